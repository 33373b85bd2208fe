//! Browse command - page through a feed fixture

use crate::cache::{FeedCache, QueryId};
use crate::cli::args::{BrowseArgs, OutputFormat};
use crate::config::{Config, ConfigManager};
use crate::controller::{FeedController, FetchOutcome, PageAppended};
use crate::error::{FeedError, FeedResult};
use crate::feed::{InMemoryStore, Item, PaginatedFetcher, Phase};
use crate::overlay::{MemoryOverlayStore, OverlayEntry, OverlayManager};
use crate::persistence::{FilePersistence, Persistence};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::fs;
use tracing::debug;

/// User the overlay fixture belongs to
const LOCAL_USER: &str = "local";

#[derive(Debug, Serialize)]
struct PageReport {
    phase: Phase,
    items: Vec<Item>,
}

#[derive(Debug, Serialize)]
struct BrowseReport {
    query_id: QueryId,
    resumed: usize,
    pages: Vec<PageReport>,
    total: usize,
    has_more: bool,
}

/// Execute the browse command
pub async fn execute(args: BrowseArgs, config: &Config) -> FeedResult<()> {
    let ctx = UiContext::detect();

    let mut feed = config.feed.clone();
    if let Some(page_size) = args.page_size {
        feed.page_size = page_size;
    }
    if let Some(threshold) = args.threshold {
        feed.popularity_threshold = threshold;
    }
    let spec = feed.feed_spec(args.recent_only)?;

    let store = InMemoryStore::load_json(&args.fixture).await?;
    let mut fetcher = PaginatedFetcher::new(Arc::new(store), spec);
    if feed.skip_missing_image && !args.keep_missing_image {
        fetcher = fetcher.with_validity(|item: &Item| item.text_field("image").is_some());
    }

    let query_id = QueryId::new(args.query.clone());
    let cache = FeedCache::global();
    let persistence = config
        .persistence
        .enabled
        .then(|| FilePersistence::new(ConfigManager::persistence_dir(config)));

    if let Some(persistence) = &persistence {
        if args.reset {
            persistence.remove(&query_id.persistence_key()).await?;
            debug!("Removed saved state of {}", query_id);
        } else if args.resume
            && !cache.load_from(&query_id, persistence).await?
            && args.format == OutputFormat::Table
        {
            ui::step_info(&ctx, &format!("No saved state for {}, starting fresh", query_id));
        }
    } else if args.resume && args.format == OutputFormat::Table {
        ui::step_warn_hint(
            &ctx,
            "Persistence is disabled",
            "Set persistence.enabled = true to resume",
        );
    }

    let mut controller = FeedController::mount(query_id.clone(), fetcher, Arc::clone(&cache));
    if let Some(path) = &args.overlay {
        controller = controller.with_overlay(Arc::new(load_overlay(path).await?));
    }
    let resumed = controller.items().len();

    let received: Arc<Mutex<Vec<PageAppended>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    controller.on_page_appended(move |page| {
        sink.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(page.clone());
    });

    let mut fetched = count_page(controller.start().await?);
    while (args.pages == 0 || fetched < args.pages) && controller.has_more() {
        match controller.on_sentinel_visible(true).await? {
            FetchOutcome::Appended { .. } => fetched += 1,
            outcome => {
                debug!("Stopped paging: {:?}", outcome);
                break;
            }
        }
    }

    if let Some(persistence) = &persistence {
        cache.save_to(&query_id, persistence).await?;
    }

    let pages = std::mem::take(&mut *received.lock().unwrap_or_else(PoisonError::into_inner));
    let report = BrowseReport {
        query_id,
        resumed,
        total: controller.items().len(),
        has_more: controller.has_more(),
        pages: pages
            .into_iter()
            .map(|page| PageReport {
                phase: page.phase,
                items: page.items,
            })
            .collect(),
    };

    match args.format {
        OutputFormat::Table => print_table(&ctx, &report),
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Plain => print_plain(&report),
    }

    Ok(())
}

fn count_page(outcome: FetchOutcome) -> u32 {
    match outcome {
        FetchOutcome::Appended { .. } => 1,
        _ => 0,
    }
}

async fn load_overlay(path: &Path) -> FeedResult<OverlayManager> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| FeedError::io(format!("reading overlay {}", path.display()), e))?;
    let entries: Vec<OverlayEntry> =
        serde_json::from_str(&content).map_err(|e| FeedError::FixtureInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let store = MemoryOverlayStore::new().with_entries(LOCAL_USER, entries);
    Ok(OverlayManager::new(LOCAL_USER, Arc::new(store)))
}

fn print_table(ctx: &UiContext, report: &BrowseReport) {
    ui::intro(ctx, &format!("Feed {}", report.query_id));
    if report.resumed > 0 {
        ui::step_ok_detail(ctx, "Resumed from saved state", &format!("{} items", report.resumed));
    }

    for (n, page) in report.pages.iter().enumerate() {
        ui::section(ctx, &format!("Page {} ({} phase)", n + 1, page.phase));

        if page.items.is_empty() {
            ui::remark(ctx, "no new items");
            continue;
        }

        println!(
            "{:<20} {:>7} {:<17} {:<6} {:>7} {}",
            style("KEY").bold(),
            style("SCORE").bold(),
            style("CREATED").bold(),
            style("LIKED").bold(),
            style("COUNT").bold(),
            style("TITLE").bold()
        );
        println!("{}", "-".repeat(72));

        for item in &page.items {
            let liked = if item.liked {
                style("yes").green()
            } else {
                style("no").dim()
            };
            println!(
                "{:<20} {:>7} {:<17} {:<6} {:>7} {}",
                item.key,
                item.score,
                item.created_at.format("%Y-%m-%d %H:%M"),
                liked,
                item.count,
                item.text_field("title").unwrap_or("-")
            );
        }
    }

    println!();
    ui::key_value(ctx, "items", &report.total.to_string());
    ui::key_value(ctx, "more", if report.has_more { "yes" } else { "no" });
}

fn print_json(report: &BrowseReport) -> FeedResult<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{}", json);
    Ok(())
}

fn print_plain(report: &BrowseReport) {
    for item in report.pages.iter().flat_map(|page| &page.items) {
        println!("{}", item.key);
    }
}
