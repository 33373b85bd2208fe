//! Integration tests for feedpager

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const FIXTURE: &str = r#"[
        {"key": "a", "score": 20, "created_at": "2025-05-01T10:00:00Z",
         "payload": {"image": "a.jpg", "title": "Harbor"}},
        {"key": "b", "score": 15, "created_at": "2025-05-02T10:00:00Z",
         "payload": {"image": "b.jpg", "title": "Old town"}},
        {"key": "c", "score": 3, "created_at": "2025-05-03T10:00:00Z",
         "payload": {"title": "No photo"}},
        {"key": "d", "score": 1, "created_at": "2025-05-04T10:00:00Z",
         "payload": {"image": "d.jpg", "title": "Rooftop"}}
    ]"#;

    fn feedpager() -> Command {
        cargo_bin_cmd!("feedpager")
    }

    /// Command with an isolated config that keeps persistence inside `temp`
    fn isolated(temp: &TempDir) -> Command {
        let config = temp.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                "[persistence]\nenabled = true\ndir = {:?}\n",
                temp.path().join("state").display().to_string()
            ),
        )
        .unwrap();

        let mut cmd = feedpager();
        cmd.env("FEEDPAGER_CONFIG", &config);
        cmd
    }

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn help_displays() {
        feedpager()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cursor-based feed pagination"));
    }

    #[test]
    fn version_displays() {
        feedpager()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("feedpager"));
    }

    #[test]
    fn config_path() {
        let temp = TempDir::new().unwrap();
        isolated(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        isolated(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[feed]").and(predicate::str::contains("page_size = 12")));
    }

    #[test]
    fn config_init_writes_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fresh").join("config.toml");

        feedpager()
            .env("FEEDPAGER_CONFIG", &path)
            .args(["config", "init"])
            .assert()
            .success();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("popularity_threshold = 10"));
    }

    #[test]
    fn browse_all_pages_plain() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", FIXTURE);

        // popular a, b; then recency d (c has no image); a, b not repeated
        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .args(["--page-size", "2", "--pages", "0", "--format", "plain"])
            .assert()
            .success()
            .stdout("a\nb\nd\n");
    }

    #[test]
    fn browse_keeps_missing_image_on_request() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", FIXTURE);

        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .args(["--recent-only", "--keep-missing-image", "--format", "plain"])
            .assert()
            .success()
            .stdout("d\nc\nb\na\n");
    }

    #[test]
    fn browse_json_applies_overlay() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", FIXTURE);
        let overlay = write_file(
            temp.path(),
            "overlay.json",
            r#"[{"key": "b", "liked": true, "count": 42}]"#,
        );

        let output = isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .arg("--overlay")
            .arg(&overlay)
            .args(["--format", "json"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let items = report["pages"][0]["items"].as_array().unwrap();
        assert_eq!(report["pages"][0]["phase"], "primary");
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["key"], "b");
        assert_eq!(items[1]["liked"], true);
        assert_eq!(items[1]["count"], 42);
    }

    #[test]
    fn browse_resume_continues_saved_feed() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", FIXTURE);

        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .args(["--recent-only", "--page-size", "2", "--format", "plain"])
            .assert()
            .success()
            .stdout("d\n");

        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .args(["--recent-only", "--page-size", "2", "--resume", "--format", "plain"])
            .assert()
            .success()
            .stdout("b\na\n");
    }

    #[test]
    fn browse_invalid_fixture_fails() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", "{not json");

        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid fixture"));
    }

    #[test]
    fn browse_rejects_zero_page_size() {
        let temp = TempDir::new().unwrap();
        let fixture = write_file(temp.path(), "items.json", FIXTURE);

        isolated(&temp)
            .arg("browse")
            .arg(&fixture)
            .args(["--page-size", "0"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid page size"));
    }
}

mod scenario_tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use feedpager::cache::{FeedCache, QueryId};
    use feedpager::controller::{FeedController, FetchOutcome, SkipReason};
    use feedpager::events::EventBus;
    use feedpager::feed::{
        CursorState, FeedSpec, Filter, InMemoryStore, Item, OrderedStore, PaginatedFetcher, Phase, SortSpec,
        StorePage,
    };
    use feedpager::overlay::{MemoryOverlayStore, OverlayEntry, OverlayManager};
    use feedpager::persistence::FilePersistence;
    use feedpager::FeedResult;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap()
    }

    /// `popular` items scored 100 down, then `plain` newer items scored 1
    fn places(popular: usize, plain: usize) -> Vec<Item> {
        let mut items = Vec::new();
        for i in 0..popular {
            items.push(Item::new(
                format!("pop-{:02}", i),
                100 - i as i64,
                base() + Duration::minutes(i as i64),
            ));
        }
        for i in 0..plain {
            items.push(Item::new(
                format!("new-{:02}", i),
                1,
                base() + Duration::days(1) + Duration::minutes(i as i64),
            ));
        }
        items
    }

    fn mount(store: Arc<dyn OrderedStore>, cache: Arc<FeedCache>, page_size: usize) -> FeedController {
        let fetcher = PaginatedFetcher::new(store, FeedSpec::popular_then_recent(10, page_size).unwrap());
        FeedController::mount(QueryId::places("all"), fetcher, cache).with_bus(Arc::new(EventBus::new()))
    }

    fn keys(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.key.clone()).collect()
    }

    async fn drain(ctl: &FeedController) {
        ctl.start().await.unwrap();
        while ctl.has_more() {
            ctl.fetch_next().await.unwrap();
        }
    }

    /// Ordered store that parks queries while `gated` is set
    struct GatedStore {
        inner: InMemoryStore,
        gate: Notify,
        gated: AtomicBool,
        started: AtomicUsize,
    }

    impl GatedStore {
        fn new(items: Vec<Item>) -> Self {
            Self {
                inner: InMemoryStore::from_items(items),
                gate: Notify::new(),
                gated: AtomicBool::new(false),
                started: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OrderedStore for GatedStore {
        async fn query(
            &self,
            filter: &Filter,
            sort: &SortSpec,
            cursor: Option<&str>,
            page_size: usize,
        ) -> FeedResult<StorePage> {
            self.started.fetch_add(1, Ordering::SeqCst);
            if self.gated.load(Ordering::SeqCst) {
                self.gate.notified().await;
            }
            self.inner.query(filter, sort, cursor, page_size).await
        }

        fn store_name(&self) -> &'static str {
            "gated"
        }
    }

    #[tokio::test]
    async fn popular_phase_then_recency_without_repeats() {
        let store = Arc::new(InMemoryStore::from_items(places(15, 5)));
        let ctl = mount(store, Arc::new(FeedCache::new()), 12);

        assert_eq!(ctl.start().await.unwrap(), FetchOutcome::Appended { appended: 12, total: 12 });
        assert_eq!(ctl.fetch_next().await.unwrap(), FetchOutcome::Appended { appended: 3, total: 15 });
        assert!(ctl.has_more());

        // first fallback page holds 5 new items and 7 already-seen popular ones
        assert_eq!(ctl.fetch_next().await.unwrap(), FetchOutcome::Appended { appended: 5, total: 20 });
        assert!(ctl.has_more());
        assert_eq!(ctl.fetch_next().await.unwrap(), FetchOutcome::Appended { appended: 0, total: 20 });
        assert!(!ctl.has_more());
        assert_eq!(
            ctl.fetch_next().await.unwrap(),
            FetchOutcome::Skipped(SkipReason::Exhausted)
        );

        let items = ctl.items();
        let expected_popular: Vec<String> = (0..15).map(|i| format!("pop-{:02}", i)).collect();
        assert_eq!(keys(&items[..15]), expected_popular);
        let expected_recent: Vec<String> = (0..5).rev().map(|i| format!("new-{:02}", i)).collect();
        assert_eq!(keys(&items[15..]), expected_recent);
    }

    #[tokio::test]
    async fn empty_primary_phase_switches_immediately() {
        let store = Arc::new(InMemoryStore::from_items(places(0, 3)));
        let ctl = mount(store, Arc::new(FeedCache::new()), 12);

        assert_eq!(ctl.start().await.unwrap(), FetchOutcome::Appended { appended: 0, total: 0 });
        assert!(ctl.has_more());

        assert_eq!(ctl.fetch_next().await.unwrap(), FetchOutcome::Appended { appended: 3, total: 3 });
        assert!(!ctl.has_more());
        assert_eq!(keys(&ctl.items()), ["new-02", "new-01", "new-00"]);
    }

    #[tokio::test]
    async fn toggle_during_fetch_keeps_overlay_precedence() {
        let store = Arc::new(GatedStore::new(places(4, 0)));
        let overlay_store = Arc::new(
            MemoryOverlayStore::new().with_entries("u1", [OverlayEntry::new("pop-03", true, 99)]),
        );
        let overlay = Arc::new(OverlayManager::new("u1", overlay_store.clone()));
        let ctl = Arc::new(
            mount(store.clone(), Arc::new(FeedCache::new()), 2).with_overlay(Arc::clone(&overlay)),
        );

        ctl.start().await.unwrap();
        store.gated.store(true, Ordering::SeqCst);
        let pending = tokio::spawn({
            let ctl = Arc::clone(&ctl);
            async move { ctl.fetch_next().await }
        });
        while store.started.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }

        // pop-02 is on the page still in flight; its base counter is its score
        let base_item = places(4, 0).remove(2);
        let entry = overlay.toggle_like(&base_item).await.unwrap();
        assert!(entry.liked);
        assert_eq!(entry.count, 99);

        store.gate.notify_one();
        assert_eq!(
            pending.await.unwrap().unwrap(),
            FetchOutcome::Appended { appended: 2, total: 4 }
        );

        let items = ctl.items();
        let toggled = items.iter().find(|i| i.key == "pop-02").unwrap();
        assert!(toggled.liked);
        assert_eq!(toggled.count, 99);
        let preset = items.iter().find(|i| i.key == "pop-03").unwrap();
        assert!(preset.liked);
        assert_eq!(preset.count, 99);
        let untouched = items.iter().find(|i| i.key == "pop-00").unwrap();
        assert!(!untouched.liked);
        assert_eq!(overlay_store.entry("u1", "pop-02").map(|e| e.count), Some(99));

        // toggling back through the controller once the item is cached
        let entry = ctl.toggle_like("pop-02").await.unwrap();
        assert!(!entry.liked);
        assert_eq!(entry.count, 98);
    }

    #[tokio::test]
    async fn same_cursor_state_yields_same_page() {
        let fetcher = PaginatedFetcher::new(
            Arc::new(InMemoryStore::from_items(places(7, 6))),
            FeedSpec::popular_then_recent(10, 4).unwrap(),
        );
        let seen = HashSet::from(["pop-01".to_string()]);
        let state = CursorState::start_of(Phase::Fallback);

        let first = fetcher.fetch_next_page(&state, &seen).await.unwrap();
        let second = fetcher.fetch_next_page(&state, &seen).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[tokio::test]
    async fn identical_inputs_yield_identical_feeds() {
        let first = mount(
            Arc::new(InMemoryStore::from_items(places(7, 6))),
            Arc::new(FeedCache::new()),
            4,
        );
        let second = mount(
            Arc::new(InMemoryStore::from_items(places(7, 6))),
            Arc::new(FeedCache::new()),
            4,
        );

        drain(&first).await;
        drain(&second).await;

        assert_eq!(
            serde_json::to_value(first.items()).unwrap(),
            serde_json::to_value(second.items()).unwrap()
        );
    }

    #[tokio::test]
    async fn reordered_store_never_repeats_a_key() {
        let store = Arc::new(InMemoryStore::from_items(places(6, 2)));
        let ctl = mount(store.clone(), Arc::new(FeedCache::new()), 2);

        ctl.start().await.unwrap();
        // pop-00 drops behind the cursor anchor and is returned again
        assert!(store.set_score("pop-00", 50));
        while ctl.has_more() {
            ctl.fetch_next().await.unwrap();
        }

        let items = ctl.items();
        let unique: HashSet<_> = items.iter().map(|i| i.key.clone()).collect();
        assert_eq!(unique.len(), items.len());
        assert_eq!(items.len(), 8);
    }

    #[tokio::test]
    async fn primary_queries_per_population() {
        for (popular, expected) in [(0, 1), (5, 1), (12, 2), (24, 3), (25, 3)] {
            let store = Arc::new(InMemoryStore::from_items(places(popular, 3)));
            let ctl = mount(store, Arc::new(FeedCache::new()), 12);

            let phases = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&phases);
            ctl.on_page_appended(move |page| sink.lock().unwrap().push(page.phase));
            drain(&ctl).await;

            let primary = phases
                .lock()
                .unwrap()
                .iter()
                .filter(|phase| **phase == Phase::Primary)
                .count();
            assert_eq!(primary, expected, "population {}", popular);
            assert_eq!(ctl.items().len(), popular + 3);
        }
    }

    #[tokio::test]
    async fn saved_feed_resumes_in_a_new_cache() {
        let temp = TempDir::new().unwrap();
        let persistence = FilePersistence::new(temp.path());
        let store = Arc::new(InMemoryStore::from_items(places(5, 0)));

        let cache = Arc::new(FeedCache::new());
        let ctl = mount(store.clone(), Arc::clone(&cache), 2);
        ctl.start().await.unwrap();
        assert!(cache.save_to(ctl.query_id(), &persistence).await.unwrap());

        let restored = Arc::new(FeedCache::new());
        assert!(restored.load_from(ctl.query_id(), &persistence).await.unwrap());
        let resumed = mount(store, restored, 2);
        assert!(resumed.is_hydrated());

        drain(&resumed).await;
        assert_eq!(
            keys(&resumed.items()),
            ["pop-00", "pop-01", "pop-02", "pop-03", "pop-04"]
        );
    }
}
