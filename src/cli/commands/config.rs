//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::{FeedError, FeedResult};
use crate::ui::{self, UiContext};
use std::path::PathBuf;

const VALID_KEYS: [&str; 6] = [
    "general.log_format",
    "feed.page_size",
    "feed.popularity_threshold",
    "feed.skip_missing_image",
    "persistence.enabled",
    "persistence.dir",
];

/// Execute the config command
pub async fn execute(args: ConfigArgs, manager: &ConfigManager, config: &Config) -> FeedResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => set_value(manager, config, &key, &value).await?,
    }

    Ok(())
}

fn show_config(config: &Config) -> FeedResult<()> {
    let toml = toml::to_string_pretty(config)?;
    println!("{}", toml);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let path = manager.path();

    if path.exists() && !force {
        ui::step_warn_hint(
            &ctx,
            &format!("Config already exists at {}", path.display()),
            "Use --force to overwrite",
        );
        return Ok(());
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());

    Ok(())
}

async fn set_value(manager: &ConfigManager, config: &Config, key: &str, value: &str) -> FeedResult<()> {
    let ctx = UiContext::detect();
    let mut config = config.clone();

    if !VALID_KEYS.contains(&key) {
        ui::step_error_detail(&ctx, "Unknown config key", key);
        ui::remark(&ctx, "Valid keys:");
        for key in VALID_KEYS {
            eprintln!("  {}", key);
        }
        return Ok(());
    }
    apply_value(&mut config, key, value)?;

    manager.save(&config).await?;
    ui::step_ok(&ctx, &format!("Set {} = {}", key, value));

    Ok(())
}

fn apply_value(config: &mut Config, key: &str, value: &str) -> FeedResult<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["general", "log_format"] => match value {
            "text" | "json" => config.general.log_format = value.to_string(),
            _ => {
                return Err(FeedError::User(format!(
                    "Invalid log format: {}. Use text/json",
                    value
                )))
            }
        },
        ["feed", "page_size"] => {
            let page_size: usize = parse_number(value)?;
            if page_size == 0 {
                return Err(FeedError::InvalidPageSize(0));
            }
            config.feed.page_size = page_size;
        }
        ["feed", "popularity_threshold"] => config.feed.popularity_threshold = parse_number(value)?,
        ["feed", "skip_missing_image"] => config.feed.skip_missing_image = parse_bool(value)?,
        ["persistence", "enabled"] => config.persistence.enabled = parse_bool(value)?,
        ["persistence", "dir"] => {
            config.persistence.dir = (!value.is_empty()).then(|| PathBuf::from(value))
        }
        _ => return Err(FeedError::User(format!("Unknown config key: {}", key))),
    }

    Ok(())
}

fn parse_bool(value: &str) -> FeedResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(FeedError::User(format!(
            "Invalid boolean value: {}. Use true/false",
            value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(value: &str) -> FeedResult<T> {
    value
        .parse()
        .map_err(|_| FeedError::User(format!("Invalid number: {}", value)))
}
