//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// feedpager - cursor-based feed pagination
///
/// Pages through a stored feed the way an infinite-scroll list does:
/// popular items first, then the rest by recency, with per-user flags
/// layered on top.
#[derive(Parser, Debug)]
#[command(name = "feedpager")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "FEEDPAGER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Page through a feed fixture
    Browse(BrowseArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the browse command
#[derive(Parser, Debug)]
pub struct BrowseArgs {
    /// JSON file with the feed items (array of items)
    pub fixture: PathBuf,

    /// Number of pages to fetch (0 = until the feed ends)
    #[arg(short, long, default_value = "1")]
    pub pages: u32,

    /// Items per page (defaults to feed.page_size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Minimum score of the popular phase (defaults to feed.popularity_threshold)
    #[arg(long)]
    pub threshold: Option<i64>,

    /// Single recency-ordered phase instead of popular-then-recent
    #[arg(long)]
    pub recent_only: bool,

    /// JSON file with per-item flags (array of {key, liked, count})
    #[arg(long)]
    pub overlay: Option<PathBuf>,

    /// Query identity the feed is cached under
    #[arg(short, long, default_value = "places")]
    pub query: String,

    /// Continue from the saved state of this query
    #[arg(long)]
    pub resume: bool,

    /// Discard the saved state and start over
    #[arg(long, conflicts_with = "resume")]
    pub reset: bool,

    /// Keep items without an image
    #[arg(long)]
    pub keep_missing_image: bool,

    /// Output format
    #[arg(short, long, default_value = "table")]
    pub format: OutputFormat,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., feed.page_size)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Output format for browse
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Item keys, one per line
    Plain,
}
