//! CLI command implementations

pub mod browse;
pub mod config;

pub use browse::execute as browse;
pub use config::execute as config;
