//! feedpager - cursor-based, phase-switching feed pagination
//!
//! Pages through a remotely stored, ordered collection in fixed-size
//! batches. A feed may switch ordering regime once (popular items first,
//! then the rest by recency) without repeating an item, merges per-user
//! flags onto shared items, and keeps fetched pages in a process-wide cache
//! so a returning reader resumes without re-fetching.

pub mod cache;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod feed;
pub mod overlay;
pub mod persistence;
pub mod ui;

pub use error::{FeedError, FeedResult};
