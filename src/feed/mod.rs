//! Cursor-based, phase-switching pagination
//!
//! A feed is read in pages through an [`OrderedStore`]. Each feed has a
//! primary regime (filtered + sorted subset) and optionally a fallback regime
//! (unfiltered ordering) that takes over once the primary one runs dry.
//!
//! # Phase Lifecycle
//!
//! | State | Cursor | Description |
//! |-------|--------|-------------|
//! | Primary | none | Session start |
//! | Primary | advanced | Last primary page was full |
//! | Fallback | none | Last primary page was short |
//! | Fallback | advanced | Last fallback page was full |
//! | Done | - | Last fallback page was short |

pub mod cursor;
pub mod fetcher;
pub mod item;
pub mod memory;
pub mod query;
pub mod store;

pub use cursor::{Cursor, CursorState, PageResult, Phase};
pub use fetcher::{PaginatedFetcher, ValidityFilter};
pub use item::Item;
pub use memory::InMemoryStore;
pub use query::{FeedSpec, Filter, PhaseSpec, SortSpec};
pub use store::{OrderedStore, StorePage};
