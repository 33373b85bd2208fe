//! Cursor and phase model driving every fetch

use crate::feed::item::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which regime a feed is currently reading
///
/// Transition is one-directional within a session: `Primary` -> `Fallback`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Filtered and sorted subset (e.g. popular items by score)
    Primary,
    /// Unfiltered fallback ordering (e.g. everything by recency)
    Fallback,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        };
        write!(f, "{}", name)
    }
}

/// Opaque resume position returned by the store, scoped to one phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Phase whose query produced this token
    pub phase: Phase,
    /// Store-defined token
    pub token: String,
}

/// Position of the next request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorState {
    pub cursor: Option<Cursor>,
    pub phase: Phase,
}

impl CursorState {
    /// Start of a feed session: no cursor, primary phase
    pub fn initial() -> Self {
        Self::start_of(Phase::Primary)
    }

    /// Start of the given phase
    pub fn start_of(phase: Phase) -> Self {
        Self {
            cursor: None,
            phase,
        }
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Outcome of one page fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    /// Items that survived dedup and validity filtering, in store order
    pub items: Vec<Item>,
    /// Cursor after the last row the store returned
    pub next_cursor: Option<Cursor>,
    /// Phase this page was read from
    pub phase: Phase,
    /// The store returned fewer rows than requested
    pub exhausted: bool,
    /// Rows the store returned before filtering
    pub fetched: usize,
}

impl PageResult {
    /// Rows dropped by dedup or validity filtering
    pub fn dropped(&self) -> usize {
        self.fetched.saturating_sub(self.items.len())
    }
}
