//! Filter and ordering regimes for each feed phase

use crate::error::{FeedError, FeedResult};
use crate::feed::cursor::Phase;
use crate::feed::item::Item;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Row filter applied by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Every row qualifies
    All,
    /// Rows whose score is at least the threshold
    ScoreAtLeast(i64),
}

impl Filter {
    /// Check whether an item passes the filter
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::ScoreAtLeast(threshold) => item.score >= *threshold,
        }
    }
}

/// Store ordering. Always descending on the primary value, ties by key ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortSpec {
    /// Popularity score, highest first
    ScoreDesc,
    /// Creation time, newest first
    RecencyDesc,
}

impl SortSpec {
    /// The primary sort value of an item under this ordering
    pub fn sort_value(&self, item: &Item) -> i64 {
        match self {
            Self::ScoreDesc => item.score,
            Self::RecencyDesc => item.created_at.timestamp_millis(),
        }
    }

    /// Total order of two items: primary value descending, then key ascending
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        self.compare_position(self.sort_value(a), &a.key, self.sort_value(b), &b.key)
    }

    /// Same ordering expressed over raw `(value, key)` positions
    pub fn compare_position(&self, a_value: i64, a_key: &str, b_value: i64, b_key: &str) -> Ordering {
        b_value.cmp(&a_value).then_with(|| a_key.cmp(b_key))
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScoreDesc => write!(f, "score desc"),
            Self::RecencyDesc => write!(f, "recency desc"),
        }
    }
}

/// One named filter + ordering regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub filter: Filter,
    pub sort: SortSpec,
}

/// Full description of a paginated feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSpec {
    /// Rows requested per store query
    pub page_size: usize,
    /// Regime read first
    pub primary: PhaseSpec,
    /// Regime switched to once the primary one is exhausted, if any
    pub fallback: Option<PhaseSpec>,
}

impl FeedSpec {
    /// Build a feed spec, rejecting a zero page size
    pub fn new(page_size: usize, primary: PhaseSpec, fallback: Option<PhaseSpec>) -> FeedResult<Self> {
        if page_size == 0 {
            return Err(FeedError::InvalidPageSize(page_size));
        }
        Ok(Self {
            page_size,
            primary,
            fallback,
        })
    }

    /// Popular items first (score >= threshold, by score), then everything by recency
    pub fn popular_then_recent(threshold: i64, page_size: usize) -> FeedResult<Self> {
        Self::new(
            page_size,
            PhaseSpec {
                filter: Filter::ScoreAtLeast(threshold),
                sort: SortSpec::ScoreDesc,
            },
            Some(PhaseSpec {
                filter: Filter::All,
                sort: SortSpec::RecencyDesc,
            }),
        )
    }

    /// Single-regime feed: everything, newest first
    pub fn recent(page_size: usize) -> FeedResult<Self> {
        Self::new(
            page_size,
            PhaseSpec {
                filter: Filter::All,
                sort: SortSpec::RecencyDesc,
            },
            None,
        )
    }

    /// Regime for a phase, if the feed has one
    pub fn phase(&self, phase: Phase) -> Option<&PhaseSpec> {
        match phase {
            Phase::Primary => Some(&self.primary),
            Phase::Fallback => self.fallback.as_ref(),
        }
    }
}
