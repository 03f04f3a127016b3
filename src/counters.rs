//! Core value types for the view counter and its on-screen projection.
//!
//! The backend owns the authoritative count. The client only ever holds a
//! cached copy, the [`DisplayedCounter`], which is what a page renders:
//!
//! ```text
//!   increment / read response ──┐
//!                               ├──► DisplayedCounter ──watch──► observers
//!   views:updated push events ──┘     (value + visibility)
//! ```
//!
//! Writes from both paths land on the same counter with last-write-wins
//! semantics unless [`UpdatePolicy::Monotonic`] is selected.

pub mod displayed;

pub use displayed::{DisplayState, DisplayedCounter};

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Text rendered while the counter shows the fallback value.
pub const FALLBACK_TEXT: &str = "...";

/// A page view count as reported by the backend.
///
/// # Examples
///
/// ```rust
/// use contavisite::counters::ViewCount;
///
/// let count = ViewCount::new(42);
/// assert_eq!(count.get(), 42);
/// assert_eq!(count.to_string(), "42");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ViewCount(u64);

impl ViewCount {
    /// Wraps a raw count.
    pub const fn new(value: u64) -> Self {
        ViewCount(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for ViewCount {
    fn from(value: u64) -> Self {
        ViewCount(value)
    }
}

impl Display for ViewCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The value a page shows for the view counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayValue {
    /// Nothing observed yet.
    #[default]
    Pending,
    /// The most recent count the client has observed.
    Count(ViewCount),
    /// The initial request failed and no count has been observed.
    Unknown,
}

impl DisplayValue {
    /// Returns the count, if one is known.
    pub fn count(&self) -> Option<ViewCount> {
        match self {
            DisplayValue::Count(c) => Some(*c),
            _ => None,
        }
    }
}

impl Display for DisplayValue {
    /// Formats the value the way it appears on the page: the number, the
    /// fallback text, or nothing while pending.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayValue::Pending => Ok(()),
            DisplayValue::Count(c) => write!(f, "{c}"),
            DisplayValue::Unknown => f.write_str(FALLBACK_TEXT),
        }
    }
}

/// How the displayed counter reconciles a new count with the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdatePolicy {
    /// Every write replaces the current value, even a lower one.
    #[default]
    LastWriteWins,
    /// Writes lower than the current count are dropped.
    Monotonic,
}

impl UpdatePolicy {
    /// Returns `true` if `next` may replace `current` under this policy.
    pub fn accepts(self, current: &DisplayValue, next: ViewCount) -> bool {
        match (self, current) {
            (UpdatePolicy::Monotonic, DisplayValue::Count(c)) => next >= *c,
            _ => true,
        }
    }
}
