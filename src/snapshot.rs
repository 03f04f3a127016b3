//! Serializable snapshot of the displayed counter.
//!
//! # Examples
//!
//! ```rust
//! use contavisite::counters::{DisplayedCounter, ViewCount};
//! use contavisite::snapshot::DisplaySnapshot;
//!
//! let counter = DisplayedCounter::new().with_name("views");
//! counter.show(ViewCount::new(42));
//!
//! let snapshot = DisplaySnapshot::from_counter(&counter);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! assert_eq!(json, r#"{"name":"views","count":42,"text":"42","visible":true}"#);
//! ```

use serde::{Deserialize, Serialize};

use crate::counters::{DisplayState, DisplayedCounter};

/// The displayed counter at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub name: String,
    /// `None` while pending or showing the fallback.
    pub count: Option<u64>,
    /// What the page renders.
    pub text: String,
    pub visible: bool,
    /// Optional timestamp in milliseconds since Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

impl DisplaySnapshot {
    /// Captures `state` under `name`.
    pub fn new(name: impl Into<String>, state: DisplayState) -> Self {
        DisplaySnapshot {
            name: name.into(),
            count: state.value.count().map(|c| c.get()),
            text: state.value.to_string(),
            visible: state.visible,
            timestamp_ms: None,
        }
    }

    /// Captures a counter's current state. Unnamed counters get `(unnamed)`.
    pub fn from_counter(counter: &DisplayedCounter) -> Self {
        let name = if counter.name().is_empty() {
            "(unnamed)"
        } else {
            counter.name()
        };
        Self::new(name, counter.state())
    }

    /// Records when the snapshot was taken, in milliseconds since the epoch.
    pub fn with_timestamp(self, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::ViewCount;

    #[test]
    fn test_pending_snapshot() {
        let snapshot = DisplaySnapshot::from_counter(&DisplayedCounter::new());
        assert_eq!(snapshot.name, "(unnamed)");
        assert_eq!(snapshot.count, None);
        assert_eq!(snapshot.text, "");
        assert!(!snapshot.visible);
    }

    #[test]
    fn test_fallback_snapshot() {
        let counter = DisplayedCounter::new().with_name("views");
        counter.show_fallback();
        let json = serde_json::to_string(&DisplaySnapshot::from_counter(&counter)).unwrap();
        assert_eq!(json, r#"{"name":"views","count":null,"text":"...","visible":true}"#);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let counter = DisplayedCounter::new().with_name("views");
        counter.show(ViewCount::new(3));
        let snapshot = DisplaySnapshot::from_counter(&counter).with_timestamp(1_700_000_000_000);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains(r#""timestamp_ms":1700000000000"#));
        let back: DisplaySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
