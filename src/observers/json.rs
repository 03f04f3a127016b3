//! JSON observer for the displayed counter.
//!
//! # Examples
//!
//! ```rust
//! use contavisite::counters::{DisplayedCounter, ViewCount};
//! use contavisite::observers::json::JsonObserver;
//!
//! let counter = DisplayedCounter::new().with_name("views");
//! counter.show(ViewCount::new(42));
//!
//! let json = JsonObserver::new().to_json(&counter).unwrap();
//! assert_eq!(json, r#"{"name":"views","count":42,"text":"42","visible":true}"#);
//! ```

use crate::counters::DisplayedCounter;
use crate::snapshot::DisplaySnapshot;

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to include a timestamp in the output.
    pub include_timestamp: bool,
}

/// Serializes the displayed counter as a [`DisplaySnapshot`].
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates an observer with compact output and no timestamp.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an observer from a full [`JsonConfig`].
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables indented output.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Adds `timestamp_ms` to each snapshot.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Takes a snapshot of the counter without serializing it.
    pub fn collect(&self, counter: &DisplayedCounter) -> DisplaySnapshot {
        let snapshot = DisplaySnapshot::from_counter(counter);
        if self.config.include_timestamp {
            snapshot.with_timestamp(current_timestamp_ms())
        } else {
            snapshot
        }
    }

    /// Serializes a snapshot of the counter to a string.
    pub fn to_json(&self, counter: &DisplayedCounter) -> Result<String, serde_json::Error> {
        let snapshot = self.collect(counter);
        if self.config.pretty {
            serde_json::to_string_pretty(&snapshot)
        } else {
            serde_json::to_string(&snapshot)
        }
    }

    /// Serializes a compact snapshot to bytes, ignoring `pretty`.
    pub fn to_json_bytes(&self, counter: &DisplayedCounter) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.collect(counter))
    }
}

/// Returns the current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
