//! Backend access for the authoritative view count.
//!
//! The reconciler talks to the backend through [`CountSource`], which has
//! exactly two operations: count this view, or read the count without
//! touching it. [`HttpCountSource`] implements it over HTTP.
//!
//! # Response shape
//!
//! Backend revisions disagree on the name of the count field, so responses
//! are read with an ordered preference over [`COUNT_KEYS`]:
//!
//! ```rust
//! use contavisite::api::extract_count;
//! use contavisite::counters::ViewCount;
//! use serde_json::json;
//!
//! assert_eq!(extract_count(&json!({"views": 10})), Some(ViewCount::new(10)));
//! assert_eq!(extract_count(&json!({"count": 3, "views": 10})), Some(ViewCount::new(3)));
//! assert_eq!(extract_count(&json!({"total": 1})), None);
//! ```

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpCountSource;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::counters::ViewCount;
use crate::error::ApiError;

/// Accepted keys for the count field, most preferred first.
pub const COUNT_KEYS: [&str; 4] = ["count", "views", "totalViews", "visits"];

/// Source of the authoritative view count.
#[async_trait]
pub trait CountSource: Send + Sync {
    /// Counts one view and returns the new total.
    async fn increment(&self) -> Result<ViewCount, ApiError>;

    /// Returns the current total without counting a view.
    async fn current(&self) -> Result<ViewCount, ApiError>;
}

#[async_trait]
impl<T: CountSource + ?Sized> CountSource for Arc<T> {
    async fn increment(&self) -> Result<ViewCount, ApiError> {
        (**self).increment().await
    }

    async fn current(&self) -> Result<ViewCount, ApiError> {
        (**self).current().await
    }
}

/// Which generation of the backend API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiRevision {
    /// `POST /api/analytics/view`, `GET /api/analytics/views`
    #[default]
    Analytics,
    /// `POST /api/views/hit`, `GET /api/views`
    Legacy,
}

/// Request paths for the two count operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub increment: String,
    pub read: String,
}

impl Endpoints {
    /// Default request paths of an API revision.
    pub fn for_revision(revision: ApiRevision) -> Self {
        let (increment, read) = match revision {
            ApiRevision::Analytics => ("/api/analytics/view", "/api/analytics/views"),
            ApiRevision::Legacy => ("/api/views/hit", "/api/views"),
        };
        Endpoints {
            increment: increment.to_string(),
            read: read.to_string(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_revision(ApiRevision::default())
    }
}

/// Extracts the count from a response body.
///
/// The first key of [`COUNT_KEYS`] holding a non-negative integer wins. Keys
/// holding `null`, strings, negative or fractional numbers are skipped.
pub fn extract_count(body: &Value) -> Option<ViewCount> {
    let object = body.as_object()?;
    COUNT_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(Value::as_u64))
        .map(ViewCount::new)
}

/// Parses a raw response body into a count.
pub fn parse_count_body(body: &[u8]) -> Result<ViewCount, ApiError> {
    let value: Value = serde_json::from_slice(body)?;
    extract_count(&value).ok_or(ApiError::MissingCount)
}

/// Joins a base URL and an absolute path without doubling the slash.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_each_key() {
        for key in COUNT_KEYS {
            let mut object = serde_json::Map::new();
            object.insert(key.to_string(), json!(10));
            let body = Value::Object(object);
            assert_eq!(extract_count(&body), Some(ViewCount::new(10)), "key {key}");
        }
    }

    #[test]
    fn test_extract_prefers_earlier_key() {
        let body = json!({"visits": 1, "totalViews": 2, "views": 3});
        assert_eq!(extract_count(&body), Some(ViewCount::new(3)));
    }

    #[test]
    fn test_extract_zero_is_a_count() {
        let body = json!({"count": 0, "views": 10});
        assert_eq!(extract_count(&body), Some(ViewCount::new(0)));
    }

    #[test]
    fn test_extract_skips_unusable_values() {
        let body = json!({"count": null, "views": "12", "totalViews": -1, "visits": 4});
        assert_eq!(extract_count(&body), Some(ViewCount::new(4)));
    }

    #[test]
    fn test_extract_non_object() {
        assert_eq!(extract_count(&json!(42)), None);
        assert_eq!(extract_count(&json!([{"count": 1}])), None);
    }

    #[test]
    fn test_parse_missing_count() {
        let err = parse_count_body(br#"{"ok":true}"#).unwrap_err();
        assert!(matches!(err, ApiError::MissingCount));
    }

    #[test]
    fn test_parse_invalid_json() {
        let err = parse_count_body(b"<html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_endpoints_for_revision() {
        let legacy = Endpoints::for_revision(ApiRevision::Legacy);
        assert_eq!(legacy.increment, "/api/views/hit");
        assert_eq!(legacy.read, "/api/views");
        assert_eq!(Endpoints::default().increment, "/api/analytics/view");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:1/", "/api/views"), "http://h:1/api/views");
        assert_eq!(join_url("http://h:1", "/api/views"), "http://h:1/api/views");
        assert_eq!(join_url("", "/api/views"), "/api/views");
    }
}
