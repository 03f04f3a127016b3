//! TOML configuration for the view counter.
//!
//! ```toml
//! base_url = "http://localhost:5000"
//! api = "analytics"                    # or "legacy"
//! session_key = "portfolio_viewed_session"
//! update_policy = "last-write-wins"    # or "monotonic"
//! request_timeout = "10s"
//!
//! [push]
//! path = "/api/views/stream"
//! event = "views:updated"
//! ```
//!
//! Only `base_url` is required.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::{ApiRevision, Endpoints};
use crate::counters::UpdatePolicy;
use crate::error::ConfigError;
use crate::push::VIEWS_UPDATED;
use crate::session::{FileSession, MemorySession, SessionStore, VIEW_KEY};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewCounterConfig {
    /// Backend origin, without the API path.
    pub base_url: String,
    #[serde(default)]
    pub api: ApiRevision,
    /// Overrides the increment path of `api`.
    #[serde(default)]
    pub increment_path: Option<String>,
    /// Overrides the read path of `api`.
    #[serde(default)]
    pub read_path: Option<String>,
    #[serde(default = "default_session_key")]
    pub session_key: String,
    /// Keeps the session flag in this file instead of in memory.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default)]
    pub update_policy: UpdatePolicy,
    /// Transport timeout for the count requests. None leaves it to the transport.
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    /// Live updates; absent means no push channel.
    #[serde(default)]
    pub push: Option<PushConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushConfig {
    #[serde(default = "default_push_path")]
    pub path: String,
    #[serde(default = "default_push_event")]
    pub event: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            path: default_push_path(),
            event: default_push_event(),
        }
    }
}

fn default_session_key() -> String {
    VIEW_KEY.to_string()
}

fn default_push_path() -> String {
    "/api/views/stream".to_string()
}

fn default_push_event() -> String {
    VIEWS_UPDATED.to_string()
}

impl ViewCounterConfig {
    /// Creates a config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        ViewCounterConfig {
            base_url: base_url.into(),
            api: ApiRevision::default(),
            increment_path: None,
            read_path: None,
            session_key: default_session_key(),
            session_file: None,
            update_policy: UpdatePolicy::default(),
            request_timeout: None,
            push: None,
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: ViewCounterConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Rejects an empty base URL or session key and paths not starting with `/`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url is empty".into()));
        }
        if self.session_key.is_empty() {
            return Err(ConfigError::Invalid("session_key is empty".into()));
        }
        let paths = [
            ("increment_path", self.increment_path.as_deref()),
            ("read_path", self.read_path.as_deref()),
            ("push.path", self.push.as_ref().map(|p| p.path.as_str())),
        ];
        for (name, path) in paths {
            if let Some(path) = path {
                if !path.starts_with('/') {
                    return Err(ConfigError::Invalid(format!(
                        "{name} must start with '/', got {path:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Request paths after applying the per-path overrides.
    pub fn endpoints(&self) -> Endpoints {
        let mut endpoints = Endpoints::for_revision(self.api);
        if let Some(path) = &self.increment_path {
            endpoints.increment = path.clone();
        }
        if let Some(path) = &self.read_path {
            endpoints.read = path.clone();
        }
        endpoints
    }

    /// A [`FileSession`] if `session_file` is set, else a fresh [`MemorySession`].
    pub fn session_store(&self) -> Arc<dyn SessionStore> {
        match &self.session_file {
            Some(path) => Arc::new(FileSession::new(path)),
            None => Arc::new(MemorySession::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config() {
        let config = ViewCounterConfig::from_toml_str(r#"base_url = "http://localhost:5000""#).unwrap();
        assert_eq!(config, ViewCounterConfig::new("http://localhost:5000"));
        assert_eq!(config.session_key, "portfolio_viewed_session");
        assert_eq!(config.endpoints(), Endpoints::default());
        assert!(config.push.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = ViewCounterConfig::from_toml_str(
            r#"
            base_url = "https://api.example.com"
            api = "legacy"
            increment_path = "/hit"
            session_key = "seen"
            session_file = "/tmp/session.json"
            update_policy = "monotonic"
            request_timeout = "1500ms"

            [push]
            event = "views:changed"
            "#,
        )
        .unwrap();

        assert_eq!(config.api, ApiRevision::Legacy);
        assert_eq!(config.endpoints().increment, "/hit");
        assert_eq!(config.endpoints().read, "/api/views");
        assert_eq!(config.session_key, "seen");
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/session.json")));
        assert_eq!(config.update_policy, UpdatePolicy::Monotonic);
        assert_eq!(config.request_timeout, Some(Duration::from_millis(1500)));
        let push = config.push.unwrap();
        assert_eq!(push.path, "/api/views/stream");
        assert_eq!(push.event, "views:changed");
    }

    #[test]
    fn test_missing_base_url() {
        let err = ViewCounterConfig::from_toml_str(r#"api = "legacy""#).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_empty_base_url() {
        let err = ViewCounterConfig::from_toml_str(r#"base_url = " ""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_relative_path_rejected() {
        let err = ViewCounterConfig::from_toml_str(
            r#"
            base_url = "http://h"
            read_path = "api/views"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("read_path"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ViewCounterConfig::from_toml_str(
            r#"
            base_url = "http://h"
            colour = "blue"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("views.toml");
        std::fs::write(&path, "base_url = \"http://h\"\n[push]\n").unwrap();
        let config = ViewCounterConfig::load(&path).unwrap();
        assert_eq!(config.push, Some(PushConfig::default()));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ViewCounterConfig::load("/nonexistent/views.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_session_store_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ViewCounterConfig::new("http://h");
        config.session_file = Some(dir.path().join("s.json"));
        config.session_store().set(VIEW_KEY).unwrap();
        assert!(FileSession::new(dir.path().join("s.json")).is_set(VIEW_KEY).unwrap());
    }
}
