//! Unified error type for the view counter.
//!
//! Each layer has its own error enum ([`ApiError`], [`PushError`],
//! [`SessionError`], [`ConfigError`]); [`Error`] wraps all of them so hosts
//! that wire up the whole stack can use a single error type.
//!
//! None of these ever escape [`ViewCounter::init`](crate::reconciler::ViewCounter::init)
//! or [`ViewCounter::listen`](crate::reconciler::ViewCounter::listen): the
//! reconciler logs them and degrades instead.

use thiserror::Error;

/// Error returned by a [`CountSource`](crate::api::CountSource).
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[cfg(feature = "http")]
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status code.
    #[error("unexpected status {0}")]
    Status(u16),

    /// The response body is not valid JSON.
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response succeeded and its JSON body holds no count under any
    /// accepted key.
    #[error("response body has no count field")]
    MissingCount,
}

/// Error raised by a [`PushChannel`](crate::push::PushChannel) or its
/// subscription stream.
#[derive(Debug, Error)]
pub enum PushError {
    /// The channel could not be opened.
    #[error("push channel connect error: {0}")]
    Connect(String),

    /// The open stream broke; no further events will arrive.
    #[error("push channel transport error: {0}")]
    Transport(String),

    /// A single event could not be decoded. The stream stays usable.
    #[error("malformed push event: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Returns `true` if the backend accepted the request even though no
    /// count could be read from its reply.
    ///
    /// An increment that fails this way has still been counted.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self, ApiError::MissingCount)
    }
}

impl PushError {
    /// Returns `true` if the subscription cannot deliver further events.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PushError::Malformed(_))
    }
}

/// Error raised by a [`SessionStore`](crate::session::SessionStore).
#[derive(Debug, Error)]
pub enum SessionError {
    /// Reading or writing the backing storage failed.
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file is not a JSON object of flags.
    #[error("session file is corrupt: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error raised while loading a [`ViewCounterConfig`](crate::config::ViewCounterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid TOML for [`ViewCounterConfig`](crate::config::ViewCounterConfig).
    #[error("cannot parse config: {0}")]
    Toml(#[from] toml::de::Error),

    /// The config parsed but holds an unusable value.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Unified error type for all view counter operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Push(#[from] PushError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for view counter operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_push_is_not_terminal() {
        assert!(!PushError::Malformed("x".into()).is_terminal());
        assert!(PushError::Transport("eof".into()).is_terminal());
        assert!(PushError::Connect("refused".into()).is_terminal());
    }

    #[test]
    fn test_only_missing_count_is_acknowledged() {
        assert!(ApiError::MissingCount.is_acknowledged());
        assert!(!ApiError::Status(500).is_acknowledged());
        let decode = serde_json::from_str::<serde_json::Value>("<html>").unwrap_err();
        assert!(!ApiError::Decode(decode).is_acknowledged());
    }

    #[test]
    fn test_unified_error_display_is_transparent() {
        let err: Error = ApiError::Status(503).into();
        assert_eq!(err.to_string(), "unexpected status 503");
    }
}
