//! Session-scoped storage for the "already counted" flag.
//!
//! A session is whatever lifetime the [`SessionStore`] gives its flags:
//!
//! | Store | Lifetime |
//! |-------|----------|
//! | [`MemorySession`] | as long as the value is alive (one tab) |
//! | [`FileSession`] | as long as the backing file exists |
//!
//! The reconciler only ever sets flags; ending the session is up to the host.

use std::collections::{BTreeMap, HashSet};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::error::SessionError;

/// Key of the flag marking that this session's view was already counted.
pub const VIEW_KEY: &str = "portfolio_viewed_session";

const FLAG_VALUE: &str = "true";

/// Storage for boolean session flags.
pub trait SessionStore: Send + Sync {
    /// Returns `true` if `key` is set in this session.
    fn is_set(&self, key: &str) -> Result<bool, SessionError>;

    /// Sets `key` for the remainder of the session.
    fn set(&self, key: &str) -> Result<(), SessionError>;
}

/// In-memory session flags.
///
/// # Examples
///
/// ```rust
/// use contavisite::session::{MemorySession, SessionStore, VIEW_KEY};
///
/// let session = MemorySession::new();
/// assert!(!session.is_set(VIEW_KEY).unwrap());
/// session.set(VIEW_KEY).unwrap();
/// assert!(session.is_set(VIEW_KEY).unwrap());
/// ```
#[derive(Debug, Default)]
pub struct MemorySession {
    flags: Mutex<HashSet<String>>,
}

impl MemorySession {
    /// Creates a session with no flags set.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySession {
    fn is_set(&self, key: &str) -> Result<bool, SessionError> {
        Ok(self.flags.lock().contains(key))
    }

    fn set(&self, key: &str) -> Result<(), SessionError> {
        self.flags.lock().insert(key.to_string());
        Ok(())
    }
}

/// Session flags kept in a JSON object file, e.g.
/// `{"portfolio_viewed_session":"true"}`.
///
/// A missing file is an empty session. Removing the file ends the session.
#[derive(Debug)]
pub struct FileSession {
    path: PathBuf,
    // serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl FileSession {
    /// Keeps the flags in the file at `path`, created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSession {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_flags(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl SessionStore for FileSession {
    fn is_set(&self, key: &str) -> Result<bool, SessionError> {
        let _guard = self.lock.lock();
        Ok(self.read_flags()?.get(key).is_some_and(|v| v == FLAG_VALUE))
    }

    fn set(&self, key: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock();
        let mut flags = self.read_flags()?;
        flags.insert(key.to_string(), FLAG_VALUE.to_string());
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        // a crash mid-write must not leave a truncated file behind
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(&serde_json::to_vec(&flags)?)?;
        file.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
