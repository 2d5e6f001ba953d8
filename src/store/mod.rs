//! Durable client-side state: the single-slot token record, the
//! bounded audit log, and the polling slots used by the realtime
//! fallback. Everything is small JSON files under the data directory;
//! reads degrade to "absent" rather than raising.

use std::fs;
use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub mod audit_log;
pub mod token_store;

pub use audit_log::{AuditLog, AUDIT_LOG_CAPACITY};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

/// Read and decode a JSON state file. Missing, unreadable, or corrupt
/// files all yield `None`; the caller treats that as "no state".
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "state file unreadable: {e}");
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), "ignoring corrupt state file: {e}");
            None
        }
    }
}

/// Serialize `value` and replace `path` atomically (temp file +
/// rename), so concurrent readers see either the old or the new
/// contents, never a partial write.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

/// Remove a state file, treating "already gone" as success.
pub(crate) fn remove_file(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not remove state file: {e}");
        }
    }
}
