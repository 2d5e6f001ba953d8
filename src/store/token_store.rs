use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::TokenRecord;

const TOKEN_FILE: &str = "token.json";

/// Single-slot persistence for the session's Token Record.
///
/// `save` overwrites any existing record; this is a slot, not a
/// history. `load` never raises: an unavailable or corrupt medium
/// reads as "absent", which callers treat as logged-out.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Option<TokenRecord>;
    fn save(&self, record: &TokenRecord) -> std::io::Result<()>;
    /// Remove the record. No partial-clear state is observable:
    /// the whole slot disappears in one step.
    fn clear(&self);
}

/// File-backed store under the application data directory.
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        FileTokenStore {
            path: data_dir.join(TOKEN_FILE),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Option<TokenRecord> {
        super::read_json(&self.path)
    }

    fn save(&self, record: &TokenRecord) -> std::io::Result<()> {
        super::write_json_atomic(&self.path, record)
    }

    fn clear(&self) {
        super::remove_file(&self.path);
    }
}

/// In-memory store for tests and ephemeral sessions. Does not survive
/// a process restart.
#[derive(Default)]
pub struct MemoryTokenStore {
    slot: Mutex<Option<TokenRecord>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<TokenRecord> {
        self.slot.lock().unwrap().clone()
    }

    fn save(&self, record: &TokenRecord) -> std::io::Result<()> {
        *self.slot.lock().unwrap() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) {
        *self.slot.lock().unwrap() = None;
    }
}

// ── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("innolink-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn record() -> TokenRecord {
        TokenRecord::new("abc".into(), 60_000, Utc::now())
    }

    #[test]
    fn test_memory_store_round_trip() {
        let store = MemoryTokenStore::new();
        assert!(store.load().is_none());

        store.save(&record()).unwrap();
        assert_eq!(store.load().unwrap().token, "abc");

        store.clear();
        assert!(store.load().is_none());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = temp_dir();
        let store = FileTokenStore::new(&dir);
        assert!(store.load().is_none());

        let rec = record();
        store.save(&rec).unwrap();
        assert_eq!(store.load().unwrap(), rec);

        store.clear();
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_overwrites_previous_record() {
        let dir = temp_dir();
        let store = FileTokenStore::new(&dir);

        store.save(&TokenRecord::new("old".into(), 1_000, Utc::now())).unwrap();
        store.save(&TokenRecord::new("new".into(), 1_000, Utc::now())).unwrap();
        assert_eq!(store.load().unwrap().token, "new");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_reads_as_absent() {
        let dir = temp_dir();
        let store = FileTokenStore::new(&dir);
        std::fs::write(dir.join(TOKEN_FILE), b"not json at all").unwrap();
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = temp_dir();
        let store = FileTokenStore::new(&dir);
        store.clear();
        store.clear();
        assert!(store.load().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }
}
