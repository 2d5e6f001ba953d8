use std::path::{Path, PathBuf};

use crate::models::AccessAttempt;

/// Oldest entries are evicted once the log holds this many.
pub const AUDIT_LOG_CAPACITY: usize = 100;

const AUDIT_FILE: &str = "audit_log.json";

/// Bounded, append-only log of access attempts, durable across
/// restarts. Entries are never mutated, only trimmed from the head.
/// Write failures degrade silently; auditing is not a
/// correctness-critical path on the client.
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(data_dir: &Path) -> Self {
        AuditLog {
            path: data_dir.join(AUDIT_FILE),
        }
    }

    pub fn append(&self, attempt: AccessAttempt) {
        let mut entries: Vec<AccessAttempt> = super::read_json(&self.path).unwrap_or_default();
        entries.push(attempt);
        if entries.len() > AUDIT_LOG_CAPACITY {
            let excess = entries.len() - AUDIT_LOG_CAPACITY;
            entries.drain(..excess);
        }
        if let Err(e) = super::write_json_atomic(&self.path, &entries) {
            tracing::warn!("failed to persist audit log: {e}");
        }
    }

    /// All retained entries, oldest first.
    pub fn recent(&self) -> Vec<AccessAttempt> {
        super::read_json(&self.path).unwrap_or_default()
    }
}

// ── Tests ───────────────────────────────────────────────────────
