//! Session lifecycle: state machine, expiry timer, role queries, and
//! the process-wide singleton used by the application shell.

use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::api::ApiClient;
use crate::config::Config;
use crate::store::{AuditLog, FileTokenStore};

pub mod manager;

pub use manager::SessionManager;

static SESSION: OnceCell<SessionManager> = OnceCell::new();

/// Construct the process-wide session manager (file-backed store, real
/// backend client) and resolve its initial state. Must be called once
/// at process start; a second call is an error. Tear down with
/// `logout()` and restart the process to re-init.
pub async fn init(config: &Config) -> anyhow::Result<&'static SessionManager> {
    let manager = SessionManager::new(
        Arc::new(ApiClient::new(config)),
        Arc::new(FileTokenStore::new(&config.data_dir)),
        AuditLog::new(&config.data_dir),
        config.user_agent(),
        config.session_timeout_ms,
    );
    SESSION
        .set(manager)
        .map_err(|_| anyhow::anyhow!("session already initialized for this process"))?;
    let manager = SESSION.get().expect("session slot was just filled");
    manager.restore().await;
    Ok(manager)
}

/// The process-wide session manager, if `init` has run.
pub fn current() -> Option<&'static SessionManager> {
    SESSION.get()
}
