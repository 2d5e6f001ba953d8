use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded project-access attempt.
///
/// Username may be absent: denied attempts are recorded even when no
/// user is loaded. Entries are append-only; the audit log trims the
/// oldest when its capacity is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub username: Option<String>,
    pub project_id: String,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    pub user_agent: String,
}
