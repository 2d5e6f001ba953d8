use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of mutation events fanned out over a feedback channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Comment,
    Reply,
    Update,
}

/// A transient event in flight between broadcast and delivery. The
/// notifier never persists these beyond the polling slot's last value;
/// callers persist the underlying domain change separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl RealtimeMessage {
    pub fn new(kind: MessageKind, data: serde_json::Value) -> Self {
        RealtimeMessage {
            kind,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn comment(data: serde_json::Value) -> Self {
        Self::new(MessageKind::Comment, data)
    }

    pub fn reply(data: serde_json::Value) -> Self {
        Self::new(MessageKind::Reply, data)
    }

    pub fn update(data: serde_json::Value) -> Self {
        Self::new(MessageKind::Update, data)
    }
}
