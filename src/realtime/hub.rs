use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::models::RealtimeMessage;

const BROADCAST_CAPACITY: usize = 64;

/// How messages move between subscribers. Chosen explicitly when the
/// hub is built; no runtime capability sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// In-process broadcast: at-most-once, publish order, live
    /// subscribers only. Late joiners see nothing.
    Broadcast,
    /// Durable last-value slot plus a fixed-interval poll. Rapid
    /// publishes coalesce; only the newest value is ever observed.
    Polling,
}

/// Envelope carried on the wire so a subscriber can skip its own
/// publishes in either mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    publisher: Uuid,
    message: RealtimeMessage,
}

type Handler = Arc<dyn Fn(RealtimeMessage) + Send + Sync>;

/// Fan-out hub for realtime messages. Cheap to clone; all clones share
/// the same channel registry.
#[derive(Clone)]
pub struct RealtimeHub {
    mode: DeliveryMode,
    channels: Arc<DashMap<String, broadcast::Sender<Envelope>>>,
    data_dir: PathBuf,
    poll_interval: Duration,
}

impl RealtimeHub {
    pub fn new(mode: DeliveryMode, data_dir: PathBuf, poll_interval: Duration) -> Self {
        RealtimeHub {
            mode,
            channels: Arc::new(DashMap::new()),
            data_dir,
            poll_interval,
        }
    }

    /// Subscribe to a channel. The handler runs on a background task
    /// for every message published by *other* subscribers; dropping
    /// the returned [`Subscription`] releases the task and its
    /// underlying primitive.
    pub fn subscribe<F>(&self, channel: &str, on_message: F) -> Subscription
    where
        F: Fn(RealtimeMessage) + Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let handler: Handler = Arc::new(on_message);
        match self.mode {
            DeliveryMode::Broadcast => self.subscribe_broadcast(channel, id, handler),
            DeliveryMode::Polling => self.subscribe_polling(channel, id, handler),
        }
    }

    fn subscribe_broadcast(&self, channel: &str, id: Uuid, handler: Handler) -> Subscription {
        let sender = self
            .channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(BROADCAST_CAPACITY).0)
            .clone();
        let mut rx = sender.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(env) => {
                        if env.publisher != id {
                            handler(env.message);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "realtime subscriber lagged, messages dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        tracing::debug!(channel, subscriber = %id, "subscribed (broadcast)");
        Subscription {
            id,
            channel: channel.to_string(),
            backend: Backend::Broadcast {
                sender,
                channels: Arc::clone(&self.channels),
            },
            task,
        }
    }

    fn subscribe_polling(&self, channel: &str, id: Uuid, handler: Handler) -> Subscription {
        let slot = self.slot_path(channel);
        let poll_slot = slot.clone();
        let interval = self.poll_interval;
        // Only messages newer than the subscription itself count; the
        // cursor is taken now, not when the poll task first runs.
        let mut last_seen: DateTime<Utc> = Utc::now();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let Some(env) = crate::store::read_json::<Envelope>(&poll_slot) else {
                    continue;
                };
                if env.message.timestamp <= last_seen {
                    continue;
                }
                last_seen = env.message.timestamp;
                if env.publisher != id {
                    handler(env.message);
                }
            }
        });
        tracing::debug!(channel, subscriber = %id, "subscribed (polling)");
        Subscription {
            id,
            channel: channel.to_string(),
            backend: Backend::Polling { slot },
            task,
        }
    }

    fn slot_path(&self, channel: &str) -> PathBuf {
        self.data_dir.join(format!("{channel}_updates.json"))
    }
}

enum Backend {
    Broadcast {
        sender: broadcast::Sender<Envelope>,
        channels: Arc<DashMap<String, broadcast::Sender<Envelope>>>,
    },
    Polling {
        slot: PathBuf,
    },
}

/// A live subscription. Publish through it with [`broadcast`];
/// dropping it cancels the delivery task and releases the channel.
///
/// [`broadcast`]: Subscription::broadcast
pub struct Subscription {
    id: Uuid,
    channel: String,
    backend: Backend,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Publish a message to the other subscribers on this channel.
    /// Fire-and-forget: delivery failures are not reported.
    pub fn broadcast(&self, message: RealtimeMessage) {
        let envelope = Envelope {
            publisher: self.id,
            message,
        };
        match &self.backend {
            Backend::Broadcast { sender, .. } => {
                // Err means no live receivers, nothing to deliver to.
                let _ = sender.send(envelope);
            }
            Backend::Polling { slot } => {
                if let Err(e) = crate::store::write_json_atomic(slot, &envelope) {
                    tracing::warn!(channel = %self.channel, "failed to publish update slot: {e}");
                }
            }
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
        if let Backend::Broadcast { sender, channels } = &self.backend {
            // Last one out drops the channel entry; a lingering entry
            // is harmless if another subscriber raced in.
            if sender.receiver_count() <= 1 {
                channels.remove_if(&self.channel, |_, s| s.receiver_count() <= 1);
            }
        }
        tracing::debug!(channel = %self.channel, subscriber = %self.id, "unsubscribed");
    }
}

// ── Tests ───────────────────────────────────────────────────────
