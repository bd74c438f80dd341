//! Real-time push: per-user private channels and broadcast topics.
//!
//! Every open websocket registers a bounded sender under its user id.
//! Sends never wait: a full connection misses the message, a closed one
//! is pruned. Topics are `tokio::sync::broadcast` channels, so a slow
//! subscriber lags instead of blocking the publisher.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, mpsc};
use tracing::debug;

use crate::config::NotificationConfig;

/// Destination of private pushes, as seen by clients
pub const USER_DESTINATION: &str = "/user/queue/notifications";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Topic {
    NewJobs,
    JobUpdates,
    Recruiters,
    Notifications,
}

impl Topic {
    pub const ALL: [Topic; 4] = [
        Topic::NewJobs,
        Topic::JobUpdates,
        Topic::Recruiters,
        Topic::Notifications,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Topic::NewJobs => "new-jobs",
            Topic::JobUpdates => "job-updates",
            Topic::Recruiters => "recruiters",
            Topic::Notifications => "notifications",
        }
    }

    pub fn destination(&self) -> String {
        format!("/topic/{}", self.name())
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One frame as delivered to a client
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub destination: String,
    pub payload: serde_json::Value,
}

/// A registered connection's private inbox. Drop it (or call
/// [`PushHub::disconnect`]) when the socket closes.
pub struct UserSubscription {
    pub connection_id: u64,
    pub user_id: String,
    pub rx: mpsc::Receiver<PushMessage>,
}

pub struct PushHub {
    users: DashMap<String, Vec<(u64, mpsc::Sender<PushMessage>)>>,
    topics: [broadcast::Sender<PushMessage>; 4],
    next_connection: AtomicU64,
    user_capacity: usize,
}

impl PushHub {
    pub fn new(user_capacity: usize, topic_capacity: usize) -> Self {
        let topic = || broadcast::channel(topic_capacity.max(1)).0;
        Self {
            users: DashMap::new(),
            topics: [topic(), topic(), topic(), topic()],
            next_connection: AtomicU64::new(1),
            user_capacity: user_capacity.max(1),
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(config.user_channel_capacity, config.topic_capacity)
    }

    pub fn connect(&self, user_id: &str) -> UserSubscription {
        let (tx, rx) = mpsc::channel(self.user_capacity);
        let connection_id = self.next_connection.fetch_add(1, Ordering::Relaxed);
        self.users
            .entry(user_id.to_string())
            .or_default()
            .push((connection_id, tx));
        debug!(user_id = %user_id, connection_id, "Push connection registered");
        UserSubscription {
            connection_id,
            user_id: user_id.to_string(),
            rx,
        }
    }

    pub fn disconnect(&self, user_id: &str, connection_id: u64) {
        if let Some(mut conns) = self.users.get_mut(user_id) {
            conns.retain(|(id, _)| *id != connection_id);
        }
        self.users.remove_if(user_id, |_, conns| conns.is_empty());
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<PushMessage> {
        self.topics[topic.index()].subscribe()
    }

    /// Push to every open connection of `user_id`. Returns how many took it.
    pub fn send_to_user(&self, user_id: &str, payload: serde_json::Value) -> usize {
        let message = PushMessage {
            destination: USER_DESTINATION.to_string(),
            payload,
        };

        let delivered = match self.users.get_mut(user_id) {
            Some(mut conns) => {
                let mut delivered = 0;
                conns.retain(|(connection_id, tx)| match tx.try_send(message.clone()) {
                    Ok(()) => {
                        delivered += 1;
                        true
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        debug!(user_id = %user_id, connection_id, "Push connection full, message skipped");
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
                delivered
            }
            None => 0,
        };
        self.users.remove_if(user_id, |_, conns| conns.is_empty());
        delivered
    }

    /// Publish on a topic. Returns the number of current subscribers.
    pub fn broadcast(&self, topic: Topic, payload: serde_json::Value) -> usize {
        let message = PushMessage {
            destination: topic.destination(),
            payload,
        };
        self.topics[topic.index()].send(message).unwrap_or(0)
    }

    pub fn connection_count(&self, user_id: &str) -> usize {
        self.users.get(user_id).map(|conns| conns.len()).unwrap_or(0)
    }
}

impl Default for PushHub {
    fn default() -> Self {
        Self::from_config(&NotificationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_private_push_reaches_every_connection() {
        let hub = PushHub::new(4, 4);
        let mut a = hub.connect("u1");
        let mut b = hub.connect("u1");
        let mut other = hub.connect("u2");

        assert_eq!(hub.send_to_user("u1", json!({"message": "hi"})), 2);

        let got = a.rx.recv().await.unwrap();
        assert_eq!(got.destination, USER_DESTINATION);
        assert_eq!(got.payload["message"], "hi");
        assert!(b.rx.recv().await.is_some());
        assert!(other.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_offline_user_is_not_an_error() {
        let hub = PushHub::new(4, 4);
        assert_eq!(hub.send_to_user("nobody", json!({})), 0);
    }

    #[tokio::test]
    async fn test_closed_connections_are_pruned() {
        let hub = PushHub::new(4, 4);
        let sub = hub.connect("u1");
        let _live = hub.connect("u1");
        drop(sub);

        assert_eq!(hub.send_to_user("u1", json!({})), 1);
        assert_eq!(hub.connection_count("u1"), 1);
    }

    #[tokio::test]
    async fn test_full_connection_does_not_block() {
        let hub = PushHub::new(1, 4);
        let mut sub = hub.connect("u1");

        assert_eq!(hub.send_to_user("u1", json!({"n": 1})), 1);
        assert_eq!(hub.send_to_user("u1", json!({"n": 2})), 0);
        assert_eq!(hub.connection_count("u1"), 1);
        assert_eq!(sub.rx.recv().await.unwrap().payload["n"], 1);
    }

    #[tokio::test]
    async fn test_disconnect_removes_user_entry() {
        let hub = PushHub::new(4, 4);
        let sub = hub.connect("u1");
        hub.disconnect("u1", sub.connection_id);
        assert_eq!(hub.connection_count("u1"), 0);
        assert!(hub.users.is_empty());
    }

    #[tokio::test]
    async fn test_topic_broadcast() {
        let hub = PushHub::new(4, 4);
        assert_eq!(hub.broadcast(Topic::NewJobs, json!({})), 0);

        let mut rx = hub.subscribe(Topic::NewJobs);
        let mut unrelated = hub.subscribe(Topic::Recruiters);
        assert_eq!(hub.broadcast(Topic::NewJobs, json!({"title": "Rustacean"})), 1);

        let got = rx.recv().await.unwrap();
        assert_eq!(got.destination, "/topic/new-jobs");
        assert_eq!(got.payload["title"], "Rustacean");
        assert!(unrelated.try_recv().is_err());
    }
}
