//! Transient user notifications.
//!
//! [`Notifier`] broadcasts short, time-limited messages with a severity.
//! [`NotificationBoard`] is the receiving side a front end keeps: it holds the
//! active messages, lets the user dismiss one, and drops expired ones.

use crate::config::NotificationsConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;
use webpforge_common::{NotificationId, Severity};

/// A single dismissible, time-limited message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub severity: Severity,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Sending side of the notification channel. Cheap to clone.
#[derive(Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notification>,
    ttl: Duration,
}

impl Notifier {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, ttl }
    }

    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self::new(config.capacity, Duration::from_millis(config.ttl_ms))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }

    /// Publish a message. It is also written to the log so that nothing is
    /// lost when no front end is listening.
    pub fn notify(&self, severity: Severity, message: impl Into<String>) -> Notification {
        let message = message.into();
        match severity {
            Severity::Error => tracing::warn!("{}", message),
            Severity::Info | Severity::Success => tracing::info!("{}", message),
        }

        let created_at = Utc::now();
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::seconds(4));
        let notification = Notification {
            id: NotificationId::new(),
            severity,
            message,
            created_at,
            expires_at: created_at + ttl,
        };

        if self.tx.send(notification.clone()).is_err() {
            tracing::debug!("No subscribers for notification");
        }
        notification
    }

    pub fn info(&self, message: impl Into<String>) -> Notification {
        self.notify(Severity::Info, message)
    }

    pub fn success(&self, message: impl Into<String>) -> Notification {
        self.notify(Severity::Success, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Notification {
        self.notify(Severity::Error, message)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::from_config(&NotificationsConfig::default())
    }
}

/// The set of notifications currently on screen.
#[derive(Debug, Default)]
pub struct NotificationBoard {
    active: Vec<Notification>,
}

impl NotificationBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, notification: Notification) {
        self.active.push(notification);
    }

    /// Pull everything waiting on `rx` onto the board.
    pub fn collect(&mut self, rx: &mut broadcast::Receiver<Notification>) -> usize {
        let mut received = 0;
        loop {
            match rx.try_recv() {
                Ok(notification) => {
                    self.push(notification);
                    received += 1;
                }
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::debug!("Notification board lagged by {} messages", skipped);
                }
                Err(_) => break,
            }
        }
        received
    }

    /// Dismiss one notification. Returns `false` if it is not on the board.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.active.len();
        self.active.retain(|n| n.id != id);
        self.active.len() < before
    }

    /// Drop expired notifications, returning how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.active.len();
        self.active.retain(|n| !n.is_expired(now));
        before - self.active.len()
    }

    /// Notifications still visible at `now`, oldest first.
    pub fn visible(&self, now: DateTime<Utc>) -> Vec<&Notification> {
        self.active.iter().filter(|n| !n.is_expired(now)).collect()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
