//! Self-expiring toast notifications.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NotificationId(u64);

impl core::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "toast-{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub id: NotificationId,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    notification: Notification,
    expires_at: Instant,
}

#[derive(Debug)]
struct Inner {
    duration: Duration,
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry>>,
    published: watch::Sender<Vec<Notification>>,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Drop expired entries and republish what is left.
    fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries();
        entries.retain(|e| e.expires_at > now);
        self.publish(&entries);
    }

    fn publish(&self, entries: &[Entry]) {
        let visible = entries.iter().map(|e| e.notification.clone()).collect();
        self.published.send_replace(visible);
    }
}

/// Ephemeral, insertion-ordered list of user-facing messages.
///
/// Cloning the queue yields another handle to the same list. Each entry
/// disappears after the configured duration or when dismissed, whichever
/// comes first. `push` schedules the expiry on the current Tokio runtime.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    inner: Arc<Inner>,
}

impl NotificationQueue {
    pub fn new(duration: Duration) -> Self {
        let (published, _) = watch::channel(Vec::new());
        Self {
            inner: Arc::new(Inner {
                duration,
                next_id: AtomicU64::new(1),
                entries: Mutex::new(Vec::new()),
                published,
            }),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    /// Append a message and schedule its removal.
    pub fn push(&self, message: impl Into<String>, kind: NotificationKind) -> NotificationId {
        let id = NotificationId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let expires_at = Instant::now() + self.inner.duration;
        let notification = Notification {
            id,
            message: message.into(),
            kind,
            created_at: Utc::now(),
        };
        tracing::debug!(%id, ?kind, message = %notification.message, "notification pushed");

        {
            let mut entries = self.inner.entries();
            entries.push(Entry {
                notification,
                expires_at,
            });
            self.inner.publish(&entries);
        }

        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep_until(expires_at).await;
            if let Some(inner) = inner.upgrade() {
                inner.sweep();
            }
        });

        id
    }

    pub fn info(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, NotificationKind::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, NotificationKind::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> NotificationId {
        self.push(message, NotificationKind::Error)
    }

    /// Remove an entry now. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: NotificationId) -> bool {
        let mut entries = self.inner.entries();
        let Some(pos) = entries.iter().position(|e| e.notification.id == id) else {
            return false;
        };
        entries.remove(pos);
        self.inner.publish(&entries);
        true
    }

    /// Entries that have not expired, in insertion order.
    ///
    /// Expiry is checked against the clock here, so an entry is never
    /// reported at or after its deadline even if the sweep has not run yet.
    pub fn visible(&self) -> Vec<Notification> {
        let now = Instant::now();
        self.inner
            .entries()
            .iter()
            .filter(|e| e.expires_at > now)
            .map(|e| e.notification.clone())
            .collect()
    }

    /// Observe the list as it changes (pushes, dismissals, expiries).
    pub fn subscribe(&self) -> watch::Receiver<Vec<Notification>> {
        self.inner.published.subscribe()
    }
}
