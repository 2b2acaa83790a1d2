//! Daemon status store.
//!
//! Holds the single [`DaemonStatus`] record read by the UI layer, with change
//! notifications for subscribers.

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, warn};
use usagepulse_core::DaemonStatus;

// ============================================================================
// Status Store
// ============================================================================

/// Lock-guarded daemon status.
///
/// Reads return a copy of the whole record taken under the read lock, so a
/// reader never sees half of another writer's update. Every setter bumps a
/// version counter observable via [`StatusStore::subscribe`].
pub struct StatusStore {
    inner: RwLock<DaemonStatus>,
    notify: watch::Sender<u64>,
    version: RwLock<u64>,
}

impl Default for StatusStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusStore {
    /// Creates an empty status store.
    pub fn new() -> Self {
        let (notify, _) = watch::channel(0);
        Self {
            inner: RwLock::new(DaemonStatus::default()),
            notify,
            version: RwLock::new(0),
        }
    }

    /// Returns a copy of the current status.
    pub async fn get_status(&self) -> DaemonStatus {
        self.inner.read().await.clone()
    }

    // ========================================================================
    // Setters
    // ========================================================================

    /// Sets the last and next send times together.
    pub async fn set_metrics_times(
        &self,
        last_sent: Option<DateTime<Utc>>,
        next_send: Option<DateTime<Utc>>,
    ) {
        {
            let mut inner = self.inner.write().await;
            inner.last_metrics_sent_at = last_sent;
            inner.next_metrics_send_at = next_send;
        }
        self.notify_change().await;
        debug!(last_sent = ?last_sent, next_send = ?next_send, "Metrics times updated");
    }

    /// Records a successful send at `at` and the next due time.
    pub async fn record_send(&self, at: DateTime<Utc>, next_send: Option<DateTime<Utc>>) {
        self.set_metrics_times(Some(at), next_send).await;
    }

    /// Sets only the next send time.
    pub async fn set_next_send(&self, next_send: Option<DateTime<Utc>>) {
        self.inner.write().await.next_metrics_send_at = next_send;
        self.notify_change().await;
    }

    /// Sets today's token count.
    pub async fn set_today_token_count(&self, count: i64) {
        self.inner.write().await.today_token_count = count;
        self.notify_change().await;
        debug!(count, "Today token count updated");
    }

    /// Records an error message with the current time.
    pub async fn record_error(&self, message: impl Into<String>) {
        let message = message.into();
        {
            let mut inner = self.inner.write().await;
            inner.last_error = Some(message.clone());
            inner.last_error_at = Some(Utc::now());
        }
        self.notify_change().await;
        warn!(error = %message, "Status error recorded");
    }

    /// Clears the recorded error.
    pub async fn clear_error(&self) {
        {
            let mut inner = self.inner.write().await;
            inner.last_error = None;
            inner.last_error_at = None;
        }
        self.notify_change().await;
    }

    /// Clears the recorded error only if it is exactly `message`.
    ///
    /// Returns whether the error was cleared.
    pub async fn clear_error_if(&self, message: &str) -> bool {
        {
            let mut inner = self.inner.write().await;
            if inner.last_error.as_deref() != Some(message) {
                return false;
            }
            inner.last_error = None;
            inner.last_error_at = None;
        }
        self.notify_change().await;
        true
    }

    /// Sets the running flag.
    ///
    /// Starting stamps `daemon_started_at`; stopping clears the next send time.
    pub async fn set_running(&self, running: bool) {
        {
            let mut inner = self.inner.write().await;
            inner.is_running = running;
            if running {
                inner.daemon_started_at = Some(Utc::now());
            } else {
                inner.next_metrics_send_at = None;
            }
        }
        self.notify_change().await;
        info!(running, "Daemon running state changed");
    }

    // ========================================================================
    // Notifications
    // ========================================================================

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.notify.subscribe()
    }

    /// Notifies subscribers of a change.
    async fn notify_change(&self) {
        let mut version = self.version.write().await;
        *version += 1;
        let _ = self.notify.send(*version);
    }
}

impl std::fmt::Debug for StatusStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusStore")
            .field("version", &*self.notify.borrow())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
