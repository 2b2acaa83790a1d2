//! Daemon status and timezone types.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Daemon Status
// ============================================================================

/// Point-in-time view of the daemon, as read by the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonStatus {
    /// Whether the scheduler loop is running.
    pub is_running: bool,
    /// When metrics were last delivered.
    pub last_metrics_sent_at: Option<DateTime<Utc>>,
    /// When the next automatic send is due.
    pub next_metrics_send_at: Option<DateTime<Utc>>,
    /// Today's token count from the primary source.
    pub today_token_count: i64,
    /// Last recorded error message.
    pub last_error: Option<String>,
    /// When the last error was recorded.
    pub last_error_at: Option<DateTime<Utc>>,
    /// When the daemon was started.
    pub daemon_started_at: Option<DateTime<Utc>>,
}

impl DaemonStatus {
    /// Returns true if an error is currently recorded.
    pub fn has_error(&self) -> bool {
        self.last_error.is_some()
    }
}

// ============================================================================
// Timezone Info
// ============================================================================

/// Timezone metadata attached to timezone-aware sink calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneInfo {
    /// IANA name (e.g. "Asia/Tokyo").
    pub name: String,
    /// Offset from UTC in seconds.
    pub utc_offset_seconds: i32,
}

impl TimezoneInfo {
    /// Creates timezone info.
    pub fn new(name: impl Into<String>, utc_offset_seconds: i32) -> Self {
        Self {
            name: name.into(),
            utc_offset_seconds,
        }
    }

    /// UTC.
    pub fn utc() -> Self {
        Self::new("UTC", 0)
    }

    /// Returns the offset, falling back to UTC for out-of-range values.
    pub fn fixed_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Returns the calendar date of `now` in this timezone.
    pub fn date_of(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.fixed_offset()).date_naive()
    }
}
