//! Student record types.
//!
//! Defines the per-student state tracked by the roster.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tab::TabInfo;

/// Display name used when a snapshot or connect event carries no email.
pub const UNKNOWN_EMAIL: &str = "Unknown Email";

/// Display name used for records created by a data event before the student
/// was announced.
pub const LOADING_EMAIL: &str = "Loading...";

/// Presentation state of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudentStatus {
    /// Student client is connected.
    Connected,
    /// Student screen is locked.
    Locked,
    /// Student client is gone.
    Disconnected,
    /// Unrecognised status value from the wire.
    #[serde(other)]
    Unknown,
}

impl StudentStatus {
    /// Returns the ordering rank used by the status sort.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Connected => 0,
            Self::Locked => 1,
            Self::Disconnected => 2,
            Self::Unknown => 3,
        }
    }

    /// Returns true if the student is reachable (connected or locked).
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connected | Self::Locked)
    }
}

impl std::fmt::Display for StudentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connected => write!(f, "connected"),
            Self::Locked => write!(f, "locked"),
            Self::Disconnected => write!(f, "disconnected"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Roster entry as announced by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    /// Client ID assigned by the relay.
    pub client_id: String,
    /// Student email, if known.
    #[serde(default)]
    pub email: Option<String>,
}

impl StudentSummary {
    /// Creates a new summary.
    #[must_use]
    pub fn new(client_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            email: Some(email.into()),
        }
    }
}

/// State of one monitored student.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    /// Client ID (identity key).
    pub client_id: String,

    /// Display name.
    pub email: String,

    /// Current status.
    pub status: StudentStatus,

    /// Open tabs keyed by tab ID.
    pub tabs: BTreeMap<i64, TabInfo>,

    /// Most recent screenshot as a data URL.
    pub last_screenshot: Option<String>,

    /// Reason the last screenshot was unavailable.
    pub screenshot_issue: Option<String>,

    /// Local receipt time of the most recent event.
    pub last_update: DateTime<Utc>,

    /// Status written optimistically and not yet confirmed.
    pub pending_status: Option<StudentStatus>,
}

impl StudentRecord {
    /// Creates a connected record.
    #[must_use]
    pub fn new(client_id: impl Into<String>, email: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            client_id: client_id.into(),
            email: email.into(),
            status: StudentStatus::Connected,
            tabs: BTreeMap::new(),
            last_screenshot: None,
            screenshot_issue: None,
            last_update: now,
            pending_status: None,
        }
    }

    /// Returns the active tab, if any.
    ///
    /// Derived from `tabs` on every call so it can never point at a tab that
    /// is no longer open.
    #[must_use]
    pub fn active_tab(&self) -> Option<&TabInfo> {
        self.tabs.values().find(|tab| tab.active)
    }

    /// Returns the name used for sorting and display.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.email.is_empty() {
            &self.client_id
        } else {
            &self.email
        }
    }

    /// Returns true while an optimistic status awaits confirmation.
    #[must_use]
    pub const fn is_provisional(&self) -> bool {
        self.pending_status.is_some()
    }

    /// Marks the record as alive after receiving data from the student.
    ///
    /// A locked student stays locked.
    pub(crate) fn touch_live(&mut self, now: DateTime<Utc>) {
        self.last_update = now;
        if self.status != StudentStatus::Locked {
            self.status = StudentStatus::Connected;
        }
    }
}
