//! Teacher commands.
//!
//! A [`Command`] is what the teacher asks one student's browser to do. It maps
//! to the `command` name and `data` payload of a `teacher_command` envelope.
//!
//! # Example
//!
//! ```rust
//! use saber_sdk::Command;
//!
//! let cmd = Command::open_tab("https://docs.rs").expect("valid url");
//! assert_eq!(cmd.name(), "open_tab");
//! assert_eq!(cmd.data()["url"], "https://docs.rs");
//! ```

use serde_json::json;

use crate::error::SdkError;
use crate::types::StudentStatus;

/// Default lock screen message.
pub const DEFAULT_LOCK_MESSAGE: &str = "Screen Locked";

/// Minimum announcement duration in milliseconds.
pub const MIN_ANNOUNCEMENT_MS: u64 = 1000;

/// A command for a student browser.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Lock the screen, optionally with a message.
    LockScreen {
        /// Message shown on the lock screen.
        message: Option<String>,
    },
    /// Unlock the screen.
    UnlockScreen,
    /// Open a new tab.
    OpenTab {
        /// URL to open.
        url: String,
    },
    /// Close a tab by ID.
    CloseTab {
        /// Tab ID.
        tab_id: i64,
    },
    /// Close whatever tab is active.
    CloseActiveTab,
    /// Bring a tab with this URL to the front, opening it if needed.
    FocusTab {
        /// URL to focus.
        url: String,
    },
    /// Show an announcement banner.
    SendAnnouncement {
        /// Announcement text.
        message: String,
        /// How long to show it, in milliseconds.
        duration_ms: u64,
    },
    /// Replace the block list.
    UpdateBlocklist {
        /// Block patterns.
        blocked_sites: Vec<String>,
    },
    /// Any other command, passed through as-is.
    Other {
        /// Command name.
        name: String,
        /// Payload.
        data: serde_json::Value,
    },
}

fn checked_url(url: &str) -> Result<String, SdkError> {
    let url = url.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(SdkError::InvalidUrl(url.to_string()))
    }
}

impl Command {
    /// Creates a lock command with the default message.
    #[must_use]
    pub fn lock() -> Self {
        Self::LockScreen {
            message: Some(DEFAULT_LOCK_MESSAGE.to_string()),
        }
    }

    /// Creates an open-tab command.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s).
    pub fn open_tab(url: &str) -> Result<Self, SdkError> {
        Ok(Self::OpenTab {
            url: checked_url(url)?,
        })
    }

    /// Creates a focus-tab command.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not http(s).
    pub fn focus_tab(url: &str) -> Result<Self, SdkError> {
        Ok(Self::FocusTab {
            url: checked_url(url)?,
        })
    }

    /// Creates an announcement.
    ///
    /// # Errors
    ///
    /// Returns an error if the message is blank or the duration is under one
    /// second.
    pub fn announcement(message: &str, duration_ms: u64) -> Result<Self, SdkError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(SdkError::EmptyMessage);
        }
        if duration_ms < MIN_ANNOUNCEMENT_MS {
            return Err(SdkError::InvalidDuration(duration_ms));
        }
        Ok(Self::SendAnnouncement {
            message: message.to_string(),
            duration_ms,
        })
    }

    /// Creates a block list update from one pattern per line.
    ///
    /// # Errors
    ///
    /// Returns an error if no non-blank line remains.
    pub fn blocklist(lines: &str) -> Result<Self, SdkError> {
        let blocked_sites: Vec<String> = lines
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if blocked_sites.is_empty() {
            return Err(SdkError::EmptyBlocklist);
        }
        Ok(Self::UpdateBlocklist { blocked_sites })
    }

    /// Returns the wire command name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::LockScreen { .. } => "lock_screen",
            Self::UnlockScreen => "unlock_screen",
            Self::OpenTab { .. } => "open_tab",
            Self::CloseTab { .. } => "close_tab",
            Self::CloseActiveTab => "close_active_tab",
            Self::FocusTab { .. } => "focus_tab",
            Self::SendAnnouncement { .. } => "send_announcement",
            Self::UpdateBlocklist { .. } => "update_blocklist",
            Self::Other { name, .. } => name,
        }
    }

    /// Returns the wire payload.
    #[must_use]
    pub fn data(&self) -> serde_json::Value {
        match self {
            Self::LockScreen { message: Some(message) } => json!({ "message": message }),
            Self::LockScreen { message: None } | Self::UnlockScreen | Self::CloseActiveTab => {
                json!({})
            }
            Self::OpenTab { url } | Self::FocusTab { url } => json!({ "url": url }),
            Self::CloseTab { tab_id } => json!({ "tabId": tab_id }),
            Self::SendAnnouncement {
                message,
                duration_ms,
            } => json!({ "message": message, "duration": duration_ms }),
            Self::UpdateBlocklist { blocked_sites } => json!({ "blockedSites": blocked_sites }),
            Self::Other { data, .. } => data.clone(),
        }
    }

    /// Returns the status the student is expected to report once this
    /// command has been carried out, for commands shown optimistically.
    #[must_use]
    pub const fn optimistic_status(&self) -> Option<StudentStatus> {
        match self {
            Self::LockScreen { .. } => Some(StudentStatus::Locked),
            Self::UnlockScreen => Some(StudentStatus::Connected),
            _ => None,
        }
    }
}
