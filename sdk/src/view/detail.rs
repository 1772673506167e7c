//! Student detail modal.
//!
//! The modal is open for at most one client at a time and only refreshes
//! for events about that client.

use crate::roster::RosterStore;
use crate::types::{StudentRecord, StudentStatus, TabInfo};

use super::card::{PLACEHOLDER_FAVICON, UNTITLED_TAB};

/// One tab line in the detail modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabLine {
    /// Tab ID, used to close it.
    pub id: i64,
    /// Title, or "Untitled Tab".
    pub title: String,
    /// URL, or "No URL".
    pub url: String,
    /// Favicon, or the placeholder.
    pub favicon: String,
}

impl From<&TabInfo> for TabLine {
    fn from(tab: &TabInfo) -> Self {
        Self {
            id: tab.id,
            title: if tab.title.is_empty() {
                UNTITLED_TAB.to_string()
            } else {
                tab.title.clone()
            },
            url: if tab.url.is_empty() {
                "No URL".to_string()
            } else {
                tab.url.clone()
            },
            favicon: tab
                .fav_icon_url
                .clone()
                .filter(|u| !u.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_FAVICON.to_string()),
        }
    }
}

/// Everything the detail modal displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailModel {
    /// Client ID.
    pub client_id: String,
    /// Title: email, or the full client ID.
    pub name: String,
    /// Status.
    pub status: StudentStatus,
    /// Screenshot data URL.
    pub screenshot: Option<String>,
    /// Caption shown instead of a missing screenshot.
    pub screenshot_caption: String,
    /// Active tab, if reported.
    pub active_tab: Option<TabLine>,
    /// Remaining tabs in ID order.
    pub other_tabs: Vec<TabLine>,
}

impl DetailModel {
    /// Builds the modal content for a record.
    #[must_use]
    pub fn from_record(record: &StudentRecord) -> Self {
        let active = record.active_tab();
        let active_id = active.map(|tab| tab.id);

        Self {
            client_id: record.client_id.clone(),
            name: if record.email.is_empty() {
                format!("ID: {}", record.client_id)
            } else {
                record.email.clone()
            },
            status: record.status,
            screenshot: record.last_screenshot.clone(),
            screenshot_caption: match (&record.last_screenshot, &record.screenshot_issue) {
                (Some(_), _) => format!("Screenshot for {}", record.display_name()),
                (None, Some(reason)) => reason.clone(),
                (None, None) => "Screenshot unavailable".to_string(),
            },
            active_tab: active.map(TabLine::from),
            other_tabs: record
                .tabs
                .values()
                .filter(|tab| Some(tab.id) != active_id)
                .map(TabLine::from)
                .collect(),
        }
    }
}

/// Tracks which student the detail modal shows.
#[derive(Debug, Clone, Default)]
pub struct DetailModal {
    viewing: Option<String>,
}

impl DetailModal {
    /// Creates a closed modal.
    #[must_use]
    pub const fn new() -> Self {
        Self { viewing: None }
    }

    /// Returns the client being viewed.
    #[must_use]
    pub fn viewing(&self) -> Option<&str> {
        self.viewing.as_deref()
    }

    /// Returns true if the modal is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.viewing.is_some()
    }

    /// Opens the modal for a student.
    ///
    /// Returns `None` and leaves the modal unchanged if the student is unknown.
    pub fn open(&mut self, client_id: &str, roster: &RosterStore) -> Option<DetailModel> {
        let record = roster.get(client_id)?;
        self.viewing = Some(client_id.to_string());
        Some(DetailModel::from_record(record))
    }

    /// Closes the modal. Returns true if it was open.
    pub fn close(&mut self) -> bool {
        self.viewing.take().is_some()
    }

    /// Returns fresh content if the modal is showing `client_id`.
    #[must_use]
    pub fn refresh_for(&self, client_id: &str, roster: &RosterStore) -> Option<DetailModel> {
        if self.viewing.as_deref() != Some(client_id) {
            return None;
        }
        roster.get(client_id).map(DetailModel::from_record)
    }
}
