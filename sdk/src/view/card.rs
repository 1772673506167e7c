//! Student card presentation.

use chrono::{DateTime, Utc};

use crate::types::{StudentRecord, StudentStatus};

/// Favicon used when a tab reports none (a transparent 1x1 PNG).
pub const PLACEHOLDER_FAVICON: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAABAAAAAQCAQAAAC1+jfqAAAAEUlEQVR42mNkIAAYIBAAJBtnBAAAAABJRU5ErkJggg==";

/// Tab title shown for a tab without one.
pub const UNTITLED_TAB: &str = "Untitled Tab";

/// What the screenshot area of a card shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenshotState {
    /// Latest screenshot data URL.
    Image(String),
    /// Student is live but no screenshot is available.
    NoScreenshot {
        /// Reason reported by the student, if any.
        reason: Option<String>,
    },
    /// Student is gone.
    Disconnected,
}

impl ScreenshotState {
    /// Returns the overlay text, if the image is hidden.
    #[must_use]
    pub const fn overlay(&self) -> Option<&'static str> {
        match self {
            Self::Image(_) => None,
            Self::NoScreenshot { .. } => Some("No Screenshot"),
            Self::Disconnected => Some("Disconnected"),
        }
    }
}

/// Everything a card displays for one student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardModel {
    /// Client ID.
    pub client_id: String,
    /// Name label.
    pub name: String,
    /// Status.
    pub status: StudentStatus,
    /// True while the status is optimistic.
    pub provisional: bool,
    /// Screenshot area.
    pub screenshot: ScreenshotState,
    /// Last update time; hidden for disconnected students.
    pub last_updated: Option<DateTime<Utc>>,
    /// Footer line: active tab title or a state message.
    pub tab_title: String,
    /// Full URL of the active tab, empty if none.
    pub tab_url: String,
    /// Active tab favicon.
    pub favicon: String,
    /// Lock overlay visible.
    pub locked: bool,
    /// Selection checkbox state.
    pub selected: bool,
}

/// Returns the card name label for a student.
#[must_use]
pub fn name_label(record: &StudentRecord) -> String {
    if record.email.is_empty() {
        let short: String = record.client_id.chars().take(6).collect();
        format!("ID: {short}")
    } else {
        record.email.clone()
    }
}

impl CardModel {
    /// Builds the card for a record.
    #[must_use]
    pub fn from_record(record: &StudentRecord, selected: bool) -> Self {
        let disconnected = record.status == StudentStatus::Disconnected;
        let locked = record.status == StudentStatus::Locked;

        let screenshot = if disconnected {
            ScreenshotState::Disconnected
        } else if let Some(image) = &record.last_screenshot {
            ScreenshotState::Image(image.clone())
        } else {
            ScreenshotState::NoScreenshot {
                reason: record.screenshot_issue.clone(),
            }
        };

        let mut tab_title = "No Active Tab".to_string();
        let mut tab_url = String::new();
        let mut favicon = PLACEHOLDER_FAVICON.to_string();
        if disconnected {
            tab_title = "Disconnected".to_string();
        } else if locked {
            tab_title = "Screen Locked".to_string();
        } else if let Some(tab) = record.active_tab() {
            tab_title = if tab.title.is_empty() {
                UNTITLED_TAB.to_string()
            } else {
                tab.title.clone()
            };
            tab_url = tab.url.clone();
            if let Some(icon) = tab.fav_icon_url.as_ref().filter(|u| !u.is_empty()) {
                favicon = icon.clone();
            }
        }

        Self {
            client_id: record.client_id.clone(),
            name: name_label(record),
            status: record.status,
            provisional: record.is_provisional(),
            screenshot,
            last_updated: (!disconnected).then_some(record.last_update),
            tab_title,
            tab_url,
            favicon,
            locked,
            selected,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::TabInfo;

    fn record(status: StudentStatus) -> StudentRecord {
        let now = Utc.timestamp_opt(1_700_000_000, 0).single().expect("timestamp");
        let mut record = StudentRecord::new("abcdef123456", "kid@school.org", now);
        record.status = status;
        record
    }

    fn active_tab(title: &str, icon: Option<&str>) -> TabInfo {
        TabInfo {
            id: 4,
            title: title.to_string(),
            url: "https://docs.rs".to_string(),
            active: true,
            fav_icon_url: icon.map(str::to_string),
        }
    }

    #[test]
    fn test_name_falls_back_to_short_id() {
        let mut rec = record(StudentStatus::Connected);
        rec.email = String::new();
        assert_eq!(CardModel::from_record(&rec, false).name, "ID: abcdef");
    }

    #[test]
    fn test_connected_with_active_tab() {
        let mut rec = record(StudentStatus::Connected);
        rec.tabs.insert(4, active_tab("Docs", Some("https://docs.rs/favicon.ico")));
        rec.last_screenshot = Some("data:image/jpeg;base64,AA".to_string());

        let card = CardModel::from_record(&rec, true);
        assert_eq!(card.tab_title, "Docs");
        assert_eq!(card.tab_url, "https://docs.rs");
        assert_eq!(card.favicon, "https://docs.rs/favicon.ico");
        assert_eq!(
            card.screenshot,
            ScreenshotState::Image("data:image/jpeg;base64,AA".to_string())
        );
        assert!(card.last_updated.is_some());
        assert!(card.selected);
        assert!(!card.locked);
    }

    #[test]
    fn test_untitled_tab_and_placeholder_favicon() {
        let mut rec = record(StudentStatus::Connected);
        rec.tabs.insert(4, active_tab("", None));

        let card = CardModel::from_record(&rec, false);
        assert_eq!(card.tab_title, UNTITLED_TAB);
        assert_eq!(card.favicon, PLACEHOLDER_FAVICON);
    }

    #[test]
    fn test_no_active_tab() {
        let mut rec = record(StudentStatus::Connected);
        rec.screenshot_issue = Some("tab hidden".to_string());

        let card = CardModel::from_record(&rec, false);
        assert_eq!(card.tab_title, "No Active Tab");
        assert_eq!(
            card.screenshot,
            ScreenshotState::NoScreenshot {
                reason: Some("tab hidden".to_string())
            }
        );
        assert_eq!(card.screenshot.overlay(), Some("No Screenshot"));
    }

    #[test]
    fn test_locked_hides_tab() {
        let mut rec = record(StudentStatus::Locked);
        rec.tabs.insert(4, active_tab("Docs", None));

        let card = CardModel::from_record(&rec, false);
        assert_eq!(card.tab_title, "Screen Locked");
        assert!(card.tab_url.is_empty());
        assert!(card.locked);
    }

    #[test]
    fn test_disconnected_card() {
        let mut rec = record(StudentStatus::Disconnected);
        rec.last_screenshot = Some("data:image/jpeg;base64,AA".to_string());

        let card = CardModel::from_record(&rec, false);
        assert_eq!(card.screenshot, ScreenshotState::Disconnected);
        assert_eq!(card.tab_title, "Disconnected");
        assert!(card.last_updated.is_none());
    }
}
