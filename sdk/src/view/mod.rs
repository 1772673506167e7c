//! Dashboard rendering.
//!
//! The session never draws anything itself. It builds [`CardModel`]s and
//! [`DetailModel`]s and hands them to a [`DashboardView`], which owns the
//! actual presentation (a terminal, a test recorder, ...).

pub mod card;
pub mod detail;
pub mod grid;

pub use card::{CardModel, ScreenshotState, PLACEHOLDER_FAVICON};
pub use detail::{DetailModal, DetailModel, TabLine};
pub use grid::{GridReconciler, RenderStats};

use crate::roster::SelectAllState;
use crate::ws::ConnectionStatus;

/// Severity of a teacher-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Informational.
    Info,
    /// Something was skipped.
    Warn,
    /// Something failed.
    Error,
}

impl std::fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Presentation layer driven by the session.
pub trait DashboardView {
    /// Handle to one rendered card.
    type Card;

    /// Renders a new card and returns its handle.
    fn create_card(&mut self, model: &CardModel) -> Self::Card;

    /// Updates an existing card in place.
    fn update_card(&mut self, card: &mut Self::Card, model: &CardModel);

    /// Removes a card.
    fn remove_card(&mut self, card: Self::Card);

    /// Shows the relay connection status.
    fn show_connection_status(&mut self, status: ConnectionStatus, label: &str);

    /// Shows the selection count and the select-all control state.
    fn show_selection(&mut self, selected: usize, select_all: SelectAllState);

    /// Shows the empty-grid message, or hides it with `None`.
    fn show_placeholder(&mut self, message: Option<&str>);

    /// Shows or refreshes the detail modal.
    fn show_detail(&mut self, detail: &DetailModel);

    /// Hides the detail modal.
    fn hide_detail(&mut self);

    /// Shows a notification.
    fn notify(&mut self, level: NoticeLevel, message: &str);

    /// Blocks further interaction after a fatal error.
    fn disable(&mut self, message: &str);
}

/// Returns the message to show instead of an empty or unhelpful grid.
///
/// `total` is the roster size, `any_live` whether any student is connected or
/// locked, `displayed` the number of cards after filtering.
#[must_use]
pub fn placeholder_message(
    total: usize,
    any_live: bool,
    displayed: usize,
    filter: &str,
) -> Option<String> {
    if total == 0 {
        Some("No students connected yet.".to_string())
    } else if !any_live {
        Some("All students are disconnected.".to_string())
    } else if displayed == 0 && !filter.is_empty() {
        Some(format!("No students match filter \"{filter}\"."))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_messages() {
        assert_eq!(
            placeholder_message(0, false, 0, "").as_deref(),
            Some("No students connected yet.")
        );
        assert_eq!(
            placeholder_message(3, false, 3, "").as_deref(),
            Some("All students are disconnected.")
        );
        assert_eq!(
            placeholder_message(3, true, 0, "zed").as_deref(),
            Some("No students match filter \"zed\".")
        );
        assert_eq!(placeholder_message(3, true, 2, "a"), None);
    }
}
