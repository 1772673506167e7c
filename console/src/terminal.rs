//! Line-oriented terminal view.
//!
//! Every view call becomes one or more lines on the writer, prefixed with a
//! marker: `+` new card, `~` updated card, `-` removed card, `*` dashboard
//! state, `!` notice, `!!` dashboard disabled.

use std::io::Write;

use chrono::Local;
use saber_sdk::view::{CardModel, DetailModel, TabLine};
use saber_sdk::{
    ConnectionStatus, DashboardView, NoticeLevel, SelectAllState, SessionMetricsSnapshot,
};
use tracing::warn;

/// Handle for a card printed on the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalCard {
    /// Client ID.
    pub client_id: String,
    /// Name label at creation time.
    pub name: String,
}

/// Formats one card as a single line.
#[must_use]
pub fn format_card(model: &CardModel) -> String {
    let mut line = format!("{} [{}", model.name, model.status);
    if model.provisional {
        line.push('?');
    }
    line.push(']');

    if model.selected {
        line.push_str(" (selected)");
    }

    match model.screenshot.overlay() {
        Some(overlay) => {
            line.push_str(" <");
            line.push_str(overlay);
            line.push('>');
        }
        None => line.push_str(" <screenshot>"),
    }

    line.push_str(" | ");
    line.push_str(&model.tab_title);
    if !model.tab_url.is_empty() {
        line.push_str(" (");
        line.push_str(&model.tab_url);
        line.push(')');
    }

    if let Some(updated) = model.last_updated {
        line.push_str(" @ ");
        line.push_str(&updated.with_timezone(&Local).format("%H:%M:%S").to_string());
    }

    line.push_str(" #");
    line.push_str(&model.client_id);
    line
}

fn format_tab(tab: &TabLine) -> String {
    format!("[{}] {} - {}", tab.id, tab.title, tab.url)
}

const fn select_all_label(state: SelectAllState) -> &'static str {
    match state {
        SelectAllState::Checked => "all",
        SelectAllState::Unchecked => "none",
        SelectAllState::Indeterminate => "some",
    }
}

/// [`DashboardView`] that writes lines to `W`.
#[derive(Debug)]
pub struct TerminalView<W: Write> {
    out: W,
    disabled: bool,
}

impl<W: Write> TerminalView<W> {
    /// Creates a view writing to `out`.
    pub const fn new(out: W) -> Self {
        Self {
            out,
            disabled: false,
        }
    }

    /// Returns the writer.
    #[must_use]
    pub const fn writer(&self) -> &W {
        &self.out
    }

    /// Returns true once the dashboard has been disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            warn!("Failed to write to terminal: {}", e);
        }
    }

    /// Prints raw lines.
    pub fn print_lines(&mut self, text: &str) {
        for line in text.lines() {
            self.line(line);
        }
    }

    /// Prints every card without changing the grid.
    pub fn print_cards<'a>(&mut self, models: impl IntoIterator<Item = &'a CardModel>) {
        let mut count = 0;
        for model in models {
            self.line(&format!("  {}", format_card(model)));
            count += 1;
        }
        if count == 0 {
            self.line("  (no cards)");
        }
    }

    /// Prints a metrics snapshot.
    pub fn print_stats(&mut self, stats: &SessionMetricsSnapshot) {
        self.line(&format!(
            "* uptime {}s | frames {} received, {} dropped ({:.1}%) | messages {} sent, {} unsent | {} rejected | {} reconnects",
            stats.uptime.as_secs(),
            stats.frames_received,
            stats.frames_dropped,
            stats.drop_rate * 100.0,
            stats.messages_sent,
            stats.messages_unsent,
            stats.commands_rejected,
            stats.reconnects_scheduled,
        ));
    }
}

impl<W: Write> DashboardView for TerminalView<W> {
    type Card = TerminalCard;

    fn create_card(&mut self, model: &CardModel) -> TerminalCard {
        self.line(&format!("+ {}", format_card(model)));
        TerminalCard {
            client_id: model.client_id.clone(),
            name: model.name.clone(),
        }
    }

    fn update_card(&mut self, card: &mut TerminalCard, model: &CardModel) {
        card.name.clone_from(&model.name);
        self.line(&format!("~ {}", format_card(model)));
    }

    fn remove_card(&mut self, card: TerminalCard) {
        self.line(&format!("- {} #{}", card.name, card.client_id));
    }

    fn show_connection_status(&mut self, _status: ConnectionStatus, label: &str) {
        self.line(&format!("* Relay: {label}"));
    }

    fn show_selection(&mut self, selected: usize, select_all: SelectAllState) {
        self.line(&format!(
            "* Selected: {selected} ({} displayed selected)",
            select_all_label(select_all)
        ));
    }

    fn show_placeholder(&mut self, message: Option<&str>) {
        if let Some(message) = message {
            self.line(&format!("* {message}"));
        }
    }

    fn show_detail(&mut self, detail: &DetailModel) {
        self.line(&format!(
            "* Detail: {} [{}] #{}",
            detail.name, detail.status, detail.client_id
        ));
        let screenshot = if detail.screenshot.is_some() {
            "available"
        } else {
            "none"
        };
        self.line(&format!("    screenshot: {screenshot} ({})", detail.screenshot_caption));
        match &detail.active_tab {
            Some(tab) => self.line(&format!("    active: {}", format_tab(tab))),
            None => self.line("    active: none"),
        }
        if detail.other_tabs.is_empty() {
            self.line("    other tabs: none");
        } else {
            for tab in &detail.other_tabs {
                self.line(&format!("    tab: {}", format_tab(tab)));
            }
        }
    }

    fn hide_detail(&mut self) {
        self.line("* Detail closed");
    }

    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.line(&format!("! [{level}] {message}"));
    }

    fn disable(&mut self, message: &str) {
        self.disabled = true;
        self.line(&format!("!! {message}"));
    }
}
