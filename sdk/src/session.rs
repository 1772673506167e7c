//! Dashboard session.
//!
//! [`DashboardSession`] owns the relay connection, the roster, the card grid,
//! the detail modal and the view. It is driven from a single task: transport
//! events, reconnect timer expiries and teacher intents are applied one at a
//! time, and every change is followed by a reconcile of the view.
//!
//! # Example
//!
//! ```rust,ignore
//! use saber_sdk::{DashboardSession, TungsteniteTransport, WsConfig};
//!
//! let config = WsConfig::default();
//! let (transport, mut events) = TungsteniteTransport::new(config.heartbeat_interval);
//! let mut session = DashboardSession::new(config, transport, view)?;
//! session.start();
//!
//! while let Some(event) = events.recv().await {
//!     session.handle_transport_event(event);
//! }
//! ```

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::command::Command;
use crate::dispatch::{BatchOutcome, CommandDispatcher};
use crate::error::SdkError;
use crate::metrics::SessionMetrics;
use crate::roster::{RosterStore, SelectAllState, SortKey};
use crate::view::{
    placeholder_message, CardModel, DashboardView, DetailModal, GridReconciler, NoticeLevel,
    RenderStats,
};
use crate::ws::{
    ConnectionEvent, ConnectionManager, ConnectionStatus, ReconnectOutcome, ServerEvent, Transport,
    TransportEvent, WsConfig, WsError,
};

/// Reason sent when closing a rejected duplicate session.
pub const DUPLICATE_SESSION_CLOSE_REASON: &str = "Duplicate session";

/// Message shown when the dashboard is disabled by a duplicate session.
pub const DUPLICATE_SESSION_NOTICE: &str =
    "Another teacher session is active. Please close this tab.";

/// One teacher dashboard session.
pub struct DashboardSession<T, V: DashboardView> {
    connection: ConnectionManager<T>,
    roster: RosterStore,
    grid: GridReconciler<V::Card>,
    detail: DetailModal,
    view: V,
    filter: String,
    sort: SortKey,
    metrics: Arc<SessionMetrics>,
    disabled: Option<String>,
    shown_status: Option<(ConnectionStatus, String)>,
    shown_placeholder: Option<Option<String>>,
    shown_selection: Option<(usize, SelectAllState)>,
}

impl<T, V: DashboardView> std::fmt::Debug for DashboardSession<T, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardSession")
            .field("connection", &self.connection)
            .field("roster", &self.roster)
            .field("filter", &self.filter)
            .field("sort", &self.sort)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, V: DashboardView> DashboardSession<T, V> {
    /// Creates a session. Nothing is sent until [`Self::start`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: WsConfig, transport: T, view: V) -> Result<Self, WsError> {
        let metrics = Arc::new(SessionMetrics::new());
        let connection = ConnectionManager::new(config, transport, Arc::clone(&metrics))?;

        Ok(Self {
            connection,
            roster: RosterStore::new(),
            grid: GridReconciler::new(),
            detail: DetailModal::new(),
            view,
            filter: String::new(),
            sort: SortKey::default(),
            metrics,
            disabled: None,
            shown_status: None,
            shown_placeholder: None,
            shown_selection: None,
        })
    }

    /// Replaces the (empty) roster, for example to inject a clock.
    #[must_use]
    pub fn with_roster(mut self, roster: RosterStore) -> Self {
        self.roster = roster;
        self
    }

    /// Sets the initial filter.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Sets the initial sort key.
    #[must_use]
    pub const fn with_sort(mut self, sort: SortKey) -> Self {
        self.sort = sort;
        self
    }

    /// Returns the connection manager.
    #[must_use]
    pub const fn connection(&self) -> &ConnectionManager<T> {
        &self.connection
    }

    /// Returns the roster.
    #[must_use]
    pub const fn roster(&self) -> &RosterStore {
        &self.roster
    }

    /// Returns the card grid.
    #[must_use]
    pub const fn grid(&self) -> &GridReconciler<V::Card> {
        &self.grid
    }

    /// Returns the detail modal state.
    #[must_use]
    pub const fn detail(&self) -> &DetailModal {
        &self.detail
    }

    /// Returns the view.
    #[must_use]
    pub const fn view(&self) -> &V {
        &self.view
    }

    /// Returns the view for modification.
    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    /// Returns the current filter.
    #[must_use]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    /// Returns the current sort key.
    #[must_use]
    pub const fn sort(&self) -> SortKey {
        self.sort
    }

    /// Returns the shared metrics.
    #[must_use]
    pub fn metrics(&self) -> Arc<SessionMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Returns the reason the dashboard was disabled, if it was.
    #[must_use]
    pub fn disabled_reason(&self) -> Option<&str> {
        self.disabled.as_deref()
    }

    /// Returns when the event loop should call [`Self::on_reconnect_timer`].
    #[must_use]
    pub const fn reconnect_deadline(&self) -> Option<Instant> {
        self.connection.reconnect_deadline()
    }

    /// Renders the initial state and opens the connection.
    pub fn start(&mut self) {
        info!("Starting dashboard session");
        self.render();
        self.connection.connect();
        self.render();
    }

    /// Applies one transport event.
    pub fn handle_transport_event(&mut self, event: TransportEvent) {
        match self.connection.handle_event(event) {
            ConnectionEvent::Ignored => return,
            ConnectionEvent::Opened | ConnectionEvent::Errored => {}
            ConnectionEvent::Frame(text) => {
                self.metrics.record_frame_received();
                self.handle_frame(&text);
            }
            ConnectionEvent::Closed(outcome) => {
                self.roster.mark_all_disconnected();
                self.refresh_viewed();
                if outcome == ReconnectOutcome::GaveUp {
                    self.view.notify(
                        NoticeLevel::Error,
                        "Lost connection to the server and could not reconnect.",
                    );
                }
            }
        }
        self.render();
    }

    /// Fires a due reconnect. Returns true if an attempt was started.
    pub fn on_reconnect_timer(&mut self) -> bool {
        let started = self.connection.on_reconnect_timer();
        self.render();
        started
    }

    /// Reconnects immediately with a fresh attempt budget.
    pub fn reconnect_now(&mut self) -> bool {
        if let Some(reason) = &self.disabled {
            warn!("Refusing to reconnect a disabled dashboard: {}", reason);
            return false;
        }
        let started = self.connection.reconnect_now();
        self.render();
        started
    }

    fn handle_frame(&mut self, text: &str) {
        let event = match ServerEvent::parse(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Dropping server message: {}", e);
                self.metrics.record_frame_dropped();
                return;
            }
        };
        debug!("Server event: {:?}", event);
        self.apply_server_event(event);
    }

    fn apply_server_event(&mut self, event: ServerEvent) {
        let duplicate = event.is_duplicate_session();

        match event {
            ServerEvent::InitialStudentList(students) => {
                self.roster.apply_snapshot(students);
                if let Some(viewing) = self.detail.viewing() {
                    if self.roster.get(viewing).is_none() {
                        self.detail.close();
                        self.view.hide_detail();
                    }
                }
                self.refresh_viewed();
            }
            ServerEvent::StudentConnected(summary) => {
                info!(
                    "Student connected: {} (ID: {})",
                    summary.email.as_deref().unwrap_or("?"),
                    summary.client_id
                );
                let client_id = summary.client_id.clone();
                self.roster.apply_connected(summary);
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentDisconnected { client_id } => {
                info!("Student disconnected: {}", client_id);
                if self.roster.apply_disconnected(&client_id) {
                    self.refresh_detail(&client_id);
                }
            }
            ServerEvent::StudentScreenshot {
                client_id,
                image_data,
            } => {
                self.roster
                    .apply_screenshot(&client_id, Some(image_data), None);
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentScreenshotUnavailable { client_id, reason } => {
                warn!("Screenshot issue for {}: {}", client_id, reason);
                self.roster.apply_screenshot(&client_id, None, Some(reason));
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentTabsUpdate { client_id, tabs } => {
                self.roster.apply_tabs(&client_id, tabs);
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentTabsChanged { client_id, tabs } => {
                self.roster.merge_tabs(&client_id, tabs);
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentTabRemoved { client_id, tab_id } => {
                self.roster.remove_tab(&client_id, tab_id);
                self.refresh_detail(&client_id);
            }
            ServerEvent::StudentStatusUpdate { client_id, status } => {
                self.roster.apply_status(&client_id, status);
                self.refresh_detail(&client_id);
            }
            ServerEvent::CommandFailed {
                target_client_id,
                reason,
            } => {
                let target = target_client_id.as_deref().unwrap_or("?");
                let reason = reason.as_deref().unwrap_or("Unknown");
                error!("Server command failed: target={}, reason={}", target, reason);
                self.metrics.record_command_rejected();
                self.view.notify(
                    NoticeLevel::Error,
                    &format!("Command failed for student {target}: {reason}"),
                );
            }
            ServerEvent::ServerAck { message } => {
                info!("Server ACK: {}", message.as_deref().unwrap_or(""));
            }
            ServerEvent::Error { message } => {
                error!("Server error: {}", message);
                self.view
                    .notify(NoticeLevel::Error, &format!("Server Error: {message}"));
                if duplicate {
                    self.disable(DUPLICATE_SESSION_NOTICE);
                }
            }
            ServerEvent::Pong => {}
        }
    }

    fn disable(&mut self, message: &str) {
        error!("Dashboard disabled: {}", message);
        self.disabled = Some(message.to_string());
        self.connection.halt(DUPLICATE_SESSION_CLOSE_REASON);
        self.roster.mark_all_disconnected();
        self.view.disable(message);
    }

    fn refresh_detail(&mut self, client_id: &str) {
        if let Some(model) = self.detail.refresh_for(client_id, &self.roster) {
            self.view.show_detail(&model);
        }
    }

    fn refresh_viewed(&mut self) {
        if let Some(viewing) = self.detail.viewing().map(str::to_string) {
            self.refresh_detail(&viewing);
        }
    }

    /// Reconciles the view with the roster, filter, sort and selection.
    pub fn render(&mut self) -> RenderStats {
        let selection = self.roster.selection();
        let models: Vec<CardModel> = self
            .roster
            .query(&self.filter, self.sort)
            .into_iter()
            .map(|record| CardModel::from_record(record, selection.contains(&record.client_id)))
            .collect();
        let displayed = models.len();

        let stats = self.grid.reconcile(&mut self.view, models);

        let placeholder = placeholder_message(
            self.roster.len(),
            self.roster.any_live(),
            displayed,
            self.filter.trim(),
        );
        if self.shown_placeholder.as_ref() != Some(&placeholder) {
            self.view.show_placeholder(placeholder.as_deref());
            self.shown_placeholder = Some(placeholder);
        }

        let selection = (
            self.roster.selection().len(),
            self.roster
                .selection()
                .select_all_state(self.grid.displayed_ids()),
        );
        if self.shown_selection != Some(selection) {
            self.view.show_selection(selection.0, selection.1);
            self.shown_selection = Some(selection);
        }

        let status = (
            self.connection.status(),
            self.connection.label().to_string(),
        );
        if self.shown_status.as_ref() != Some(&status) {
            self.view.show_connection_status(status.0, &status.1);
            self.shown_status = Some(status);
        }

        stats
    }

    /// Changes the filter text.
    pub fn set_filter(&mut self, filter: &str) {
        self.filter = filter.to_string();
        self.render();
    }

    /// Changes the sort key.
    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
        self.render();
    }

    /// Selects or deselects one student. Returns false if the student is
    /// unknown.
    pub fn set_selected(&mut self, client_id: &str, selected: bool) -> bool {
        if self.roster.get(client_id).is_none() {
            return false;
        }
        self.roster.selection_mut().set(client_id, selected);
        self.render();
        true
    }

    /// Selects every displayed student, or clears the selection.
    pub fn set_select_all(&mut self, selected: bool) {
        if selected {
            self.roster
                .selection_mut()
                .select_only(self.grid.displayed_ids());
        } else {
            self.roster.selection_mut().clear();
        }
        self.render();
    }

    fn ensure_enabled(&self) -> Result<(), SdkError> {
        match &self.disabled {
            Some(reason) => Err(SdkError::Disabled(reason.clone())),
            None => Ok(()),
        }
    }

    /// Sends a command to one student. Returns whether it was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the dashboard is disabled or the target is empty.
    pub fn send_to_one(&mut self, client_id: &str, command: &Command) -> Result<bool, SdkError> {
        self.ensure_enabled()?;
        let sent = CommandDispatcher::new(&mut self.connection, &mut self.roster)
            .send_to_one(client_id, command)?;
        if !sent {
            self.view.notify(
                NoticeLevel::Warn,
                &format!("Not connected: {} was not sent", command.name()),
            );
        }
        self.refresh_detail(client_id);
        self.render();
        Ok(sent)
    }

    /// Sends a command to every selected student.
    ///
    /// # Errors
    ///
    /// Returns an error if the dashboard is disabled or nothing is selected.
    pub fn send_to_selected(&mut self, command: &Command) -> Result<BatchOutcome, SdkError> {
        self.ensure_enabled()?;
        let targets = self.roster.selection().ids();
        if targets.is_empty() {
            self.view
                .notify(NoticeLevel::Warn, "No students selected for bulk action.");
            return Err(SdkError::NoTargets);
        }

        let outcome = CommandDispatcher::new(&mut self.connection, &mut self.roster)
            .send_to_many(&targets, command)?;
        if !outcome.all_sent() {
            self.view.notify(
                NoticeLevel::Warn,
                &format!(
                    "{} of {} commands were not sent",
                    outcome.unsent.len(),
                    outcome.total()
                ),
            );
        }
        self.refresh_viewed();
        self.render();
        Ok(outcome)
    }

    /// Asks one student's browser to close whatever tab is active there.
    ///
    /// The student resolves the tab, so this works before any tab list has
    /// arrived. Returns whether the command was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the dashboard is disabled or the target is empty.
    pub fn close_active_tab(&mut self, client_id: &str) -> Result<bool, SdkError> {
        self.send_to_one(client_id, &Command::CloseActiveTab)
    }

    /// Opens the detail modal for a student. Returns false if unknown.
    pub fn open_detail(&mut self, client_id: &str) -> bool {
        match self.detail.open(client_id, &self.roster) {
            Some(model) => {
                info!("Showing detail for {}", client_id);
                self.view.show_detail(&model);
                true
            }
            None => {
                warn!("Cannot show detail: student {} not found", client_id);
                false
            }
        }
    }

    /// Closes the detail modal.
    pub fn close_detail(&mut self) {
        if self.detail.close() {
            self.view.hide_detail();
        }
    }
}
