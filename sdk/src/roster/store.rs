//! In-memory roster of monitored students.
//!
//! The store is a reducer over relay events: every operation is synchronous,
//! total, and leaves the store consistent before the next event is applied.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::query::{compare, matches_filter, SortKey};
use super::selection::Selection;
use crate::types::{
    StudentRecord, StudentStatus, StudentSummary, TabInfo, LOADING_EMAIL, UNKNOWN_EMAIL,
};

/// Time source for record timestamps.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Roster of students keyed by client ID, plus the teacher's selection.
pub struct RosterStore {
    /// Records by client ID.
    records: HashMap<String, StudentRecord>,

    /// Selected client IDs.
    selection: Selection,

    /// Timestamp source.
    clock: Clock,
}

impl std::fmt::Debug for RosterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RosterStore")
            .field("records", &self.records)
            .field("selection", &self.selection)
            .finish_non_exhaustive()
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RosterStore {
    /// Creates an empty store using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(Utc::now))
    }

    /// Creates an empty store with a custom clock.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            records: HashMap::new(),
            selection: Selection::new(),
            clock,
        }
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the roster is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns a record by client ID.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<&StudentRecord> {
        self.records.get(client_id)
    }

    /// Returns true if any student is connected or locked.
    #[must_use]
    pub fn any_live(&self) -> bool {
        self.records.values().any(|r| r.status.is_live())
    }

    /// Returns the selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Returns the selection for modification.
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Returns the record for `client_id`, creating a placeholder if the
    /// student has not been announced yet.
    fn get_or_init(&mut self, client_id: &str) -> &mut StudentRecord {
        let now = self.now();
        self.records.entry(client_id.to_string()).or_insert_with(|| {
            warn!("Received update for unknown student {}, initializing", client_id);
            StudentRecord::new(client_id, LOADING_EMAIL, now)
        })
    }

    /// Replaces the whole roster with a snapshot.
    ///
    /// Clears the selection. Entries with an empty client ID are skipped.
    pub fn apply_snapshot(&mut self, students: Vec<StudentSummary>) {
        let now = self.now();
        let mut records = HashMap::with_capacity(students.len());

        for summary in students {
            if summary.client_id.is_empty() {
                warn!("Ignoring snapshot entry without client id");
                continue;
            }
            let email = summary
                .email
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
            records.insert(
                summary.client_id.clone(),
                StudentRecord::new(summary.client_id, email, now),
            );
        }

        info!("Applied roster snapshot with {} students", records.len());
        self.records = records;
        self.selection.clear();
    }

    /// Inserts or updates a student announced as connected.
    pub fn apply_connected(&mut self, summary: StudentSummary) {
        let now = self.now();
        let email = summary.email.filter(|e| !e.is_empty());

        match self.records.get_mut(&summary.client_id) {
            Some(record) => {
                if let Some(email) = email {
                    record.email = email;
                }
                record.status = StudentStatus::Connected;
                record.pending_status = None;
                record.last_update = now;
            }
            None => {
                let email = email.unwrap_or_else(|| UNKNOWN_EMAIL.to_string());
                self.records.insert(
                    summary.client_id.clone(),
                    StudentRecord::new(summary.client_id, email, now),
                );
            }
        }
    }

    /// Marks a student disconnected and drops it from the selection.
    ///
    /// Returns false if the student is unknown.
    pub fn apply_disconnected(&mut self, client_id: &str) -> bool {
        let now = self.now();
        let Some(record) = self.records.get_mut(client_id) else {
            debug!("Disconnect for unknown student {}", client_id);
            return false;
        };

        record.status = StudentStatus::Disconnected;
        record.pending_status = None;
        record.last_update = now;
        self.selection.remove(client_id);
        true
    }

    /// Records a screenshot, or its absence with an optional reason.
    pub fn apply_screenshot(
        &mut self,
        client_id: &str,
        image: Option<String>,
        reason: Option<String>,
    ) {
        let now = self.now();
        let record = self.get_or_init(client_id);
        record.screenshot_issue = if image.is_some() { None } else { reason };
        record.last_screenshot = image;
        record.touch_live(now);
    }

    /// Replaces the full tab list of a student.
    pub fn apply_tabs(&mut self, client_id: &str, tabs: BTreeMap<i64, TabInfo>) {
        let now = self.now();
        let record = self.get_or_init(client_id);
        record.tabs = tabs;
        record.touch_live(now);
    }

    /// Merges created or updated tabs into a student's tab list.
    pub fn merge_tabs(&mut self, client_id: &str, tabs: BTreeMap<i64, TabInfo>) {
        let now = self.now();
        let record = self.get_or_init(client_id);
        record.tabs.extend(tabs);
        record.touch_live(now);
    }

    /// Removes a single tab from a student's tab list.
    pub fn remove_tab(&mut self, client_id: &str, tab_id: i64) {
        let now = self.now();
        let record = self.get_or_init(client_id);
        record.tabs.remove(&tab_id);
        record.touch_live(now);
    }

    /// Applies an authoritative status and clears any optimistic one.
    pub fn apply_status(&mut self, client_id: &str, status: StudentStatus) {
        let now = self.now();
        let record = self.get_or_init(client_id);
        record.pending_status = None;
        if record.status != status {
            info!("Status update for {}: {}", client_id, status);
            record.status = status;
            record.last_update = now;
        }
    }

    /// Applies a status before the relay confirms it.
    ///
    /// A repeated optimistic write of the status already shown and pending
    /// does nothing. Returns true if the record changed.
    pub fn apply_optimistic_status(&mut self, client_id: &str, status: StudentStatus) -> bool {
        let now = self.now();
        let Some(record) = self.records.get_mut(client_id) else {
            return false;
        };

        if record.pending_status == Some(status) && record.status == status {
            return false;
        }

        record.pending_status = Some(status);
        record.status = status;
        record.last_update = now;
        true
    }

    /// Marks every student disconnected and clears the selection.
    ///
    /// Records that are already disconnected are left untouched, so applying
    /// this twice is the same as applying it once. Returns the number of
    /// records that changed.
    pub fn mark_all_disconnected(&mut self) -> usize {
        let now = self.now();
        let mut changed = 0;
        for record in self.records.values_mut() {
            record.pending_status = None;
            if record.status != StudentStatus::Disconnected {
                record.status = StudentStatus::Disconnected;
                record.last_update = now;
                changed += 1;
            }
        }
        if changed > 0 {
            info!("Marked {} students disconnected", changed);
        }
        self.selection.clear();
        changed
    }

    /// Returns the records matching `filter`, ordered by `sort`.
    #[must_use]
    pub fn query(&self, filter: &str, sort: SortKey) -> Vec<&StudentRecord> {
        let needle = filter.trim().to_lowercase();
        let mut records: Vec<&StudentRecord> = self
            .records
            .values()
            .filter(|r| matches_filter(r, &needle))
            .collect();
        records.sort_by(|a, b| compare(a, b, sort));
        records
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicI64, Ordering};

    use chrono::TimeZone;

    use super::*;

    fn ticking_store() -> RosterStore {
        let ticks = Arc::new(AtomicI64::new(0));
        RosterStore::with_clock(Arc::new(move || {
            let t = ticks.fetch_add(1, Ordering::Relaxed);
            Utc.timestamp_opt(1_700_000_000 + t, 0)
                .single()
                .unwrap_or_else(Utc::now)
        }))
    }

    fn tab(id: i64, active: bool) -> TabInfo {
        TabInfo {
            id,
            title: format!("Tab {id}"),
            url: format!("https://example.com/{id}"),
            active,
            fav_icon_url: None,
        }
    }

    fn ids(store: &RosterStore, filter: &str, sort: SortKey) -> Vec<String> {
        store
            .query(filter, sort)
            .into_iter()
            .map(|r| r.client_id.clone())
            .collect()
    }

    #[test]
    fn test_store_new() {
        let store = RosterStore::new();
        assert!(store.is_empty());
        assert!(!store.any_live());
    }

    #[test]
    fn test_snapshot_then_query() {
        let mut store = RosterStore::new();
        store.apply_snapshot(vec![StudentSummary::new("a", "x@y.com")]);
        assert_eq!(ids(&store, "", SortKey::Name), vec!["a"]);

        assert!(store.apply_disconnected("a"));
        let record = store.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Disconnected);
        assert_eq!(ids(&store, "", SortKey::Name), vec!["a"]);
    }

    #[test]
    fn test_snapshot_replaces_previous() {
        let mut store = RosterStore::new();
        store.apply_snapshot(vec![
            StudentSummary::new("a", "a@x.org"),
            StudentSummary::new("b", "b@x.org"),
        ]);
        store.selection_mut().set("a", true);

        store.apply_snapshot(vec![StudentSummary::new("c", "c@x.org")]);
        assert_eq!(ids(&store, "", SortKey::Name), vec!["c"]);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_snapshot_skips_empty_ids_and_defaults_email() {
        let mut store = RosterStore::new();
        store.apply_snapshot(vec![
            StudentSummary {
                client_id: String::new(),
                email: Some("ghost@x.org".to_string()),
            },
            StudentSummary {
                client_id: "a".to_string(),
                email: None,
            },
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").map(|r| r.email.as_str()), Some(UNKNOWN_EMAIL));
    }

    #[test]
    fn test_connect_disconnect_never_duplicates() {
        let mut store = RosterStore::new();
        for _ in 0..5 {
            store.apply_connected(StudentSummary::new("a", "a@x.org"));
            store.apply_disconnected("a");
            store.apply_connected(StudentSummary {
                client_id: "a".to_string(),
                email: None,
            });
        }
        assert_eq!(store.len(), 1);
        let record = store.get("a").expect("record");
        assert_eq!(record.email, "a@x.org");
        assert_eq!(record.status, StudentStatus::Connected);
    }

    #[test]
    fn test_connected_merges_email() {
        let mut store = RosterStore::new();
        store.apply_screenshot("a", Some("data:image/png;base64,AA".to_string()), None);
        assert_eq!(store.get("a").map(|r| r.email.as_str()), Some(LOADING_EMAIL));

        store.apply_connected(StudentSummary::new("a", "a@x.org"));
        let record = store.get("a").expect("record");
        assert_eq!(record.email, "a@x.org");
        assert_eq!(
            record.last_screenshot.as_deref(),
            Some("data:image/png;base64,AA")
        );
    }

    #[test]
    fn test_disconnect_unknown_is_ignored() {
        let mut store = RosterStore::new();
        assert!(!store.apply_disconnected("ghost"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_disconnect_removes_selection() {
        let mut store = RosterStore::new();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));
        store.apply_connected(StudentSummary::new("b", "b@x.org"));
        store.selection_mut().set("a", true);
        store.selection_mut().set("b", true);

        store.apply_disconnected("a");
        assert!(!store.selection().contains("a"));
        assert!(store.selection().contains("b"));
    }

    #[test]
    fn test_screenshot_error_keeps_lock() {
        let mut store = RosterStore::new();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));
        store.apply_status("a", StudentStatus::Locked);

        store.apply_screenshot("a", None, Some("timeout".to_string()));
        let record = store.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Locked);
        assert!(record.last_screenshot.is_none());
        assert_eq!(record.screenshot_issue.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_screenshot_revives_disconnected() {
        let mut store = RosterStore::new();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));
        store.apply_disconnected("a");
        store.apply_screenshot("a", Some("data:image/png;base64,AA".to_string()), None);
        assert_eq!(store.get("a").map(|r| r.status), Some(StudentStatus::Connected));
    }

    #[test]
    fn test_tabs_active_tab_consistent() {
        let mut store = RosterStore::new();
        let tabs: BTreeMap<i64, TabInfo> =
            [(1, tab(1, false)), (2, tab(2, true))].into_iter().collect();
        store.apply_tabs("a", tabs);
        assert_eq!(store.get("a").and_then(|r| r.active_tab()).map(|t| t.id), Some(2));

        let tabs: BTreeMap<i64, TabInfo> = [(1, tab(1, false))].into_iter().collect();
        store.apply_tabs("a", tabs);
        assert!(store.get("a").and_then(|r| r.active_tab()).is_none());
    }

    #[test]
    fn test_merge_and_remove_tabs() {
        let mut store = RosterStore::new();
        store.apply_tabs("a", [(1, tab(1, true))].into_iter().collect());
        store.merge_tabs("a", [(2, tab(2, false))].into_iter().collect());
        assert_eq!(store.get("a").map(|r| r.tabs.len()), Some(2));

        store.remove_tab("a", 1);
        let record = store.get("a").expect("record");
        assert_eq!(record.tabs.len(), 1);
        assert!(record.active_tab().is_none());
    }

    #[test]
    fn test_optimistic_lock_then_confirmation() {
        let mut store = RosterStore::new();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        let record = store.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Locked);
        assert!(record.is_provisional());

        store.apply_status("a", StudentStatus::Locked);
        assert_eq!(store.len(), 1);
        let record = store.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Locked);
        assert!(!record.is_provisional());
    }

    #[test]
    fn test_repeated_optimistic_write_is_noop() {
        let mut store = ticking_store();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        let first = store.get("a").map(|r| r.last_update);
        assert!(!store.apply_optimistic_status("a", StudentStatus::Locked));
        assert_eq!(store.get("a").map(|r| r.last_update), first);
    }

    #[test]
    fn test_optimistic_lock_after_reconnect_applies_again() {
        let mut store = ticking_store();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        assert!(store.apply_disconnected("a"));
        store.apply_screenshot("a", Some("data:image/png;base64,AA".to_string()), None);
        let record = store.get("a").expect("record");
        assert_eq!(record.status, StudentStatus::Connected);
        assert!(!record.is_provisional());

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        assert_eq!(store.get("a").map(|r| r.status), Some(StudentStatus::Locked));
    }

    #[test]
    fn test_optimistic_rewrite_when_status_moved_on() {
        let mut store = ticking_store();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        store.mark_all_disconnected();
        assert!(!store.get("a").expect("record").is_provisional());
        store.apply_tabs("a", BTreeMap::new());

        assert!(store.apply_optimistic_status("a", StudentStatus::Locked));
        assert_eq!(store.get("a").map(|r| r.status), Some(StudentStatus::Locked));
    }

    #[test]
    fn test_optimistic_unknown_student_ignored() {
        let mut store = RosterStore::new();
        assert!(!store.apply_optimistic_status("ghost", StudentStatus::Locked));
        assert!(store.is_empty());
    }

    #[test]
    fn test_mark_all_disconnected_idempotent() {
        let mut store = ticking_store();
        store.apply_connected(StudentSummary::new("a", "a@x.org"));
        store.apply_connected(StudentSummary::new("b", "b@x.org"));
        store.selection_mut().set("a", true);

        assert_eq!(store.mark_all_disconnected(), 2);
        let once: Vec<StudentRecord> =
            store.query("", SortKey::Name).into_iter().cloned().collect();

        assert_eq!(store.mark_all_disconnected(), 0);
        let twice: Vec<StudentRecord> =
            store.query("", SortKey::Name).into_iter().cloned().collect();

        assert_eq!(once, twice);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_query_filter() {
        let mut store = RosterStore::new();
        store.apply_snapshot(vec![
            StudentSummary::new("a1", "alice@school.org"),
            StudentSummary::new("b2", "bob@school.org"),
        ]);
        assert_eq!(store.query("", SortKey::Name).len(), 2);
        assert_eq!(ids(&store, "ALICE", SortKey::Name), vec!["a1"]);
        assert_eq!(ids(&store, "b2", SortKey::Name), vec!["b2"]);
        assert!(store.query("nobody", SortKey::Name).is_empty());
    }

    #[test]
    fn test_query_sort_status() {
        let mut store = RosterStore::new();
        store.apply_snapshot(vec![
            StudentSummary::new("a", "a@x.org"),
            StudentSummary::new("b", "b@x.org"),
            StudentSummary::new("c", "c@x.org"),
        ]);
        store.apply_disconnected("a");
        store.apply_status("b", StudentStatus::Locked);
        assert_eq!(ids(&store, "", SortKey::Status), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_query_sort_activity() {
        let mut store = ticking_store();
        store.apply_snapshot(vec![
            StudentSummary::new("a", "a@x.org"),
            StudentSummary::new("b", "b@x.org"),
        ]);
        store.apply_screenshot("a", Some("data:image/png;base64,AA".to_string()), None);
        assert_eq!(ids(&store, "", SortKey::Activity), vec!["a", "b"]);
    }
}
