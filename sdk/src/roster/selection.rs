//! Teacher selection of students for bulk commands.

use std::collections::HashSet;

/// State of the "select all" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAllState {
    /// Every displayed student is selected.
    Checked,
    /// No displayed student is selected.
    Unchecked,
    /// Some, but not all, displayed students are selected.
    Indeterminate,
}

/// Set of selected client IDs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects or deselects a student.
    pub fn set(&mut self, client_id: &str, selected: bool) {
        if selected {
            self.ids.insert(client_id.to_string());
        } else {
            self.ids.remove(client_id);
        }
    }

    /// Removes a student; returns true if it was selected.
    pub fn remove(&mut self, client_id: &str) -> bool {
        self.ids.remove(client_id)
    }

    /// Replaces the selection with the given IDs.
    pub fn select_only<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.ids = ids.into_iter().map(str::to_string).collect();
    }

    /// Clears the selection.
    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Returns true if the student is selected.
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        self.ids.contains(client_id)
    }

    /// Returns the number of selected students.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Returns true if nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Returns the selected IDs in sorted order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.ids.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Computes the "select all" state over the displayed students.
    #[must_use]
    pub fn select_all_state<'a>(
        &self,
        displayed: impl IntoIterator<Item = &'a str>,
    ) -> SelectAllState {
        let mut total = 0usize;
        let mut selected = 0usize;
        for id in displayed {
            total += 1;
            if self.ids.contains(id) {
                selected += 1;
            }
        }

        if total == 0 || selected == 0 {
            SelectAllState::Unchecked
        } else if selected == total {
            SelectAllState::Checked
        } else {
            SelectAllState::Indeterminate
        }
    }
}
