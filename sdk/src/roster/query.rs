//! Filtering and sorting of roster records.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::StudentRecord;

/// Sort order for the student grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    /// Alphabetical by display name.
    #[default]
    Name,
    /// Connected, then locked, then disconnected.
    Status,
    /// Most recently updated first.
    Activity,
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => write!(f, "name"),
            Self::Status => write!(f, "status"),
            Self::Activity => write!(f, "activity"),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "status" => Ok(Self::Status),
            "activity" => Ok(Self::Activity),
            other => Err(format!("unknown sort key: {other}")),
        }
    }
}

/// Returns true if the record matches the (already lowercased, trimmed) filter.
#[must_use]
pub fn matches_filter(record: &StudentRecord, needle: &str) -> bool {
    needle.is_empty()
        || record.email.to_lowercase().contains(needle)
        || record.client_id.to_lowercase().contains(needle)
}

/// Case-insensitive name comparison, falling back to byte order so the
/// result is total.
///
/// Names are compared by Unicode lowercase code points, not by a locale
/// collation, so accented names sort after unaccented ones.
#[must_use]
pub fn compare_names(a: &StudentRecord, b: &StudentRecord) -> Ordering {
    let (left, right) = (a.display_name(), b.display_name());
    left.to_lowercase()
        .cmp(&right.to_lowercase())
        .then_with(|| left.cmp(right))
        .then_with(|| a.client_id.cmp(&b.client_id))
}

/// Compares two records under the given sort key.
#[must_use]
pub fn compare(a: &StudentRecord, b: &StudentRecord, key: SortKey) -> Ordering {
    let primary = match key {
        SortKey::Name => Ordering::Equal,
        SortKey::Status => a.status.rank().cmp(&b.status.rank()),
        SortKey::Activity => b.last_update.cmp(&a.last_update),
    };
    primary.then_with(|| compare_names(a, b))
}
