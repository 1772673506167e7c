//! Browser tab types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// A browser tab reported by a student client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Tab ID.
    pub id: i64,

    /// Page title.
    #[serde(default)]
    pub title: String,

    /// Page URL.
    #[serde(default)]
    pub url: String,

    /// Whether this is the focused tab.
    #[serde(default)]
    pub active: bool,

    /// Favicon URL.
    #[serde(default)]
    pub fav_icon_url: Option<String>,
}

/// Converts a wire tab mapping (`{"<tabId>": TabInfo}`) into tabs keyed by ID.
///
/// The ID inside the tab wins over the map key.
#[must_use]
pub fn tabs_by_id(wire: HashMap<String, TabInfo>) -> BTreeMap<i64, TabInfo> {
    wire.into_values().map(|tab| (tab.id, tab)).collect()
}
