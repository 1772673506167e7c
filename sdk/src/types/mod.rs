//! Core types for the Saber SDK.
//!
//! - [`StudentRecord`]: state of one monitored student
//! - [`StudentStatus`]: connected / locked / disconnected
//! - [`StudentSummary`]: roster entry from the relay
//! - [`TabInfo`]: a browser tab

pub mod student;
pub mod tab;

pub use student::{StudentRecord, StudentStatus, StudentSummary, LOADING_EMAIL, UNKNOWN_EMAIL};
pub use tab::{tabs_by_id, TabInfo};
