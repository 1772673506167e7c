//! Saber SDK - core of the Saber teacher console.
//!
//! This crate connects a teacher to the Saber relay, keeps the roster of
//! monitored student browsers up to date and sends commands back to them.
//!
//! # Components
//!
//! - [`ws::ConnectionManager`]: relay connection with bounded reconnects
//! - [`RosterStore`]: students, their tabs and screenshots, and the selection
//! - [`CommandDispatcher`]: single and bulk `teacher_command` sends
//! - [`view`]: card models, grid reconciliation and the detail modal behind
//!   the [`DashboardView`] trait
//! - [`DashboardSession`]: owns all of the above and applies relay events
//!
//! # Example
//!
//! ```rust
//! use saber_sdk::{RosterStore, SortKey, StudentSummary};
//!
//! let mut roster = RosterStore::new();
//! roster.apply_snapshot(vec![StudentSummary::new("a", "x@y.com")]);
//! roster.apply_disconnected("a");
//!
//! let ids: Vec<&str> = roster
//!     .query("", SortKey::Name)
//!     .iter()
//!     .map(|r| r.client_id.as_str())
//!     .collect();
//! assert_eq!(ids, vec!["a"]);
//! ```

pub mod command;
pub mod dispatch;
pub mod error;
pub mod metrics;
pub mod roster;
pub mod session;
pub mod types;
pub mod view;
pub mod ws;

pub use command::Command;
pub use dispatch::{BatchOutcome, CommandDispatcher, CommandSink};
pub use error::SdkError;
pub use metrics::{SessionMetrics, SessionMetricsSnapshot};
pub use roster::{RosterStore, SelectAllState, Selection, SortKey};
pub use session::DashboardSession;
pub use types::{StudentRecord, StudentStatus, StudentSummary, TabInfo};
pub use view::{CardModel, DashboardView, DetailModel, NoticeLevel, RenderStats};
pub use ws::{ConnectionStatus, TungsteniteTransport, WsConfig, WsError};
