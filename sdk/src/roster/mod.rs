//! Roster of monitored students.
//!
//! # Components
//!
//! - [`store`]: the roster reducer
//! - [`query`]: filtering and sorting
//! - [`selection`]: teacher selection for bulk commands

pub mod query;
pub mod selection;
pub mod store;

pub use query::SortKey;
pub use selection::{SelectAllState, Selection};
pub use store::{Clock, RosterStore};
