//! Saber Console - terminal front end for the Saber teacher dashboard.
//!
//! Connects to the relay with [`saber_sdk::DashboardSession`], prints the
//! student grid as lines and reads teacher commands from stdin.
//!
//! # Modules
//!
//! - [`config`]: environment configuration
//! - [`input`]: command line parsing
//! - [`terminal`]: line-oriented [`saber_sdk::DashboardView`]
//! - [`app`]: the event loop

pub mod app;
pub mod config;
pub mod input;
pub mod terminal;

pub use app::{run, Flow};
pub use config::{ConfigError, ConsoleConfig};
pub use input::{parse_line, InputError, Intent, Target};
pub use terminal::{format_card, TerminalView};
