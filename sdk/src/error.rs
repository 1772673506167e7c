//! SDK error types.
//!
//! Provides error types for command construction and dispatch.

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// Target client ID was empty.
    #[error("client id cannot be empty")]
    EmptyClientId,

    /// Command name was empty.
    #[error("command name cannot be empty")]
    EmptyCommand,

    /// URL is not an http(s) URL.
    #[error("invalid url (must start with http:// or https://): {0}")]
    InvalidUrl(String),

    /// Announcement message was empty.
    #[error("announcement message cannot be empty")]
    EmptyMessage,

    /// Announcement duration below the minimum.
    #[error("invalid duration: {0} ms (min 1000 ms)")]
    InvalidDuration(u64),

    /// Block list contained no patterns.
    #[error("no block patterns entered")]
    EmptyBlocklist,

    /// No students were targeted.
    #[error("no students selected")]
    NoTargets,

    /// Dashboard was disabled after a fatal session error.
    #[error("dashboard is disabled: {0}")]
    Disabled(String),
}
