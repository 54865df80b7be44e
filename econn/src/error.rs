//! Error taxonomy for econn.

/// Errors returned by the fallible operations in this crate.
///
/// Inbound validation failures (wrong clientId, wrong sessionId, operation
/// requested from the wrong state during passive dispatch) are logged and
/// dropped rather than surfaced as one of these — see [`crate::connection`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum EconnError {
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    #[error("bad message: {0}")]
    BadMessage(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("no transport bound")]
    Unsupported,

    #[error("timed out")]
    TimedOut,

    #[error("canceled")]
    Canceled,

    /// Allocation failure. Never constructed by this crate — Rust aborts
    /// the process on OOM rather than returning a recoverable error — but
    /// kept for fidelity with the ported error taxonomy (see DESIGN.md).
    #[error("no memory")]
    NoMemory,

    #[error("transport send failed: {0}")]
    Send(String),
}
