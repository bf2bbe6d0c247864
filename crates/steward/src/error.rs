use std::fmt;

/// Unified error type for the steward crate.
///
/// Command-level failures (unrecognized input, a capability erroring out) are
/// not errors at all: they resolve to a [`crate::capability::CapabilityResult`]
/// reply. `CoreError` covers the faults that can actually stop the process or
/// reject a caller.
#[derive(Debug, Clone)]
pub enum CoreError {
    /// Another live process already holds the instance lock.
    AlreadyRunning { lock_path: String, owner_pid: u32 },
    /// Relay or API credential was missing, wrong, or expired.
    Authentication(String),
    /// A supervised unit failed to start, or startup had to be rolled back.
    Supervision(String),
    /// Invalid input provided by the caller.
    InvalidInput(String),
    /// Internal error.
    Internal(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::AlreadyRunning { lock_path, owner_pid } => write!(
                f,
                "another instance is already running (pid {owner_pid}, lock {lock_path})"
            ),
            CoreError::Authentication(msg) => write!(f, "authentication failed: {msg}"),
            CoreError::Supervision(msg) => write!(f, "supervision error: {msg}"),
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type alias using [`CoreError`].
pub type CoreResult<T> = Result<T, CoreError>;
