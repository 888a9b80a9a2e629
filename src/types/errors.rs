//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the options bridge.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed input or structural misuse of the document tree.
    #[error("validation error: {0}")]
    Validation(String),

    /// Node, key or handler not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid one-way state transition (e.g. loading a second dictionary).
    #[error("state transition error: {0}")]
    StateTransition(String),

    /// The peer cannot be reached (transport closed or torn down).
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code used in logs and frame-level diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Validation(_) => "INVALID_ARGUMENT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::StateTransition(_) => "FAILED_PRECONDITION",
            Error::Transport(_) => "UNAVAILABLE",
            Error::Serialization(_) => "INVALID_ARGUMENT",
            Error::Io(_) => "UNAVAILABLE",
        }
    }
}

// Convenience constructors
impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn state_transition(msg: impl Into<String>) -> Self {
        Self::StateTransition(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}
