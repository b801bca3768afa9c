//! crates/podcast_core/src/error.rs
//!
//! The user-facing error taxonomy for every flow the core drives.

use crate::ports::PortError;

/// Errors surfaced to whoever drives a flow (CLI, UI).
///
/// Every variant renders to a single human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    /// Detected on the client; no request was sent.
    #[error("{0}")]
    Validation(String),

    /// The cached balance cannot cover the action; prompt a purchase.
    #[error("You need at least 1 Hoot to do that. Buy more Hoots to continue.")]
    InsufficientBalance,

    #[error("You are not signed in or your session expired: {0}")]
    Auth(String),

    #[error("Could not reach the server. Check your connection and try again. ({0})")]
    Network(String),

    /// `status` is `None` when the response succeeded but was unusable.
    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    #[error("The podcast is taking longer than expected (gave up after {attempts} checks). Check your history later.")]
    Timeout { attempts: u32 },

    /// The background job reported FAILED.
    #[error("The audio generation failed in the background: {0}")]
    GenerationFailed(String),

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("The operation was cancelled.")]
    Cancelled,
}

impl From<PortError> for FlowError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Network(msg) => FlowError::Network(msg),
            PortError::Unauthorized(msg) => FlowError::Auth(msg),
            PortError::Server { status, message } => FlowError::Server {
                status: Some(status),
                message,
            },
            PortError::Malformed(message) => FlowError::Server {
                status: None,
                message,
            },
            PortError::Unexpected(message) => FlowError::Server {
                status: None,
                message,
            },
        }
    }
}

pub type FlowResult<T> = Result<T, FlowError>;
