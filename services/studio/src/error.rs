//! services/studio/src/error.rs
//!
//! Defines the primary error type for the studio client.

use crate::config::ConfigError;
use podcast_core::{FlowError, PortError};

/// The primary error type for the `studio` client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error raised directly by an adapter, outside any flow.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A user-facing error from one of the core flows. Rendered as-is.
    #[error("{0}")]
    Flow(#[from] FlowError),

    /// Represents an error from building the HTTP client.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error (e.g., reading from the terminal).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
