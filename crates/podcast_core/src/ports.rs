//! crates/podcast_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the HTTP stack and of the identity provider.

use async_trait::async_trait;
use serde_json::Value;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP, identity).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    /// The request never produced a response (DNS, refused connection, TLS, timeout).
    #[error("Network error: {0}")]
    Network(String),
    /// No usable credential could be obtained.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// The backend answered with a 4xx/5xx status.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },
    /// The backend answered with a success status but an unusable body.
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Supplies a short-lived bearer credential from the external identity provider.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a credential valid for the next request.
    ///
    /// Fails with `PortError::Unauthorized` when none is available.
    async fn access_token(&self) -> PortResult<String>;
}

/// Sends one request to the backend and returns its JSON body.
///
/// Implementations attach the credential, normalize error statuses into
/// `PortError::Server` and transport failures into `PortError::Network`.
/// They never retry.
#[async_trait]
pub trait RemoteCaller: Send + Sync {
    async fn call(&self, path: &str, payload: Value) -> PortResult<Value>;
}
