//! services/studio/src/adapters/credentials.rs
//!
//! Adapters that implement the `CredentialProvider` port.

use async_trait::async_trait;
use podcast_core::ports::{CredentialProvider, PortError, PortResult};
use std::path::PathBuf;
use tracing::debug;

/// Hands out the same token on every call.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl CredentialProvider for StaticTokenProvider {
    async fn access_token(&self) -> PortResult<String> {
        if self.token.trim().is_empty() {
            return Err(PortError::Unauthorized("No access token configured.".to_string()));
        }
        Ok(self.token.clone())
    }
}

/// Reads the token from a file before every call, so an external refresher
/// can rotate it while the client runs.
#[derive(Clone)]
pub struct TokenFileProvider {
    path: PathBuf,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn access_token(&self) -> PortResult<String> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            PortError::Unauthorized(format!(
                "Could not read the token file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let token = raw.trim();
        if token.is_empty() {
            return Err(PortError::Unauthorized(format!(
                "The token file {} is empty.",
                self.path.display()
            )));
        }
        debug!("Loaded access token from {}", self.path.display());
        Ok(token.to_string())
    }
}
