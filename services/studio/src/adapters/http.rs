//! services/studio/src/adapters/http.rs
//!
//! This module contains the adapter for the podcast backend's HTTP functions.
//! It implements the `RemoteCaller` port from the `core` crate.

use async_trait::async_trait;
use podcast_core::ports::{CredentialProvider, PortError, PortResult, RemoteCaller};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Posts JSON to `{base_url}/{path}` with a bearer credential.
#[derive(Clone)]
pub struct HttpRemoteCaller {
    client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpRemoteCaller {
    pub fn new(client: Client, base_url: impl Into<String>, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Builds the reqwest client with a per-request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::new(client, base_url, credentials))
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

//=========================================================================================
// `RemoteCaller` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteCaller for HttpRemoteCaller {
    async fn call(&self, path: &str, payload: Value) -> PortResult<Value> {
        // A fresh credential per call; the provider decides whether to cache.
        let token = self.credentials.access_token().await?;
        let url = self.url_for(path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                warn!("Request to {} failed: {}", path, e);
                PortError::Network(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Network(format!("Failed to read the {} response: {}", path, e)))?;

        if !status.is_success() {
            let message = error_message(status, &body);
            warn!("{} answered {}: {}", path, status.as_u16(), message);
            return Err(match status {
                StatusCode::UNAUTHORIZED => PortError::Unauthorized(message),
                _ => PortError::Server {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| PortError::Malformed(format!("{} returned invalid JSON: {}", path, e)))
    }
}

/// Picks the human-readable message out of an error body.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
    });
    match from_json {
        Some(message) if !message.trim().is_empty() => message,
        _ if !body.trim().is_empty() && body.len() <= 200 && !body.trim_start().starts_with('{') => {
            body.trim().to_string()
        }
        _ => format!("Request failed with status {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(error_message(status, r#"{"message":"Topic too long"}"#), "Topic too long");
        assert_eq!(error_message(status, r#"{"error":"nope"}"#), "nope");
        assert_eq!(error_message(status, "plain text"), "plain text");
        assert_eq!(error_message(status, ""), "Request failed with status 400");
        assert_eq!(error_message(status, r#"{"other":1}"#), "Request failed with status 400");
    }
}
