//! services/classroom/src/adapters/backend.rs
//!
//! This module contains the adapter for the classroom backend (preprocessing
//! and session tokens). It implements the `ClassroomBackend` port from the
//! `core` crate over HTTP.

use async_trait::async_trait;
use classroom_core::{
    domain::{PreprocessResult, SessionCredential},
    ports::{ClassroomBackend, PortError, PortResult},
    session_config::SessionConfig,
};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(2);

//=========================================================================================
// Response Payloads
//=========================================================================================

#[derive(Deserialize)]
struct TokenResponse {
    client_secret: Option<ClientSecret>,
}

#[derive(Deserialize)]
struct ClientSecret {
    value: Option<String>,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ClassroomBackend` against the HTTP backend.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    /// Creates a new `HttpBackend` for a known base URL.
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Picks the local backend when its `/ping` answers OK, the remote one otherwise.
    pub async fn discover(
        client: reqwest::Client,
        local_url: &str,
        remote_url: Option<&str>,
    ) -> PortResult<Self> {
        let local = Self::new(client.clone(), local_url);
        match local.ping().await {
            Ok(()) => {
                info!("Local backend at {} is active", local.base_url);
                Ok(local)
            }
            Err(e) => {
                let remote = remote_url.ok_or_else(|| {
                    PortError::Unavailable(format!(
                        "local backend unreachable ({}) and no remote backend configured",
                        e
                    ))
                })?;
                warn!("Local backend not available ({}), using {}", e, remote);
                Ok(Self::new(client, remote))
            }
        }
    }

    /// Liveness check.
    pub async fn ping(&self) -> PortResult<()> {
        self.client
            .get(format!("{}/ping", self.base_url))
            .timeout(PING_TIMEOUT)
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(map_reqwest_error)?;
        Ok(())
    }
}

/// Maps transport failures to port errors, keeping decode problems apart.
pub(crate) fn map_reqwest_error(e: reqwest::Error) -> PortError {
    if e.is_decode() {
        PortError::InvalidResponse(e.to_string())
    } else if e.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
        || e.status() == Some(reqwest::StatusCode::FORBIDDEN)
    {
        PortError::PermissionDenied(e.to_string())
    } else {
        PortError::Unavailable(e.to_string())
    }
}

//=========================================================================================
// `ClassroomBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl ClassroomBackend for HttpBackend {
    async fn preprocess(&self, youtube_link: &str) -> PortResult<PreprocessResult> {
        info!("Preprocessing video link: {}", youtube_link);
        let response = self
            .client
            .post(format!("{}/preprocess", self.base_url))
            .json(&json!({ "youtube_link": youtube_link }))
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(map_reqwest_error)?;

        let result: PreprocessResult = response.json().await.map_err(map_reqwest_error)?;
        info!("Preprocessing returned {} checkpoints", result.checkpoints.len());
        Ok(result)
    }

    async fn session_token(&self, config: &SessionConfig) -> PortResult<SessionCredential> {
        let response = self
            .client
            .post(format!("{}/session-token", self.base_url))
            .json(&config.token_request())
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(map_reqwest_error)?;

        let token: TokenResponse = response.json().await.map_err(map_reqwest_error)?;
        token
            .client_secret
            .and_then(|secret| secret.value)
            .filter(|value| !value.is_empty())
            .map(SessionCredential::new)
            .ok_or_else(|| {
                PortError::InvalidResponse("Missing client_secret in response".to_string())
            })
    }
}
