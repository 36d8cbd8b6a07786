//! services/classroom/src/adapters/sdp.rs
//!
//! Offer/answer exchange with the realtime service for peer-connection
//! transports.

use crate::adapters::backend::map_reqwest_error;
use classroom_core::{
    domain::SessionCredential,
    ports::{PortError, PortResult},
};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

#[derive(Clone)]
pub struct SdpNegotiator {
    client: reqwest::Client,
    url: String,
}

impl SdpNegotiator {
    pub fn new(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Posts the local SDP offer and returns the remote SDP answer.
    pub async fn negotiate(
        &self,
        offer: &str,
        model: &str,
        credential: &SessionCredential,
    ) -> PortResult<String> {
        debug!("Sending SDP offer ({} bytes) for model {}", offer.len(), model);
        let answer = self
            .client
            .post(&self.url)
            .query(&[("model", model)])
            .header(AUTHORIZATION, format!("Bearer {}", credential.expose()))
            .header(CONTENT_TYPE, "application/sdp")
            .body(offer.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?
            .error_for_status()
            .map_err(map_reqwest_error)?
            .text()
            .await
            .map_err(map_reqwest_error)?;

        if answer.trim().is_empty() {
            return Err(PortError::InvalidResponse("empty SDP answer".to_string()));
        }
        Ok(answer)
    }
}
