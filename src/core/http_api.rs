use crate::core::{GenerateRequest, GenerateResponse, ImageGenerator, Result};
use crate::utils::error::GenError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tokio_util::sync::CancellationToken;

/// Generation backend reached over HTTP (`POST` JSON in, JSON out).
pub struct HttpImageGenerator {
    endpoint: String,
    client: Client,
}

impl HttpImageGenerator {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(endpoint, Client::new())
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        tracing::debug!("Making generation request to: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| if e.is_timeout() { GenError::Timeout } else { GenError::Api(e) })?;

        let status = response.status();
        tracing::debug!("Generation response status: {}", status);

        if status.is_success() {
            let body = response.bytes().await?;
            return Ok(serde_json::from_slice(&body)?);
        }

        let message = error_message(response.text().await.unwrap_or_default(), status);
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Err(GenError::Transient { message })
        } else {
            Err(GenError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Prefers a `{"message": ...}` body, then the raw body, then the status reason.
fn error_message(body: String, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string(),
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        tokio::select! {
            _ = cancel.cancelled() => Err(GenError::Aborted),
            result = self.send(request) => result,
        }
    }
}
