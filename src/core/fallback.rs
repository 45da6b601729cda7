use crate::core::{GenerateRequest, GenerateResponse, ImageGenerator, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(10);

/// Tries `primary` under a deadline and hands the request to `fallback`
/// when the deadline passes. Every other primary outcome is returned as is.
pub struct FallbackGenerator<P, F> {
    primary: P,
    fallback: F,
    timeout: Duration,
}

impl<P: ImageGenerator, F: ImageGenerator> FallbackGenerator<P, F> {
    pub fn new(primary: P, fallback: F) -> Self {
        Self::with_timeout(primary, fallback, DEFAULT_PRIMARY_TIMEOUT)
    }

    pub fn with_timeout(primary: P, fallback: F, timeout: Duration) -> Self {
        Self {
            primary,
            fallback,
            timeout,
        }
    }
}

#[async_trait]
impl<P: ImageGenerator, F: ImageGenerator> ImageGenerator for FallbackGenerator<P, F> {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        match tokio::time::timeout(self.timeout, self.primary.generate(request, cancel)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    "⏱️ Primary backend exceeded {:?}, using simulated generation",
                    self.timeout
                );
                self.fallback.generate(request, cancel).await
            }
        }
    }
}
