use crate::domain::model::{GenerateRequest, GenerateResponse};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A backend that turns a request into a finished generation.
///
/// Implementations must watch `cancel` while the call is in flight and
/// return [`GenError::Aborted`](crate::utils::error::GenError::Aborted) once it fires.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse>;
}

#[async_trait]
impl<G: ImageGenerator + ?Sized> ImageGenerator for Arc<G> {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        (**self).generate(request, cancel).await
    }
}

#[async_trait]
impl<G: ImageGenerator + ?Sized> ImageGenerator for Box<G> {
    async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerateResponse> {
        (**self).generate(request, cancel).await
    }
}
