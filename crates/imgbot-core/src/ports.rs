use async_trait::async_trait;

use crate::{
    generation::{GenerationRequest, GenerationResponse},
    Result,
};

/// Hexagonal port for the remote image generation service.
///
/// One call per request; implementations must not retry on their own.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, req: &GenerationRequest) -> Result<GenerationResponse>;
}

/// Downloads a generated image so it can be uploaded to the chat as a binary payload.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
