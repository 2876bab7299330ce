#[cfg(test)]
#[path = "backend_test.rs"]
mod tests;

use anyhow::Result;
use async_trait::async_trait;

use super::AspectRatio;
use super::GenerationError;
use super::ImageBlob;
use super::Mode;

/// Everything a backend needs for one generation attempt. Prompt
/// composition and calling-convention selection happen behind the trait.
#[derive(Clone, Debug)]
pub struct GenerationRequest {
    pub prompt: String,
    pub mode: Mode,
    pub create_function: String,
    pub edit_function: String,
    pub image1: Option<ImageBlob>,
    pub image2: Option<ImageBlob>,
    pub aspect_ratio: AspectRatio,
}

impl GenerationRequest {
    pub fn active_function(&self) -> &str {
        if self.mode == Mode::Create {
            return &self.create_function;
        }
        return &self.edit_function;
    }

    /// Edits always condition on an image; creations do as soon as a
    /// reference image is attached.
    pub fn is_image_conditioned(&self) -> bool {
        return self.mode == Mode::Edit || self.image1.is_some();
    }
}

/// A successful generation: a displayable data URL plus the raw payload.
#[derive(Clone, Debug)]
pub struct GeneratedPayload {
    pub url: String,
    pub blob: ImageBlob,
}

pub type BackendBox = Box<dyn Backend + Send + Sync>;

#[async_trait]
pub trait Backend {
    /// Used at startup to verify all configurations are available to work
    /// with the backend.
    async fn health_check(&self) -> Result<()>;

    /// Performs exactly one generation attempt and returns either a usable
    /// image or a classified failure. Backends never retry on their own;
    /// retries are always user-initiated.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedPayload, GenerationError>;
}
