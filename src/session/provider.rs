//! Provider seam between the generation client and its consumers
//!
//! The HTTP adapters and chat sessions only see this trait, so they can be
//! driven by a scripted provider in tests.

use crate::{
    Result,
    types::{GenerateOptions, GenerationResponse, ModelInfo},
};
use async_trait::async_trait;

/// A text generation backend
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Short provider name used in logs
    fn name(&self) -> &str;

    /// Generate one answer for `prompt`
    async fn generate(&self, prompt: &str, options: &GenerateOptions)
    -> Result<GenerationResponse>;

    /// Whether the provider currently holds a usable session
    async fn is_healthy(&self) -> bool;

    /// Models the provider advertises
    fn list_models(&self) -> Vec<ModelInfo>;
}
