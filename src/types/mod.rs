//! Type definitions for the bridge
//!
//! Core generation types shared by the session client, plus the wire types
//! of each API dialect.

pub mod claude;
pub mod gemini;
pub mod internal;
pub mod openai;
pub mod request;
pub mod response;
pub mod serde_helpers;

pub use internal::{Message, ModelInfo, SUPPORTED_MODELS, find_model};
pub use request::{ChatOptions, DEFAULT_MODEL, GenerateOptions};
pub use response::{ConversationMetadata, GenerationResponse, HealthResponse};
