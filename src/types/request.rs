//! Request type definitions
//!
//! Options accepted by the generation client and by chat sessions.

use super::ConversationMetadata;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Model used when a caller does not name one
pub const DEFAULT_MODEL: &str = "gemini-pro";

/// Per-call options for a single generation
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Model identifier; informational for the web backend
    pub model: Option<String>,

    /// Conversation identifiers from a previous turn
    pub metadata: Option<ConversationMetadata>,

    /// Deadline for the whole call
    pub timeout: Option<Duration>,

    /// Cancels the call when fired
    pub cancellation: Option<CancellationToken>,
}

impl GenerateOptions {
    /// Create options with every field unset
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Continue an existing conversation
    pub fn with_metadata(mut self, metadata: ConversationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Bound the call by a deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Model identifier, falling back to [`DEFAULT_MODEL`]
    pub fn model_or_default(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Options fixed for the lifetime of a chat session
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Model identifier used for every turn
    pub model: Option<String>,

    /// Resume a known conversation
    pub metadata: Option<ConversationMetadata>,
}

impl ChatOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_metadata(mut self, metadata: ConversationMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}
