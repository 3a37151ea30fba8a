//! Response type definitions
//!
//! Results of a generation call and the health report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Identifiers that let the backend continue a conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    /// Conversation id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// Response id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,

    /// Candidate id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rcid: Option<String>,
}

impl ConversationMetadata {
    /// True when no identifier is known
    pub fn is_empty(&self) -> bool {
        self.cid.is_none() && self.rid.is_none() && self.rcid.is_none()
    }

    /// Envelope slot value: `[cid, rid, rcid]` or `null`
    pub fn to_envelope(&self) -> Value {
        if self.is_empty() {
            return Value::Null;
        }
        json!([
            self.cid.as_deref().unwrap_or_default(),
            self.rid.as_deref().unwrap_or_default(),
            self.rcid.as_deref().unwrap_or_default(),
        ])
    }
}

/// Answer produced by one generation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Answer text, never empty
    pub text: String,

    /// Identifiers to continue the conversation
    pub metadata: ConversationMetadata,
}

impl GenerationResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: ConversationMetadata::default(),
        }
    }
}

/// Health report served at `/health`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: String,

    /// Service name
    pub service: String,

    /// Server version
    pub version: String,

    /// Server uptime in seconds
    pub server_uptime: u64,

    /// Time the report was produced
    pub timestamp: DateTime<Utc>,
}

impl HealthResponse {
    /// Create a health report; `healthy` selects the status string
    pub fn new(healthy: bool, uptime: std::time::Duration) -> Self {
        Self {
            status: if healthy { "ok" } else { "degraded" }.to_string(),
            service: "gemini-web-bridge".to_string(),
            version: crate::utils::version::get_version().to_string(),
            server_uptime: uptime.as_secs(),
            timestamp: Utc::now(),
        }
    }
}
