//! Internal shared types
//!
//! Conversation turns and the model catalog advertised by every dialect.

use super::serde_helpers::deserialize_flexible_content;
use serde::{Deserialize, Serialize};

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// `user`, `assistant`, `model` or `system`
    pub role: String,

    /// Turn text
    #[serde(default, deserialize_with = "deserialize_flexible_content")]
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new("system", content)
    }
}

/// Catalog entry for a model the bridge advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Model identifier
    pub id: &'static str,
    /// Human-readable name
    pub display_name: &'static str,
    /// Upstream owner
    pub owned_by: &'static str,
    /// Unix timestamp advertised as the creation time
    pub created: i64,
}

/// Models served by the web backend
pub const SUPPORTED_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "gemini-pro",
        display_name: "Gemini Pro",
        owned_by: "google",
        created: 1_702_339_200,
    },
    ModelInfo {
        id: "gemini-2.0-flash",
        display_name: "Gemini 2.0 Flash",
        owned_by: "google",
        created: 1_733_875_200,
    },
    ModelInfo {
        id: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
        owned_by: "google",
        created: 1_744_848_000,
    },
    ModelInfo {
        id: "gemini-2.5-pro",
        display_name: "Gemini 2.5 Pro",
        owned_by: "google",
        created: 1_742_860_800,
    },
];

/// Look a model up by identifier
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    SUPPORTED_MODELS.iter().find(|model| model.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_accepts_block_content() {
        let message: Message = serde_json::from_value(json!({
            "role": "user",
            "content": [{"type": "text", "text": "hi"}]
        }))
        .unwrap();
        assert_eq!(message, Message::user("hi"));
    }

    #[test]
    fn test_message_serializes_plain_content() {
        let value = serde_json::to_value(Message::assistant("ok")).unwrap();
        assert_eq!(value, json!({"role": "assistant", "content": "ok"}));
    }

    #[test]
    fn test_catalog_contains_default_model() {
        assert!(find_model(super::super::DEFAULT_MODEL).is_some());
        assert!(find_model("gpt-4").is_none());
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let mut ids: Vec<_> = SUPPORTED_MODELS.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), SUPPORTED_MODELS.len());
    }
}
