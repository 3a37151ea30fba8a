//! Prompt assembly and request validation shared by the dialect adapters

use crate::{Result, types::Message};

/// Upper bound accepted for `temperature`
pub const MAX_TEMPERATURE: f64 = 2.0;

/// Label used for a message role in the flattened prompt
pub fn role_label(role: &str) -> &'static str {
    if role.eq_ignore_ascii_case("assistant") || role.eq_ignore_ascii_case("model") {
        "Model"
    } else if role.eq_ignore_ascii_case("system") {
        "System"
    } else {
        "User"
    }
}

/// Flatten a conversation into one prompt
///
/// A non-blank system prompt becomes a `System: ...` paragraph, followed by
/// one `Role: content` line per message.
pub fn build_prompt(system: Option<&str>, messages: &[Message]) -> String {
    let mut prompt = String::new();
    if let Some(system) = system.map(str::trim).filter(|s| !s.is_empty()) {
        prompt.push_str(&format!("System: {}\n\n", system));
    }
    for message in messages {
        prompt.push_str(&format!(
            "{}: {}\n",
            role_label(&message.role),
            message.content
        ));
    }
    prompt.trim().to_string()
}

/// Reject an empty conversation
pub fn validate_messages(messages: &[Message]) -> Result<()> {
    if messages.is_empty() {
        return Err(crate::Error::invalid_request(
            "messages array cannot be empty",
        ));
    }
    if messages.iter().all(|m| m.content.trim().is_empty()) {
        return Err(crate::Error::invalid_request(
            "messages must contain non-empty content",
        ));
    }
    Ok(())
}

/// Reject out-of-range sampling parameters
pub fn validate_sampling(max_tokens: Option<i64>, temperature: Option<f64>) -> Result<()> {
    if let Some(max_tokens) = max_tokens
        && max_tokens < 0
    {
        return Err(crate::Error::invalid_request(
            "max_tokens must be non-negative",
        ));
    }
    if let Some(temperature) = temperature
        && !(0.0..=MAX_TEMPERATURE).contains(&temperature)
    {
        return Err(crate::Error::invalid_request(format!(
            "temperature must be between 0 and {}",
            MAX_TEMPERATURE
        )));
    }
    Ok(())
}

/// Rough token count: four characters per token
pub fn estimate_tokens(text: &str) -> u64 {
    (text.chars().count() / 4) as u64
}
