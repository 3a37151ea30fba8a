//! Backend response decoding
//!
//! The generation endpoint answers with a line-oriented stream: an anti-XSSI
//! prefix, length markers, and JSON arrays whose third element is itself a
//! JSON-encoded payload array. Every level is decoded defensively; anything
//! that does not have the expected shape is skipped.

use crate::{
    Result,
    types::{ConversationMetadata, GenerationResponse},
};
use serde_json::Value;

/// Anti-XSSI guard prepended to backend responses
pub const XSSI_PREFIX: &str = ")]}'";

/// Maximum number of characters of a raw body carried by a parse error
pub const EXCERPT_LIMIT: usize = 200;

const PAYLOAD_CONVERSATION: usize = 1;
const PAYLOAD_CANDIDATES: usize = 4;
const CANDIDATE_ID: usize = 0;
const CANDIDATE_PARTS: usize = 1;

/// Extract the first answer text and its conversation identifiers
pub fn parse_response(body: &str) -> Result<GenerationResponse> {
    body.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .find_map(parse_line)
        .ok_or_else(|| crate::Error::parse(body))
}

fn parse_line(line: &str) -> Option<GenerationResponse> {
    let line = line.strip_prefix(XSSI_PREFIX).unwrap_or(line).trim();
    let root: Value = serde_json::from_str(line).ok()?;
    root.as_array()?.iter().find_map(parse_item)
}

fn parse_item(item: &Value) -> Option<GenerationResponse> {
    let encoded = item.as_array().filter(|a| a.len() >= 3)?.get(2)?.as_str()?;
    let payload: Value = serde_json::from_str(encoded).ok()?;
    let payload = payload.as_array()?;

    let candidate = payload
        .get(PAYLOAD_CANDIDATES)?
        .as_array()?
        .first()?
        .as_array()?;
    let text = candidate
        .get(CANDIDATE_PARTS)?
        .as_array()?
        .first()?
        .as_str()
        .filter(|text| !text.is_empty())?;

    let mut metadata = ConversationMetadata {
        rcid: candidate
            .get(CANDIDATE_ID)
            .and_then(Value::as_str)
            .map(str::to_string),
        ..Default::default()
    };
    match payload.get(PAYLOAD_CONVERSATION) {
        Some(Value::String(cid)) => metadata.cid = Some(cid.clone()),
        Some(Value::Array(ids)) => {
            metadata.cid = ids.first().and_then(Value::as_str).map(str::to_string);
            metadata.rid = ids.get(1).and_then(Value::as_str).map(str::to_string);
        }
        _ => {}
    }

    Some(GenerationResponse {
        text: text.to_string(),
        metadata,
    })
}
