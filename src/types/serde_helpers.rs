//! Custom serde deserializers for lenient client payloads
//!
//! SDKs of the three dialects disagree on how they encode a few fields;
//! these helpers accept every shape seen in practice.

use serde::{Deserialize, Deserializer, de};

/// Deserialize a `stream`-style flag sent as a JSON boolean, an integer
/// (`0`/`1`) or a string (`"true"`, `"false"`, `"0"`, `"1"`, any case)
///
/// Other strings are rejected so a typo never silently turns streaming off.
pub fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleBool {
        Bool(bool),
        Int(i64),
        String(String),
    }

    match Option::<FlexibleBool>::deserialize(deserializer)? {
        None => Ok(None),
        Some(FlexibleBool::Bool(b)) => Ok(Some(b)),
        Some(FlexibleBool::Int(i)) => Ok(Some(i > 0)),
        Some(FlexibleBool::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(de::Error::custom(format!("invalid boolean string: {}", s))),
        },
    }
}

/// Deserialize message content sent either as a plain string or as an
/// array of typed blocks
///
/// Text blocks (`{"type":"text","text":"..."}`) are joined with newlines;
/// every other block type is ignored. `null` reads as an empty string.
pub fn deserialize_flexible_content<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Block {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        text: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleContent {
        Text(String),
        Blocks(Vec<Block>),
    }

    Ok(match Option::<FlexibleContent>::deserialize(deserializer)? {
        None => String::new(),
        Some(FlexibleContent::Text(text)) => text,
        Some(FlexibleContent::Blocks(blocks)) => blocks
            .into_iter()
            .filter(|block| block.kind.as_deref().is_none_or(|kind| kind == "text"))
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n"),
    })
}
