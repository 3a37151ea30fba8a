//! Google-native (`v1beta`) adapter
//!
//! `POST /models/{model}:generateContent` answers with one JSON document;
//! `POST /models/{model}:streamGenerateContent` answers with newline-delimited
//! JSON chunks, the last one carrying `finishReason: "STOP"`.

use crate::{
    server::{
        app::AppState,
        handlers::{run_generation, status_for},
        prompt::{estimate_tokens, validate_sampling},
        stream::{GEMINI_CHUNK_DELAY, closing_frames, paced_chunks, split_into_chunks},
    },
    types::{
        GenerationResponse,
        gemini::{
            Candidate, Content, ErrorBody, ErrorResponse, GenerateContentRequest,
            GenerateContentResponse, Model, ModelList, UsageMetadata,
        },
    },
};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

const GENERATE_CONTENT: &str = "generateContent";
const STREAM_GENERATE_CONTENT: &str = "streamGenerateContent";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/{model_action}", post(model_action))
}

/// Error rendered as `{error:{code, message, status}}`
#[derive(Debug)]
pub struct GoogleError {
    status: StatusCode,
    message: String,
}

impl GoogleError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn status_name(&self) -> &'static str {
        match self.status {
            StatusCode::BAD_REQUEST => "INVALID_ARGUMENT",
            StatusCode::NOT_FOUND => "NOT_FOUND",
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => "UNAVAILABLE",
            StatusCode::GATEWAY_TIMEOUT => "DEADLINE_EXCEEDED",
            _ => "INTERNAL",
        }
    }
}

impl From<crate::Error> for GoogleError {
    fn from(err: crate::Error) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl From<JsonRejection> for GoogleError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Invalid request body: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for GoogleError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.status.as_u16(),
                message: self.message.clone(),
                status: self.status_name().to_string(),
            },
        };
        (self.status, Json(body)).into_response()
    }
}

/// GET /models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(ModelList {
        models: state
            .provider
            .list_models()
            .iter()
            .map(|model| Model {
                name: format!("models/{}", model.id),
                display_name: model.display_name.to_string(),
                supported_generation_methods: vec![
                    GENERATE_CONTENT.to_string(),
                    STREAM_GENERATE_CONTENT.to_string(),
                ],
            })
            .collect(),
    })
}

/// POST /models/{model}:{action}
pub async fn model_action(
    State(state): State<AppState>,
    Path(model_action): Path<String>,
    payload: Result<Json<GenerateContentRequest>, JsonRejection>,
) -> Result<Response, GoogleError> {
    let (model, action) = model_action.split_once(':').ok_or_else(|| {
        GoogleError::new(
            StatusCode::NOT_FOUND,
            format!("Unknown method for {}", model_action),
        )
    })?;
    let model = model.strip_prefix("models/").unwrap_or(model).to_string();
    let stream = match action {
        GENERATE_CONTENT => false,
        STREAM_GENERATE_CONTENT => true,
        other => {
            return Err(GoogleError::new(
                StatusCode::NOT_FOUND,
                format!("Unknown method: {}", other),
            ));
        }
    };

    let Json(request) = payload?;
    if let Some(config) = &request.generation_config {
        validate_sampling(config.max_output_tokens, config.temperature)?;
    }
    let prompt = build_prompt(&request);
    if prompt.is_empty() {
        return Err(GoogleError::new(
            StatusCode::BAD_REQUEST,
            "contents must contain at least one text part",
        ));
    }

    let response = run_generation(&state, &prompt, &model).await?;
    let usage = usage(&prompt, &response);
    if stream {
        Ok(stream_content(response, usage, state.shutdown.child_token()))
    } else {
        Ok(Json(GenerateContentResponse {
            candidates: vec![Candidate {
                index: 0,
                content: Some(Content::model_text(response.text)),
                finish_reason: Some("STOP".to_string()),
            }],
            usage_metadata: Some(usage),
            model_version: Some(model),
        })
        .into_response())
    }
}

/// Join every text part of every content, prefixed by the system instruction
fn build_prompt(request: &GenerateContentRequest) -> String {
    let body = request
        .contents
        .iter()
        .map(Content::joined_text)
        .filter(|text| !text.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    match request
        .system_instruction
        .as_ref()
        .map(Content::joined_text)
        .filter(|s| !s.trim().is_empty())
    {
        Some(system) => format!("System: {}\n\n{}", system.trim(), body),
        None => body.to_string(),
    }
}

fn usage(prompt: &str, response: &GenerationResponse) -> UsageMetadata {
    let prompt_token_count = estimate_tokens(prompt);
    let candidates_token_count = estimate_tokens(&response.text);
    UsageMetadata {
        prompt_token_count,
        candidates_token_count,
        total_token_count: prompt_token_count + candidates_token_count,
    }
}

fn ndjson_line(chunk: &GenerateContentResponse) -> Result<String, serde_json::Error> {
    serde_json::to_string(chunk).map(|line| line + "\n")
}

fn stream_content(
    response: GenerationResponse,
    usage: UsageMetadata,
    cancel: CancellationToken,
) -> Response {
    let pieces = paced_chunks(
        split_into_chunks(&response.text),
        GEMINI_CHUNK_DELAY,
        cancel.clone(),
    )
    .map(|piece| {
        ndjson_line(&GenerateContentResponse {
            candidates: vec![Candidate {
                index: 0,
                content: Some(Content::model_text(piece)),
                finish_reason: None,
            }],
            usage_metadata: None,
            model_version: None,
        })
    });
    let last = ndjson_line(&GenerateContentResponse {
        candidates: vec![Candidate {
            index: 0,
            content: None,
            finish_reason: Some("STOP".to_string()),
        }],
        usage_metadata: Some(usage),
        model_version: None,
    });

    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(pieces.chain(closing_frames(vec![last], cancel))),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> GenerateContentRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_prompt_joins_parts_across_contents() {
        let req = request(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "first"}, {"text": "second"}]},
                {"role": "model", "parts": [{"text": "  "}]},
                {"role": "user", "parts": [{"text": "third\n"}]}
            ]
        }));
        assert_eq!(build_prompt(&req), "first\nsecond\nthird");
    }

    #[test]
    fn test_prompt_with_system_instruction() {
        let req = request(json!({
            "systemInstruction": {"parts": [{"text": "Answer in French"}]},
            "contents": [{"parts": [{"text": "Hello"}]}]
        }));
        assert_eq!(build_prompt(&req), "System: Answer in French\n\nHello");
    }

    #[test]
    fn test_prompt_without_text_is_empty() {
        let req = request(json!({
            "systemInstruction": {"parts": [{"text": "ignored"}]},
            "contents": [{"parts": [{"inlineData": {"mimeType": "image/png", "data": ""}}]}]
        }));
        assert_eq!(build_prompt(&req), "");
    }

    #[test]
    fn test_google_error_status_names() {
        assert_eq!(
            GoogleError::new(StatusCode::GATEWAY_TIMEOUT, "").status_name(),
            "DEADLINE_EXCEEDED"
        );
        assert_eq!(
            GoogleError::from(crate::Error::NotInitialized).status_name(),
            "UNAVAILABLE"
        );
    }
}
