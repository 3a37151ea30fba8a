//! Anthropic-compatible adapter
//!
//! Serves the Messages API surface: model listing and lookup, `messages`
//! (plain or streamed as typed server-sent events) and `count_tokens`.

use crate::{
    server::{
        app::AppState,
        handlers::{run_generation, status_for},
        prompt::{build_prompt, estimate_tokens, validate_messages, validate_sampling},
        stream::{CHAT_CHUNK_DELAY, closing_frames, paced_chunks, split_into_chunks},
    },
    types::{
        DEFAULT_MODEL, GenerationResponse,
        claude::{
            ContentBlock, CountTokensResponse, DeltaUsage, ErrorBody, ErrorResponse,
            MessageDelta, MessageRequest, MessageResponse, ModelData, ModelList, StreamEvent,
            TextDelta, Usage,
        },
    },
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use futures::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

/// Model identifiers advertised to Anthropic clients: (id, display name, created_at)
const CLAUDE_MODELS: &[(&str, &str, i64)] = &[
    ("claude-3-5-sonnet-20240620", "Claude 3.5 Sonnet", 1_718_841_600),
    ("claude-3-opus-20240229", "Claude 3 Opus", 1_709_164_800),
    ("claude-3-7-sonnet-20250219", "Claude 3.7 Sonnet", 1_739_923_200),
];

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/models/{model_id}", get(get_model))
        .route("/messages", post(messages))
        .route("/messages/count_tokens", post(count_tokens))
}

/// Error rendered as `{type:"error", error:{type, message}}`
#[derive(Debug)]
pub struct ClaudeError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ClaudeError {
    fn new(status: StatusCode, kind: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorResponse {
                kind: "error".to_string(),
                error: ErrorBody {
                    kind: kind.to_string(),
                    message: message.into(),
                },
            },
        }
    }
}

impl From<crate::Error> for ClaudeError {
    fn from(err: crate::Error) -> Self {
        let status = status_for(&err);
        let kind = match status {
            StatusCode::BAD_REQUEST => "invalid_request_error",
            StatusCode::SERVICE_UNAVAILABLE => "overloaded_error",
            _ => "api_error",
        };
        Self::new(status, kind, err.to_string())
    }
}

impl From<JsonRejection> for ClaudeError {
    fn from(rejection: JsonRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "invalid_request_error",
            format!("Invalid JSON body: {}", rejection.body_text()),
        )
    }
}

impl IntoResponse for ClaudeError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn model_data(id: &str, display_name: &str, created_at: i64) -> ModelData {
    ModelData {
        id: id.to_string(),
        kind: "model".to_string(),
        created_at,
        display_name: display_name.to_string(),
    }
}

/// GET /models
pub async fn list_models() -> Json<ModelList> {
    let data: Vec<ModelData> = CLAUDE_MODELS
        .iter()
        .map(|(id, name, created)| model_data(id, name, *created))
        .collect();
    Json(ModelList {
        first_id: data.first().map(|m| m.id.clone()),
        last_id: data.last().map(|m| m.id.clone()),
        has_more: false,
        data,
    })
}

/// GET /models/{model_id}
///
/// Unknown identifiers are echoed back so any model name a client sends
/// resolves.
pub async fn get_model(Path(model_id): Path<String>) -> Json<ModelData> {
    let data = CLAUDE_MODELS
        .iter()
        .find(|(id, _, _)| *id == model_id)
        .map(|(id, name, created)| model_data(id, name, *created))
        .unwrap_or_else(|| model_data(&model_id, &model_id, Utc::now().timestamp()));
    Json(data)
}

/// POST /messages/count_tokens
pub async fn count_tokens(
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Json<CountTokensResponse>, ClaudeError> {
    let Json(request) = payload?;
    let prompt = build_prompt(Some(&request.system), &request.messages);
    Ok(Json(CountTokensResponse {
        input_tokens: estimate_tokens(&prompt),
    }))
}

/// POST /messages
pub async fn messages(
    State(state): State<AppState>,
    payload: Result<Json<MessageRequest>, JsonRejection>,
) -> Result<Response, ClaudeError> {
    let Json(request) = payload?;
    validate_messages(&request.messages)?;
    validate_sampling(request.max_tokens, request.temperature)?;

    let prompt = build_prompt(Some(&request.system), &request.messages);
    let model = if request.model.is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        request.model.clone()
    };
    let response = run_generation(&state, &prompt, &model).await?;
    let input_tokens = estimate_tokens(&prompt);

    if request.is_stream() {
        Ok(stream_message(response, model, input_tokens, state.shutdown.child_token()).into_response())
    } else {
        Ok(Json(message(response, model, input_tokens)).into_response())
    }
}

fn message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4())
}

fn message(response: GenerationResponse, model: String, input_tokens: u64) -> MessageResponse {
    let output_tokens = estimate_tokens(&response.text);
    MessageResponse {
        id: message_id(),
        kind: "message".to_string(),
        role: "assistant".to_string(),
        model,
        content: vec![ContentBlock::text(response.text)],
        stop_reason: Some("end_turn".to_string()),
        stop_sequence: None,
        usage: Usage {
            input_tokens,
            output_tokens,
        },
    }
}

fn sse_event(event: StreamEvent) -> Result<Event, axum::Error> {
    Event::default().event(event.name()).json_data(&event)
}

fn stream_message(
    response: GenerationResponse,
    model: String,
    input_tokens: u64,
    cancel: CancellationToken,
) -> Sse<impl futures::Stream<Item = Result<Event, axum::Error>>> {
    let output_tokens = estimate_tokens(&response.text);
    let head = [
        StreamEvent::MessageStart {
            message: MessageResponse {
                id: message_id(),
                kind: "message".to_string(),
                role: "assistant".to_string(),
                model,
                content: Vec::new(),
                stop_reason: None,
                stop_sequence: None,
                usage: Usage {
                    input_tokens,
                    output_tokens: 0,
                },
            },
        },
        StreamEvent::ContentBlockStart {
            index: 0,
            content_block: ContentBlock::text(""),
        },
    ];
    let tail = vec![
        StreamEvent::ContentBlockStop { index: 0 },
        StreamEvent::MessageDelta {
            delta: MessageDelta {
                stop_reason: Some("end_turn".to_string()),
                stop_sequence: None,
            },
            usage: DeltaUsage { output_tokens },
        },
        StreamEvent::MessageStop,
    ];

    let deltas = paced_chunks(
        split_into_chunks(&response.text),
        CHAT_CHUNK_DELAY,
        cancel.clone(),
    )
    .map(|piece| StreamEvent::ContentBlockDelta {
        index: 0,
        delta: TextDelta {
            kind: "text_delta".to_string(),
            text: piece,
        },
    });

    let events = stream::iter(head)
        .chain(deltas)
        .chain(closing_frames(tail, cancel))
        .map(sse_event);
    Sse::new(events).keep_alive(KeepAlive::default())
}
