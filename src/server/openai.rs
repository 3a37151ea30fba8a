//! OpenAI-compatible adapter
//!
//! `GET /models` and `POST /chat/completions`, with `stream: true` served as
//! server-sent `chat.completion.chunk` events closed by `data: [DONE]`.

use crate::{
    server::{
        app::AppState,
        handlers::{run_generation, status_for},
        prompt::{build_prompt, estimate_tokens, validate_messages, validate_sampling},
        stream::{CHAT_CHUNK_DELAY, closing_frames, paced_chunks, split_into_chunks},
    },
    types::{
        DEFAULT_MODEL, GenerationResponse, Message,
        openai::{
            ChatCompletionChunk, ChatCompletionRequest, ChatCompletionResponse, Choice, ChunkChoice,
            Delta, ErrorBody, ErrorResponse, ModelData, ModelList, Usage,
        },
    },
};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use chrono::Utc;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/models", get(list_models))
        .route("/chat/completions", post(chat_completions))
}

/// Error rendered as `{error:{message, type, code}}`
#[derive(Debug)]
pub struct OpenAiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl OpenAiError {
    fn invalid(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorResponse {
                error: ErrorBody {
                    message: message.into(),
                    kind: "invalid_request_error".to_string(),
                    code: Some("invalid_request".to_string()),
                },
            },
        }
    }
}

impl From<crate::Error> for OpenAiError {
    fn from(err: crate::Error) -> Self {
        let status = status_for(&err);
        if status == StatusCode::BAD_REQUEST {
            return Self::invalid(err.to_string());
        }
        Self {
            status,
            body: ErrorResponse {
                error: ErrorBody {
                    message: format!("Generation failed: {}", err),
                    kind: "api_error".to_string(),
                    code: None,
                },
            },
        }
    }
}

impl From<JsonRejection> for OpenAiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl IntoResponse for OpenAiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// GET /models
pub async fn list_models(State(state): State<AppState>) -> Json<ModelList> {
    Json(ModelList {
        object: "list".to_string(),
        data: state
            .provider
            .list_models()
            .iter()
            .map(ModelData::from)
            .collect(),
    })
}

/// POST /chat/completions
pub async fn chat_completions(
    State(state): State<AppState>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, OpenAiError> {
    let Json(request) = payload?;
    validate_messages(&request.messages)?;
    validate_sampling(request.max_tokens, request.temperature)?;

    let prompt = build_prompt(None, &request.messages);
    let model = if request.model.is_empty() {
        DEFAULT_MODEL.to_string()
    } else {
        request.model.clone()
    };
    let response = run_generation(&state, &prompt, &model).await?;

    if request.is_stream() {
        Ok(stream_completion(response, model, state.shutdown.child_token()).into_response())
    } else {
        Ok(Json(completion(&prompt, response, model)).into_response())
    }
}

fn completion_id() -> String {
    format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
}

fn completion(prompt: &str, response: GenerationResponse, model: String) -> ChatCompletionResponse {
    let prompt_tokens = estimate_tokens(prompt);
    let completion_tokens = estimate_tokens(&response.text);
    ChatCompletionResponse {
        id: completion_id(),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model,
        choices: vec![Choice {
            index: 0,
            message: Message::assistant(response.text),
            finish_reason: "stop".to_string(),
        }],
        usage: Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        },
    }
}

fn stream_completion(
    response: GenerationResponse,
    model: String,
    cancel: CancellationToken,
) -> Sse<impl futures::Stream<Item = Result<Event, axum::Error>>> {
    let id = completion_id();
    let created = Utc::now().timestamp();
    let chunk = move |delta: Delta, finish_reason: Option<String>| ChatCompletionChunk {
        id: id.clone(),
        object: "chat.completion.chunk".to_string(),
        created,
        model: model.clone(),
        choices: vec![ChunkChoice {
            index: 0,
            delta,
            finish_reason,
        }],
    };
    let final_chunk = chunk(Delta::default(), Some("stop".to_string()));

    let pieces = paced_chunks(
        split_into_chunks(&response.text),
        CHAT_CHUNK_DELAY,
        cancel.clone(),
    )
    .enumerate()
    .map(move |(i, piece)| {
        let delta = Delta {
            role: (i == 0).then(|| "assistant".to_string()),
            content: Some(piece),
        };
        Event::default().json_data(chunk(delta, None))
    });
    let tail = closing_frames(
        vec![
            Event::default().json_data(final_chunk),
            Ok(Event::default().data("[DONE]")),
        ],
        cancel,
    );

    Sse::new(pieces.chain(tail)).keep_alive(KeepAlive::default())
}
