//! Shared HTTP handlers and helpers
//!
//! Health reporting, the error-to-status mapping used by every dialect, and
//! the generation call all adapters go through.

use crate::{
    ErrorCategory, Result,
    server::app::AppState,
    types::{GenerateOptions, GenerationResponse, HealthResponse},
};
use axum::{extract::State, http::StatusCode, response::Json};
use tracing::{debug, error, info};

/// Health endpoint
///
/// GET /health
///
/// Reports `degraded` while the provider has no usable session.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let healthy = state.provider.is_healthy().await;
    let response = HealthResponse::new(healthy, state.start_time.elapsed());
    debug!(
        "Health response: status={}, uptime={}s",
        response.status, response.server_uptime
    );
    Json(response)
}

/// HTTP status for a library error
pub fn status_for(err: &crate::Error) -> StatusCode {
    match err.category() {
        ErrorCategory::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCategory::Precondition
        | ErrorCategory::Authentication
        | ErrorCategory::Rotation => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCategory::Transport | ErrorCategory::Upstream | ErrorCategory::Parse => {
            StatusCode::BAD_GATEWAY
        }
        ErrorCategory::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorCategory::Cancelled | ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Run one generation with the configured deadline
///
/// The call is cancelled when the server shuts down.
pub async fn run_generation(
    state: &AppState,
    prompt: &str,
    model: &str,
) -> Result<GenerationResponse> {
    let options = GenerateOptions::new()
        .with_model(model)
        .with_timeout(state.settings.generation_deadline())
        .with_cancellation(state.shutdown.child_token());

    info!(
        provider = state.provider.name(),
        model,
        prompt_chars = prompt.chars().count(),
        "Generating content"
    );
    match state.provider.generate(prompt, &options).await {
        Ok(response) => Ok(response),
        Err(e) => {
            error!("Generation failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AuthFailure;
    use rstest::rstest;

    #[rstest]
    #[case(crate::Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(crate::Error::NotInitialized, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(
        crate::Error::authentication(AuthFailure::NonceNotFound),
        StatusCode::SERVICE_UNAVAILABLE
    )]
    #[case(crate::Error::rotation("status 401"), StatusCode::SERVICE_UNAVAILABLE)]
    #[case(crate::Error::Generation { status: 429 }, StatusCode::BAD_GATEWAY)]
    #[case(crate::Error::parse("garbage"), StatusCode::BAD_GATEWAY)]
    #[case(crate::Error::Timeout { seconds: 300 }, StatusCode::GATEWAY_TIMEOUT)]
    #[case(crate::Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn test_status_for(#[case] err: crate::Error, #[case] expected: StatusCode) {
        assert_eq!(status_for(&err), expected);
    }
}
