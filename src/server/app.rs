//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::{config::Settings, session::Provider};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Generation backend
    pub provider: Arc<dyn Provider>,
    /// Application settings
    pub settings: Arc<Settings>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
    /// Fired on shutdown; in-flight generations and streams stop early
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(provider: Arc<dyn Provider>, settings: Settings) -> Self {
        Self {
            provider,
            settings: Arc::new(settings),
            start_time: std::time::Instant::now(),
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the main Axum application with routes and middleware
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(super::handlers::health))
        .nest("/gemini/v1beta", super::gemini::routes())
        .nest("/openai/v1", super::openai::routes())
        .nest("/claude/v1", super::claude::routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GenerateOptions, GenerationResponse, ModelInfo};
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[derive(Debug)]
    struct IdleProvider;

    #[async_trait]
    impl Provider for IdleProvider {
        fn name(&self) -> &str {
            "idle"
        }

        async fn generate(
            &self,
            _prompt: &str,
            _options: &GenerateOptions,
        ) -> crate::Result<GenerationResponse> {
            Err(crate::Error::NotInitialized)
        }

        async fn is_healthy(&self) -> bool {
            false
        }

        fn list_models(&self) -> Vec<ModelInfo> {
            Vec::new()
        }
    }

    fn app() -> Router {
        create_app(AppState::new(Arc::new(IdleProvider), Settings::default()))
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_not_found() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/unknown").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
