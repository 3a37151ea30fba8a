//! Common test utilities and helpers
//!
//! A wiremock stand-in for the web backend and a scripted provider for
//! router tests.

#![allow(dead_code)]

/// Fake web backend
pub mod backend {
    use gemini_web_bridge::config::Settings;
    use serde_json::{Value, json};
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    pub const WARM_UP_PATH: &str = "/";
    pub const INIT_PATH: &str = "/app";
    pub const GENERATE_PATH: &str = "/generate";
    pub const ROTATE_PATH: &str = "/RotateCookies";

    /// Settings pointing every backend endpoint at `server`
    pub fn settings_for(server: &MockServer, psid: &str, psidts: &str) -> Settings {
        let mut settings = Settings::default();
        settings.gemini.secure_1psid = psid.to_string();
        settings.gemini.secure_1psidts = psidts.to_string();
        settings.gemini.auto_refresh = false;
        settings.backend.google_url = format!("{}{}", server.uri(), WARM_UP_PATH);
        settings.backend.init_url = format!("{}{}", server.uri(), INIT_PATH);
        settings.backend.generate_url = format!("{}{}", server.uri(), GENERATE_PATH);
        settings.backend.rotate_url = format!("{}{}", server.uri(), ROTATE_PATH);
        settings
    }

    /// Landing page embedding `nonce`
    pub fn landing_page(nonce: &str) -> String {
        format!(
            r#"<html><script>window.WIZ_global_data = {{"SNlM0e":"{nonce}","cfb2h":"boq"}};</script></html>"#
        )
    }

    /// Streamed generation body carrying one payload
    pub fn generation_body(payload: Value) -> String {
        let line = json!([["wrb.fr", null, payload.to_string()]]).to_string();
        format!(")]}}'\n\n{}\n{}\n", line.len(), line)
    }

    /// Payload with an answer and conversation identifiers
    pub fn answer_payload(text: &str, cid: &str, rid: &str, rcid: &str) -> Value {
        json!([null, [cid, rid], null, null, [[rcid, [text]]]])
    }

    pub async fn mount_warm_up(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path(WARM_UP_PATH))
            .respond_with(
                ResponseTemplate::new(200).append_header("set-cookie", "NID=warm; Path=/"),
            )
            .mount(server)
            .await;
    }

    pub async fn mount_landing(server: &MockServer, body: String) {
        Mock::given(method("GET"))
            .and(path(INIT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_rotation(server: &MockServer, psidts: &str) {
        Mock::given(method("POST"))
            .and(path(ROTATE_PATH))
            .respond_with(ResponseTemplate::new(200).append_header(
                "set-cookie",
                format!("__Secure-1PSIDTS={psidts}; Path=/; Secure").as_str(),
            ))
            .mount(server)
            .await;
    }

    pub async fn mount_generation(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .respond_with(template)
            .mount(server)
            .await;
    }

    /// Requests the backend received on `request_path`
    pub async fn requests_to(server: &MockServer, request_path: &str) -> Vec<wiremock::Request> {
        server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|request| request.url.path() == request_path)
            .collect()
    }
}

/// Provider double for router tests
pub mod scripted {
    use async_trait::async_trait;
    use gemini_web_bridge::{
        Result,
        session::Provider,
        types::{GenerateOptions, GenerationResponse, ModelInfo, SUPPORTED_MODELS},
    };
    use std::sync::Mutex;

    /// Answers every prompt with the same outcome and records prompts
    #[derive(Debug)]
    pub struct ScriptedProvider {
        outcome: Outcome,
        healthy: bool,
        prompts: Mutex<Vec<String>>,
    }

    #[derive(Debug)]
    enum Outcome {
        Answer(String),
        NotInitialized,
        Upstream(u16),
    }

    impl ScriptedProvider {
        pub fn answering(text: &str) -> Self {
            Self {
                outcome: Outcome::Answer(text.to_string()),
                healthy: true,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn uninitialized() -> Self {
            Self {
                outcome: Outcome::NotInitialized,
                healthy: false,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_upstream(status: u16) -> Self {
            Self {
                outcome: Outcome::Upstream(status),
                healthy: true,
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            prompt: &str,
            _options: &GenerateOptions,
        ) -> Result<GenerationResponse> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.outcome {
                Outcome::Answer(text) => Ok(GenerationResponse::new(text.clone())),
                Outcome::NotInitialized => Err(gemini_web_bridge::Error::NotInitialized),
                Outcome::Upstream(status) => {
                    Err(gemini_web_bridge::Error::Generation { status: *status })
                }
            }
        }

        async fn is_healthy(&self) -> bool {
            self.healthy
        }

        fn list_models(&self) -> Vec<ModelInfo> {
            SUPPORTED_MODELS.to_vec()
        }
    }
}
