//! # Gemini Web Client
//!
//! The [`GeminiClient`] drives a cookie-authenticated web session:
//! - reconciles configured secrets with the on-disk cache
//! - performs the handshake that yields the session nonce
//! - keeps the rotating cookie fresh on a schedule
//! - builds the nested request envelope and parses the answer
//!
//! ## Locking
//!
//! Three independent locks keep unrelated work from blocking each other:
//! the credential mutex (shared with the rotation loop), the session
//! read/write lock guarding the nonce and health flag, and a generation gate
//! held for the full round trip of each generation call. The rotation loop
//! never touches the generation gate.
//!
//! ## Example
//!
//! ```rust,no_run
//! use gemini_web_bridge::config::Settings;
//! use gemini_web_bridge::session::GeminiClient;
//! use gemini_web_bridge::types::GenerateOptions;
//!
//! # tokio_test::block_on(async {
//! let mut settings = Settings::default();
//! settings.gemini.secure_1psid = "cookie-value".to_string();
//!
//! let client = GeminiClient::new(&settings)?;
//! client.init().await?;
//!
//! let answer = client.generate("Hello", &GenerateOptions::new()).await?;
//! println!("{}", answer.text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use crate::{
    Result,
    config::Settings,
    session::{
        cache::{CredentialCache, FileCredentialCache},
        chat::ChatSession,
        credentials::{CredentialSet, CredentialStatus, PSID_COOKIE, PSIDTS_COOKIE},
        handshake::HandshakeEngine,
        parser::parse_response,
        provider::Provider,
        rotation::{RotationEngine, RotationTask},
    },
    types::{
        ChatOptions, ConversationMetadata, GenerateOptions, GenerationResponse, ModelInfo,
        SUPPORTED_MODELS,
    },
};
use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Nonce, health and ambient cookies of the current web session
#[derive(Default)]
struct SessionState {
    nonce: String,
    healthy: bool,
    ambient_cookies: BTreeMap<String, String>,
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("nonce", &crate::config::settings::redact(&self.nonce))
            .field("healthy", &self.healthy)
            .field("ambient_cookies", &self.ambient_cookies.len())
            .finish()
    }
}

/// Client for the cookie-authenticated Gemini web backend
#[derive(Debug)]
pub struct GeminiClient {
    /// Configuration settings
    settings: Arc<Settings>,
    /// HTTP client for generation requests
    http: Client,
    /// Session secrets, shared with the rotation loop
    credentials: Arc<Mutex<CredentialSet>>,
    /// Current session nonce and health
    session: RwLock<SessionState>,
    /// Serializes generation round trips
    request_gate: Mutex<()>,
    handshake: HandshakeEngine,
    rotation: RotationEngine,
    cache: Arc<dyn CredentialCache>,
    /// Scheduled rotation loop, started after the first successful handshake
    rotation_task: std::sync::Mutex<Option<RotationTask>>,
    /// Fired by [`GeminiClient::close`]
    shutdown: CancellationToken,
}

impl GeminiClient {
    /// Create a client using the file cache from `settings`
    ///
    /// Fails with a configuration error when no `__Secure-1PSID` is
    /// configured.
    pub fn new(settings: &Settings) -> Result<Self> {
        let cache = Arc::new(FileCredentialCache::new(settings.cookie_cache_dir()));
        Self::with_cache(settings.clone(), cache)
    }

    /// Create a client with a custom credential cache
    pub fn with_cache(settings: Settings, cache: Arc<dyn CredentialCache>) -> Result<Self> {
        let credentials = CredentialSet::from_settings(&settings.gemini)?;

        let http = Client::builder()
            .user_agent(settings.backend.user_agent.as_str())
            .build()
            .map_err(|e| crate::Error::config(format!("Failed to create HTTP client: {}", e)))?;

        let handshake = HandshakeEngine::new(http.clone(), &settings.backend);
        let rotation = RotationEngine::new(http.clone(), &settings.backend, cache.clone());

        Ok(Self {
            settings: Arc::new(settings),
            http,
            credentials: Arc::new(Mutex::new(credentials)),
            session: RwLock::new(SessionState::default()),
            request_gate: Mutex::new(()),
            handshake,
            rotation,
            cache,
            rotation_task: std::sync::Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    /// Establish the web session
    ///
    /// 1. Reconcile the configured rotating cookie with the cache
    /// 2. Obtain a rotating cookie first when only `__Secure-1PSID` is known
    /// 3. Handshake, with one rotation and one retry on failure
    /// 4. Start scheduled rotation
    pub async fn init(&self) -> Result<()> {
        self.reconcile_cache().await;

        {
            let mut credentials = self.credentials.lock().await;
            if credentials.needs_rotation() {
                info!(
                    "Only {} provided, obtaining {} via rotation",
                    PSID_COOKIE, PSIDTS_COOKIE
                );
                match self.rotation.rotate(&mut credentials).await {
                    Ok(()) => info!("Obtained {} via rotation", PSIDTS_COOKIE),
                    Err(e) => info!("Initial rotation failed, continuing: {}", e),
                }
            }
        }

        self.handshake_with_recovery().await?;
        self.start_scheduled_rotation();
        info!("Gemini client initialized");
        Ok(())
    }

    /// Re-run the handshake to obtain a fresh nonce
    ///
    /// Nonce staleness is not detected automatically; callers invoke this
    /// when generation starts failing.
    pub async fn refresh_session(&self) -> Result<()> {
        self.handshake_with_recovery().await?;
        self.start_scheduled_rotation();
        Ok(())
    }

    /// Rotate the rotating cookie now
    pub async fn rotate_cookies(&self) -> Result<()> {
        let mut credentials = self.credentials.lock().await;
        self.rotation.rotate(&mut credentials).await
    }

    /// Redacted view of the current credentials
    pub async fn credentials(&self) -> CredentialStatus {
        self.credentials.lock().await.status()
    }

    /// Whether the last handshake succeeded and the client is open
    pub async fn is_healthy(&self) -> bool {
        self.session.read().await.healthy
    }

    /// Whether the scheduled rotation loop is running
    pub fn is_rotation_scheduled(&self) -> bool {
        lock_task_slot(&self.rotation_task)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn list_models(&self) -> Vec<ModelInfo> {
        SUPPORTED_MODELS.to_vec()
    }

    /// Generate one answer
    ///
    /// Honors `options.timeout` (→ [`crate::Error::Timeout`]) and
    /// `options.cancellation` (→ [`crate::Error::Cancelled`]).
    pub async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerationResponse> {
        let call = async {
            match options.timeout {
                Some(limit) => {
                    match tokio::time::timeout(limit, self.generate_once(prompt, options)).await {
                        Ok(result) => result,
                        Err(_) => Err(crate::Error::Timeout {
                            seconds: limit.as_secs(),
                        }),
                    }
                }
                None => self.generate_once(prompt, options).await,
            }
        };

        match &options.cancellation {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => Err(crate::Error::Cancelled),
                result = call => result,
            },
            None => call.await,
        }
    }

    /// Start a chat session bound to this client
    pub fn start_chat(self: &Arc<Self>, options: ChatOptions) -> ChatSession {
        let provider: Arc<dyn Provider> = self.clone();
        ChatSession::new(provider, options)
    }

    /// Stop scheduled rotation and mark the client unhealthy
    pub async fn close(&self) {
        self.shutdown.cancel();
        let task = lock_task_slot(&self.rotation_task).take();
        if let Some(task) = task {
            task.shutdown().await;
        }
        self.session.write().await.healthy = false;
        info!("Gemini client closed");
    }

    async fn generate_once(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerationResponse> {
        let _gate = self.request_gate.lock().await;

        let (nonce, ambient_cookies) = {
            let session = self.session.read().await;
            if session.nonce.is_empty() {
                return Err(crate::Error::NotInitialized);
            }
            (session.nonce.clone(), session.ambient_cookies.clone())
        };
        let cookie = self
            .credentials
            .lock()
            .await
            .cookie_header_with(&ambient_cookies);
        let envelope = build_envelope(prompt, options.metadata.as_ref())?;

        debug!(
            model = options.model_or_default(),
            prompt_chars = prompt.chars().count(),
            "Sending generation request"
        );
        let response = self
            .http
            .post(&self.settings.backend.generate_url)
            .query(&[("at", nonce.as_str())])
            .headers(generation_headers())
            .header(header::COOKIE, cookie)
            .form(&[("at", nonce.as_str()), ("f.req", envelope.as_str())])
            .timeout(self.settings.backend.generation_timeout())
            .send()
            .await
            .map_err(crate::Error::transport)?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Generation request failed with status {}", status.as_u16());
            return Err(crate::Error::Generation {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(crate::Error::transport)?;
        let parsed = parse_response(&body)?;
        debug!(
            answer_chars = parsed.text.chars().count(),
            "Generation succeeded"
        );
        Ok(parsed)
    }

    /// Apply the cached rotating cookie, or drop a cache that conflicts with
    /// the configured one
    async fn reconcile_cache(&self) {
        let mut credentials = self.credentials.lock().await;
        match self.cache.load(credentials.long_lived()) {
            Ok(Some(cached)) if credentials.rotating().is_empty() => {
                credentials.set_rotating(&cached);
                info!("Loaded {} from cache", PSIDTS_COOKIE);
            }
            Ok(Some(cached)) if cached != credentials.rotating() => {
                info!("Configured {} differs from cache, clearing cache", PSIDTS_COOKIE);
                if let Err(e) = self.cache.clear(credentials.long_lived()) {
                    warn!("Failed to clear cookie cache: {}", e);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Failed to read cookie cache: {}", e),
        }
    }

    async fn handshake_with_recovery(&self) -> Result<()> {
        let first = match self.run_handshake().await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        debug!("Handshake failed ({}), attempting cookie rotation", first);
        let rotated = {
            let mut credentials = self.credentials.lock().await;
            self.rotation.rotate(&mut credentials).await
        };
        match rotated {
            Ok(()) => {
                debug!("Cookie rotation succeeded, retrying handshake");
                self.run_handshake().await
            }
            Err(e) => {
                debug!("Recovery rotation failed: {}", e);
                Err(first)
            }
        }
    }

    async fn run_handshake(&self) -> Result<()> {
        let snapshot = self.credentials.lock().await.clone();
        let outcome = self.handshake.handshake(&snapshot).await?;

        {
            let mut session = self.session.write().await;
            session.nonce = outcome.nonce;
            session.ambient_cookies = outcome.ambient_cookies;
            session.healthy = true;
        }

        if !snapshot.rotating().is_empty()
            && let Err(e) = self.cache.save(snapshot.long_lived(), snapshot.rotating())
        {
            warn!("Failed to persist {}: {}", PSIDTS_COOKIE, e);
        }
        Ok(())
    }

    fn start_scheduled_rotation(&self) {
        if !self.settings.gemini.auto_refresh || self.shutdown.is_cancelled() {
            return;
        }
        let mut slot = lock_task_slot(&self.rotation_task);
        if slot.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        *slot = Some(
            self.rotation
                .spawn_scheduled(self.credentials.clone(), self.settings.refresh_interval()),
        );
    }
}

impl Drop for GeminiClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(task) = lock_task_slot(&self.rotation_task).as_ref() {
            task.cancel();
        }
    }
}

#[async_trait]
impl Provider for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<GenerationResponse> {
        GeminiClient::generate(self, prompt, options).await
    }

    async fn is_healthy(&self) -> bool {
        GeminiClient::is_healthy(self).await
    }

    fn list_models(&self) -> Vec<ModelInfo> {
        GeminiClient::list_models(self)
    }
}

/// Build the `f.req` form value
///
/// Inner `[[prompt], null, metadata]` is JSON-encoded and wrapped as the
/// second element of `[null, inner]`, which is encoded again.
pub fn build_envelope(prompt: &str, metadata: Option<&ConversationMetadata>) -> Result<String> {
    let metadata = metadata
        .map(ConversationMetadata::to_envelope)
        .unwrap_or(Value::Null);
    let inner = serde_json::to_string(&json!([[prompt], null, metadata]))?;
    Ok(serde_json::to_string(&json!([null, inner]))?)
}

fn generation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ORIGIN,
        HeaderValue::from_static("https://gemini.google.com"),
    );
    headers.insert(
        header::REFERER,
        HeaderValue::from_static("https://gemini.google.com/"),
    );
    headers.insert("x-same-domain", HeaderValue::from_static("1"));
    headers
}

fn lock_task_slot(
    slot: &std::sync::Mutex<Option<RotationTask>>,
) -> std::sync::MutexGuard<'_, Option<RotationTask>> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
