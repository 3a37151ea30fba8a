//! Rotating-cookie refresh
//!
//! Exchanges `__Secure-1PSIDTS` for a fresh value, either on demand or on a
//! fixed schedule owned by the client. A rotation always runs against one
//! mutable borrow of the credential set, so concurrent rotations cannot
//! interleave.

use crate::{
    Result,
    config::BackendSettings,
    session::{
        cache::CredentialCache,
        credentials::{CredentialSet, PSIDCC_COOKIE, PSIDTS_COOKIE},
    },
};
use reqwest::{Client, StatusCode, header};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Body the rotation endpoint expects, byte for byte
pub const ROTATION_BODY: &str = r#"[000,"-0000000000000000000"]"#;

/// Issues rotation requests and persists the result
#[derive(Debug, Clone)]
pub struct RotationEngine {
    http: Client,
    rotate_url: String,
    timeout: Duration,
    cache: Arc<dyn CredentialCache>,
}

impl RotationEngine {
    pub fn new(http: Client, backend: &BackendSettings, cache: Arc<dyn CredentialCache>) -> Self {
        Self {
            http,
            rotate_url: backend.rotate_url.clone(),
            timeout: backend.rotation_timeout(),
            cache,
        }
    }

    /// Rotate once, updating `credentials` in place
    ///
    /// On success the new rotating secret is written to the cache. A cache
    /// write failure is logged and does not fail the rotation.
    pub async fn rotate(&self, credentials: &mut CredentialSet) -> Result<()> {
        debug!("Sending cookie rotation request");
        let response = self
            .http
            .post(&self.rotate_url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::COOKIE, credentials.cookie_header())
            .body(ROTATION_BODY)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| crate::Error::rotation(format!("request failed: {}", e.without_url())))?;

        let status = response.status();
        if status != StatusCode::OK {
            info!("Cookie rotation refused with status {}", status.as_u16());
            return Err(crate::Error::rotation(format!(
                "endpoint returned status {}",
                status.as_u16()
            )));
        }

        let mut rotated = None;
        let mut context = None;
        for cookie in response.cookies() {
            match cookie.name() {
                PSIDTS_COOKIE => rotated = Some(cookie.value().to_string()),
                PSIDCC_COOKIE => context = Some(cookie.value().to_string()),
                _ => {}
            }
        }

        if let Some(value) = context.filter(|v| !v.is_empty()) {
            credentials.set_context(&value);
        }
        let Some(value) = rotated.filter(|v| !v.is_empty()) else {
            return Err(crate::Error::rotation(format!(
                "no new {PSIDTS_COOKIE} in response"
            )));
        };
        credentials.set_rotating(&value);

        if let Err(e) = self
            .cache
            .save(credentials.long_lived(), credentials.rotating())
        {
            warn!("Failed to persist rotated cookie: {}", e);
        }
        info!(updated_at = %credentials.updated_at(), "Cookie rotated successfully");
        Ok(())
    }

    /// Spawn the scheduled rotation loop
    ///
    /// The first rotation happens one `interval` from now. Each tick takes
    /// the credential lock for the whole exchange. Cancelling the returned
    /// task stops the loop between ticks; a rotation already in flight runs
    /// to completion.
    pub fn spawn_scheduled(
        &self,
        credentials: Arc<Mutex<CredentialSet>>,
        interval: Duration,
    ) -> RotationTask {
        let engine = self.clone();
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Scheduled cookie rotation every {:?}", interval);

            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    _ = ticker.tick() => {
                        let mut guard = credentials.lock().await;
                        if let Err(e) = engine.rotate(&mut guard).await {
                            warn!("Scheduled cookie rotation failed: {}", e);
                        }
                    }
                }
            }
            debug!("Scheduled cookie rotation stopped");
        });

        RotationTask { token, handle }
    }
}

/// Handle to a running scheduled rotation loop
#[derive(Debug)]
pub struct RotationTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl RotationTask {
    /// Ask the loop to stop after any in-flight rotation
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel and wait for the loop to exit
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.handle.await {
            warn!("Rotation task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::cache::FileCredentialCache;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn engine(server: &MockServer, dir: &TempDir) -> RotationEngine {
        let backend = BackendSettings {
            rotate_url: format!("{}/RotateCookies", server.uri()),
            ..Default::default()
        };
        RotationEngine::new(
            Client::new(),
            &backend,
            Arc::new(FileCredentialCache::new(dir.path())),
        )
    }

    #[tokio::test]
    async fn test_rotation_updates_and_persists() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .and(path("/RotateCookies"))
            .and(body_string(ROTATION_BODY))
            .and(header_eq("content-type", "application/json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "__Secure-1PSIDTS=fresh-ts; Path=/; Secure")
                    .append_header("set-cookie", "__Secure-1PSIDCC=fresh-cc; Path=/; Secure"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let engine = engine(&server, &dir);
        let mut creds = CredentialSet::new("psid", "old-ts", "").unwrap();
        engine.rotate(&mut creds).await.unwrap();

        assert_eq!(creds.rotating(), "fresh-ts");
        assert_eq!(creds.context(), "fresh-cc");
        let cache = FileCredentialCache::new(dir.path());
        assert_eq!(cache.load("psid").unwrap().as_deref(), Some("fresh-ts"));
    }

    #[tokio::test]
    async fn test_rotation_non_200_leaves_credentials() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let engine = engine(&server, &dir);
        let mut creds = CredentialSet::new("psid", "old-ts", "").unwrap();
        let err = engine.rotate(&mut creds).await.unwrap_err();

        assert!(matches!(err, crate::Error::Rotation { .. }));
        assert!(err.to_string().contains("401"));
        assert_eq!(creds.rotating(), "old-ts");
    }

    #[tokio::test]
    async fn test_rotation_without_new_cookie_fails() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).append_header("set-cookie", "NID=1; Path=/"),
            )
            .mount(&server)
            .await;

        let engine = engine(&server, &dir);
        let mut creds = CredentialSet::new("psid", "", "").unwrap();
        let err = engine.rotate(&mut creds).await.unwrap_err();
        assert!(err.to_string().contains("no new __Secure-1PSIDTS"));
        assert!(creds.needs_rotation());
    }

    #[tokio::test]
    async fn test_scheduled_loop_rotates_and_stops() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .append_header("set-cookie", "__Secure-1PSIDTS=tick; Path=/"),
            )
            .mount(&server)
            .await;

        let engine = engine(&server, &dir);
        let creds = Arc::new(Mutex::new(CredentialSet::new("psid", "", "").unwrap()));
        let task = engine.spawn_scheduled(creds.clone(), Duration::from_millis(50));

        tokio::time::sleep(Duration::from_millis(300)).await;
        task.shutdown().await;

        let received = server.received_requests().await.unwrap().len();
        assert!(received >= 2, "expected repeated rotations, got {received}");
        assert_eq!(creds.lock().await.rotating(), "tick");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(server.received_requests().await.unwrap().len(), received);
    }
}
