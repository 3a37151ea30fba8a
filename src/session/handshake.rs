//! Session handshake
//!
//! Turns a credential set into the per-session nonce (`SNlM0e`) that every
//! generation call must carry. The nonce is scraped from the authenticated
//! landing page; cookies handed out along the way are kept as ambient
//! cookies for later requests.

use crate::{
    AuthFailure, Result,
    config::BackendSettings,
    session::credentials::CredentialSet,
};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};

/// Nonce patterns, tried in order
static NONCE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [r#""SNlM0e":"([^"]+)""#, r#"\["SNlM0e","([^"]+)"\]"#]
        .into_iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Landing page markers of a signed-out session
const SIGN_IN_MARKERS: [&str; 2] = ["Sign in", "login"];

/// Result of a successful handshake
#[derive(Clone)]
pub struct HandshakeOutcome {
    /// Session nonce, never empty
    pub nonce: String,
    /// Cookies set by the warm-up and landing page responses
    pub ambient_cookies: BTreeMap<String, String>,
}

impl std::fmt::Debug for HandshakeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeOutcome")
            .field("nonce", &crate::config::settings::redact(&self.nonce))
            .field("ambient_cookies", &self.ambient_cookies.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Performs the warm-up and landing page requests
#[derive(Debug, Clone)]
pub struct HandshakeEngine {
    http: Client,
    google_url: String,
    init_url: String,
    timeout: Duration,
}

impl HandshakeEngine {
    pub fn new(http: Client, backend: &BackendSettings) -> Self {
        Self {
            http,
            google_url: backend.google_url.clone(),
            init_url: backend.init_url.clone(),
            timeout: backend.handshake_timeout(),
        }
    }

    /// Run the full handshake against a credential snapshot
    pub async fn handshake(&self, credentials: &CredentialSet) -> Result<HandshakeOutcome> {
        let mut ambient_cookies = self.warm_up().await;

        debug!("Fetching landing page for session nonce");
        let response = self
            .http
            .get(&self.init_url)
            .query(&[("hl", "en")])
            .headers(navigation_headers())
            .header(
                header::COOKIE,
                credentials.cookie_header_with(&ambient_cookies),
            )
            .timeout(self.timeout)
            .send()
            .await
            .map_err(crate::Error::transport)?;

        for cookie in response.cookies() {
            ambient_cookies.insert(cookie.name().to_string(), cookie.value().to_string());
        }
        debug!("Landing page answered with status {}", response.status());

        // Compressed bodies are decoded by the client
        let body = response.text().await.map_err(crate::Error::transport)?;

        match extract_nonce(&body) {
            Some(nonce) => {
                info!("Session nonce acquired");
                Ok(HandshakeOutcome {
                    nonce,
                    ambient_cookies,
                })
            }
            None => {
                let kind = classify_failure(&body);
                info!("Handshake failed: {}", kind);
                Err(crate::Error::authentication(kind))
            }
        }
    }

    /// Best-effort unauthenticated hit collecting general cookies
    async fn warm_up(&self) -> BTreeMap<String, String> {
        let mut cookies = BTreeMap::new();
        match self
            .http
            .get(&self.google_url)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(response) => {
                for cookie in response.cookies() {
                    cookies.insert(cookie.name().to_string(), cookie.value().to_string());
                }
                debug!("Warm-up collected {} cookies", cookies.len());
            }
            Err(e) => debug!("Warm-up request failed, continuing: {}", e.without_url()),
        }
        cookies
    }
}

/// Find the session nonce in a landing page body
pub fn extract_nonce(body: &str) -> Option<String> {
    NONCE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(body)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|nonce| !nonce.is_empty())
    })
}

/// Decide why a landing page carried no nonce
pub fn classify_failure(body: &str) -> AuthFailure {
    if SIGN_IN_MARKERS.iter().any(|marker| body.contains(marker)) {
        AuthFailure::CredentialsInvalid
    } else {
        AuthFailure::NonceNotFound
    }
}

fn navigation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in [
        (
            "accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("accept-language", "en-US,en;q=0.9"),
        ("cache-control", "max-age=0"),
        ("origin", "https://gemini.google.com"),
        ("referer", "https://gemini.google.com/"),
        (
            "sec-ch-ua",
            r#""Not_A Brand";v="8", "Chromium";v="120", "Google Chrome";v="120""#,
        ),
        ("sec-ch-ua-mobile", "?0"),
        ("sec-ch-ua-platform", r#""Windows""#),
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "same-origin"),
        ("sec-fetch-user", "?1"),
        ("upgrade-insecure-requests", "1"),
        ("x-same-domain", "1"),
    ] {
        headers.insert(name, HeaderValue::from_static(value));
    }
    headers
}
