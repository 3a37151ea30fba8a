//! Configuration settings structure
//!
//! Defines the main settings structure and loading logic for the bridge.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Browser user agent sent to every backend endpoint
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Longest accepted rotation interval (one week)
pub const MAX_REFRESH_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Main configuration settings for the bridge
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server configuration
    pub server: ServerSettings,
    /// Gemini session credentials and rotation
    pub gemini: GeminiSettings,
    /// Backend endpoints and timeouts
    pub backend: BackendSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Deadline applied by the adapters to every generation call, in seconds
    pub generation_deadline_secs: u64,
}

/// Session credentials and rotation schedule
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    /// `__Secure-1PSID`
    pub secure_1psid: String,
    /// `__Secure-1PSIDTS`
    pub secure_1psidts: String,
    /// `__Secure-1PSIDCC`
    pub secure_1psidcc: String,
    /// Raw browser cookie header used to fill in missing secrets
    pub cookies: Option<String>,
    /// Scheduled rotation interval in minutes
    pub refresh_interval_minutes: u64,
    /// Run scheduled rotation after initialization
    pub auto_refresh: bool,
    /// Directory for the rotating-secret cache
    pub cookie_cache_dir: Option<PathBuf>,
}

/// Backend endpoints, user agent and transport timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// Unauthenticated warm-up URL
    pub google_url: String,
    /// Authenticated landing page
    pub init_url: String,
    /// Generation endpoint
    pub generate_url: String,
    /// Cookie rotation endpoint
    pub rotate_url: String,
    /// User agent for all backend requests
    pub user_agent: String,
    /// Warm-up and landing page timeout in seconds
    pub handshake_timeout_secs: u64,
    /// Rotation request timeout in seconds
    pub rotation_timeout_secs: u64,
    /// Generation request timeout in seconds
    pub generation_timeout_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level
    pub level: String,
    /// Enable verbose logging
    pub verbose: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "::".to_string(),
            port: 3000,
            generation_deadline_secs: 300,
        }
    }
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            secure_1psid: String::new(),
            secure_1psidts: String::new(),
            secure_1psidcc: String::new(),
            cookies: None,
            refresh_interval_minutes: 30,
            auto_refresh: true,
            cookie_cache_dir: None,
        }
    }
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("secure_1psid", &redact(&self.secure_1psid))
            .field("secure_1psidts", &redact(&self.secure_1psidts))
            .field("secure_1psidcc", &redact(&self.secure_1psidcc))
            .field("cookies", &self.cookies.as_deref().map(redact))
            .field("refresh_interval_minutes", &self.refresh_interval_minutes)
            .field("auto_refresh", &self.auto_refresh)
            .field("cookie_cache_dir", &self.cookie_cache_dir)
            .finish()
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            google_url: "https://www.google.com/".to_string(),
            init_url: "https://gemini.google.com/app".to_string(),
            generate_url: "https://gemini.google.com/_/BardChatUi/data/assistant.lamda.BardFrontendService/StreamGenerate".to_string(),
            rotate_url: "https://accounts.google.com/RotateCookies".to_string(),
            user_agent: BROWSER_USER_AGENT.to_string(),
            handshake_timeout_secs: 30,
            rotation_timeout_secs: 30,
            generation_timeout_secs: 120,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            verbose: false,
        }
    }
}

/// Render a secret as a length marker for debug output
pub(crate) fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "<empty>".to_string()
    } else {
        format!("<redacted:{} chars>", secret.chars().count())
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(name: &str) -> crate::Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", name, e))),
        None => Ok(None),
    }
}

impl Settings {
    /// Create new settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| {
            crate::Error::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }

    /// Apply environment variable overrides on top of these settings
    pub fn merge_with_env(mut self) -> crate::Result<Self> {
        // Server
        if let Some(host) = env_var("GEMINI_BRIDGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = parse_env("PORT")? {
            self.server.port = port;
        }

        // Credentials
        if let Some(psid) = env_var("GEMINI_1PSID") {
            self.gemini.secure_1psid = psid;
        }
        if let Some(psidts) = env_var("GEMINI_1PSIDTS") {
            self.gemini.secure_1psidts = psidts;
        }
        if let Some(psidcc) = env_var("GEMINI_1PSIDCC") {
            self.gemini.secure_1psidcc = psidcc;
        }
        if let Some(cookies) = env_var("GEMINI_COOKIES") {
            self.gemini.cookies = Some(cookies);
        }
        if let Some(minutes) = parse_env("GEMINI_REFRESH_INTERVAL")? {
            self.gemini.refresh_interval_minutes = minutes;
        }
        if let Some(dir) = env_var("GEMINI_COOKIE_CACHE_DIR") {
            self.gemini.cookie_cache_dir = Some(PathBuf::from(dir));
        }

        // Logging
        if let Some(level) = env_var("LOG_LEVEL") {
            self.logging.level = level;
        }

        Ok(self)
    }

    /// Check structural validity; credentials are checked by the client
    pub fn validate(&self) -> crate::Result<()> {
        if self.server.port == 0 {
            return Err(crate::Error::config("Server port must be non-zero"));
        }
        if self.server.generation_deadline_secs == 0 {
            return Err(crate::Error::config(
                "Generation deadline must be at least one second",
            ));
        }
        if self.gemini.refresh_interval_minutes == 0 {
            return Err(crate::Error::config(
                "Refresh interval must be at least one minute",
            ));
        }
        if self.gemini.refresh_interval_minutes > MAX_REFRESH_INTERVAL_MINUTES {
            return Err(crate::Error::Config(format!(
                "Refresh interval must not exceed {} minutes",
                MAX_REFRESH_INTERVAL_MINUTES
            )));
        }
        for (name, value) in [
            ("google_url", &self.backend.google_url),
            ("init_url", &self.backend.init_url),
            ("generate_url", &self.backend.generate_url),
            ("rotate_url", &self.backend.rotate_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| crate::Error::Config(format!("Invalid {}: {}", name, e)))?;
        }
        if self.backend.handshake_timeout_secs == 0
            || self.backend.rotation_timeout_secs == 0
            || self.backend.generation_timeout_secs == 0
        {
            return Err(crate::Error::config("Backend timeouts must be non-zero"));
        }
        if self.logging.level.trim().is_empty() {
            return Err(crate::Error::config("Log level must not be empty"));
        }
        Ok(())
    }

    /// Directory holding the rotating-secret cache
    pub fn cookie_cache_dir(&self) -> PathBuf {
        self.gemini.cookie_cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("gemini-web-bridge")
                .join("cookies")
        })
    }

    /// Scheduled rotation interval, capped at [`MAX_REFRESH_INTERVAL_MINUTES`]
    pub fn refresh_interval(&self) -> Duration {
        let minutes = self
            .gemini
            .refresh_interval_minutes
            .min(MAX_REFRESH_INTERVAL_MINUTES);
        Duration::from_secs(minutes * 60)
    }

    /// Adapter deadline for generation calls
    pub fn generation_deadline(&self) -> Duration {
        Duration::from_secs(self.server.generation_deadline_secs)
    }
}

impl BackendSettings {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs)
    }

    pub fn rotation_timeout(&self) -> Duration {
        Duration::from_secs(self.rotation_timeout_secs)
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }
}
