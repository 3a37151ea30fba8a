//! Error type definitions
//!
//! Defines the error taxonomy shared by the session client and the dialect
//! adapters. No variant ever carries a raw cookie value or the session nonce.

use thiserror::Error;

/// Why a handshake could not produce a session nonce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// The landing page asked us to sign in: the cookies are not accepted
    CredentialsInvalid,
    /// The landing page loaded but carried no recognizable nonce
    NonceNotFound,
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CredentialsInvalid => write!(
                f,
                "credentials invalid: secondary token required (provide __Secure-1PSIDTS in addition to __Secure-1PSID)"
            ),
            Self::NonceNotFound => write!(f, "nonce not found in landing page"),
        }
    }
}

/// Coarse classification used by adapters to pick a dialect error shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    Rotation,
    Transport,
    Upstream,
    Parse,
    Precondition,
    InvalidRequest,
    Timeout,
    Cancelled,
    Internal,
}

/// Main error type for the bridge
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Handshake could not extract a session nonce
    #[error("Authentication failed: {kind}")]
    Authentication { kind: AuthFailure },

    /// Cookie rotation endpoint unreachable, refused, or returned no new token
    #[error("Cookie rotation failed: {reason}")]
    Rotation { reason: String },

    /// Generation endpoint answered with a non-200 status
    #[error("Generation failed with status {status}")]
    Generation { status: u16 },

    /// Backend response exhausted without extractable text
    #[error("Failed to parse backend response (excerpt: {excerpt:?})")]
    Parse { excerpt: String },

    /// Generation attempted before any successful handshake
    #[error("Client not initialized: no session nonce available")]
    NotInitialized,

    /// Request rejected by an adapter before reaching the backend
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Generation deadline elapsed
    #[error("Generation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Generation cancelled by the caller
    #[error("Generation cancelled")]
    Cancelled,

    /// Cache operation errors
    #[error("Cache error: {operation}")]
    Cache { operation: String },

    /// Network/HTTP client errors
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new server error
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    /// Create an authentication error
    pub fn authentication(kind: AuthFailure) -> Self {
        Self::Authentication { kind }
    }

    /// Create a rotation error
    pub fn rotation(reason: impl Into<String>) -> Self {
        Self::Rotation {
            reason: reason.into(),
        }
    }

    /// Create a parse error; the excerpt is cut to the first 200 characters
    pub fn parse(body: &str) -> Self {
        Self::Parse {
            excerpt: body.chars().take(crate::session::parser::EXCERPT_LIMIT).collect(),
        }
    }

    /// Create a transport error with the request URL stripped
    ///
    /// Generation URLs carry the session nonce as a query parameter, so the
    /// URL must never reach a log line or a response body.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Network(err.without_url())
    }

    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Create a cache error
    pub fn cache(operation: impl Into<String>) -> Self {
        Self::Cache {
            operation: operation.into(),
        }
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Classify this error for dialect error mapping
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication { .. } => ErrorCategory::Authentication,
            Self::Rotation { .. } => ErrorCategory::Rotation,
            Self::Network(_) => ErrorCategory::Transport,
            Self::Generation { .. } => ErrorCategory::Upstream,
            Self::Parse { .. } => ErrorCategory::Parse,
            Self::NotInitialized => ErrorCategory::Precondition,
            Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Config(_)
            | Self::Server(_)
            | Self::Cache { .. }
            | Self::Json(_)
            | Self::Io(_)
            | Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}
