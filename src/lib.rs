//! Gemini Web Bridge
//!
//! A client for the cookie-authenticated Gemini web backend, plus an HTTP
//! bridge that exposes it through Google-native, OpenAI-compatible and
//! Anthropic-compatible APIs.
//!
//! # Architecture
//!
//! - **Session client** ([`GeminiClient`]): handshake, cookie rotation,
//!   request envelopes, response parsing and multi-turn chat
//! - **Server** ([`server`]): one axum router per API dialect on top of the
//!   [`Provider`](session::Provider) seam
//! - **Binaries**: `gemini-bridge` runs the server, `gemini-ask` answers one
//!   prompt from the command line
//!
//! # Usage
//!
//! ```bash
//! GEMINI_1PSID=... gemini-bridge --port 3000
//! GEMINI_1PSID=... gemini-ask "Explain ownership in Rust"
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use gemini_web_bridge::{GeminiClient, Settings, types::GenerateOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut settings = Settings::default();
//! settings.gemini.secure_1psid = "cookie-value".to_string();
//!
//! let client = GeminiClient::new(&settings)?;
//! client.init().await?;
//! let answer = client.generate("Hello", &GenerateOptions::new()).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod types;
pub mod utils;

pub use config::Settings;
pub use error::{AuthFailure, Error, ErrorCategory, Result};
pub use session::GeminiClient;
