//! Gemini web session
//!
//! Everything needed to talk to the cookie-authenticated web backend:
//! credentials and their cache, the nonce handshake, cookie rotation, the
//! generation client with its response parser, and chat sessions.

pub mod cache;
pub mod chat;
pub mod client;
pub mod credentials;
pub mod handshake;
pub mod parser;
pub mod provider;
pub mod rotation;

pub use cache::{CredentialCache, FileCredentialCache, cache_key};
pub use chat::ChatSession;
pub use client::GeminiClient;
pub use credentials::{CredentialSet, CredentialStatus};
pub use handshake::HandshakeEngine;
pub use provider::Provider;
pub use rotation::{RotationEngine, RotationTask};
