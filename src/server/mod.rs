//! HTTP server
//!
//! The axum application and one adapter per API dialect, all backed by the
//! same [`Provider`](crate::session::Provider).

pub mod app;
pub mod claude;
pub mod gemini;
pub mod handlers;
pub mod openai;
pub mod prompt;
pub mod stream;

pub use app::{AppState, create_app};
