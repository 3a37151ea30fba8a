//! Configuration management for the bridge
//!
//! This module handles loading and managing configuration settings
//! for both the server and the one-shot CLI.

pub mod loader;
pub mod settings;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use settings::{BROWSER_USER_AGENT, BackendSettings, GeminiSettings, Settings};
