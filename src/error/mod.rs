//! Error handling for the bridge
//!
//! This module defines error types and handling patterns used throughout the application.

pub mod types;

pub use types::{AuthFailure, Error, ErrorCategory, Result};
