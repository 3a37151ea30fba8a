//! HTTP bridge binary
//!
//! Serves the Gemini web session through three API dialects.
//!
//! # Usage
//!
//! ```bash
//! GEMINI_1PSID=... gemini-bridge --port 3000 --host 0.0.0.0
//! ```
//!
//! # API Endpoints
//!
//! - `GET /health`: Health check
//! - `/gemini/v1beta/...`: Google-native `generateContent`
//! - `/openai/v1/...`: OpenAI-compatible chat completions
//! - `/claude/v1/...`: Anthropic-compatible messages

use clap::Parser;
use gemini_web_bridge::cli::{ServerArgs, run_server_mode};
use std::path::PathBuf;

/// HTTP bridge for the Gemini web backend
#[derive(Parser)]
#[command(name = "gemini-bridge", author, version, about, long_about = None)]
struct Cli {
    /// Port to listen on [default: 3000]
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to [default: ::]
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl From<Cli> for ServerArgs {
    fn from(cli: Cli) -> Self {
        Self {
            port: cli.port,
            host: cli.host,
            config: cli.config,
            verbose: cli.verbose,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    run_server_mode(cli.into()).await
}
