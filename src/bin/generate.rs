//! One-shot prompt binary
//!
//! Initializes a session, answers a single prompt and prints the result to
//! stdout.
//!
//! # Usage
//!
//! ```bash
//! GEMINI_1PSID=... gemini-ask "What is a borrow checker?"
//! GEMINI_1PSID=... gemini-ask --json --model gemini-2.5-flash "Hi"
//! ```
//!
//! # Output
//!
//! Plain text by default. With `--json`:
//! ```json
//! {
//!   "text": "answer",
//!   "metadata": { "cid": "c_1", "rid": "r_1", "rcid": "rc_1" }
//! }
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use gemini_web_bridge::{
    GeminiClient,
    cli::init_logging,
    config::{ConfigLoader, ConfigOverrides},
    types::{GenerateOptions, GenerationResponse},
};

#[derive(Parser)]
#[command(name = "gemini-ask", author, version, about, long_about = None)]
struct Cli {
    /// Prompt to send
    #[arg(value_name = "PROMPT")]
    prompt: String,

    /// Model identifier
    #[arg(short, long, value_name = "MODEL")]
    model: Option<String>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the answer and conversation metadata as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Failed to generate answer: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<String> {
    // No background rotation for a single request
    let settings = ConfigLoader::new()
        .with_overrides(ConfigOverrides {
            auto_refresh: Some(false),
            ..ConfigOverrides::default()
        })
        .load(cli.config.as_deref())
        .context("Failed to load configuration")?;

    // Quiet unless asked: stdout carries the answer
    init_logging("error", cli.verbose);

    let client = GeminiClient::new(&settings)?;
    client.init().await.context("Session initialization failed")?;

    let options = build_options(cli);
    debug!(model = options.model_or_default(), "Generating answer");
    let result = client.generate(&cli.prompt, &options).await;
    client.close().await;

    render(&result?, cli.json)
}

fn build_options(cli: &Cli) -> GenerateOptions {
    let options = GenerateOptions::new();
    match &cli.model {
        Some(model) => options.with_model(model),
        None => options,
    }
}

fn render(response: &GenerationResponse, json: bool) -> anyhow::Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(response)?)
    } else {
        Ok(response.text.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_web_bridge::types::ConversationMetadata;

    #[test]
    fn test_cli_parses_prompt_and_flags() {
        let cli = Cli::parse_from(["gemini-ask", "--json", "-m", "gemini-2.5-pro", "Hello there"]);
        assert_eq!(cli.prompt, "Hello there");
        assert!(cli.json);
        assert!(!cli.verbose);

        let options = build_options(&cli);
        assert_eq!(options.model_or_default(), "gemini-2.5-pro");
    }

    #[test]
    fn test_cli_requires_prompt() {
        assert!(Cli::try_parse_from(["gemini-ask"]).is_err());
    }

    #[test]
    fn test_render_plain_and_json() {
        let response = GenerationResponse {
            text: "Hi!".to_string(),
            metadata: ConversationMetadata {
                cid: Some("c_1".to_string()),
                rid: None,
                rcid: Some("rc_1".to_string()),
            },
        };

        assert_eq!(render(&response, false).unwrap(), "Hi!");

        let value: serde_json::Value =
            serde_json::from_str(&render(&response, true).unwrap()).unwrap();
        assert_eq!(value["text"], "Hi!");
        assert_eq!(value["metadata"]["cid"], "c_1");
        assert!(value["metadata"].get("rid").is_none());
    }
}
