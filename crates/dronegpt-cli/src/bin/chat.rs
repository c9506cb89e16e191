//! Interactive chat with the model endpoint. An empty line exits.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dronegpt_chat::{ChatCompletionClient, DEFAULT_API_URL};
use dronegpt_cli::{ChatSession, DEFAULT_CHAT_MODEL, DEFAULT_CHAT_PROMPT};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Chat with the model from the terminal
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Chat-completion endpoint
    #[arg(long, default_value = DEFAULT_API_URL)]
    url: String,

    /// Model identifier
    #[arg(long, default_value = DEFAULT_CHAT_MODEL)]
    model: String,

    /// System prompt
    #[arg(long, default_value = DEFAULT_CHAT_PROMPT)]
    system: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// API key (falls back to OPENAI_API_KEY)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::WARN.into()))
        .init();

    let args = Args::parse();
    let client = ChatCompletionClient::new(
        args.url.as_str(),
        args.api_key,
        Duration::from_secs(args.timeout),
    )?;
    let mut session = ChatSession::new(Arc::new(client), args.model, args.system);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let input = lines.next_line().await?.unwrap_or_default();
        if input.trim().is_empty() {
            println!("Goodbye");
            return Ok(());
        }

        match session.add(input).await {
            Ok(reply) => println!("{}", reply.text().unwrap_or_default()),
            Err(e) => tracing::warn!("Request failed: {}", e),
        }
    }
}
