//! ChatMaven server
//!
//! Entry point: loads `.env`, checks the API key, and serves the chat page.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use chatmaven::config::{AppConfig, load_llm_settings};
use chatmaven::error::ChatError;
use chatmaven::server::start_server;
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before anything reads the environment
    let _ = dotenv();

    // Initialize tracing (M-LOG-STRUCTURED); LOG_FORMAT=json for machine-readable output
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }

    let config = AppConfig::load()?;

    let settings = match load_llm_settings() {
        Ok(settings) => settings,
        Err(ChatError::MissingCredential) => {
            error!("OPENAI_API_KEY is not set");
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Configuration error");
            std::process::exit(1);
        }
    };
    info!("OPENAI_API_KEY is set");

    start_server(Arc::new(config), settings).await
}
