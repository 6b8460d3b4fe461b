//! Authful MCP Server - Main entry point
//!
//! Serves the built-in tools over SSE behind the multiplexed bearer credential.

use authful_mcp_server::config::Config;
use authful_mcp_server::error::{Result, ServerError};
use authful_mcp_server::server;
use authful_mcp_server::tools::{BuiltinTools, GmailClient};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BANNER: &str = r#"
╔══════════════════════════════════════════════════════════════╗
║                   Authful MCP Server (Rust)                  ║
║        MCP over SSE with multiplexed bearer credentials      ║
╚══════════════════════════════════════════════════════════════╝
"#;

fn setup_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}", config.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::parse_args();

    setup_logging(&config);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    if !config.no_banner && !config.silent {
        eprintln!("{}", BANNER);
        info!("Listening on: {}", config.bind_address());
        info!("Auth mode: {}", config.auth_mode);
        info!("Server name: {}", config.server_name);
        info!("Gmail API: {}", config.gmail_api_url);
        eprintln!();
    }

    if let Err(e) = run(config).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> Result<()> {
    let gmail = GmailClient::new(config.gmail_api_url()?)?;
    let tools = Arc::new(BuiltinTools::new(config.server_name.clone(), gmail));

    let server_handle = tokio::spawn(server::run_server(config, tools));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
        result = server_handle => {
            match result {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => {
                    error!("Server error: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    error!("Server task panicked: {}", e);
                    return Err(ServerError::Mcp(format!("Server task panicked: {}", e)));
                }
            }
        }
    }

    Ok(())
}
