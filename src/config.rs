//! Configuration parsing and validation

use crate::error::{Result, ServerError};
use clap::{Parser, ValueEnum};
use std::fmt;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3003;
const DEFAULT_SERVER_NAME: &str = "authful-mcp-server";
const DEFAULT_GMAIL_API_URL: &str = "https://gmail.googleapis.com";

/// Where the credential check happens
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Request-level gate in front of every route
    Gate,
    /// Check once, at the SSE handshake
    Handshake,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gate => f.write_str("gate"),
            Self::Handshake => f.write_str("handshake"),
        }
    }
}

#[derive(Parser, Clone)]
#[command(
    name = "authful-mcp-server",
    version,
    about = "MCP tool server with multiplexed bearer credentials",
    long_about = "MCP server over SSE whose bearer credential both authenticates the calling application with a shared secret and carries per-connector access tokens for tools"
)]
pub struct Config {
    /// Shared secret every credential must carry
    #[arg(long, env = "AUTH_SECRET", hide_env_values = true)]
    pub auth_secret: String,

    /// Address to bind to
    #[arg(long, env = "MCP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "MCP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Enforcement point for the credential check
    #[arg(long, env = "MCP_AUTH_MODE", value_enum, default_value_t = AuthMode::Gate)]
    pub auth_mode: AuthMode,

    /// Server name reported to MCP clients
    #[arg(long, env = "MCP_SERVER_NAME", default_value = DEFAULT_SERVER_NAME)]
    pub server_name: String,

    /// Base URL of the Gmail REST API
    #[arg(long, env = "GMAIL_API_URL", default_value = DEFAULT_GMAIL_API_URL)]
    pub gmail_api_url: String,

    /// Don't show the server banner
    #[arg(long)]
    pub no_banner: bool,

    /// Show only error messages
    #[arg(long, conflicts_with = "debug")]
    pub silent: bool,

    /// Enable debug logging
    #[arg(long, env = "MCP_SERVER_DEBUG")]
    pub debug: bool,
}

impl Config {
    /// Parse configuration from CLI arguments and environment variables
    pub fn parse_args() -> Self {
        Config::parse()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.auth_secret.is_empty() {
            return Err(ServerError::Config("Auth secret must not be empty".to_string()));
        }

        if self.host.is_empty() {
            return Err(ServerError::Config("Host is required".to_string()));
        }

        url::Host::parse(&self.host)
            .map_err(|e| ServerError::Config(format!("Invalid host '{}': {}", self.host, e)))?;

        if self.port == 0 {
            return Err(ServerError::Config("Port must be non-zero".to_string()));
        }

        self.gmail_api_url()?;

        Ok(())
    }

    /// Parsed Gmail API base URL
    pub fn gmail_api_url(&self) -> Result<url::Url> {
        url::Url::parse(&self.gmail_api_url)
            .map_err(|e| ServerError::Config(format!("Invalid Gmail API URL: {}", e)))
    }

    /// Address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get log level based on flags
    pub fn log_level(&self) -> tracing::Level {
        if self.silent {
            tracing::Level::ERROR
        } else if self.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth_secret", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_mode", &self.auth_mode)
            .field("server_name", &self.server_name)
            .field("gmail_api_url", &self.gmail_api_url)
            .field("no_banner", &self.no_banner)
            .field("silent", &self.silent)
            .field("debug", &self.debug)
            .finish()
    }
}
