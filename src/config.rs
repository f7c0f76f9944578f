use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;

use crate::api::endpoints::DEFAULT_API_BASE;

/// Easee Bridge - vendor cloud to smart-home host glue
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Vendor cloud account username (email)
    #[arg(short = 'u', long, env = "EASEE_USERNAME")]
    pub username: Option<String>,

    /// Vendor cloud account password
    #[arg(short = 'p', long, env = "EASEE_PASSWORD")]
    pub password: Option<String>,

    /// Base URL of the vendor REST API
    #[arg(long, env = "EASEE_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Polling interval for device state in seconds
    #[arg(long, env = "POLL_INTERVAL", default_value = "30")]
    pub poll_interval: u64,

    /// Poll every device once and exit
    #[arg(long, default_value = "false")]
    pub once: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP request timeout in seconds
    #[arg(long, env = "HTTP_REQUEST_TIMEOUT", default_value = "30")]
    pub http_timeout: u64,

    /// HTTP max retries
    #[arg(long, env = "HTTP_MAX_RETRIES", default_value = "3")]
    pub http_retries: u32,
}

#[derive(Clone, Debug)]
pub struct Config {
    // Account
    pub username: String,
    pub password: String,

    // Cloud API
    pub api_base: String,

    // Polling
    pub poll_interval: u64,
    pub once: bool,

    // HTTP client
    pub http_max_connections: usize,
    pub http_connect_timeout: u64,
    pub http_request_timeout: u64,
    pub http_max_retries: u32,

    // Token lifecycle
    pub min_token_age: Duration,
    pub renewal_margin_secs: u64,
    pub max_renewal_retries: u32,

    // Logging
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with priority: CLI > ENV > defaults
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let args = CliArgs::parse();
        Self::from_args(args)
    }

    pub fn from_args(args: CliArgs) -> Result<Self> {
        let config = Config {
            username: args
                .username
                .context("EASEE_USERNAME is required (use -u or set EASEE_USERNAME env var)")?,

            password: args
                .password
                .context("EASEE_PASSWORD is required (use -p or set EASEE_PASSWORD env var)")?,

            api_base: args.api_base,

            poll_interval: args.poll_interval,
            once: args.once,

            http_max_connections: std::env::var("HTTP_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_connect_timeout: std::env::var("HTTP_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            http_request_timeout: args.http_timeout,

            http_max_retries: args.http_retries,

            min_token_age: Duration::from_secs(
                std::env::var("MIN_TOKEN_AGE")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),

            renewal_margin_secs: std::env::var("TOKEN_RENEWAL_MARGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(120),

            max_renewal_retries: std::env::var("TOKEN_MAX_RENEWAL_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),

            log_level: args.log_level,
        };

        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.trim().is_empty() {
            anyhow::bail!("Username must not be empty");
        }
        if self.password.is_empty() {
            anyhow::bail!("Password must not be empty");
        }
        if self.poll_interval == 0 {
            anyhow::bail!("Poll interval must be at least 1 second");
        }
        if !self.api_base.starts_with("http") {
            anyhow::bail!("API base must be an http(s) URL: {}", self.api_base);
        }
        Ok(())
    }
}
