//! Command-line and environment configuration.
//!
//! Every flag falls back to an environment variable, so the relay can be
//! configured entirely from a `.env` file.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use chatkit_core::{Error, Result, Secret};
use clap::{Parser, ValueEnum};

use crate::upstream::{DEFAULT_API_BASE, UpstreamConfig};

/// How `POST /api/chatkit/refresh` obtains a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum RefreshMode {
    /// Mint a brand-new session, ignoring the caller's current secret.
    #[default]
    Mint,
    /// Send the caller's current secret to the upstream refresh endpoint.
    Forward,
}

/// How upstream failures are reported to the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ErrorMode {
    /// Always `500` with a fixed message.
    #[default]
    Generic,
    /// Upstream status and message, with the API key redacted.
    Passthrough,
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mint => "mint",
            Self::Forward => "forward",
        })
    }
}

impl fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generic => "generic",
            Self::Passthrough => "passthrough",
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "chatkit-relay")]
#[command(version, about = "ChatKit token server - mints client secrets for the chat widget")]
pub struct RelayArgs {
    /// API key used to mint sessions. Never sent to the browser.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Secret,

    /// Published workflow the widget should run.
    #[arg(long, env = "CHATKIT_WORKFLOW_ID")]
    pub workflow_id: String,

    /// Host to listen on.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8787)]
    pub port: u16,

    /// Base URL of the sessions API.
    #[arg(long, env = "OPENAI_API_BASE", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Refresh strategy.
    #[arg(long, env = "CHATKIT_REFRESH_MODE", value_enum, default_value_t = RefreshMode::Mint)]
    pub refresh_mode: RefreshMode,

    /// Upstream failure reporting.
    #[arg(long, env = "CHATKIT_ERROR_MODE", value_enum, default_value_t = ErrorMode::Generic)]
    pub error_mode: ErrorMode,

    /// Upstream request timeout in seconds.
    #[arg(long, env = "CHATKIT_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long, env = "LOG_JSON")]
    pub log_json: bool,
}

impl RelayArgs {
    /// Reject configuration the relay cannot serve with.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(Error::Config("OPENAI_API_KEY is empty".into()));
        }
        if self.workflow_id.trim().is_empty() {
            return Err(Error::Config("CHATKIT_WORKFLOW_ID is empty".into()));
        }
        if self.request_timeout == 0 {
            return Err(Error::Config("request timeout must be at least 1 second".into()));
        }
        Ok(())
    }

    pub const fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_config(&self) -> UpstreamConfig {
        UpstreamConfig {
            base_url: self.api_base.clone(),
            api_key: Secret::new(self.api_key.expose().trim()),
            workflow_id: self.workflow_id.trim().to_string(),
            timeout: Duration::from_secs(self.request_timeout),
        }
    }
}
