//! `ChatKit` sessions API client.
//!
//! Uses reqwest to mint (and optionally refresh) client secrets. One call
//! per relay request; no retries.

use std::time::Duration;

use chatkit_core::{Secret, SessionCredential};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Default base URL of the sessions API.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com";

const SESSIONS_PATH: &str = "/v1/chatkit/sessions";
const REFRESH_PATH: &str = "/v1/chatkit/sessions/refresh";

/// The sessions API is gated behind this beta header.
const BETA_HEADER: &str = "openai-beta";
const BETA_VALUE: &str = "chatkit_beta=v1";

/// Sessions API client errors.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sessions API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode session response: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl UpstreamError {
    /// Upstream HTTP status, when the upstream answered at all.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Settings for reaching the sessions API.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// Base URL (e.g., "<https://api.openai.com>").
    pub base_url: String,
    pub api_key: Secret,
    pub workflow_id: String,
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct CreateSessionBody<'a> {
    workflow: WorkflowRef<'a>,
    user: &'a str,
}

#[derive(Debug, Serialize)]
struct WorkflowRef<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshSessionBody<'a> {
    client_secret: &'a str,
}

/// Client for the `ChatKit` sessions API.
#[derive(Debug, Clone)]
pub struct SessionClient {
    http: reqwest::Client,
    base_url: String,
    /// Kept only to scrub upstream error text; the header carries the real value.
    api_key: Secret,
    workflow_id: String,
}

impl SessionClient {
    /// Create a new sessions API client.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        if config.base_url.trim().is_empty() {
            return Err(UpstreamError::Config("base_url is empty".into()));
        }
        if config.api_key.is_empty() {
            return Err(UpstreamError::Config("api key is empty".into()));
        }
        if config.workflow_id.trim().is_empty() {
            return Err(UpstreamError::Config("workflow id is empty".into()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose()))
            .map_err(|_| UpstreamError::Config("Invalid api key format".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            HeaderName::from_static(BETA_HEADER),
            HeaderValue::from_static(BETA_VALUE),
        );

        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            http,
            base_url,
            api_key: config.api_key.clone(),
            workflow_id: config.workflow_id.clone(),
        })
    }

    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// Mint a new session for `user`, or for a fresh anonymous id when the
    /// caller did not supply one.
    pub async fn create_session(
        &self,
        user: Option<&str>,
    ) -> Result<SessionCredential, UpstreamError> {
        let user = user
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        let body = CreateSessionBody {
            workflow: WorkflowRef {
                id: &self.workflow_id,
            },
            user: &user,
        };
        debug!(workflow_id = %self.workflow_id, "Creating ChatKit session");
        let resp = self
            .http
            .post(self.api_url(SESSIONS_PATH))
            .json(&body)
            .send()
            .await?;
        self.read_credential(resp).await
    }

    /// Exchange the caller's current secret for a fresh one.
    pub async fn refresh_session(
        &self,
        current: &Secret,
    ) -> Result<SessionCredential, UpstreamError> {
        let body = RefreshSessionBody {
            client_secret: current.expose(),
        };
        debug!("Refreshing ChatKit session");
        let resp = self
            .http
            .post(self.api_url(REFRESH_PATH))
            .json(&body)
            .send()
            .await?;
        self.read_credential(resp).await
    }

    /// Decode a session response, turning non-success codes into
    /// [`UpstreamError::Api`] with the API key scrubbed from the message.
    async fn read_credential(
        &self,
        resp: reqwest::Response,
    ) -> Result<SessionCredential, UpstreamError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = self
                .api_key
                .redact_in(&error_message(&body, status.canonical_reason()));
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

/// Pull a human-readable message out of an upstream error body.
///
/// Understands `{"error": {"message": ".."}}` and `{"error": ".."}`; anything
/// else is returned as trimmed text, or the status reason when empty.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let error = value.get("error");
        let message = error
            .and_then(|e| e.get("message"))
            .or(error)
            .and_then(serde_json::Value::as_str);
        if let Some(message) = message {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("Unknown").to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> UpstreamConfig {
        UpstreamConfig {
            base_url: "https://api.openai.com".into(),
            api_key: Secret::new("sk-test-key"),
            workflow_id: "wf_abc".into(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn empty_api_key_returns_config_error() {
        let cfg = UpstreamConfig {
            api_key: Secret::new(""),
            ..config()
        };
        let err = SessionClient::new(&cfg).unwrap_err();
        assert!(matches!(err, UpstreamError::Config(_)));
    }

    #[test]
    fn empty_workflow_returns_config_error() {
        let cfg = UpstreamConfig {
            workflow_id: " ".into(),
            ..config()
        };
        assert!(matches!(
            SessionClient::new(&cfg).unwrap_err(),
            UpstreamError::Config(_)
        ));
    }

    #[test]
    fn empty_base_url_returns_config_error() {
        let cfg = UpstreamConfig {
            base_url: String::new(),
            ..config()
        };
        assert!(SessionClient::new(&cfg).is_err());
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let cfg = UpstreamConfig {
            api_key: Secret::new("sk-bad\nkey"),
            ..config()
        };
        let err = SessionClient::new(&cfg).unwrap_err();
        assert!(!err.to_string().contains("sk-bad"));
    }

    #[test]
    fn trailing_slash_stripped_from_base_url() {
        let cfg = UpstreamConfig {
            base_url: "https://api.openai.com/".into(),
            ..config()
        };
        let client = SessionClient::new(&cfg).unwrap();
        assert_eq!(
            client.api_url(SESSIONS_PATH),
            "https://api.openai.com/v1/chatkit/sessions"
        );
    }

    #[test]
    fn debug_does_not_leak_api_key() {
        let client = SessionClient::new(&config()).unwrap();
        let out = format!("{client:?}");
        assert!(!out.contains("sk-test-key"), "leaked: {out}");
    }

    #[test]
    fn create_body_shape() {
        let body = CreateSessionBody {
            workflow: WorkflowRef { id: "wf_abc" },
            user: "u-1",
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"workflow": {"id": "wf_abc"}, "user": "u-1"})
        );
    }

    #[test]
    fn error_message_from_nested_object() {
        let body = r#"{"error": {"message": "Invalid workflow", "type": "invalid_request_error"}}"#;
        assert_eq!(error_message(body, Some("Bad Request")), "Invalid workflow");
    }

    #[test]
    fn error_message_from_flat_string() {
        assert_eq!(error_message(r#"{"error": "nope"}"#, None), "nope");
    }

    #[test]
    fn error_message_falls_back_to_text_then_reason() {
        assert_eq!(error_message("  upstream down \n", None), "upstream down");
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("", None), "Unknown");
    }

    #[test]
    fn status_only_for_api_errors() {
        let api = UpstreamError::Api {
            status: 429,
            message: "slow down".into(),
        };
        assert_eq!(api.status(), Some(429));
        assert_eq!(UpstreamError::Decode("x".into()).status(), None);
    }
}
