use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chatkit_core::session::from_body;
use chatkit_core::{RefreshRequest, SessionCredential, StartRequest};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, error, info};

use crate::config::{ErrorMode, RefreshMode};
use crate::upstream::{SessionClient, UpstreamError};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionClient>,
    pub refresh_mode: RefreshMode,
    pub error_mode: ErrorMode,
}

impl AppState {
    pub fn new(sessions: SessionClient, refresh_mode: RefreshMode, error_mode: ErrorMode) -> Self {
        Self {
            sessions: Arc::new(sessions),
            refresh_mode,
            error_mode,
        }
    }
}

/// Which relay endpoint failed; picks the generic error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Start,
    Refresh,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Refresh => "refresh",
        })
    }
}

/// Errors returned to the widget as `{"error": ".."}`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] chatkit_core::Error),

    #[error("currentClientSecret is required")]
    MissingClientSecret,

    #[error("Failed to {op} ChatKit session")]
    Upstream {
        op: Operation,
        mode: ErrorMode,
        source: UpstreamError,
    },
}

impl RelayError {
    /// Log an upstream failure and wrap it for the response.
    fn upstream(op: Operation, mode: ErrorMode, source: UpstreamError) -> Self {
        error!(op = %op, status = ?source.status(), error = %source, "ChatKit session request failed");
        Self::Upstream { op, mode, source }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            Self::InvalidBody(_) | Self::MissingClientSecret => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            Self::Upstream {
                mode: ErrorMode::Passthrough,
                source: UpstreamError::Api { status, message },
                ..
            } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                message.clone(),
            ),
            Self::Upstream { .. } => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Build the relay router with permissive CORS for the browser widget.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chatkit/start", post(start))
        .route("/api/chatkit/refresh", post(refresh))
        .route("/health", get(health))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `POST /api/chatkit/start` — mint a client secret for the widget.
pub async fn start(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionCredential>, RelayError> {
    let req: StartRequest = from_body(&body)?;
    let credential = state
        .sessions
        .create_session(req.user.as_deref())
        .await
        .map_err(|e| RelayError::upstream(Operation::Start, state.error_mode, e))?;
    info!(op = "start", expires_at = ?credential.expires_at, "ChatKit session started");
    Ok(Json(credential))
}

/// `POST /api/chatkit/refresh` — replace the widget's client secret.
///
/// In `mint` mode the current secret is ignored and a new session is
/// created; in `forward` mode it is exchanged at the upstream.
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SessionCredential>, RelayError> {
    let req: RefreshRequest = from_body(&body)?;
    let result = match state.refresh_mode {
        RefreshMode::Mint => {
            debug!(
                has_current_secret = req.current_client_secret.is_some(),
                "Refreshing by minting a new session"
            );
            state.sessions.create_session(req.user.as_deref()).await
        }
        RefreshMode::Forward => {
            let current = req
                .current_client_secret
                .filter(|s| !s.is_empty())
                .ok_or(RelayError::MissingClientSecret)?;
            state.sessions.refresh_session(&current).await
        }
    };
    let credential =
        result.map_err(|e| RelayError::upstream(Operation::Refresh, state.error_mode, e))?;
    info!(op = "refresh", mode = %state.refresh_mode, expires_at = ?credential.expires_at, "ChatKit session refreshed");
    Ok(Json(credential))
}

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
