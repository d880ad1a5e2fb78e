//! `ChatKit` token server
//!
//! Serves `/api/chatkit/start` and `/api/chatkit/refresh` for the chat widget.

use clap::Parser;
use tracing::info;

use chatkit_relay::config::RelayArgs;
use chatkit_relay::routes::{AppState, build_router};
use chatkit_relay::upstream::SessionClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let args = RelayArgs::parse();

    chatkit_core::tracing_init::init_tracing("chatkit_relay=info,tower_http=info", args.log_json)?;
    args.validate()?;

    let sessions = SessionClient::new(&args.upstream_config())?;
    let addr = args.listen_addr();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        api_base = %args.api_base,
        workflow_id = %sessions.workflow_id(),
        refresh_mode = %args.refresh_mode,
        error_mode = %args.error_mode,
        "Starting chatkit-relay"
    );

    let app = build_router(AppState::new(sessions, args.refresh_mode, args.error_mode));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("ChatKit token server listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}
