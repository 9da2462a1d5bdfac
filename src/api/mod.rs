//! HTTP API host for the agent.
//!
//! Exposes one turn per `POST /api/chat` request. Each request names a
//! session (or gets a fresh one), and turns on the same session run one at
//! a time against that session's history.

mod routes;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::agent::Agent;
use crate::config::Config;
use crate::session::SessionStore;

pub use routes::{router, AppState};

/// Start the HTTP server and run until it stops.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        agent: Agent::new(&config),
        sessions: SessionStore::new(),
    });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}
