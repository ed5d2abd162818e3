//! HTTP status sink
//!
//! Serves the latest orchestrator snapshot for external dashboards and
//! process supervision (systemd/launchd liveness checks).

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::info;

use crate::coordination::ShutdownSignal;
use crate::error::{Result, SwitchboardError};
use crate::orchestrator::OrchestratorSnapshot;

/// Shared state for the status server
pub struct StatusState {
    pub started_at: DateTime<Utc>,
    snapshots: watch::Receiver<OrchestratorSnapshot>,
}

impl StatusState {
    pub fn new(snapshots: watch::Receiver<OrchestratorSnapshot>) -> Self {
        Self {
            started_at: Utc::now(),
            snapshots,
        }
    }

    pub fn latest(&self) -> OrchestratorSnapshot {
        self.snapshots.borrow().clone()
    }
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    uptime_seconds: u64,
    running: usize,
    #[serde(flatten)]
    snapshot: OrchestratorSnapshot,
}

/// Routes: `GET /health` and `GET /status`
pub fn router(state: Arc<StatusState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Status server listening on `addr`
pub struct StatusServer {
    state: Arc<StatusState>,
    addr: SocketAddr,
}

impl StatusServer {
    pub fn new(snapshots: watch::Receiver<OrchestratorSnapshot>, addr: SocketAddr) -> Self {
        Self {
            state: Arc::new(StatusState::new(snapshots)),
            addr,
        }
    }

    /// Serve until a shutdown signal arrives
    pub async fn run(&self, mut shutdown: broadcast::Receiver<ShutdownSignal>) -> Result<()> {
        let app = router(Arc::clone(&self.state));

        info!(addr = %self.addr, "starting status server");

        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await
            .map_err(|e| SwitchboardError::Internal(format!("status server error: {e}")))?;

        Ok(())
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn status_handler(State(state): State<Arc<StatusState>>) -> impl IntoResponse {
    let snapshot = state.latest();
    let uptime = (Utc::now() - state.started_at).num_seconds().max(0) as u64;

    Json(StatusResponse {
        uptime_seconds: uptime,
        running: snapshot.running_count(),
        snapshot,
    })
}
