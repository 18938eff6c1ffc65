//! REST API server for koemo.
//!
//! Provides HTTP endpoints for:
//! - Recording control (start/stop, status)
//! - Memo storage (list, get, save, delete)
//! - Memo playback (play/toggle, stop)

pub mod error;
pub mod routes;

use crate::config::Config;
use crate::session::SessionCoordinator;
use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;

pub use routes::memos::MemosApiState;
pub use routes::session::SessionApiState;

pub struct ApiServer {
    port: u16,
    session_state: SessionApiState,
    memos_state: MemosApiState,
}

impl ApiServer {
    pub fn new(coordinator: Arc<SessionCoordinator>, config: &Config) -> Self {
        Self {
            port: config.api.port,
            session_state: SessionApiState {
                coordinator: coordinator.clone(),
            },
            memos_state: MemosApiState {
                coordinator,
                default_color: config.memos.default_color.clone(),
            },
        }
    }

    pub async fn start(self) -> Result<()> {
        let app = Router::new()
            .route("/", get(status))
            .route("/version", get(version))
            .merge(routes::session::router(self.session_state))
            .merge(routes::memos::router(self.memos_state))
            .layer(ServiceBuilder::new());

        let listener = tokio::net::TcpListener::bind(&format!("127.0.0.1:{}", self.port)).await?;

        info!("API server listening on http://127.0.0.1:{}", self.port);
        info!("Endpoints:");
        info!("  GET    /                - Service info");
        info!("  GET    /version         - Version info");
        info!("  POST   /record/start    - Start recording");
        info!("  POST   /record/stop     - Stop recording");
        info!("  GET    /status          - Session status");
        info!("  POST   /playback/stop   - Stop playback");
        info!("  GET    /memos           - List/search memos");
        info!("  POST   /memos           - Save memo (from transcript or text)");
        info!("  GET    /memos/:id       - Get memo");
        info!("  DELETE /memos/:id       - Delete memo");
        info!("  POST   /memos/:id/play  - Play or toggle-stop memo");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "koemo",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

async fn version() -> Json<Value> {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "name": "koemo"
    }))
}
