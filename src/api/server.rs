// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! HTTP surface of the embedding worker.
//!
//! One handler route plus a liveness probe. Process and request
//! concurrency belong to the platform in front of this service; the only
//! shared state is the engine once-cell.

use crate::api::embed::run_handler;
use crate::config::WorkerConfig;
use crate::embeddings::{EmbeddingEngine, EngineConfig};
use anyhow::Result;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state.
///
/// The engine is initialized atomically on first use: concurrent first
/// requests race into `get_or_try_init`, exactly one construction runs,
/// and the rest await its outcome. A failed construction is not cached,
/// so a later request may retry.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WorkerConfig>,
    engine: Arc<OnceCell<Arc<EmbeddingEngine>>>,
}

impl AppState {
    pub fn new(config: WorkerConfig) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(OnceCell::new()),
        }
    }

    /// Returns the engine, constructing it on first use.
    pub async fn engine(&self) -> Result<Arc<EmbeddingEngine>> {
        let engine = self
            .engine
            .get_or_try_init(|| async {
                let engine_config = EngineConfig::from(self.config.as_ref());
                EmbeddingEngine::new(engine_config).await.map(Arc::new)
            })
            .await?;
        Ok(engine.clone())
    }

    pub fn engine_ready(&self) -> bool {
        self.engine.initialized()
    }
}

/// Builds the worker router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/run", post(run_handler))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Binds the listener and serves until ctrl-c.
pub async fn start_server(config: WorkerConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    let state = AppState::new(config);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Embedding worker listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.config.model_name,
        "engine_ready": state.engine_ready(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_engine_not_ready_before_first_request() {
        let state = AppState::new(WorkerConfig::default());
        assert!(!state.engine_ready());
    }

    #[test]
    fn test_app_state_clones_share_engine_cell() {
        let state = AppState::new(WorkerConfig::default());
        let clone = state.clone();
        assert!(Arc::ptr_eq(&state.engine, &clone.engine));
        assert!(Arc::ptr_eq(&state.config, &clone.config));
    }
}
