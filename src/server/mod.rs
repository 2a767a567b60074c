//! HTTP chat endpoint
//!
//! Exposes the orchestrator to the chat UI.

mod chat;
mod error;

use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::Orchestrator;
use crate::core::{ChatError, Result};

pub use chat::{ChatRequest, ChatResponse, IncomingMessage};
pub use error::{ApiError, ApiErrorBody};

/// Shared handler state
pub struct ServerState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Build the application router
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = Arc::new(ServerState { orchestrator });
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat::chat))
        .with_state(state)
        .layer(cors)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, orchestrator: Arc<Orchestrator>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!("chat endpoint listening on http://{}", local);

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ChatError::from)
}
