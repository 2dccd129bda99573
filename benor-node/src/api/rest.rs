use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use benor_common::{ConsensusMessage, NodeStatus};
use benor_consensus::ConsensusNode;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

pub type AppState = Arc<ConsensusNode>;

pub fn router(node: AppState) -> Router {
    Router::new()
        .route("/status", get(status_api))
        .route("/getState", get(get_state_api))
        .route("/start", get(start_api))
        .route("/stop", get(stop_api))
        .route("/message", post(message_api))
        .with_state(node)
        .layer(CorsLayer::permissive())
}

pub async fn serve(listener: TcpListener, node: AppState) -> std::io::Result<()> {
    info!("REST API for {} listening on {}", node.id(), listener.local_addr()?);
    axum::serve(listener, router(node)).await
}

/// Liveness probe.
async fn status_api(State(node): State<AppState>) -> (StatusCode, &'static str) {
    if node.is_alive() {
        (StatusCode::OK, "live")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "faulty")
    }
}

async fn get_state_api(State(node): State<AppState>) -> Json<NodeStatus> {
    Json(node.status())
}

async fn start_api(State(node): State<AppState>) -> &'static str {
    if node.start() {
        "started"
    } else {
        "not started"
    }
}

async fn stop_api(State(node): State<AppState>) -> &'static str {
    node.stop();
    "killed"
}

async fn message_api(
    State(node): State<AppState>,
    Json(message): Json<ConsensusMessage>,
) -> (StatusCode, &'static str) {
    if node.deliver(message) {
        (StatusCode::OK, "message received")
    } else {
        debug!("[{}] rejected {:?}", node.id(), message);
        (StatusCode::INTERNAL_SERVER_ERROR, "message discarded")
    }
}
