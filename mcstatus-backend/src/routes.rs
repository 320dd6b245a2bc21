use crate::AppState;
use crate::error::AppError;
use crate::helpers::{now, request_ip, rfc3339, uptime_secs, user_agent};

use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use serde::Serialize;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;

/// Public endpoints and what they serve.
pub(crate) const ENDPOINTS: [(&str, &str); 3] = [
    ("/api/status", "Current status of the Minecraft server"),
    ("/api/health", "Health check of this API"),
    ("/api/docs", "This documentation"),
];

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    timestamp: String,
    uptime: f64,
}

#[debug_handler]
pub(crate) async fn status(
    State(state): State<Arc<AppState>>,
    peer: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
) -> Response {
    let record = state.cache.get_status().await;
    let peer = peer.map(|Extension(ConnectInfo(addr))| addr);

    tracing::info!(
        ip = %request_ip(&headers, peer),
        user_agent = user_agent(&headers).unwrap_or("unknown"),
        online = record.online,
        "Status request"
    );

    Json(record.as_ref()).into_response()
}

pub(crate) async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        timestamp: rfc3339(now()),
        uptime: uptime_secs(state.started_at),
    })
}

pub(crate) async fn docs() -> Json<Value> {
    let endpoints: serde_json::Map<String, Value> = ENDPOINTS
        .iter()
        .map(|(path, description)| (path.to_string(), Value::from(*description)))
        .collect();

    Json(json!({
        "name": "Minecraft Server Status API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": endpoints,
        "example": {
            "status": "/api/status",
            "health": "/api/health",
        },
    }))
}

pub(crate) async fn not_found() -> AppError {
    AppError::NotFound
}
