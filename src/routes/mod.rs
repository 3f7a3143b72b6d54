//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the WebSocket endpoint, the small JSON API, and the
//! static whiteboard client under a single Axum router. The client's assets
//! are served from `STATIC_DIR` at `/static`, and `/` falls through to its
//! `index.html`.

pub mod api;
pub mod ws;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// WebSocket and JSON API routes.
fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/stats", get(api::stats))
        .route("/ws/{client_id}", get(ws::handle_ws))
        .route("/api/v1/info", get(api::info))
        .route("/api/v1/health", get(api::health))
        .route("/api/v1/ai-assist", post(api::ai_assist))
        .layer(cors)
        .with_state(state)
}

/// Full application router: API routes plus the static client.
pub fn app(state: AppState) -> Router {
    let static_dir = PathBuf::from(&state.config.static_dir);
    let index = ServeFile::new(static_dir.join("index.html"));

    api_routes(state)
        .nest_service("/static", ServeDir::new(&static_dir))
        .fallback_service(ServeDir::new(&static_dir).fallback(index))
        .layer(TraceLayer::new_for_http())
}

/// Best-effort origin address: first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer.
pub(crate) fn client_address(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return Some(ip.to_string());
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return Some(ip.to_string());
    }

    peer.map(|addr| addr.ip().to_string())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
