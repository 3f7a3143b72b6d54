//! JSON API — service info, health, connection stats, and AI assist.

use std::net::SocketAddr;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Json;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::config::{APP_DESCRIPTION, APP_NAME, APP_VERSION};
use crate::message::ErrorCode;
use crate::rate_limit::RateLimiter;
use crate::services::ai::{self, AiError};
use crate::services::session::SessionInfo;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AiAssistRequest {
    /// `data:image/...;base64,...` snapshot of the canvas.
    pub image_data: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AiAssistResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpretation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiAssistResponse {
    fn ok(interpretation: String) -> Self {
        Self { success: true, interpretation: Some(interpretation), error: None }
    }

    fn failed(error: impl Into<String>) -> Self {
        Self { success: false, interpretation: None, error: Some(error.into()) }
    }
}

#[derive(Debug, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub connections: Vec<SessionInfo>,
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /ws/stats`
pub async fn stats(State(state): State<AppState>) -> Json<ConnectionStats> {
    let connections = state.sessions.connection_info().await;
    Json(ConnectionStats { total_connections: connections.len(), connections })
}

/// `GET /api/v1/info`
pub async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "name": APP_NAME,
        "description": APP_DESCRIPTION,
        "version": APP_VERSION,
        "features": {
            "ai_assist": state.llm.is_some(),
            "real_time_collaboration": true,
            "canvas_drawing": true,
        },
        "limits": {
            "max_stroke_points": config.max_stroke_points,
            "board_log_max_actions": config.board_log_max_actions,
            "ws_rate_limit": describe_limit(&state.ws_limiter),
            "ai_rate_limit": describe_limit(&state.ai_limiter),
        },
    }))
}

/// `GET /api/v1/health`. 200 when healthy, 503 when the configured AI
/// backend fails its probe.
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let available = state.llm.is_some();
    let healthy = available && ai::health(state.llm()).await;
    let status = if healthy || !available { "healthy" } else { "degraded" };
    let code = if status == "healthy" { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    let body = json!({
        "status": status,
        "service": APP_NAME,
        "version": APP_VERSION,
        "timestamp": unix_now(),
        "connections": state.sessions.count().await,
        "board_actions": state.board.len().await,
        "ai_service": { "available": available, "healthy": healthy },
    });
    (code, Json(body))
}

/// `POST /api/v1/ai-assist`
pub async fn ai_assist(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<AiAssistRequest>,
) -> Response {
    let identifier = super::client_address(&headers, Some(peer)).unwrap_or_else(|| "unknown".into());
    assist(&state, &identifier, &request.image_data).await
}

pub(crate) async fn assist(state: &AppState, identifier: &str, image_data: &str) -> Response {
    if let Err(e) = state.ai_limiter.check(identifier) {
        warn!(%identifier, "ai assist rate limit exceeded");
        let retry_after = e.retry_after_secs().unwrap_or(1).to_string();
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(AiAssistResponse::failed("Rate limit exceeded. Please try again later.")),
        )
            .into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    info!(%identifier, "processing ai assist request");
    match ai::interpret(state.llm(), image_data).await {
        Ok(interpretation) => {
            info!(%identifier, "ai assist completed");
            Json(AiAssistResponse::ok(interpretation)).into_response()
        }
        Err(e) => {
            error!(%identifier, error = %e, "ai assist failed");
            (ai_error_status(&e), Json(AiAssistResponse::failed(e.to_string()))).into_response()
        }
    }
}

/// Configuration and input problems get an HTTP status; model-side failures
/// are reported in a 200 body with `success: false`.
fn ai_error_status(err: &AiError) -> StatusCode {
    match err {
        AiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        AiError::InvalidImage => StatusCode::BAD_REQUEST,
        AiError::Timeout | AiError::Upstream(_) | AiError::EmptyResponse | AiError::ResponseTooShort => StatusCode::OK,
    }
}

fn describe_limit(limiter: &RateLimiter) -> String {
    format!("{} requests per {} seconds", limiter.max_requests(), limiter.window().as_secs())
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0.0, |d| d.as_secs_f64())
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
