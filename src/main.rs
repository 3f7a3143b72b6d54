mod config;
mod llm;
mod message;
mod rate_limit;
mod routes;
mod services;
mod state;
mod validate;

use std::net::SocketAddr;
use std::sync::Arc;

use config::{APP_NAME, APP_VERSION, Config};
use llm::{LlmClient, LlmVision};

#[tokio::main]
async fn main() {
    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level())
        .init();

    let llm: Option<Arc<dyn LlmVision>> = match LlmClient::from_env() {
        Ok(client) => {
            tracing::info!(model = client.model(), "ai assist enabled");
            Some(Arc::new(client))
        }
        Err(e) => {
            tracing::warn!(error = %e, "ai assist disabled");
            None
        }
    };

    let bind_addr = config.bind_addr();
    let state = state::AppState::new(config, llm);

    // Spawn background inactivity reaper.
    let _reaper = services::reaper::spawn_reaper_task(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("failed to bind");

    tracing::info!(addr = %bind_addr, version = APP_VERSION, "{APP_NAME} listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("server failed");
}
