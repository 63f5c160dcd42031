//! HTTP API gateway for Agora.
//!
//! Research runs are launched in the background and tracked by task id;
//! clients poll for status and download the Markdown report once the run
//! completes.
//!
//! Built on Axum.

mod api;
pub mod services;
pub mod tasks;

use std::sync::Arc;

use agora_config::AppConfig;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use services::Services;
use tasks::TaskManager;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub services: Services,
    pub tasks: TaskManager,
}

impl GatewayState {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            tasks: TaskManager::new(),
        }
    }
}

pub type SharedState = Arc<GatewayState>;

/// Build the router with every API route and the standard layers:
/// permissive CORS, a 1 MB body limit and HTTP trace logging.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600));

    api::api_router(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// Services are built once and shared by every run the server launches.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let services = Services::from_config(&config)?;
    let app = build_router(Arc::new(GatewayState::new(services)));

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
