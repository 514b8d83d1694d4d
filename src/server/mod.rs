use anyhow::{Context, Result};
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod events;
pub mod handlers;
pub mod refresh;
pub mod state;

pub use self::state::AppState;
use handlers::{
    get_all_hubs, get_calibration, get_connections, get_hub, get_positions, get_settings,
    get_status, import_events_stream, index_html, project_point, reload_hubs, script_js,
    style_css, update_settings,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_html))
        .route("/style.css", get(style_css))
        .route("/script.js", get(script_js))
        .route("/api/status", get(get_status))
        .route("/api/hubs", get(get_all_hubs))
        .route("/api/hubs/:id", get(get_hub))
        .route("/api/positions", get(get_positions))
        .route("/api/connections", get(get_connections))
        .route("/api/calibration", get(get_calibration))
        .route("/api/project", post(project_point))
        .route("/api/settings", get(get_settings).post(update_settings))
        .route("/api/reload", post(reload_hubs))
        .route("/api/events", get(import_events_stream))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
    }
}
