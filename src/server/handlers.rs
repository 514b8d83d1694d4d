use axum::{
    extract::{Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{sse::Event as SseEvent, IntoResponse, Json, Response, Sse},
};
use rust_embed::RustEmbed;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{error, info, warn};

use super::events::ImportEvent;
use super::refresh::run_import;
use super::state::AppState;
use crate::connections::{connection_rng, generate_connections, Connection};
use crate::database::Hub;
use crate::projection::{
    layout, project, CalibrationPoint, GeoPoint, PlacedHub, Placement, ProjectedPosition,
    CALIBRATION_POINTS,
};
use crate::settings::Settings;

#[derive(RustEmbed)]
#[folder = "frontend/"]
struct Asset;

// Hub record plus where its marker goes
#[derive(Serialize, Debug)]
pub struct HubView {
    #[serde(flatten)]
    pub hub: Hub,
    pub x: f64,
    pub y: f64,
    pub placement: Placement,
}

#[derive(Serialize, Debug)]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub hubs: usize,
    pub uptime_secs: u64,
}

#[derive(Deserialize, Debug, Default)]
pub struct ConnectionQuery {
    pub seed: Option<u64>,
}

/// A connection resolved against the layout it was drawn from, so clients do
/// not need a matching `/api/hubs` response to render it
#[derive(Serialize, Debug)]
pub struct ConnectionView {
    #[serde(flatten)]
    pub connection: Connection,
    pub from_id: String,
    pub to_id: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

#[derive(Serialize, Debug)]
pub struct ConnectionsResponse {
    pub seed: Option<u64>,
    pub connections: Vec<ConnectionView>,
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    error!(error = %e, "hub store error");
    StatusCode::INTERNAL_SERVER_ERROR
}

fn load_layout(state: &AppState) -> Result<(Vec<Hub>, Vec<PlacedHub>), StatusCode> {
    let hubs = state.store.get_all_hubs().map_err(internal_error)?;
    let placed = layout(&hubs);
    Ok((hubs, placed))
}

fn hub_view(hub: Hub, placed: &PlacedHub) -> HubView {
    HubView {
        hub,
        x: placed.position.x,
        y: placed.position.y,
        placement: placed.placement,
    }
}

pub async fn get_status(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    let hubs = state.store.get_hubs_count().map_err(internal_error)?;
    Ok(Json(StatusResponse {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        status: "ok",
        hubs,
        uptime_secs: state.started_at.elapsed().as_secs(),
    }))
}

pub async fn get_all_hubs(State(state): State<AppState>) -> Result<Json<Vec<HubView>>, StatusCode> {
    let (hubs, placed) = load_layout(&state)?;
    let views = hubs
        .into_iter()
        .zip(placed.iter())
        .map(|(hub, placed)| hub_view(hub, placed))
        .collect();
    Ok(Json(views))
}

/// One hub; its ring position depends on the whole list so the layout is rebuilt
pub async fn get_hub(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HubView>, StatusCode> {
    if state.store.get_hub(&id).map_err(internal_error)?.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let (hubs, placed) = load_layout(&state)?;
    hubs
        .into_iter()
        .zip(placed.iter())
        .find(|(hub, _)| hub.id == id)
        .map(|(hub, placed)| Json(hub_view(hub, placed)))
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_positions(State(state): State<AppState>) -> Result<Json<Vec<PlacedHub>>, StatusCode> {
    let (_, placed) = load_layout(&state)?;
    Ok(Json(placed))
}

pub async fn get_connections(
    State(state): State<AppState>,
    Query(query): Query<ConnectionQuery>,
) -> Result<Json<ConnectionsResponse>, StatusCode> {
    let (_, placed) = load_layout(&state)?;
    let positions: Vec<ProjectedPosition> = placed.iter().map(|p| p.position).collect();
    let params = state.settings().connection_params();

    let mut rng = connection_rng(query.seed);
    let connections = generate_connections(&positions, &params, &mut rng)
        .into_iter()
        .map(|connection| {
            let from = &placed[connection.from];
            let to = &placed[connection.to];
            ConnectionView {
                from_id: from.id.clone(),
                to_id: to.id.clone(),
                x1: from.position.x,
                y1: from.position.y,
                x2: to.position.x,
                y2: to.position.y,
                connection,
            }
        })
        .collect();

    Ok(Json(ConnectionsResponse {
        seed: query.seed,
        connections,
    }))
}

pub async fn get_calibration() -> Json<Vec<CalibrationPoint>> {
    Json(CALIBRATION_POINTS.to_vec())
}

pub async fn project_point(
    Json(point): Json<GeoPoint>,
) -> Result<Json<ProjectedPosition>, (StatusCode, Json<serde_json::Value>)> {
    project(point.lat, point.lng).map(Json).map_err(|e| {
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({ "status": "error", "message": e.to_string() })),
        )
    })
}

// API endpoint to get current settings
pub async fn get_settings(State(state): State<AppState>) -> Json<Settings> {
    Json(state.settings())
}

// API endpoint to update settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(new_settings): Json<Settings>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let new_settings = new_settings.sanitized();
    if let Err(e) = new_settings.save_to(&state.settings_path) {
        error!(error = %e, "failed to save settings");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    state.replace_settings(new_settings);

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Settings updated successfully"
    })))
}

// API endpoint to re-import hubs in the background
pub async fn reload_hubs(State(state): State<AppState>) -> Json<serde_json::Value> {
    let Some(dir) = state.settings().hubs_folder else {
        return Json(serde_json::json!({
            "status": "error",
            "message": "No hubs folder configured"
        }));
    };

    info!(dir = %dir, "reload requested");
    tokio::spawn(async move {
        if let Err(e) = run_import(&state).await {
            warn!(error = %e, "requested hub import failed");
        }
    });

    Json(serde_json::json!({
        "status": "started",
        "message": format!("Importing hubs from {}", dir)
    }))
}

// SSE endpoint for import updates
pub async fn import_events_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let (tx, rx) = mpsc::channel(100);
    let mut event_receiver = state.event_sender.subscribe();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                event = event_receiver.recv() => match event {
                    Ok(import_event) => import_event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "SSE client lagging behind");
                        continue;
                    }
                    Err(_) => break,
                },
                _ = tokio::time::sleep(Duration::from_secs(30)) => ImportEvent::heartbeat(),
            };

            let sse_event = SseEvent::default()
                .json_data(&event)
                .unwrap_or_else(|_| SseEvent::default().data("Error serializing event"));

            if tx.send(Ok(sse_event)).await.is_err() {
                break; // Client disconnected
            }
        }
    });

    Sse::new(ReceiverStream::new(rx)).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive-message"),
    )
}

fn embedded(path: &str, content_type: &'static str) -> Response {
    match Asset::get(path) {
        Some(file) => (
            [(header::CONTENT_TYPE, content_type)],
            file.data.into_owned(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn index_html() -> Response {
    embedded("index.html", "text/html; charset=utf-8")
}

pub async fn style_css() -> Response {
    embedded("style.css", "text/css")
}

pub async fn script_js() -> Response {
    embedded("script.js", "application/javascript")
}
