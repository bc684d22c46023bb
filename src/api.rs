//! HTTP API
//!
//! Axum handlers exposing room creation, queue reads/writes, room checks and
//! track search. Queue writes are pushed to WebSocket subscribers by the
//! `RoomServer` actor as part of the write itself.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::AppError;
use crate::search::SearchGateway;
use crate::server::RoomHandle;
use crate::types::{RoomCode, Song};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomHandle,
    pub search: SearchGateway,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomParams {
    #[serde(default)]
    pub auth_tok: String,
}

#[derive(Debug, Deserialize)]
pub struct GetQueueParams {
    pub room_code: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomParams {
    pub room: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub room: String,
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQueueBody {
    pub queue: Vec<Song>,
    pub room: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSongBody {
    pub song: Song,
    pub room: String,
}

#[derive(Debug, Serialize)]
pub struct RoomCreated {
    pub room: RoomCode,
}

#[derive(Debug, Serialize)]
pub struct QueueList {
    pub list: Vec<Song>,
}

#[derive(Debug, Serialize)]
pub struct SongAdded {
    pub song_added: bool,
}

#[derive(Debug, Serialize)]
pub struct RoomExists {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub rooms: usize,
    pub connections: usize,
}

/// Build the router with every endpoint
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/createroom", get(create_room))
        .route("/getqueue", get(get_queue))
        .route("/updatequeue", post(update_queue))
        .route("/addsong", post(add_song))
        .route("/search", get(search))
        .route("/checkroom", get(check_room))
        .with_state(state)
}

// ============ Handlers ============

async fn index(State(state): State<AppState>) -> Result<Json<ServiceInfo>, AppError> {
    let stats = state.rooms.stats().await?;
    Ok(Json(ServiceInfo {
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        rooms: stats.rooms,
        connections: stats.connections,
    }))
}

async fn create_room(
    State(state): State<AppState>,
    Query(params): Query<CreateRoomParams>,
) -> Result<Json<RoomCreated>, AppError> {
    let room = state.rooms.create_room(params.auth_tok).await?;
    Ok(Json(RoomCreated { room }))
}

/// Superseded by the `update_queue` push, kept for older clients
async fn get_queue(
    State(state): State<AppState>,
    Query(params): Query<GetQueueParams>,
) -> Result<Json<QueueList>, AppError> {
    let list = state
        .rooms
        .get_queue(RoomCode::parse(params.room_code))
        .await?;
    Ok(Json(QueueList { list }))
}

async fn update_queue(
    State(state): State<AppState>,
    Json(body): Json<UpdateQueueBody>,
) -> Result<StatusCode, AppError> {
    let room = RoomCode::parse(body.room);
    debug!("Replacing queue of {} ({} songs)", room, body.queue.len());
    state.rooms.replace_queue(room, body.queue).await?;
    Ok(StatusCode::OK)
}

async fn add_song(
    State(state): State<AppState>,
    Json(body): Json<AddSongBody>,
) -> Result<Json<SongAdded>, AppError> {
    let room = RoomCode::parse(body.room);
    match state.rooms.append_song(room.clone(), body.song).await {
        Ok(queue) => {
            info!("Song added to {} ({} in queue)", room, queue.len());
            Ok(Json(SongAdded { song_added: true }))
        }
        Err(AppError::RoomNotFound(_)) => Ok(Json(SongAdded { song_added: false })),
        Err(e) => Err(e),
    }
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Response, AppError> {
    let body = state
        .search
        .search(RoomCode::parse(params.room), &params.query)
        .await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

async fn check_room(
    State(state): State<AppState>,
    Query(params): Query<RoomParams>,
) -> Result<Json<RoomExists>, AppError> {
    let exists = state.rooms.exists(RoomCode::parse(params.room)).await?;
    Ok(Json(RoomExists { exists }))
}

// ============ Error handling ============

impl AppError {
    /// HTTP status reported for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RoomNotFound(_) => StatusCode::NOT_FOUND,
            AppError::CapacityExceeded { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Provider { .. } | AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(serde_json::json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
