use crate::directory::InMemoryDebateDirectory;
use crate::room::{Closure, RoomManager};
use crate::signaling;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tribune_core::{DebateRecord, DebateStatus, RoomId};

#[derive(Clone)]
pub struct AppState {
    pub room_manager: RoomManager,
    pub directory: Arc<InMemoryDebateDirectory>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(signaling::ws_handler))
        .route("/health", get(health))
        .route("/internal/debates/{id}", put(upsert_debate))
        .route("/internal/debates/{id}/closed", post(debate_closed))
        .route("/internal/debates/{id}/deleted", post(debate_deleted))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "rooms": state.room_manager.room_count(),
    }))
}

/// The debate service pushes the current record whenever it changes.
async fn upsert_debate(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut record): Json<DebateRecord>,
) -> impl IntoResponse {
    record.id = RoomId::from(id);
    let closed = record.status == DebateStatus::Closed;
    let room_id = record.id.clone();
    state.directory.insert(record);

    if closed {
        state
            .room_manager
            .close_room(&room_id, Closure::Closed)
            .await;
    } else if state.room_manager.reopen(&room_id) {
        info!("Debate {} reopened upstream", room_id);
    }
    StatusCode::NO_CONTENT
}

async fn debate_closed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let room_id = RoomId::from(id);
    state.directory.set_status(&room_id, DebateStatus::Closed);
    let live = state
        .room_manager
        .close_room(&room_id, Closure::Closed)
        .await;
    info!("Debate {} closed upstream (live room: {})", room_id, live);
    StatusCode::NO_CONTENT
}

async fn debate_deleted(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let room_id = RoomId::from(id);
    state.directory.remove(&room_id);
    let live = state
        .room_manager
        .close_room(&room_id, Closure::Deleted)
        .await;
    info!("Debate {} deleted upstream (live room: {})", room_id, live);
    StatusCode::NO_CONTENT
}
