use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{service::RoomService, types::RoomResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new room
///
/// POST /room
/// Takes no body; returns the newly allocated room identifier
#[instrument(name = "create_room", skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<RoomResponse>), AppError> {
    info!("Creating new room");

    // Use injected collaborators from app state
    let service = RoomService::new(Arc::clone(&state.room_repository), state.registry.clone());
    let room = service.create_room().await?;

    info!(room_id = %room.id, "Room created successfully");

    Ok((StatusCode::CREATED, Json(room)))
}
