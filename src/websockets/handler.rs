use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::HubConfig;
use crate::hub::{Client, RoomHandle, UserIdentity};
use crate::session::service::SessionService;
use crate::shared::{AppError, AppState};

/// WebSocket endpoint that handles authentication via Sec-WebSocket-Protocol header
/// GET /ws/{room_id} with JWT token in Sec-WebSocket-Protocol header
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    info!(room_id = %room_id, "WebSocket connection requested");

    if !is_valid_room_id(&room_id) {
        warn!(room_id = %room_id, "Malformed room identifier");
        return Err(AppError::InvalidRequest(
            "Malformed room identifier".to_string(),
        ));
    }

    // Extract JWT from Sec-WebSocket-Protocol header
    let jwt_token = headers
        .get("sec-websocket-protocol")
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing or invalid Sec-WebSocket-Protocol header");
            AppError::Unauthorized("Missing authentication token".to_string())
        })?;

    // Validate the token and resolve the identity it carries
    let session_service = SessionService::new(
        Arc::clone(&state.session_repository),
        state.token_config.clone(),
    );
    let identity = session_service.validate_session(jwt_token).await?;

    info!(
        room_id = %room_id,
        username = %identity.username,
        "WebSocket authentication successful"
    );

    // Resolve the live room; unknown or terminated rooms reject the join
    let room = state.registry.resolve(&room_id).await.ok_or_else(|| {
        warn!(room_id = %room_id, "Room not found, rejecting WebSocket connection");
        AppError::NotFound("Room not found".to_string())
    })?;

    let hub_config = state.hub_config.clone();
    Ok(ws.on_upgrade(move |socket| handle_websocket_connection(socket, room, identity, hub_config)))
}

/// Room identifiers are generated pet names: lowercase words joined by
/// dashes. Anything else is rejected before touching the session store.
fn is_valid_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id.len() <= 64
        && room_id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Handle the upgraded WebSocket connection
async fn handle_websocket_connection(
    socket: axum::extract::ws::WebSocket,
    room: RoomHandle,
    identity: UserIdentity,
    hub_config: HubConfig,
) {
    let room_id = room.id().to_string();
    let username = identity.username.clone();

    // The client owns the connection exclusively: one half per pump
    let (sink, stream) = socket.split();
    let client = Client::new(
        room,
        identity,
        Box::new(sink),
        Box::new(stream),
        hub_config,
    );

    match client.start().await {
        Ok(handle) => {
            info!(
                room_id = %room_id,
                username = %username,
                client_id = %handle.client_id(),
                "WebSocket connection established"
            );
            handle.closed().await;
            info!(
                room_id = %room_id,
                username = %username,
                "WebSocket connection closed"
            );
        }
        Err(_) => {
            // Room terminated between resolve and register; dropping the
            // socket halves closes the connection
            warn!(
                room_id = %room_id,
                username = %username,
                "Room closed during join"
            );
        }
    }
}
