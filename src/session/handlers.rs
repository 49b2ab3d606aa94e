use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{service::SessionService, types::SessionResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new session
///
/// POST /session
/// Returns a JWT token as session_id and generated username
#[instrument(name = "create_session", skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    info!("Creating new session");

    // Use injected collaborators from app state
    let service = SessionService::new(
        Arc::clone(&state.session_repository),
        state.token_config.clone(),
    );
    let session = service.create_session().await?;

    info!(
        username = %session.username,
        session_id_length = session.session_id.len(),
        "Session created successfully"
    );

    Ok(Json(session))
}
