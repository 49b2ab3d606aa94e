use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::SessionModel,
    repository::SessionRepository,
    token::TokenConfig,
    types::SessionResponse,
};
use crate::hub::UserIdentity;
use crate::shared::AppError;

/// Service for session creation and validation
pub struct SessionService {
    repository: Arc<dyn SessionRepository + Send + Sync>,
    token_config: TokenConfig,
}

impl SessionService {
    pub fn new(
        repository: Arc<dyn SessionRepository + Send + Sync>,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            repository,
            token_config,
        }
    }

    /// Creates a new session with a generated username and JWT token
    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionResponse, AppError> {
        let username = petname::Petnames::default().generate_one(2, "-");
        let session = SessionModel::new(username.clone(), self.token_config.expiration_days);

        self.repository.create_session(&session).await?;

        let token = self.token_config.issue(&session)?;

        info!(
            username = %username,
            session_id = %session.id,
            "Session created successfully"
        );

        Ok(SessionResponse {
            session_id: token,
            user_id: session.id,
            username,
        })
    }

    /// Validates a session token and resolves the identity it carries
    #[instrument(skip(self, token))]
    pub async fn validate_session(&self, token: &str) -> Result<UserIdentity, AppError> {
        // First validate JWT token structure and signature
        let claims = self.token_config.verify(token)?;

        // Then validate session exists in the database and hasn't been revoked
        match self.repository.get_session(&claims.session_id).await? {
            Some(session) => {
                if session.is_expired() {
                    warn!(
                        session_id = %claims.session_id,
                        "Session found in database but has expired"
                    );
                    return Err(AppError::Unauthorized("Session has expired".to_string()));
                }

                Ok(UserIdentity {
                    user_id: session.id,
                    username: session.username,
                })
            }
            None => {
                warn!(
                    session_id = %claims.session_id,
                    "Session not found in database - may have been revoked"
                );
                Err(AppError::Unauthorized(
                    "Session not found or has been revoked".to_string(),
                ))
            }
        }
    }
}
