use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{models::RoomRecord, repository::RoomRepository, types::RoomResponse};
use crate::hub::{RoomHandle, RoomRegistry};
use crate::shared::AppError;

/// Service for room creation and lookup
pub struct RoomService {
    repository: Arc<dyn RoomRepository + Send + Sync>,
    registry: RoomRegistry,
}

impl RoomService {
    pub fn new(repository: Arc<dyn RoomRepository + Send + Sync>, registry: RoomRegistry) -> Self {
        Self {
            repository,
            registry,
        }
    }

    /// Allocates a new room: persists the identifier, then starts the
    /// control loop and publishes it in the registry.
    ///
    /// Persistence failure surfaces to the caller and no room task is
    /// left running.
    #[instrument(skip(self))]
    pub async fn create_room(&self) -> Result<RoomResponse, AppError> {
        let record = RoomRecord::new();
        debug!(room_id = %record.id, "Generated room ID");

        self.repository.create_room(&record).await?;

        self.registry.open(record.id.clone()).await;

        info!(room_id = %record.id, "Room created successfully");
        Ok(RoomResponse { id: record.id })
    }

    /// Resolves a room id to its live hub. Ids without a live control
    /// loop - never created, or already terminated - are not found.
    #[instrument(skip(self))]
    pub async fn resolve_room(&self, room_id: &str) -> Result<RoomHandle, AppError> {
        self.registry
            .resolve(room_id)
            .await
            .ok_or_else(|| AppError::NotFound("Room not found".to_string()))
    }
}
