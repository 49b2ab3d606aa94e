use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};

use super::models::RoomRecord;
use crate::shared::AppError;

/// Identifier-allocation authority for rooms. A room id is externally
/// resolvable only after `create_room` has persisted it.
#[async_trait]
pub trait RoomRepository {
    async fn create_room(&self, room: &RoomRecord) -> Result<(), AppError>;
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, AppError>;
}

/// In-memory implementation of RoomRepository for development and testing
pub struct InMemoryRoomRepository {
    rooms: Mutex<HashMap<String, RoomRecord>>,
}

impl Default for InMemoryRoomRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRoomRepository {
    /// Creates a new empty in-memory repository
    pub fn new() -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RoomRepository for InMemoryRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomRecord) -> Result<(), AppError> {
        debug!(room_id = %room.id, "Creating room in memory");

        let mut rooms = self.rooms.lock().unwrap();
        if rooms.contains_key(&room.id) {
            warn!(room_id = %room.id, "Room already exists in memory");
            return Err(AppError::DatabaseError("Room already exists".to_string()));
        }
        rooms.insert(room.id.clone(), room.clone());

        debug!(room_id = %room.id, "Room created successfully in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, AppError> {
        debug!(room_id = %room_id, "Fetching room from memory");

        let rooms = self.rooms.lock().unwrap();
        let room = rooms.get(room_id).cloned();

        match &room {
            Some(_) => debug!(room_id = %room_id, "Room found in memory"),
            None => debug!(room_id = %room_id, "Room not found in memory"),
        }

        Ok(room)
    }
}

/// PostgreSQL implementation of RoomRepository for production use
pub struct PostgresRoomRepository {
    pool: PgPool,
}

impl PostgresRoomRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomRepository for PostgresRoomRepository {
    #[instrument(skip(self, room))]
    async fn create_room(&self, room: &RoomRecord) -> Result<(), AppError> {
        debug!(room_id = %room.id, "Creating room in database");

        sqlx::query("INSERT INTO chat_rooms (id, created_at) VALUES ($1, $2)")
            .bind(&room.id)
            .bind(room.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create room in database");
                AppError::DatabaseError(e.to_string())
            })?;

        debug!(room_id = %room.id, "Room created successfully in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<RoomRecord>, AppError> {
        debug!(room_id = %room_id, "Fetching room from database");

        let row = sqlx::query("SELECT id, created_at FROM chat_rooms WHERE id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, room_id = %room_id, "Failed to fetch room from database");
                AppError::DatabaseError(e.to_string())
            })?;

        Ok(row.map(|row| RoomRecord {
            id: row.get("id"),
            created_at: row.get("created_at"),
        }))
    }
}
