use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Database record for the rooms table
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: String, // Random pet name generated ID
    pub created_at: DateTime<Utc>,
}

impl RoomRecord {
    /// Creates a new room record with a generated identifier
    pub fn new() -> Self {
        let room_id = petname::Petnames::default().generate_one(2, "-");

        Self {
            id: room_id,
            created_at: Utc::now(),
        }
    }
}

impl Default for RoomRecord {
    fn default() -> Self {
        Self::new()
    }
}
