use serde::{Deserialize, Serialize};

/// Response for room creation
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub id: String,
}
