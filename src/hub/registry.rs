use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::room::RoomHandle;

/// Live directory of rooms: room id -> running control loop.
///
/// Only rooms present here are joinable; persisted records without a
/// live handle resolve to nothing.
#[derive(Clone)]
pub struct RoomRegistry {
    // room id -> handle
    rooms: Arc<RwLock<HashMap<String, RoomHandle>>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Spawns a room's control loop and publishes its handle.
    pub async fn open(&self, room_id: String) -> RoomHandle {
        let handle = RoomHandle::open(room_id.clone());
        let mut rooms = self.rooms.write().await;
        if let Some(previous) = rooms.insert(room_id.clone(), handle.clone()) {
            warn!(room_id = %room_id, "Replacing existing room handle");
            previous.close();
        }
        handle
    }

    /// Resolves a room id to its live handle. Unknown ids and rooms
    /// that have already terminated both come back as None.
    pub async fn resolve(&self, room_id: &str) -> Option<RoomHandle> {
        let stale = {
            let rooms = self.rooms.read().await;
            match rooms.get(room_id) {
                Some(handle) if !handle.is_closed() => return Some(handle.clone()),
                Some(_) => true,
                None => false,
            }
        };

        if stale {
            // Lazily prune the dead handle
            let mut rooms = self.rooms.write().await;
            if rooms.get(room_id).is_some_and(|h| h.is_closed()) {
                rooms.remove(room_id);
                debug!(room_id = %room_id, "Pruned terminated room");
            }
        }
        None
    }

    /// Terminates a room and removes it from the directory. Returns
    /// false if the id was unknown.
    pub async fn close(&self, room_id: &str) -> bool {
        let mut rooms = self.rooms.write().await;
        match rooms.remove(room_id) {
            Some(handle) => {
                handle.close();
                info!(room_id = %room_id, "Room closed");
                true
            }
            None => false,
        }
    }

    /// Terminates every room. Used during process shutdown.
    pub async fn close_all(&self) {
        let mut rooms = self.rooms.write().await;
        let count = rooms.len();
        for (_, handle) in rooms.drain() {
            handle.close();
        }
        info!(rooms = count, "All rooms closed");
    }

    /// Number of live rooms currently registered.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}
