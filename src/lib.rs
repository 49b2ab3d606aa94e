// Library crate for the parley chat server
// This file exposes the public API for integration tests

pub mod config;
pub mod hub;
pub mod room;
pub mod session;
pub mod shared;
pub mod websockets;

// Re-export commonly used types for easier access in tests
pub use config::HubConfig;
pub use hub::{
    ChatFrame, ChatMessage, Client, ClientHandle, FrameSink, FrameStream, InboundFrame,
    Registration, RoomHandle, RoomRegistry, SocketError, UserIdentity,
};
pub use shared::{AppError, AppState};
