// Public API - what other modules can use
pub use client::{Client, ClientHandle};
pub use message::{ChatFrame, ChatMessage, UserIdentity};
pub use registry::RoomRegistry;
pub use room::{ClientId, Registration, RoomClosed, RoomHandle};
pub use socket::{FrameSink, FrameStream, InboundFrame, SocketError};

// Internal modules
mod client;
mod message;
mod registry;
mod room;
mod socket;
