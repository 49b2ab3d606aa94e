// Public API
pub use handler::websocket_handler;

// Internal modules
mod handler;
