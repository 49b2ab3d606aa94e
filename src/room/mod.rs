// Public API - what other modules can use
pub use handlers::create_room;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
mod types;
