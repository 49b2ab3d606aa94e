// Public API - what other modules can use
pub use handlers::create_session;
pub use token::TokenConfig;
pub use types::SessionClaims;

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
mod token;
mod types;
