//! Shared state and HTTP API for the Sentra server.

pub mod auth;
pub mod dto;
pub mod error;
pub mod rate_limit;
pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::{AppState, AuthSettings, ServerSettings};
