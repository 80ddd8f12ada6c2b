//! Admin Back-Office Library
//!
//! Exposes the HTTP API, authentication and store modules for the binary
//! and the integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod models;
pub mod store;
pub mod validation;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::ApiError;
pub use store::Database;
