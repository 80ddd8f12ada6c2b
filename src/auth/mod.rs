//! Authentication Module
//! Mission: Secure the back office with bcrypt credentials, JWT sessions and permission checks

pub mod api;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod permissions;
pub mod service;

pub use jwt::JwtHandler;
pub use middleware::{auth_middleware, guarded, require_permission};
pub use service::{AdminService, DefaultAdmin};
