//! Middleware for observability and rate limiting.
//!
//! This module provides:
//! - Request logging with latency tracking
//! - Sliding-window rate limiting per client IP

pub mod logging;
pub mod rate_limit;

pub use logging::request_logging;
pub use rate_limit::{rate_limit_middleware, RateLimitDecision, RateLimiter};

use axum::extract::{ConnectInfo, Request};
use std::net::SocketAddr;

/// Client identity for throttling and logs: the peer IP when the server was
/// started with connect info, otherwise a shared `unknown` bucket.
pub(crate) fn client_key(request: &Request) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
