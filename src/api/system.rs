//! System maintenance endpoints

use super::{ApiResponse, AppState};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct SystemHealth {
    pub status: &'static str,
    pub database: &'static str,
    pub uptime: String,
    pub uptime_seconds: u64,
    pub version: &'static str,
}

/// GET /api/v1/system/logs
pub async fn logs() -> Json<ApiResponse<Value>> {
    let entries = vec![LogEntry {
        timestamp: Utc::now(),
        level: "INFO",
        message: "System running normally".to_string(),
    }];
    Json(ApiResponse::data(json!({ "logs": entries })))
}

/// POST /api/v1/system/backup
///
/// Only mints an identifier; no snapshot is written.
pub async fn create_backup() -> Json<ApiResponse<Value>> {
    let backup_id = backup_id(Utc::now());
    info!("💾 Backup requested: {}", backup_id);
    Json(ApiResponse::with_message(
        "Backup created successfully",
        json!({ "backup_id": backup_id }),
    ))
}

/// GET /api/v1/system/health
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<SystemHealth>> {
    let database = match state.db.ping().await {
        Ok(()) => "connected",
        Err(e) => {
            warn!("Store ping failed: {}", e);
            "disconnected"
        }
    };
    let uptime = state.started_at.elapsed();

    Json(ApiResponse::data(SystemHealth {
        status: if database == "connected" { "healthy" } else { "degraded" },
        database,
        uptime: format_uptime(uptime),
        uptime_seconds: uptime.as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

fn backup_id(now: DateTime<Utc>) -> String {
    format!("backup_{}", now.format("%Y%m%d_%H%M%S"))
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}
