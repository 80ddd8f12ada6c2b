//! Customer account management endpoints

use super::{paged, parse_id, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ListQuery};
use crate::error::ApiError;
use crate::models::{
    user::{CreateUserRequest, UpdateUserRequest, DEFAULT_USER_ROLE},
    DocumentId, User,
};
use crate::store::{UserFilter, UserUpdate};
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

/// GET /api/v1/users
pub async fn list_users(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let filter = match query.search() {
        Some(needle) => UserFilter::Search(needle),
        None => UserFilter::All,
    };
    let page = state.db.list_users(filter, query.page_request()).await?;
    Ok(Json(ApiResponse::data(paged("users", page))))
}

/// GET /api/v1/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let user = find_user(&state, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::data(user)))
}

/// POST /api/v1/users
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<User>>), ApiError> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();
    if state
        .db
        .find_user(UserFilter::Email(email.clone()))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(
            "User with this email already exists".to_string(),
        ));
    }

    let hasher = Arc::clone(&state.hasher);
    let password = payload.password;
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await?
        .map_err(ApiError::internal)?;

    let now = Utc::now();
    let user = state
        .db
        .insert_user(User {
            id: DocumentId::new(),
            email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            phone: payload.phone,
            password_hash,
            role: DEFAULT_USER_ROLE.to_string(),
            is_active: true,
            is_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
            addresses: Vec::new(),
            total_orders: 0,
            total_spent: 0.0,
        })
        .await?;

    info!("✅ User created: {}", user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("User created successfully", user)),
    ))
}

/// PUT /api/v1/users/:id
pub async fn update_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<User>>, ApiError> {
    let id = parse_id(&id)?;
    payload.validate()?;

    let update = UserUpdate {
        first_name: Some(payload.first_name),
        last_name: Some(payload.last_name),
        phone: payload.phone,
        is_active: payload.is_active,
        is_verified: payload.is_verified,
    };
    apply_update(&state, id, update).await?;

    let user = find_user(&state, id).await?;
    Ok(Json(ApiResponse::with_message(
        "User updated successfully",
        user,
    )))
}

/// DELETE /api/v1/users/:id
pub async fn delete_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_id(&id)?;
    if !state.db.delete_user(UserFilter::Id(id)).await? {
        return Err(ApiError::not_found("User not found"));
    }
    info!("🗑️  User deleted: {}", id);
    Ok(Json(ApiResponse::message("User deleted successfully")))
}

/// POST /api/v1/users/:id/activate
pub async fn activate_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    set_active(&state, &id, true).await?;
    Ok(Json(ApiResponse::message("User activated successfully")))
}

/// POST /api/v1/users/:id/deactivate
pub async fn deactivate_user(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    set_active(&state, &id, false).await?;
    Ok(Json(ApiResponse::message("User deactivated successfully")))
}

async fn set_active(state: &AppState, raw_id: &str, active: bool) -> Result<(), ApiError> {
    let update = UserUpdate {
        is_active: Some(active),
        ..Default::default()
    };
    apply_update(state, parse_id(raw_id)?, update).await
}

async fn apply_update(state: &AppState, id: DocumentId, update: UserUpdate) -> Result<(), ApiError> {
    if state.db.update_user(UserFilter::Id(id), update).await? {
        Ok(())
    } else {
        Err(ApiError::not_found("User not found"))
    }
}

async fn find_user(state: &AppState, id: DocumentId) -> Result<User, ApiError> {
    state
        .db
        .find_user(UserFilter::Id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))
}
