//! Authentication API Endpoints
//! Mission: Login, registration and self-service endpoints for administrators

use crate::api::{paged, parse_id, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ListQuery};
use crate::auth::models::{
    Admin, AuthContext, ChangePasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
    UpdateProfileRequest,
};
use crate::error::ApiError;
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};

/// Login endpoint - POST /api/v1/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    let response = state.admins.login(payload).await?;
    Ok(Json(ApiResponse::with_message("Login successful", response)))
}

/// Register endpoint - POST /api/v1/auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Admin>>), ApiError> {
    let admin = state.admins.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Admin registered successfully",
            admin,
        )),
    ))
}

/// GET /api/v1/admin/profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<Admin>>, ApiError> {
    let admin = state.admins.profile(&auth).await?;
    Ok(Json(ApiResponse::data(admin)))
}

/// PUT /api/v1/admin/profile
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<Admin>>, ApiError> {
    let admin = state.admins.update_profile(&auth, payload).await?;
    Ok(Json(ApiResponse::with_message(
        "Profile updated successfully",
        admin,
    )))
}

/// POST /api/v1/admin/change-password
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.admins.change_password(&auth, payload).await?;
    Ok(Json(ApiResponse::message("Password changed successfully")))
}

/// GET /api/v1/admin/list
pub async fn list_admins(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let page = state.admins.list_admins(query.page_request()).await?;
    Ok(Json(ApiResponse::data(paged("admins", page))))
}

/// DELETE /api/v1/admin/:id
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let target = parse_id(&id)?;
    state.admins.delete_admin(&auth, target).await?;
    Ok(Json(ApiResponse::message("Admin deleted successfully")))
}
