//! Order management endpoints

use super::{paged, parse_id, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ListQuery};
use crate::error::ApiError;
use crate::models::{order::UpdateOrderStatusRequest, DocumentId, Order, OrderStatus};
use crate::store::{OrderFilter, OrderStatusUpdate};
use axum::{
    extract::State,
    Json,
};
use tracing::info;

/// GET /api/v1/orders
pub async fn list_orders(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<OrderStatus>().map_err(|e| ApiError::Validation {
            message: "Invalid query parameters".to_string(),
            details: Some(e),
        })?),
    };
    let filter = OrderFilter::Matching {
        status,
        search: query.search(),
    };
    let page = state.db.list_orders(filter, query.page_request()).await?;
    Ok(Json(ApiResponse::data(paged("orders", page))))
}

/// GET /api/v1/orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let order = find_order(&state, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::data(order)))
}

/// PUT /api/v1/orders/:id/status
pub async fn update_order_status(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<Order>>, ApiError> {
    let id = parse_id(&id)?;
    let update = OrderStatusUpdate {
        status: payload.status,
        tracking_number: payload.tracking_number,
        notes: payload.notes,
    };
    if !state
        .db
        .update_order_status(OrderFilter::Id(id), update)
        .await?
    {
        return Err(ApiError::not_found("Order not found"));
    }

    let order = find_order(&state, id).await?;
    info!("📦 Order {} moved to {}", order.order_number, order.status);
    Ok(Json(ApiResponse::with_message(
        "Order status updated successfully",
        order,
    )))
}

/// DELETE /api/v1/orders/:id
pub async fn delete_order(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_id(&id)?;
    if !state.db.delete_order(OrderFilter::Id(id)).await? {
        return Err(ApiError::not_found("Order not found"));
    }
    info!("🗑️  Order deleted: {}", id);
    Ok(Json(ApiResponse::message("Order deleted successfully")))
}

async fn find_order(state: &AppState, id: DocumentId) -> Result<Order, ApiError> {
    state
        .db
        .find_order(OrderFilter::Id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))
}
