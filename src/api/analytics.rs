//! Analytics endpoints
//! Mission: Dashboard totals straight from the store; trend series are not collected yet

use super::{ApiResponse, AppState};
use crate::error::ApiError;
use crate::store::{OrderFilter, ProductFilter, UserFilter};
use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_products: u64,
    pub total_orders: u64,
    pub total_revenue: f64,
    pub recent_orders: Vec<Value>,
    pub top_products: Vec<Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct SalesAnalytics {
    pub daily_sales: Vec<Value>,
    pub monthly_sales: Vec<Value>,
    pub yearly_sales: Vec<Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct UserAnalytics {
    pub user_growth: Vec<Value>,
    pub user_activity: Vec<Value>,
    pub user_demographics: Map<String, Value>,
}

#[derive(Debug, Default, Serialize)]
pub struct ProductAnalytics {
    pub top_selling: Vec<Value>,
    pub low_stock: Vec<Value>,
    pub category_stats: Vec<Value>,
}

/// GET /api/v1/analytics/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let db = &state.db;
    let (total_users, total_products, total_orders, total_revenue) = tokio::try_join!(
        db.count_users(UserFilter::All),
        db.count_products(ProductFilter::All),
        db.count_orders(OrderFilter::All),
        db.order_revenue(),
    )?;

    Ok(Json(ApiResponse::data(DashboardStats {
        total_users,
        total_products,
        total_orders,
        total_revenue,
        recent_orders: Vec::new(),
        top_products: Vec::new(),
    })))
}

/// GET /api/v1/analytics/sales
pub async fn sales() -> Json<ApiResponse<SalesAnalytics>> {
    Json(ApiResponse::data(SalesAnalytics::default()))
}

/// GET /api/v1/analytics/users
pub async fn users() -> Json<ApiResponse<UserAnalytics>> {
    Json(ApiResponse::data(UserAnalytics::default()))
}

/// GET /api/v1/analytics/products
pub async fn products() -> Json<ApiResponse<ProductAnalytics>> {
    Json(ApiResponse::data(ProductAnalytics::default()))
}
