//! Product catalog endpoints

use super::{paged, parse_id, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, ListQuery};
use crate::auth::models::AuthContext;
use crate::error::ApiError;
use crate::models::{
    product::{CreateProductRequest, UpdateProductRequest},
    DocumentId, Product,
};
use crate::store::{ProductFilter, ProductUpdate};
use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use tracing::info;

/// GET /api/v1/products
pub async fn list_products(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let filter = ProductFilter::Matching {
        search: query.search(),
        category_id: query.category.clone(),
    };
    let page = state.db.list_products(filter, query.page_request()).await?;
    Ok(Json(ApiResponse::data(paged("products", page))))
}

/// GET /api/v1/products/:id
pub async fn get_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let product = find_product(&state, parse_id(&id)?).await?;
    Ok(Json(ApiResponse::data(product)))
}

/// POST /api/v1/products
pub async fn create_product(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>), ApiError> {
    payload.validate()?;

    let now = Utc::now();
    let product = state
        .db
        .insert_product(Product {
            id: DocumentId::new(),
            name: payload.name,
            description: payload.description,
            price: payload.price,
            category_id: payload.category_id,
            brand: payload.brand,
            sku: payload.sku,
            stock_quantity: payload.stock_quantity,
            images: payload.images,
            tags: payload.tags,
            is_active: payload.is_active.unwrap_or(true),
            is_featured: payload.is_featured.unwrap_or(false),
            rating: 0.0,
            review_count: 0,
            sold_count: 0,
            created_at: now,
            updated_at: now,
            created_by: Some(auth.admin_id),
        })
        .await?;

    info!("✅ Product created: {} by {}", product.id, auth.admin_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Product created successfully",
            product,
        )),
    ))
}

/// PUT /api/v1/products/:id
pub async fn update_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<ApiResponse<Product>>, ApiError> {
    let id = parse_id(&id)?;
    payload.validate()?;

    let update = ProductUpdate {
        name: payload.name,
        description: payload.description,
        price: payload.price,
        category_id: payload.category_id,
        brand: payload.brand,
        sku: payload.sku,
        stock_quantity: payload.stock_quantity,
        images: payload.images,
        tags: payload.tags,
        is_active: payload.is_active,
        is_featured: payload.is_featured,
    };
    if !state
        .db
        .update_product(ProductFilter::Id(id), update)
        .await?
    {
        return Err(ApiError::not_found("Product not found"));
    }

    let product = find_product(&state, id).await?;
    Ok(Json(ApiResponse::with_message(
        "Product updated successfully",
        product,
    )))
}

/// DELETE /api/v1/products/:id
pub async fn delete_product(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_id(&id)?;
    if !state.db.delete_product(ProductFilter::Id(id)).await? {
        return Err(ApiError::not_found("Product not found"));
    }
    info!("🗑️  Product deleted: {}", id);
    Ok(Json(ApiResponse::message("Product deleted successfully")))
}

async fn find_product(state: &AppState, id: DocumentId) -> Result<Product, ApiError> {
    state
        .db
        .find_product(ProductFilter::Id(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Product not found"))
}
