//! Router Assembly
//! Mission: Wire every handler behind the right authentication and permission gates

use super::{analytics, orders, products, system, users, AppState};
use crate::auth::{api as admin_api, auth_middleware, guarded, permissions::*};
use crate::middleware::{rate_limit_middleware, request_logging};
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::warn;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: String,
}

/// Build the full application router.
///
/// Layer order, outermost first: request logging, CORS, rate limiting. Every
/// request (including `/health` and the auth endpoints) is counted against the
/// caller's rate-limit bucket before it reaches a route.
pub fn create_router(state: AppState, allowed_origins: &[String]) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/auth/login", post(admin_api::login))
        .route("/api/v1/auth/register", post(admin_api::register));

    let protected_routes = Router::new()
        // Own profile: any authenticated admin
        .route("/api/v1/admin/profile", get(admin_api::get_profile))
        .route("/api/v1/admin/profile", put(admin_api::update_profile))
        .route(
            "/api/v1/admin/change-password",
            post(admin_api::change_password),
        )
        .route(
            "/api/v1/admin/list",
            guarded(ADMIN_READ, get(admin_api::list_admins)),
        )
        .route(
            "/api/v1/admin/:id",
            guarded(ADMIN_DELETE, delete(admin_api::delete_admin)),
        )
        // Customers
        .route("/api/v1/users", guarded(USER_READ, get(users::list_users)))
        .route("/api/v1/users", guarded(USER_CREATE, post(users::create_user)))
        .route("/api/v1/users/:id", guarded(USER_READ, get(users::get_user)))
        .route("/api/v1/users/:id", guarded(USER_UPDATE, put(users::update_user)))
        .route(
            "/api/v1/users/:id",
            guarded(USER_DELETE, delete(users::delete_user)),
        )
        .route(
            "/api/v1/users/:id/activate",
            guarded(USER_UPDATE, post(users::activate_user)),
        )
        .route(
            "/api/v1/users/:id/deactivate",
            guarded(USER_UPDATE, post(users::deactivate_user)),
        )
        // Catalog
        .route(
            "/api/v1/products",
            guarded(PRODUCT_READ, get(products::list_products)),
        )
        .route(
            "/api/v1/products",
            guarded(PRODUCT_CREATE, post(products::create_product)),
        )
        .route(
            "/api/v1/products/:id",
            guarded(PRODUCT_READ, get(products::get_product)),
        )
        .route(
            "/api/v1/products/:id",
            guarded(PRODUCT_UPDATE, put(products::update_product)),
        )
        .route(
            "/api/v1/products/:id",
            guarded(PRODUCT_DELETE, delete(products::delete_product)),
        )
        // Orders
        .route("/api/v1/orders", guarded(ORDER_READ, get(orders::list_orders)))
        .route("/api/v1/orders/:id", guarded(ORDER_READ, get(orders::get_order)))
        .route(
            "/api/v1/orders/:id",
            guarded(ORDER_DELETE, delete(orders::delete_order)),
        )
        .route(
            "/api/v1/orders/:id/status",
            guarded(ORDER_UPDATE, put(orders::update_order_status)),
        )
        // Analytics
        .route(
            "/api/v1/analytics/dashboard",
            guarded(ANALYTICS_READ, get(analytics::dashboard)),
        )
        .route(
            "/api/v1/analytics/sales",
            guarded(ANALYTICS_READ, get(analytics::sales)),
        )
        .route(
            "/api/v1/analytics/users",
            guarded(ANALYTICS_READ, get(analytics::users)),
        )
        .route(
            "/api/v1/analytics/products",
            guarded(ANALYTICS_READ, get(analytics::products)),
        )
        // System
        .route(
            "/api/v1/system/logs",
            guarded(SYSTEM_MANAGE, get(system::logs)),
        )
        .route(
            "/api/v1/system/health",
            guarded(SYSTEM_MANAGE, get(system::health)),
        )
        .route(
            "/api/v1/system/backup",
            guarded(BACKUP_CREATE, post(system::create_backup)),
        )
        // Authentication wraps the permission gates above
        .route_layer(middleware::from_fn_with_state(
            state.jwt_handler.clone(),
            auth_middleware,
        ));

    let rate_limiter = state.rate_limiter.clone();

    Router::new()
        .route("/health", get(health_check))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            rate_limiter,
            rate_limit_middleware,
        ))
        .layer(cors_layer(allowed_origins))
        .layer(middleware::from_fn(request_logging))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "admin-backoffice",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if allowed_origins.iter().any(|origin| origin == "*") {
        return base.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
}
