//! Authentication Middleware
//! Mission: Protect API endpoints with bearer-token validation and permission gates

use crate::auth::{jwt::JwtHandler, models::AuthContext, permissions::has_permission};
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Auth middleware that validates bearer tokens and attaches an [`AuthContext`].
pub async fn auth_middleware(
    State(jwt_handler): State<Arc<JwtHandler>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())?;

    let claims = jwt_handler.validate_token(token).map_err(|e| {
        debug!(reason = %e, "Rejected bearer token");
        ApiError::invalid_token()
    })?;

    req.extensions_mut().insert(AuthContext::from(claims));
    Ok(next.run(req).await)
}

/// Token from an `Authorization` header of exactly the form `Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Authentication("Authorization header required".to_string()))?;

    let invalid_format =
        || ApiError::Authentication("Invalid authorization header format".to_string());

    let value = value.to_str().map_err(|_| invalid_format())?;
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(invalid_format()),
    }
}

/// Permission a route requires; carried as the gate's state.
#[derive(Debug, Clone, Copy)]
pub struct RequiredPermission(pub &'static str);

/// Reject with 403 unless the authenticated admin holds the required permission.
pub async fn require_permission(
    State(RequiredPermission(required)): State<RequiredPermission>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let allowed = match req.extensions().get::<AuthContext>() {
        Some(auth) => {
            let allowed = has_permission(&auth.permissions, required);
            if !allowed {
                warn!(
                    admin_id = %auth.admin_id,
                    role = %auth.role,
                    required,
                    "Permission denied"
                );
            }
            allowed
        }
        None => return Err(ApiError::forbidden("Authentication required")),
    };

    if !allowed {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }
    Ok(next.run(req).await)
}

/// Wrap a method router so every handler in it requires `permission`.
pub fn guarded<S>(permission: &'static str, route: MethodRouter<S>) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(middleware::from_fn_with_state(
        RequiredPermission(permission),
        require_permission,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{Admin, AdminRole};
    use crate::auth::permissions::{default_permissions, PRODUCT_CREATE, PRODUCT_READ};
    use crate::models::DocumentId;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        routing::get,
        Extension, Router,
    };
    use chrono::Utc;
    use tower::ServiceExt;

    const SECRET: &str = "middleware-test-secret-0123456789abcdef";

    fn admin_with(role: AdminRole) -> Admin {
        Admin {
            id: DocumentId::new(),
            email: "staff@shop.example".to_string(),
            username: "staff".to_string(),
            first_name: "Staff".to_string(),
            last_name: "Member".to_string(),
            password_hash: "hash".to_string(),
            permissions: default_permissions(&role),
            role,
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            created_by: None,
        }
    }

    async fn whoami(Extension(auth): Extension<AuthContext>) -> String {
        auth.email
    }

    fn app(jwt: Arc<JwtHandler>) -> Router {
        Router::new()
            .route("/me", get(whoami))
            .route("/products", guarded(PRODUCT_READ, get(|| async { "list" })))
            .route(
                "/products/new",
                guarded(PRODUCT_CREATE, get(|| async { "create" })),
            )
            .layer(middleware::from_fn_with_state(jwt, auth_middleware))
    }

    async fn send(app: Router, path: &str, auth: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut builder = HttpRequest::builder().uri(path);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, body)
    }

    #[test]
    fn test_bearer_token_shapes() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).is_err());

        for bad in ["Bearer", "Bearer ", "Bearer  x", "bearer x", "Token x", "Bearer a b"] {
            headers.insert(AUTHORIZATION, bad.parse().unwrap());
            assert!(bearer_token(&headers).is_err(), "accepted {bad:?}");
        }

        headers.insert(AUTHORIZATION, "Bearer abc.def.ghi".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }

    #[tokio::test]
    async fn test_missing_and_invalid_tokens_are_401() {
        let jwt = Arc::new(JwtHandler::new(SECRET));

        let (status, body) = send(app(jwt.clone()), "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);

        let (status, body) = send(app(jwt.clone()), "/me", Some("Bearer not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");

        let (status, _) = send(app(jwt), "/me", Some("Token abc")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_token_attaches_context() {
        let jwt = Arc::new(JwtHandler::new(SECRET));
        let token = jwt
            .generate_token(&admin_with(AdminRole::Admin))
            .unwrap()
            .access_token;

        let response = app(jwt)
            .oneshot(
                HttpRequest::builder()
                    .uri("/me")
                    .header(AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"staff@shop.example");
    }

    #[tokio::test]
    async fn test_moderator_permission_gate() {
        let jwt = Arc::new(JwtHandler::new(SECRET));
        let token = jwt
            .generate_token(&admin_with(AdminRole::Moderator))
            .unwrap()
            .access_token;
        let header = format!("Bearer {token}");

        let (status, _) = send(app(jwt.clone()), "/products", Some(&header)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(app(jwt), "/products/new", Some(&header)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Insufficient permissions");
    }

    #[tokio::test]
    async fn test_gate_without_context_is_403() {
        let app = Router::new().route("/x", guarded(PRODUCT_READ, get(|| async { "x" })));
        let (status, _) = send(app, "/x", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
