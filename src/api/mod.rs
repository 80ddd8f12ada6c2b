//! HTTP API
//! Mission: Shared state, response envelope and extractors for the JSON handlers

pub mod analytics;
pub mod orders;
pub mod products;
pub mod routes;
pub mod system;
pub mod users;

pub use routes::create_router;

use crate::{
    auth::{password::PasswordHasher, service::AdminService, JwtHandler},
    config::Config,
    error::ApiError,
    middleware::RateLimiter,
    models::{DocumentId, Page, PageRequest},
    store::Database,
};
use axum::extract::{FromRequest, FromRequestParts};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub admins: AdminService,
    pub jwt_handler: Arc<JwtHandler>,
    pub hasher: Arc<PasswordHasher>,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn from_config(db: Database, config: &Config) -> Self {
        let jwt_handler = Arc::new(JwtHandler::new(&config.jwt_secret));
        let hasher = Arc::new(PasswordHasher::new(config.bcrypt_cost));
        let admins = AdminService::new(
            db.clone(),
            jwt_handler.clone(),
            hasher.clone(),
            &config.registration_token,
        );

        Self {
            db,
            admins,
            jwt_handler,
            hasher,
            rate_limiter: Arc::new(RateLimiter::new(
                config.rate_limit_requests,
                config.rate_limit_window(),
            )),
            started_at: Instant::now(),
        }
    }
}

/// Success envelope: `{success, message?, data?}`. Failures go through [`ApiError`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// JSON body extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the API error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Common listing parameters. Not every collection uses every filter.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default, deserialize_with = "lenient_number")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub limit: Option<u32>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

/// Unparseable paging values fall back to the defaults instead of failing the request.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.trim().parse().ok()))
}

/// `{"<key>": [...], "pagination": {page, limit, total, pages}}`
pub fn paged<T: Serialize>(key: &str, page: Page<T>) -> serde_json::Value {
    let pagination = page.pagination();
    json!({ key: page.items, "pagination": pagination })
}

/// Path ids accept canonical UUIDs and legacy 24-hex object ids.
pub fn parse_id(raw: &str) -> Result<DocumentId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::validation("Invalid ID format"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PageRequest;

    #[test]
    fn test_envelope_skips_empty_fields() {
        let body = serde_json::to_value(ApiResponse::message("Done")).unwrap();
        assert_eq!(body, json!({ "success": true, "message": "Done" }));

        let body = serde_json::to_value(ApiResponse::data(vec![1, 2])).unwrap();
        assert_eq!(body, json!({ "success": true, "data": [1, 2] }));
    }

    #[test]
    fn test_paged_shape() {
        let page = Page {
            items: vec!["a", "b"],
            total: 12,
            request: PageRequest::new(Some(2), Some(5)),
        };
        let body = paged("users", page);
        assert_eq!(body["users"], json!(["a", "b"]));
        assert_eq!(
            body["pagination"],
            json!({ "page": 2, "limit": 5, "total": 12, "pages": 3 })
        );
    }

    #[test]
    fn test_parse_id_accepts_both_forms() {
        let canonical = DocumentId::new();
        assert_eq!(parse_id(&canonical.to_string()).unwrap(), canonical);

        let legacy = parse_id("507f1f77bcf86cd799439011").unwrap();
        assert_eq!(legacy, parse_id("507F1F77BCF86CD799439011").unwrap());

        assert!(parse_id("42").is_err());
    }

    fn query(raw: &str) -> ListQuery {
        let uri: axum::http::Uri = format!("/items?{raw}").parse().unwrap();
        axum::extract::Query::<ListQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_list_query_tolerates_bad_paging() {
        let parsed = query("page=abc&limit=-1&search=lamp");
        assert_eq!(parsed.page, None);
        assert_eq!(parsed.limit, None);
        assert_eq!(parsed.page_request(), PageRequest::new(Some(1), Some(10)));
        assert_eq!(parsed.search().as_deref(), Some("lamp"));

        let parsed = query("page=3&limit=25");
        assert_eq!(parsed.page_request(), PageRequest::new(Some(3), Some(25)));
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(query.page_request(), PageRequest::new(Some(1), Some(10)));
        assert!(query.search().is_none());
    }
}
