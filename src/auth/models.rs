//! Authentication Models
//! Mission: Define administrator records, token claims and auth request/response shapes

use crate::{error::ApiError, models::DocumentId, validation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Administrator account
#[derive(Debug, Clone, Serialize)]
pub struct Admin {
    pub id: DocumentId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub role: AdminRole,
    pub permissions: BTreeSet<String>,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<DocumentId>,
}

/// Staff roles. Unrecognized role names are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AdminRole {
    SuperAdmin, // Everything, including admin management and backups
    Admin,      // Users and products, order updates, analytics
    Moderator,  // Read-mostly
    Other(String),
}

impl AdminRole {
    pub fn as_str(&self) -> &str {
        match self {
            AdminRole::SuperAdmin => "super_admin",
            AdminRole::Admin => "admin",
            AdminRole::Moderator => "moderator",
            AdminRole::Other(name) => name,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "super_admin" => AdminRole::SuperAdmin,
            "admin" => AdminRole::Admin,
            "moderator" => AdminRole::Moderator,
            other => AdminRole::Other(other.to_string()),
        }
    }
}

impl From<String> for AdminRole {
    fn from(value: String) -> Self {
        AdminRole::parse(&value)
    }
}

impl From<AdminRole> for String {
    fn from(role: AdminRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub admin_id: DocumentId,
    pub email: String,
    pub role: AdminRole,
    pub permissions: BTreeSet<String>, // snapshot at issuance
    pub iat: i64,
    pub exp: i64,
}

/// Identity attached to a request once its bearer token checks out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub admin_id: DocumentId,
    pub email: String,
    pub role: AdminRole,
    pub permissions: BTreeSet<String>,
}

impl From<Claims> for AuthContext {
    fn from(claims: Claims) -> Self {
        Self {
            admin_id: claims.admin_id,
            email: claims.email,
            role: claims.role,
            permissions: claims.permissions,
        }
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body.
///
/// Every field defaults so the registration secret can be checked before the
/// rest of the payload is judged.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
    pub confirm_password: String,
    pub registration_token: String,
    pub role: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validation::email("email", &self.email)?;
        validation::length("username", &self.username, 3, 50)?;
        validation::length("first_name", &self.first_name, 1, 50)?;
        validation::length("last_name", &self.last_name, 1, 50)?;
        validation::password("password", &self.password)?;
        if self.confirm_password.is_empty() {
            return Err(ApiError::invalid_field("confirm_password", "is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validation::length("first_name", &self.first_name, 1, 50)?;
        validation::length("last_name", &self.last_name, 1, 50)?;
        validation::length("username", &self.username, 3, 50)?;
        Ok(())
    }
}

/// Signed token plus the metadata returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64, // seconds until expiration
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    #[serde(flatten)]
    pub token: IssuedToken,
    pub admin: Admin,
}
