//! Customer accounts managed from the back office.

use super::{Address, DocumentId};
use crate::{error::ApiError, validation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: DocumentId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub is_active: bool,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub total_orders: i64,
    pub total_spent: f64,
}

pub const DEFAULT_USER_ROLE: &str = "user";

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validation::email("email", &self.email)?;
        validation::password("password", &self.password)?;
        validation::length("first_name", &self.first_name, 1, 50)?;
        validation::length("last_name", &self.last_name, 1, 50)?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_verified: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validation::length("first_name", &self.first_name, 1, 50)?;
        validation::length("last_name", &self.last_name, 1, 50)?;
        Ok(())
    }
}
