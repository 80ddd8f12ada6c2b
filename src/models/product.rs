//! Catalog products.

use super::DocumentId;
use crate::{error::ApiError, validation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: DocumentId,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: String,
    pub brand: String,
    pub sku: String,
    pub stock_quantity: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub rating: f64,
    pub review_count: i64,
    pub sold_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<DocumentId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub category_id: String,
    pub brand: String,
    pub sku: String,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_featured: Option<bool>,
}

impl CreateProductRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        validation::length("name", &self.name, 1, 200)?;
        validation::length("description", &self.description, 10, 2000)?;
        validation::non_negative("price", self.price)?;
        validation::length("categoryId", &self.category_id, 1, 100)?;
        validation::length("brand", &self.brand, 1, 100)?;
        validation::length("sku", &self.sku, 1, 100)?;
        if self.stock_quantity < 0 {
            return Err(ApiError::invalid_field("stockQuantity", "must be zero or greater"));
        }
        Ok(())
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub category_id: Option<String>,
    pub brand: Option<String>,
    pub sku: Option<String>,
    pub stock_quantity: Option<i64>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
}

impl UpdateProductRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if let Some(name) = &self.name {
            validation::length("name", name, 1, 200)?;
        }
        if let Some(description) = &self.description {
            validation::length("description", description, 1, 2000)?;
        }
        if let Some(price) = self.price {
            validation::non_negative("price", price)?;
        }
        if matches!(self.stock_quantity, Some(stock) if stock < 0) {
            return Err(ApiError::invalid_field("stockQuantity", "must be zero or greater"));
        }
        Ok(())
    }
}
