//! Product Collection
//! Mission: Catalog persistence with search, category filtering and partial updates

use super::{
    count_where, delete_where, encode_json, encode_ts, read_id, read_json, read_opt_id, read_ts,
    select_one, select_page, update_where, Assignments, Database, Predicate, StoreError,
};
use crate::models::{DocumentId, Page, PageRequest, Product};
use chrono::Utc;
use rusqlite::{params, Row};

const PRODUCT_COLUMNS: &str = "id, name, description, price, category_id, brand, sku, \
     stock_quantity, images_json, tags_json, is_active, is_featured, rating, review_count, \
     sold_count, created_at, updated_at, created_by";

#[derive(Debug, Clone)]
pub enum ProductFilter {
    Id(DocumentId),
    /// Listing query; both criteria optional and combined with AND
    Matching {
        search: Option<String>,
        category_id: Option<String>,
    },
    All,
}

impl ProductFilter {
    fn predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();
        match self {
            ProductFilter::Id(id) => predicate = predicate.eq("id", id.to_string()),
            ProductFilter::Matching {
                search,
                category_id,
            } => {
                if let Some(needle) = search.as_deref().filter(|s| !s.is_empty()) {
                    predicate = predicate.search(&["name", "description"], needle);
                }
                if let Some(category_id) = category_id.as_deref().filter(|s| !s.is_empty()) {
                    predicate = predicate.eq("category_id", category_id.to_string());
                }
            }
            ProductFilter::All => {}
        }
        predicate
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
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

impl ProductUpdate {
    fn into_assignments(self) -> Result<Assignments, StoreError> {
        let mut set = Assignments::default();
        set.set_opt("name", self.name);
        set.set_opt("description", self.description);
        set.set_opt("price", self.price);
        set.set_opt("category_id", self.category_id);
        set.set_opt("brand", self.brand);
        set.set_opt("sku", self.sku);
        set.set_opt("stock_quantity", self.stock_quantity);
        if let Some(images) = &self.images {
            set.set("images_json", encode_json(images)?);
        }
        if let Some(tags) = &self.tags {
            set.set("tags_json", encode_json(tags)?);
        }
        set.set_opt("is_active", self.is_active);
        set.set_opt("is_featured", self.is_featured);
        set.set("updated_at", encode_ts(&Utc::now()));
        Ok(set)
    }
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: read_id(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        category_id: row.get(4)?,
        brand: row.get(5)?,
        sku: row.get(6)?,
        stock_quantity: row.get(7)?,
        images: read_json(row, 8)?,
        tags: read_json(row, 9)?,
        is_active: row.get(10)?,
        is_featured: row.get(11)?,
        rating: row.get(12)?,
        review_count: row.get(13)?,
        sold_count: row.get(14)?,
        created_at: read_ts(row, 15)?,
        updated_at: read_ts(row, 16)?,
        created_by: read_opt_id(row, 17)?,
    })
}

impl Database {
    pub async fn insert_product(&self, product: Product) -> Result<Product, StoreError> {
        self.call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO products ({PRODUCT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                             ?16, ?17, ?18)"
                ),
                params![
                    product.id.to_string(),
                    product.name,
                    product.description,
                    product.price,
                    product.category_id,
                    product.brand,
                    product.sku,
                    product.stock_quantity,
                    encode_json(&product.images)?,
                    encode_json(&product.tags)?,
                    product.is_active,
                    product.is_featured,
                    product.rating,
                    product.review_count,
                    product.sold_count,
                    encode_ts(&product.created_at),
                    encode_ts(&product.updated_at),
                    product.created_by.map(|id| id.to_string()),
                ],
            )?;
            Ok(product)
        })
        .await
    }

    pub async fn find_product(&self, filter: ProductFilter) -> Result<Option<Product>, StoreError> {
        self.call(move |conn| {
            select_one(
                conn,
                "products",
                PRODUCT_COLUMNS,
                &filter.predicate(),
                product_from_row,
            )
        })
        .await
    }

    pub async fn count_products(&self, filter: ProductFilter) -> Result<u64, StoreError> {
        self.call(move |conn| count_where(conn, "products", &filter.predicate()))
            .await
    }

    pub async fn list_products(
        &self,
        filter: ProductFilter,
        request: PageRequest,
    ) -> Result<Page<Product>, StoreError> {
        self.call(move |conn| {
            select_page(
                conn,
                "products",
                PRODUCT_COLUMNS,
                &filter.predicate(),
                request,
                product_from_row,
            )
        })
        .await
    }

    pub async fn update_product(
        &self,
        filter: ProductFilter,
        update: ProductUpdate,
    ) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let set = update.into_assignments()?;
            update_where(conn, "products", set, &filter.predicate())
        })
        .await
    }

    pub async fn delete_product(&self, filter: ProductFilter) -> Result<bool, StoreError> {
        self.call(move |conn| delete_where(conn, "products", &filter.predicate()))
            .await
    }
}
