//! Domain Models
//! Mission: Typed records for customers, catalog and orders, plus shared id/paging types

pub mod order;
pub mod product;
pub mod user;

pub use order::{Address, Order, OrderItem, OrderStatus, PaymentStatus};
pub use product::Product;
pub use user::User;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Namespace for mapping legacy 12-byte object ids into the UUID space.
const LEGACY_OBJECT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f62_6a65_6374_4964_8000_0000_0000_0001);

/// Canonical identifier for every stored document.
///
/// Documents are keyed by UUID. Older records were addressed by 24-hex-digit
/// object ids; those parse into a stable UUID v5 so callers holding an old id
/// still reach the migrated record without the read path caring which form
/// was supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid document id: {0}")]
pub struct InvalidDocumentId(pub String);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Map a legacy object id (24 hex digits) onto its canonical id.
    pub fn from_legacy_object_id(hex: &str) -> Option<Self> {
        if hex.len() == 24 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            let normalized = hex.to_ascii_lowercase();
            Some(Self(Uuid::new_v5(
                &LEGACY_OBJECT_ID_NAMESPACE,
                normalized.as_bytes(),
            )))
        } else {
            None
        }
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for DocumentId {
    type Err = InvalidDocumentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(uuid) = Uuid::parse_str(trimmed) {
            return Ok(Self(uuid));
        }
        Self::from_legacy_object_id(trimmed).ok_or_else(|| InvalidDocumentId(s.to_string()))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

pub const DEFAULT_PAGE_LIMIT: u32 = 10;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Offset pagination request (1-based pages).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// Clamp raw query values into a usable page.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit
                .unwrap_or(DEFAULT_PAGE_LIMIT)
                .clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus the total matching count.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn pagination(&self) -> Pagination {
        let limit = u64::from(self.request.limit);
        Pagination {
            page: self.request.page,
            limit: self.request.limit,
            total: self.total,
            pages: self.total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u64,
}
