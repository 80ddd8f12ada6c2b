//! Permission Model
//! Mission: Map roles to default capability sets and answer membership checks

use crate::auth::models::AdminRole;
use std::collections::BTreeSet;

pub const ADMIN_CREATE: &str = "admin.create";
pub const ADMIN_READ: &str = "admin.read";
pub const ADMIN_UPDATE: &str = "admin.update";
pub const ADMIN_DELETE: &str = "admin.delete";

pub const USER_CREATE: &str = "user.create";
pub const USER_READ: &str = "user.read";
pub const USER_UPDATE: &str = "user.update";
pub const USER_DELETE: &str = "user.delete";

pub const PRODUCT_CREATE: &str = "product.create";
pub const PRODUCT_READ: &str = "product.read";
pub const PRODUCT_UPDATE: &str = "product.update";
pub const PRODUCT_DELETE: &str = "product.delete";

pub const ORDER_CREATE: &str = "order.create";
pub const ORDER_READ: &str = "order.read";
pub const ORDER_UPDATE: &str = "order.update";
pub const ORDER_DELETE: &str = "order.delete";

pub const ANALYTICS_READ: &str = "analytics.read";
pub const SYSTEM_MANAGE: &str = "system.manage";
pub const BACKUP_CREATE: &str = "backup.create";

const SUPER_ADMIN_PERMISSIONS: &[&str] = &[
    ADMIN_CREATE,
    ADMIN_READ,
    ADMIN_UPDATE,
    ADMIN_DELETE,
    USER_CREATE,
    USER_READ,
    USER_UPDATE,
    USER_DELETE,
    PRODUCT_CREATE,
    PRODUCT_READ,
    PRODUCT_UPDATE,
    PRODUCT_DELETE,
    ORDER_CREATE,
    ORDER_READ,
    ORDER_UPDATE,
    ORDER_DELETE,
    ANALYTICS_READ,
    SYSTEM_MANAGE,
    BACKUP_CREATE,
];

const ADMIN_PERMISSIONS: &[&str] = &[
    USER_CREATE,
    USER_READ,
    USER_UPDATE,
    USER_DELETE,
    PRODUCT_CREATE,
    PRODUCT_READ,
    PRODUCT_UPDATE,
    PRODUCT_DELETE,
    ORDER_READ,
    ORDER_UPDATE,
    ANALYTICS_READ,
];

const MODERATOR_PERMISSIONS: &[&str] = &[USER_READ, PRODUCT_READ, PRODUCT_UPDATE, ORDER_READ];

const FALLBACK_PERMISSIONS: &[&str] = &[USER_READ, PRODUCT_READ, ORDER_READ];

/// Default capability set for a role.
///
/// Only consulted when an administrator is created without explicit
/// permissions; later role changes do not recompute it.
pub fn default_permissions(role: &AdminRole) -> BTreeSet<String> {
    let names = match role {
        AdminRole::SuperAdmin => SUPER_ADMIN_PERMISSIONS,
        AdminRole::Admin => ADMIN_PERMISSIONS,
        AdminRole::Moderator => MODERATOR_PERMISSIONS,
        AdminRole::Other(_) => FALLBACK_PERMISSIONS,
    };
    names.iter().map(|name| name.to_string()).collect()
}

/// Exact membership test against a granted set, typically the snapshot in a token.
pub fn has_permission(granted: &BTreeSet<String>, required: &str) -> bool {
    granted.contains(required)
}
