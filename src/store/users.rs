//! Customer Collection
//! Mission: CRUD over end-user accounts with case-insensitive search

use super::{
    count_where, delete_where, encode_json, encode_ts, read_id, read_json, read_opt_ts, read_ts,
    select_one, select_page, update_where, Assignments, Database, Predicate, StoreError,
};
use crate::models::{DocumentId, Page, PageRequest, User};
use chrono::Utc;
use rusqlite::{params, Row};

const USER_COLUMNS: &str = "id, email, first_name, last_name, phone, password_hash, role, \
     is_active, is_verified, last_login, created_at, updated_at, addresses_json, total_orders, \
     total_spent";

#[derive(Debug, Clone)]
pub enum UserFilter {
    Id(DocumentId),
    Email(String),
    /// Substring of email, first or last name
    Search(String),
    All,
}

impl UserFilter {
    fn predicate(&self) -> Predicate {
        let predicate = Predicate::default();
        match self {
            UserFilter::Id(id) => predicate.eq("id", id.to_string()),
            UserFilter::Email(email) => predicate.eq("email", email.clone()),
            UserFilter::Search(needle) => {
                predicate.search(&["email", "first_name", "last_name"], needle)
            }
            UserFilter::All => predicate,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
}

impl UserUpdate {
    fn into_assignments(self) -> Assignments {
        let mut set = Assignments::default();
        set.set_opt("first_name", self.first_name);
        set.set_opt("last_name", self.last_name);
        set.set_opt("phone", self.phone);
        set.set_opt("is_active", self.is_active);
        set.set_opt("is_verified", self.is_verified);
        set.set("updated_at", encode_ts(&Utc::now()));
        set
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: read_id(row, 0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        password_hash: row.get(5)?,
        role: row.get(6)?,
        is_active: row.get(7)?,
        is_verified: row.get(8)?,
        last_login: read_opt_ts(row, 9)?,
        created_at: read_ts(row, 10)?,
        updated_at: read_ts(row, 11)?,
        addresses: read_json(row, 12)?,
        total_orders: row.get(13)?,
        total_spent: row.get(14)?,
    })
}

impl Database {
    pub async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO users ({USER_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)"
                ),
                params![
                    user.id.to_string(),
                    user.email,
                    user.first_name,
                    user.last_name,
                    user.phone,
                    user.password_hash,
                    user.role,
                    user.is_active,
                    user.is_verified,
                    user.last_login.as_ref().map(encode_ts),
                    encode_ts(&user.created_at),
                    encode_ts(&user.updated_at),
                    encode_json(&user.addresses)?,
                    user.total_orders,
                    user.total_spent,
                ],
            )?;
            Ok(user)
        })
        .await
    }

    pub async fn find_user(&self, filter: UserFilter) -> Result<Option<User>, StoreError> {
        self.call(move |conn| {
            select_one(conn, "users", USER_COLUMNS, &filter.predicate(), user_from_row)
        })
        .await
    }

    pub async fn count_users(&self, filter: UserFilter) -> Result<u64, StoreError> {
        self.call(move |conn| count_where(conn, "users", &filter.predicate()))
            .await
    }

    /// Matching users, newest first.
    pub async fn list_users(
        &self,
        filter: UserFilter,
        request: PageRequest,
    ) -> Result<Page<User>, StoreError> {
        self.call(move |conn| {
            select_page(
                conn,
                "users",
                USER_COLUMNS,
                &filter.predicate(),
                request,
                user_from_row,
            )
        })
        .await
    }

    pub async fn update_user(
        &self,
        filter: UserFilter,
        update: UserUpdate,
    ) -> Result<bool, StoreError> {
        self.call(move |conn| {
            update_where(conn, "users", update.into_assignments(), &filter.predicate())
        })
        .await
    }

    pub async fn delete_user(&self, filter: UserFilter) -> Result<bool, StoreError> {
        self.call(move |conn| delete_where(conn, "users", &filter.predicate()))
            .await
    }
}
