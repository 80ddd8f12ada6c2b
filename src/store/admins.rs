//! Administrator Collection
//! Mission: Persist staff accounts behind typed filters and partial updates

use super::{
    count_where, delete_where, encode_json, encode_ts, read_id, read_json, read_opt_id,
    read_opt_ts, read_ts, select_one, select_page, update_where, Assignments, Database, Predicate,
    StoreError,
};
use crate::auth::models::{Admin, AdminRole};
use crate::models::{DocumentId, Page, PageRequest};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

const ADMIN_COLUMNS: &str = "id, email, username, first_name, last_name, password_hash, role, \
     permissions_json, is_active, last_login, created_at, updated_at, created_by";

/// Which administrator(s) an operation targets.
#[derive(Debug, Clone)]
pub enum AdminFilter {
    Id(DocumentId),
    Email(String),
    Username(String),
    /// Same username held by a different account
    UsernameOtherThan { username: String, id: DocumentId },
    All,
}

impl AdminFilter {
    fn predicate(&self) -> Predicate {
        let predicate = Predicate::default();
        match self {
            AdminFilter::Id(id) => predicate.eq("id", id.to_string()),
            AdminFilter::Email(email) => predicate.eq("email", email.clone()),
            AdminFilter::Username(username) => predicate.eq("username", username.clone()),
            AdminFilter::UsernameOtherThan { username, id } => predicate
                .eq("username", username.clone())
                .ne("id", id.to_string()),
            AdminFilter::All => predicate,
        }
    }
}

/// Partial update; `None` leaves the column untouched. `updated_at` is always bumped.
#[derive(Debug, Clone, Default)]
pub struct AdminUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

impl AdminUpdate {
    fn into_assignments(self, now: DateTime<Utc>) -> Assignments {
        let mut set = Assignments::default();
        set.set_opt("first_name", self.first_name);
        set.set_opt("last_name", self.last_name);
        set.set_opt("username", self.username);
        set.set_opt("password_hash", self.password_hash);
        set.set_opt("last_login", self.last_login.as_ref().map(encode_ts));
        set.set_opt("is_active", self.is_active);
        set.set("updated_at", encode_ts(&now));
        set
    }
}

fn admin_from_row(row: &Row<'_>) -> rusqlite::Result<Admin> {
    let role: String = row.get(6)?;
    Ok(Admin {
        id: read_id(row, 0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        password_hash: row.get(5)?,
        role: AdminRole::parse(&role),
        permissions: read_json(row, 7)?,
        is_active: row.get(8)?,
        last_login: read_opt_ts(row, 9)?,
        created_at: read_ts(row, 10)?,
        updated_at: read_ts(row, 11)?,
        created_by: read_opt_id(row, 12)?,
    })
}

impl Database {
    pub async fn insert_admin(&self, admin: Admin) -> Result<Admin, StoreError> {
        self.call(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO admins ({ADMIN_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    admin.id.to_string(),
                    admin.email,
                    admin.username,
                    admin.first_name,
                    admin.last_name,
                    admin.password_hash,
                    admin.role.as_str(),
                    encode_json(&admin.permissions)?,
                    admin.is_active,
                    admin.last_login.as_ref().map(encode_ts),
                    encode_ts(&admin.created_at),
                    encode_ts(&admin.updated_at),
                    admin.created_by.map(|id| id.to_string()),
                ],
            )?;
            Ok(admin)
        })
        .await
    }

    pub async fn find_admin(&self, filter: AdminFilter) -> Result<Option<Admin>, StoreError> {
        self.call(move |conn| {
            select_one(conn, "admins", ADMIN_COLUMNS, &filter.predicate(), admin_from_row)
        })
        .await
    }

    pub async fn count_admins(&self, filter: AdminFilter) -> Result<u64, StoreError> {
        self.call(move |conn| count_where(conn, "admins", &filter.predicate()))
            .await
    }

    /// Newest first.
    pub async fn list_admins(&self, request: PageRequest) -> Result<Page<Admin>, StoreError> {
        self.call(move |conn| {
            select_page(
                conn,
                "admins",
                ADMIN_COLUMNS,
                &AdminFilter::All.predicate(),
                request,
                admin_from_row,
            )
        })
        .await
    }

    /// Returns whether a record matched.
    pub async fn update_admin(
        &self,
        filter: AdminFilter,
        update: AdminUpdate,
    ) -> Result<bool, StoreError> {
        self.call(move |conn| {
            let set = update.into_assignments(Utc::now());
            update_where(conn, "admins", set, &filter.predicate())
        })
        .await
    }

    pub async fn delete_admin(&self, filter: AdminFilter) -> Result<bool, StoreError> {
        self.call(move |conn| delete_where(conn, "admins", &filter.predicate()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::default_permissions;
    use crate::store::test_support::temp_db;
    use chrono::Duration;

    fn new_admin(email: &str, username: &str) -> Admin {
        let now = Utc::now();
        Admin {
            id: DocumentId::new(),
            email: email.to_string(),
            username: username.to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: AdminRole::Admin,
            permissions: default_permissions(&AdminRole::Admin),
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let (db, _temp) = temp_db();
        let admin = db
            .insert_admin(new_admin("grace@shop.example", "grace"))
            .await
            .unwrap();

        let by_email = db
            .find_admin(AdminFilter::Email("grace@shop.example".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, admin.id);
        assert_eq!(by_email.role, AdminRole::Admin);
        assert_eq!(by_email.permissions, admin.permissions);

        let by_id = db.find_admin(AdminFilter::Id(admin.id)).await.unwrap();
        assert!(by_id.is_some());

        let missing = db
            .find_admin(AdminFilter::Username("nobody".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unique_email_and_username() {
        let (db, _temp) = temp_db();
        db.insert_admin(new_admin("a@shop.example", "alpha"))
            .await
            .unwrap();

        let dup_email = db
            .insert_admin(new_admin("a@shop.example", "other"))
            .await
            .unwrap_err();
        assert!(matches!(dup_email, StoreError::Duplicate { field: "email" }));

        let dup_username = db
            .insert_admin(new_admin("b@shop.example", "alpha"))
            .await
            .unwrap_err();
        assert!(matches!(
            dup_username,
            StoreError::Duplicate { field: "username" }
        ));

        assert_eq!(db.count_admins(AdminFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let (db, _temp) = temp_db();
        let admin = db
            .insert_admin(new_admin("c@shop.example", "charlie"))
            .await
            .unwrap();

        let login_at = Utc::now();
        let matched = db
            .update_admin(
                AdminFilter::Id(admin.id),
                AdminUpdate {
                    last_login: Some(login_at),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(matched);

        let stored = db
            .find_admin(AdminFilter::Id(admin.id))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.is_active);
        assert!(stored.last_login.is_some());
        assert_eq!(stored.first_name, "Grace");

        let unmatched = db
            .update_admin(AdminFilter::Id(DocumentId::new()), AdminUpdate::default())
            .await
            .unwrap();
        assert!(!unmatched);
    }

    #[tokio::test]
    async fn test_username_other_than() {
        let (db, _temp) = temp_db();
        let first = db
            .insert_admin(new_admin("d@shop.example", "delta"))
            .await
            .unwrap();

        let own = db
            .find_admin(AdminFilter::UsernameOtherThan {
                username: "delta".to_string(),
                id: first.id,
            })
            .await
            .unwrap();
        assert!(own.is_none());

        let someone_else = db
            .find_admin(AdminFilter::UsernameOtherThan {
                username: "delta".to_string(),
                id: DocumentId::new(),
            })
            .await
            .unwrap();
        assert!(someone_else.is_some());
    }

    #[tokio::test]
    async fn test_list_newest_first_with_paging() {
        let (db, _temp) = temp_db();
        let base = Utc::now() - Duration::hours(1);
        for i in 0..3 {
            let mut admin = new_admin(&format!("{i}@shop.example"), &format!("staff{i}"));
            admin.created_at = base + Duration::minutes(i);
            db.insert_admin(admin).await.unwrap();
        }

        let page = db
            .list_admins(PageRequest::new(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].username, "staff2");
        assert_eq!(page.items[1].username, "staff1");
        assert_eq!(page.pagination().pages, 2);

        let second = db
            .list_admins(PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].username, "staff0");
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, _temp) = temp_db();
        let admin = db
            .insert_admin(new_admin("e@shop.example", "echo"))
            .await
            .unwrap();

        assert!(db.delete_admin(AdminFilter::Id(admin.id)).await.unwrap());
        assert!(!db.delete_admin(AdminFilter::Id(admin.id)).await.unwrap());
        assert_eq!(db.count_admins(AdminFilter::All).await.unwrap(), 0);
    }
}
