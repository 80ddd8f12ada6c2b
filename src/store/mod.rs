//! Document Store
//! Mission: Typed, timeout-bounded persistence for admins, users, products and orders
//!
//! One SQLite connection behind a mutex. Every call runs on the blocking pool
//! and is bounded by the configured timeout so a stalled backend surfaces as
//! an error instead of pinning a request worker.

pub mod admins;
pub mod orders;
pub mod products;
pub mod users;

pub use admins::{AdminFilter, AdminUpdate};
pub use orders::{OrderFilter, OrderStatusUpdate};
pub use products::{ProductFilter, ProductUpdate};
pub use users::{UserFilter, UserUpdate};

use crate::models::{DocumentId, Page, PageRequest};
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{
    types::{Type, Value},
    params_from_iter, Connection, ErrorCode, InterruptHandle, OpenFlags, OptionalExtension, Row,
};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS admins (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    username TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    permissions_json TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    last_login TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    created_by TEXT
) WITHOUT ROWID;

CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_email ON admins(email);
CREATE UNIQUE INDEX IF NOT EXISTS idx_admins_username ON admins(username);
CREATE INDEX IF NOT EXISTS idx_admins_created_at ON admins(created_at DESC);

CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    phone TEXT,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_verified INTEGER NOT NULL DEFAULT 0,
    last_login TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    addresses_json TEXT NOT NULL DEFAULT '[]',
    total_orders INTEGER NOT NULL DEFAULT 0,
    total_spent REAL NOT NULL DEFAULT 0
) WITHOUT ROWID;

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);
CREATE INDEX IF NOT EXISTS idx_users_created_at ON users(created_at DESC);

CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    price REAL NOT NULL,
    category_id TEXT NOT NULL,
    brand TEXT NOT NULL,
    sku TEXT NOT NULL,
    stock_quantity INTEGER NOT NULL DEFAULT 0,
    images_json TEXT NOT NULL DEFAULT '[]',
    tags_json TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    is_featured INTEGER NOT NULL DEFAULT 0,
    rating REAL NOT NULL DEFAULT 0,
    review_count INTEGER NOT NULL DEFAULT 0,
    sold_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    created_by TEXT
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_products_category ON products(category_id);
CREATE INDEX IF NOT EXISTS idx_products_active ON products(is_active);
CREATE INDEX IF NOT EXISTS idx_products_created_at ON products(created_at DESC);

CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    order_number TEXT NOT NULL,
    user_id TEXT NOT NULL,
    user_email TEXT NOT NULL,
    items_json TEXT NOT NULL,
    total_amount REAL NOT NULL,
    status TEXT NOT NULL,
    payment_status TEXT NOT NULL,
    payment_method TEXT,
    shipping_address_json TEXT NOT NULL,
    billing_address_json TEXT,
    tracking_number TEXT,
    notes TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    shipped_at TEXT,
    delivered_at TEXT
) WITHOUT ROWID;

CREATE UNIQUE INDEX IF NOT EXISTS idx_orders_number ON orders(order_number);
CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status);
CREATE INDEX IF NOT EXISTS idx_orders_created_at ON orders(created_at DESC);
"#;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate value for unique field `{field}`")]
    Duplicate { field: &'static str },
    #[error("store call exceeded its deadline")]
    Timeout,
    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
            if failure.code == ErrorCode::ConstraintViolation
                && message.starts_with("UNIQUE constraint failed")
            {
                return StoreError::Duplicate {
                    field: unique_field(message),
                };
            }
        }
        StoreError::Sqlite(err)
    }
}

/// Column named in a SQLite unique-constraint message, e.g. `admins.email`.
fn unique_field(message: &str) -> &'static str {
    let column = message
        .rsplit(|c: char| c == '.' || c == ' ')
        .next()
        .unwrap_or_default();
    match column {
        "email" => "email",
        "username" => "username",
        "order_number" => "order number",
        "id" => "id",
        _ => "record",
    }
}

/// Shared handle to the backing database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    interrupt: Arc<InterruptHandle>,
    timeout: Duration,
}

/// Progress of one store call, shared between the caller and its blocking task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CallState {
    Queued,
    Running,
    Abandoned,
    Finished,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema.
    pub fn open(path: &str, timeout: Duration) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX; // locking is ours

        let conn = Connection::open_with_flags(path, flags)?;
        conn.execute_batch(SCHEMA_SQL)?;

        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap_or_default();
        if journal_mode.to_lowercase() != "wal" {
            warn!("WAL mode not active, journal_mode = {}", journal_mode);
        }

        info!("📦 Document store ready at: {}", path);

        Ok(Self {
            interrupt: Arc::new(conn.get_interrupt_handle()),
            conn: Arc::new(Mutex::new(conn)),
            timeout,
        })
    }

    /// Run `op` against the connection on the blocking pool, bounded by the store timeout.
    ///
    /// `op` runs inside a transaction. A call that times out is rolled back:
    /// it never reaches `op` if it was still queued, its running statement is
    /// interrupted, and whatever it already wrote is discarded.
    pub async fn call<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let state = Arc::new(Mutex::new(CallState::Queued));
        let task_state = Arc::clone(&state);

        let mut task = tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            {
                let mut state = task_state.lock();
                if *state == CallState::Abandoned {
                    return Err(StoreError::Timeout);
                }
                *state = CallState::Running;
            }

            if let Err(e) = guard.execute_batch("BEGIN") {
                *task_state.lock() = CallState::Finished;
                return Err(e.into());
            }
            let result = op(&guard);

            // State lock is held through COMMIT; a caller timing out meanwhile waits for the result.
            let mut state = task_state.lock();
            let abandoned = *state == CallState::Abandoned;
            *state = CallState::Finished;
            match result {
                Ok(value) if !abandoned => match guard.execute_batch("COMMIT") {
                    Ok(()) => Ok(value),
                    Err(e) => {
                        let _ = guard.execute_batch("ROLLBACK");
                        Err(e.into())
                    }
                },
                other => {
                    // An interrupted statement may already have ended the transaction.
                    let _ = guard.execute_batch("ROLLBACK");
                    if abandoned {
                        Err(StoreError::Timeout)
                    } else {
                        other
                    }
                }
            }
        });

        match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined?,
            Err(_) => {
                let finished = {
                    let mut state = state.lock();
                    match *state {
                        CallState::Queued => *state = CallState::Abandoned,
                        CallState::Running => {
                            *state = CallState::Abandoned;
                            // The task still holds the connection, so this only hits its statement.
                            self.interrupt.interrupt();
                        }
                        CallState::Abandoned | CallState::Finished => {}
                    }
                    *state == CallState::Finished
                };
                if finished {
                    return task.await?;
                }
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Timeout)
            }
        }
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        self.call(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }
}

/// Column assignments for an `UPDATE ... SET` built from a typed update struct.
#[derive(Debug, Default)]
pub(crate) struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    pub(crate) fn set(&mut self, column: &'static str, value: impl Into<Value>) {
        self.columns.push(column);
        self.values.push(value.into());
    }

    pub(crate) fn set_opt<T: Into<Value>>(&mut self, column: &'static str, value: Option<T>) {
        if let Some(value) = value {
            self.set(column, value);
        }
    }

    /// `UPDATE <table> SET ... WHERE <predicate>`; predicate params follow the set values.
    pub(crate) fn into_statement(
        self,
        table: &str,
        predicate: &Predicate,
    ) -> (String, Vec<Value>) {
        let set_clause = self
            .columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {table} SET {set_clause}{}", predicate.where_clause());
        let mut params = self.values;
        params.extend(predicate.params.iter().cloned());
        (sql, params)
    }
}

/// Conjunction of SQL conditions with positional parameters.
#[derive(Debug, Default, Clone)]
pub(crate) struct Predicate {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Predicate {
    pub(crate) fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(format!("{column} = ?"));
        self.params.push(value.into());
        self
    }

    pub(crate) fn ne(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(format!("{column} <> ?"));
        self.params.push(value.into());
        self
    }

    /// Case-insensitive substring match on any of `columns`.
    pub(crate) fn search(mut self, columns: &[&str], needle: &str) -> Self {
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        let any = columns
            .iter()
            .map(|column| format!("LOWER({column}) LIKE ? ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.clauses.push(format!("({any})"));
        self.params
            .extend(columns.iter().map(|_| Value::Text(pattern.clone())));
        self
    }

    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn params(&self) -> &[Value] {
        &self.params
    }
}

type RowMapper<T> = fn(&Row<'_>) -> rusqlite::Result<T>;

pub(crate) fn count_where(
    conn: &Connection,
    table: &str,
    predicate: &Predicate,
) -> Result<u64, StoreError> {
    let sql = format!("SELECT COUNT(*) FROM {table}{}", predicate.where_clause());
    let count: i64 = conn.query_row(&sql, params_from_iter(predicate.params()), |row| row.get(0))?;
    Ok(count.max(0) as u64)
}

pub(crate) fn select_one<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    predicate: &Predicate,
    map: RowMapper<T>,
) -> Result<Option<T>, StoreError> {
    let sql = format!(
        "SELECT {columns} FROM {table}{} LIMIT 1",
        predicate.where_clause()
    );
    Ok(conn
        .query_row(&sql, params_from_iter(predicate.params()), map)
        .optional()?)
}

/// One page of matches, newest first, with the total match count.
pub(crate) fn select_page<T>(
    conn: &Connection,
    table: &str,
    columns: &str,
    predicate: &Predicate,
    request: PageRequest,
    map: RowMapper<T>,
) -> Result<Page<T>, StoreError> {
    let total = count_where(conn, table, predicate)?;

    let mut params = predicate.params().to_vec();
    params.push(Value::Integer(i64::from(request.limit)));
    params.push(Value::Integer(request.skip() as i64));

    let sql = format!(
        "SELECT {columns} FROM {table}{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
        predicate.where_clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(params), map)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Page {
        items,
        total,
        request,
    })
}

pub(crate) fn update_where(
    conn: &Connection,
    table: &str,
    set: Assignments,
    predicate: &Predicate,
) -> Result<bool, StoreError> {
    let (sql, values) = set.into_statement(table, predicate);
    Ok(conn.execute(&sql, params_from_iter(values))? > 0)
}

pub(crate) fn delete_where(
    conn: &Connection,
    table: &str,
    predicate: &Predicate,
) -> Result<bool, StoreError> {
    let sql = format!("DELETE FROM {table}{}", predicate.where_clause());
    Ok(conn.execute(&sql, params_from_iter(predicate.params()))? > 0)
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn encode_json<T: Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

pub(crate) fn read_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

pub(crate) fn read_opt_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| conversion_error(idx, e))
    })
    .transpose()
}

pub(crate) fn read_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<DocumentId> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion_error(idx, e))
}

pub(crate) fn read_opt_id(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DocumentId>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|raw| raw.parse().map_err(|e| conversion_error(idx, e)))
        .transpose()
}

pub(crate) fn read_json<T: DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, e))
}

pub(crate) fn read_parsed<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = String>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e: String| conversion_error(idx, std::io::Error::other(e)))
}


#[cfg(test)]
mod tests {
    use super::test_support::temp_db;
    use super::*;

    #[tokio::test]
    async fn test_ping() {
        let (db, _temp) = temp_db();
        db.ping().await.unwrap();
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let db = Database::open(
            temp_file.path().to_str().unwrap(),
            Duration::from_millis(20),
        )
        .unwrap();

        let result = db
            .call(|_conn| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout)));
    }

    #[tokio::test]
    async fn test_timed_out_write_is_rolled_back() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let path = temp_file.path().to_str().unwrap().to_string();
        let db = Database::open(&path, Duration::from_millis(20)).unwrap();

        let observer = Connection::open(&path).unwrap();
        observer
            .execute_batch("CREATE TABLE scratch (value INTEGER NOT NULL)")
            .unwrap();

        let result = db
            .call(|conn| {
                std::thread::sleep(Duration::from_millis(100));
                conn.execute("INSERT INTO scratch (value) VALUES (1)", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::Timeout)));

        // Let the abandoned task run to completion
        tokio::time::sleep(Duration::from_millis(300)).await;
        let rows: i64 = observer
            .query_row("SELECT COUNT(*) FROM scratch", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[tokio::test]
    async fn test_failed_op_is_rolled_back() {
        let (db, temp) = temp_db();
        let observer = Connection::open(temp.path()).unwrap();
        observer
            .execute_batch("CREATE TABLE scratch (value INTEGER NOT NULL)")
            .unwrap();

        let result: Result<(), StoreError> = db
            .call(|conn| {
                conn.execute("INSERT INTO scratch (value) VALUES (1)", [])?;
                Err(StoreError::Timeout)
            })
            .await;
        assert!(result.is_err());

        db.call(|conn| {
            conn.execute("INSERT INTO scratch (value) VALUES (2)", [])?;
            Ok(())
        })
        .await
        .unwrap();

        let values: Vec<i64> = observer
            .prepare("SELECT value FROM scratch")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(values, vec![2]);
    }

    #[test]
    fn test_unique_field_parsing() {
        assert_eq!(unique_field("UNIQUE constraint failed: admins.email"), "email");
        assert_eq!(
            unique_field("UNIQUE constraint failed: admins.username"),
            "username"
        );
        assert_eq!(
            unique_field("UNIQUE constraint failed: orders.order_number"),
            "order number"
        );
        assert_eq!(unique_field("UNIQUE constraint failed: x.y"), "record");
    }

    #[test]
    fn test_predicate_and_assignments() {
        let predicate = Predicate::default().eq("id", "abc".to_string());
        let mut set = Assignments::default();
        set.set("first_name", "Ada".to_string());
        set.set("is_active", true);
        let (sql, params) = set.into_statement("admins", &predicate);
        assert_eq!(
            sql,
            "UPDATE admins SET first_name = ?, is_active = ? WHERE id = ?"
        );
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_search_escapes_wildcards() {
        let predicate = Predicate::default().search(&["email"], "50%_off");
        assert_eq!(predicate.params().len(), 1);
        assert_eq!(
            predicate.params()[0],
            Value::Text("%50\\%\\_off%".to_string())
        );
    }
}
