use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params_from_iter, Connection, OpenFlags};

use crate::store::{quote_identifier, ColumnFilter, DuplicateKey, KnowledgeStore, StoreError};

/// SQLite-backed implementation of the KnowledgeStore trait.
///
/// The connection sits behind a mutex so one store can be shared by all
/// audit workers; queries are short and read-only.
pub struct SqliteKnowledgeStore {
    conn: Mutex<Connection>,
}

impl SqliteKnowledgeStore {
    /// Open an existing database read-only. A missing file is an error.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Self::from_connection(conn))
    }

    /// Open or create a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Self::from_connection(conn))
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Run a batch of SQL statements (schema setup and fixtures).
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.lock()?.execute_batch(sql).map_err(map_sqlite_error)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
    }
}

/// Map a SQLite error onto the store taxonomy. A missing relation must stay
/// distinguishable from every other failure.
pub(crate) fn map_sqlite_error(e: rusqlite::Error) -> StoreError {
    let msg = e.to_string();
    if let Some(table) = missing_relation(&msg) {
        return StoreError::TableMissing(table);
    }
    match &e {
        rusqlite::Error::SqliteFailure(err, _)
            if matches!(
                err.code,
                rusqlite::ErrorCode::CannotOpen
                    | rusqlite::ErrorCode::DatabaseBusy
                    | rusqlite::ErrorCode::DatabaseLocked
                    | rusqlite::ErrorCode::NotADatabase
            ) =>
        {
            StoreError::Unavailable(msg)
        }
        _ => StoreError::Query(msg),
    }
}

/// Extract the table name from "no such table: x" / "relation \"x\" does not exist".
fn missing_relation(msg: &str) -> Option<String> {
    if let Some(idx) = msg.find("no such table: ") {
        let rest = &msg[idx + "no such table: ".len()..];
        return Some(rest.split_whitespace().next().unwrap_or(rest).to_string());
    }
    if msg.contains("does not exist") {
        if let Some(start) = msg.find("relation \"") {
            let rest = &msg[start + "relation \"".len()..];
            return Some(rest.split('"').next().unwrap_or(rest).to_string());
        }
    }
    None
}

impl KnowledgeStore for SqliteKnowledgeStore {
    fn count_rows(&self, table: &str) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(&sql, [], |row| row.get(0))
            .map_err(map_sqlite_error)?;
        Ok(count.max(0) as u64)
    }

    fn duplicate_keys(&self, table: &str, key_column: &str) -> Result<Vec<DuplicateKey>, StoreError> {
        let t = quote_identifier(table)?;
        let k = quote_identifier(key_column)?;
        let sql = format!(
            "SELECT CAST({k} AS TEXT), COUNT(*) FROM {t} \
             GROUP BY {k} HAVING COUNT(*) > 1 ORDER BY 1"
        );
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DuplicateKey {
                    key: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    count: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })
            .map_err(map_sqlite_error)?;
        let collected = rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_error);
        collected
    }

    fn missing_values(
        &self,
        table: &str,
        key_column: &str,
        required_column: &str,
        filter: Option<&ColumnFilter>,
    ) -> Result<Vec<String>, StoreError> {
        let t = quote_identifier(table)?;
        let k = quote_identifier(key_column)?;
        let c = quote_identifier(required_column)?;
        let mut sql = format!(
            "SELECT CAST({k} AS TEXT) FROM {t} WHERE ({c} IS NULL OR CAST({c} AS TEXT) = '')"
        );
        let mut bind: Vec<String> = Vec::new();
        if let Some(f) = filter {
            sql.push_str(&format!(
                " AND CAST({} AS TEXT) = ?1",
                quote_identifier(&f.column)?
            ));
            bind.push(f.value.clone());
        }
        sql.push_str(" ORDER BY 1");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map(params_from_iter(bind.iter()), |row| {
                Ok(row.get::<_, Option<String>>(0)?.unwrap_or_default())
            })
            .map_err(map_sqlite_error)?;
        let collected = rows.collect::<Result<Vec<_>, _>>().map_err(map_sqlite_error);
        collected
    }

    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        crate::store::validate_identifier(table)?;
        let name = table.rsplit('.').next().unwrap_or(table);
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .map_err(map_sqlite_error)?;
        Ok(count > 0)
    }
}
