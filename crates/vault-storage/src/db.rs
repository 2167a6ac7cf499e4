//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use tracing::info;

use vault_core::config::DatabaseLocation;
use vault_core::error::VaultError;

use crate::migrations;

/// Table used when none is configured.
pub const DEFAULT_TABLE: &str = "records";

/// SQL function returning its text argument lowercased with full Unicode
/// case mapping. SQLite's own `lower()` and `NOCASE` only fold ASCII.
pub const FOLD_CASE_FN: &str = "fold_case";

/// Thread-safe SQLite database wrapper.
///
/// Holds the name of the table records live in; every repository built on
/// this handle targets that table.
pub struct Database {
    conn: Mutex<Connection>,
    table: String,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, foreign keys, and runs
    /// all pending migrations. Failures are reported as `Connection` errors.
    pub fn new(path: &Path, table: &str) -> Result<Self, VaultError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    VaultError::Connection(format!(
                        "Failed to create database directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| VaultError::Connection(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| VaultError::Connection(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        Self::bootstrap(conn, table)
    }

    /// Open an in-memory database (for testing and ephemeral runs).
    pub fn in_memory() -> Result<Self, VaultError> {
        Self::in_memory_with_table(DEFAULT_TABLE)
    }

    /// Open an in-memory database with a custom records table.
    pub fn in_memory_with_table(table: &str) -> Result<Self, VaultError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            VaultError::Connection(format!("Failed to open in-memory db: {}", e))
        })?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| VaultError::Connection(format!("Failed to set pragmas: {}", e)))?;

        Self::bootstrap(conn, table)
    }

    /// Open whatever the configuration points at.
    pub fn open(location: &DatabaseLocation, table: &str) -> Result<Self, VaultError> {
        match location {
            DatabaseLocation::File(path) => Self::new(path, table),
            DatabaseLocation::Memory => Self::in_memory_with_table(table),
        }
    }

    fn bootstrap(conn: Connection, table: &str) -> Result<Self, VaultError> {
        register_functions(&conn)?;

        let db = Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        };

        db.with_conn(|conn| migrations::run_migrations(conn, table))
            .map_err(|e| VaultError::Connection(e.to_string()))?;

        Ok(db)
    }

    /// Name of the records table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, VaultError>
    where
        F: FnOnce(&Connection) -> Result<T, VaultError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| VaultError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

fn register_functions(conn: &Connection) -> Result<(), VaultError> {
    conn.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value: String = ctx.get(0)?;
            Ok(value.to_lowercase())
        },
    )
    .map_err(|e| VaultError::Connection(format!("Failed to register SQL functions: {}", e)))
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("table", &self.table)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_rows(db: &Database) -> i64 {
        db.with_conn(|conn| {
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", db.table()), [], |row| {
                row.get(0)
            })
            .map_err(|e| VaultError::Storage(e.to_string()))
        })
        .unwrap()
    }

    #[test]
    fn test_in_memory_database() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.table(), "records");
        assert_eq!(count_rows(&db), 0);
    }

    #[test]
    fn test_custom_table() {
        let db = Database::in_memory_with_table("people").unwrap();
        assert_eq!(db.table(), "people");
        assert_eq!(count_rows(&db), 0);
    }

    #[test]
    fn test_file_database_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("vault.db");
        let db = Database::new(&path, DEFAULT_TABLE).unwrap();
        assert_eq!(count_rows(&db), 0);
        assert!(path.exists());
    }

    #[test]
    fn test_open_from_location() {
        let db = Database::open(&DatabaseLocation::Memory, "records").unwrap();
        assert_eq!(count_rows(&db), 0);
    }

    #[test]
    fn test_open_failure_is_connection_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file.
        let err = Database::new(dir.path(), DEFAULT_TABLE).unwrap_err();
        assert!(matches!(err, VaultError::Connection(_)));
    }

    #[test]
    fn test_fold_case_handles_non_ascii() {
        let db = Database::in_memory().unwrap();
        let folded: String = db
            .with_conn(|conn| {
                conn.query_row("SELECT fold_case('ÅNGSTRÖM Émile')", [], |row| row.get(0))
                    .map_err(|e| VaultError::Storage(e.to_string()))
            })
            .unwrap();
        assert_eq!(folded, "ångström émile");
    }

    #[test]
    fn test_wal_mode_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(&dir.path().join("wal.db"), DEFAULT_TABLE).unwrap();
        db.with_conn(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .map_err(|e| VaultError::Storage(e.to_string()))?;
            assert_eq!(mode, "wal");
            Ok(())
        })
        .unwrap();
    }
}
