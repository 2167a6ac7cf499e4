//! Database schema migrations.
//!
//! Migrations are tracked per records table, so several vaults can share one
//! database file under different table names.

use rusqlite::Connection;
use tracing::info;

use vault_core::config::is_sql_identifier;
use vault_core::error::VaultError;

/// Run all pending migrations for `table`.
pub fn run_migrations(conn: &Connection, table: &str) -> Result<(), VaultError> {
    if !is_sql_identifier(table) {
        return Err(VaultError::Storage(format!(
            "Invalid records table name '{}'",
            table
        )));
    }

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER NOT NULL,
            target      TEXT NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            PRIMARY KEY (version, target)
        );",
    )
    .map_err(|e| VaultError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations WHERE target = ?1",
            [table],
            |row| row.get(0),
        )
        .map_err(|e| VaultError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn, table)?;
        info!(table, "Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: records table.
fn apply_v1(conn: &Connection, table: &str) -> Result<(), VaultError> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS {table} (
            id          INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL CHECK (length(trim(name)) > 0),
            created     TEXT NOT NULL,
            inserted_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_{table}_name
            ON {table} (name);

        CREATE INDEX IF NOT EXISTS idx_{table}_created
            ON {table} (created);

        INSERT OR IGNORE INTO schema_migrations (version, target, name)
            VALUES (1, '{table}', 'initial_schema');
        "
    ))
    .map_err(|e| VaultError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
