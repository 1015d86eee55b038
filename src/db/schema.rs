//! Database schema definitions

use rusqlite::Connection;
use tracing::info;

use crate::error::StorageError;

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<(), StorageError> {
    let current_version = get_schema_version(conn)?;

    if current_version == 0 {
        info!("Creating new database schema v{}", SCHEMA_VERSION);
        create_tables(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if current_version < SCHEMA_VERSION {
        info!("Migrating schema from v{} to v{}", current_version, SCHEMA_VERSION);
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else {
        info!("Database schema is up to date (v{})", current_version);
    }

    Ok(())
}

/// Get current schema version (0 if not initialized)
fn get_schema_version(conn: &Connection) -> Result<i32, StorageError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    ).map_err(|e| StorageError::Database(format!("Failed to create schema_version table: {}", e)))?;

    let version: i32 = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| row.get(0))
        .unwrap_or(0);

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<(), StorageError> {
    conn.execute("DELETE FROM schema_version", [])
        .map_err(|e| StorageError::Database(format!("Failed to clear schema_version: {}", e)))?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?)", [version])
        .map_err(|e| StorageError::Database(format!("Failed to set schema_version: {}", e)))?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(FIELDS_SCHEMA)
        .map_err(|e| StorageError::Database(format!("Failed to create field tables: {}", e)))?;

    conn.execute_batch(FILES_SCHEMA)
        .map_err(|e| StorageError::Database(format!("Failed to create file tables: {}", e)))?;

    conn.execute_batch(INDEXES_SCHEMA)
        .map_err(|e| StorageError::Database(format!("Failed to create indexes: {}", e)))?;

    Ok(())
}

/// Contexts, field definitions and field values
const FIELDS_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS contexts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    context_level INTEGER NOT NULL,
    instance_id INTEGER NOT NULL,
    UNIQUE (context_level, instance_id)
);

CREATE TABLE IF NOT EXISTS metadata_fields (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    shortname TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    datatype TEXT NOT NULL,
    context_level INTEGER NOT NULL,
    locked INTEGER NOT NULL DEFAULT 0,
    -- Newline separated option list
    param1 TEXT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- One value per (instance, field); upserts rely on this constraint
CREATE TABLE IF NOT EXISTS metadata_values (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    instance_id INTEGER NOT NULL,
    field_id INTEGER NOT NULL,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    UNIQUE (instance_id, field_id),
    FOREIGN KEY (field_id) REFERENCES metadata_fields(id) ON DELETE CASCADE
);
"#;

/// Permanent file records and draft areas
const FILES_SCHEMA: &str = r#"
-- filename '.' marks the directory entry of an area root
CREATE TABLE IF NOT EXISTS files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    context_id INTEGER NOT NULL,
    component TEXT NOT NULL,
    file_area TEXT NOT NULL,
    item_id INTEGER NOT NULL,
    file_path TEXT NOT NULL DEFAULT '/',
    filename TEXT NOT NULL,
    content_hash TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE (context_id, component, file_area, item_id, file_path, filename)
);

CREATE TABLE IF NOT EXISTS draft_tokens (
    token INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS draft_files (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    token INTEGER NOT NULL,
    file_path TEXT NOT NULL DEFAULT '/',
    filename TEXT NOT NULL,
    content_hash TEXT,
    size_bytes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE (token, file_path, filename),
    FOREIGN KEY (token) REFERENCES draft_tokens(token) ON DELETE CASCADE
);
"#;

const INDEXES_SCHEMA: &str = r#"
CREATE INDEX IF NOT EXISTS idx_files_context ON files(context_id, item_id);
CREATE INDEX IF NOT EXISTS idx_files_area ON files(context_id, component, file_area, item_id);
CREATE INDEX IF NOT EXISTS idx_values_field ON metadata_values(field_id);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        assert_eq!(get_schema_version(&conn).unwrap(), SCHEMA_VERSION);

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN
                 ('contexts', 'metadata_fields', 'metadata_values', 'files', 'draft_tokens', 'draft_files')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 6);
    }
}
