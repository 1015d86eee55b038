//! SQLite database for field definitions, field values and file records
//!
//! ## Tables
//!
//! - `contexts` - Stable context ids per (context level, instance)
//! - `metadata_fields` - Field definitions created by administrators
//! - `metadata_values` - One value per (instance, field)
//! - `files` - Permanent file records, bodies referenced by `content_hash`
//! - `draft_tokens` / `draft_files` - Draft areas used while editing
//!
//! `MetadataDb` implements the host collaborator traits from [`crate::host`]
//! so the field adapters never touch SQL directly.

pub mod schema;
pub mod contexts;
pub mod fields;
pub mod values;
pub mod files;

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::StorageError;

/// SQLite database backing the metadata field host services
pub struct MetadataDb {
    conn: Mutex<Connection>,
}

impl MetadataDb {
    /// Open or create the database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, StorageError> {
        info!("Opening SQLite database at {:?}", db_path);

        let conn = Connection::open(db_path)
            .map_err(|e| StorageError::Database(format!("Failed to open SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| StorageError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        debug!("Opening in-memory SQLite database");

        let conn = Connection::open_in_memory()
            .map_err(|e| StorageError::Database(format!("Failed to open in-memory SQLite: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| StorageError::Database(format!("Failed to set PRAGMA: {}", e)))?;

        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init_schema()?;

        Ok(db)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        self.with_conn(|conn| schema::init_schema(conn))
    }

    /// Run a read operation against the connection
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self.conn.lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a write operation with exclusive access (for transactions)
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError>,
    {
        let mut conn = self.conn.lock()
            .map_err(|e| StorageError::Internal(format!("Lock poisoned: {}", e)))?;
        f(&mut conn)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats, StorageError> {
        self.with_conn(|conn| {
            let count = |table: &str| -> Result<u64, StorageError> {
                let sql = format!("SELECT COUNT(*) FROM {}", table);
                conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n as u64)
                    .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
            };

            let file_count: i64 = conn
                .query_row("SELECT COUNT(*) FROM files WHERE filename != '.'", [], |row| row.get(0))
                .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;

            Ok(DbStats {
                field_count: count("metadata_fields")?,
                value_count: count("metadata_values")?,
                file_count: file_count as u64,
                draft_file_count: count("draft_files")?,
            })
        })
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub field_count: u64,
    pub value_count: u64,
    pub file_count: u64,
    pub draft_file_count: u64,
}

// Re-exports
pub use contexts::{Context, ContextLevel};
pub use fields::{CreateFieldInput, FieldDefinition};
pub use values::FieldValue;
pub use files::{DraftFile, FileArea, NewDraftFile, StoredFile};
