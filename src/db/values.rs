//! Field value persistence
//!
//! Values are keyed by `(instance_id, field_id)`. Writes go through a single
//! `INSERT ... ON CONFLICT DO UPDATE` so concurrent saves for the same pair
//! can never produce two rows.

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{fields, CreateFieldInput, FieldDefinition, MetadataDb};
use crate::error::StorageError;
use crate::host::RecordStore;

/// Field value row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldValue {
    pub id: i64,
    pub instance_id: i64,
    pub field_id: i64,
    pub data: String,
    pub updated_at: String,
}

impl FieldValue {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            instance_id: row.get("instance_id")?,
            field_id: row.get("field_id")?,
            data: row.get("data")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

pub fn find_value_id(conn: &Connection, instance_id: i64, field_id: i64) -> Result<Option<i64>, StorageError> {
    conn.query_row(
        "SELECT id FROM metadata_values WHERE instance_id = ? AND field_id = ?",
        params![instance_id, field_id],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Failed to find value: {}", e)))
}

pub fn get_value(conn: &Connection, instance_id: i64, field_id: i64) -> Result<Option<FieldValue>, StorageError> {
    conn.query_row(
        "SELECT * FROM metadata_values WHERE instance_id = ? AND field_id = ?",
        params![instance_id, field_id],
        |row| FieldValue::from_row(row),
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Failed to get value: {}", e)))
}

pub fn upsert_value(conn: &Connection, instance_id: i64, field_id: i64, data: &str) -> Result<i64, StorageError> {
    let now = chrono::Utc::now().to_rfc3339();

    let id: i64 = conn
        .query_row(
            "INSERT INTO metadata_values (instance_id, field_id, data, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(instance_id, field_id) DO UPDATE SET
                 data = excluded.data,
                 updated_at = excluded.updated_at
             RETURNING id",
            params![instance_id, field_id, data, now],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::Database(format!("Failed to save value: {}", e)))?;

    debug!(value_id = id, instance_id, field_id, "Saved field value");
    Ok(id)
}

pub fn count_values(conn: &Connection, instance_id: i64, field_id: i64) -> Result<u64, StorageError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM metadata_values WHERE instance_id = ? AND field_id = ?",
            params![instance_id, field_id],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?;
    Ok(count as u64)
}

impl RecordStore for MetadataDb {
    fn find_value_id(&self, instance_id: i64, field_id: i64) -> Result<Option<i64>, StorageError> {
        self.with_conn(|conn| find_value_id(conn, instance_id, field_id))
    }

    fn upsert_value(&self, instance_id: i64, field_id: i64, data: &str) -> Result<i64, StorageError> {
        self.with_conn(|conn| upsert_value(conn, instance_id, field_id, data))
    }

    fn get_value(&self, instance_id: i64, field_id: i64) -> Result<Option<FieldValue>, StorageError> {
        self.with_conn(|conn| get_value(conn, instance_id, field_id))
    }

    fn count_values(&self, instance_id: i64, field_id: i64) -> Result<u64, StorageError> {
        self.with_conn(|conn| count_values(conn, instance_id, field_id))
    }

    fn define_field(&self, input: &CreateFieldInput) -> Result<FieldDefinition, StorageError> {
        self.with_conn(|conn| fields::create_field(conn, input))
    }

    fn field(&self, id: i64) -> Result<Option<FieldDefinition>, StorageError> {
        self.with_conn(|conn| fields::get_field(conn, id))
    }

    fn field_by_shortname(&self, shortname: &str) -> Result<Option<FieldDefinition>, StorageError> {
        self.with_conn(|conn| fields::get_field_by_shortname(conn, shortname))
    }

    fn list_fields(&self) -> Result<Vec<FieldDefinition>, StorageError> {
        self.with_conn(|conn| fields::list_fields(conn))
    }
}
