//! Field definition CRUD operations

use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::MetadataDb;
use crate::error::StorageError;

/// Field definition row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub id: i64,
    pub shortname: String,
    pub name: String,
    /// Field type tag, e.g. `fileupload`
    pub datatype: String,
    /// Raw context level code; unknown codes are kept as-is
    pub context_level: i64,
    pub locked: bool,
    pub param1: Option<String>,
    pub created_at: String,
}

impl FieldDefinition {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            shortname: row.get("shortname")?,
            name: row.get("name")?,
            datatype: row.get("datatype")?,
            context_level: row.get("context_level")?,
            locked: row.get("locked")?,
            param1: row.get("param1")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Input for defining a field
#[derive(Debug, Clone, Deserialize)]
pub struct CreateFieldInput {
    pub shortname: String,
    pub name: String,
    #[serde(default = "default_datatype")]
    pub datatype: String,
    pub context_level: i64,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub param1: Option<String>,
}

fn default_datatype() -> String { "fileupload".to_string() }

fn validate_shortname(shortname: &str) -> Result<(), StorageError> {
    if shortname.is_empty() {
        return Err(StorageError::Validation("Field shortname is required".to_string()));
    }
    if !shortname.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StorageError::Validation(format!(
            "Field shortname may only contain letters, digits and underscores: {}",
            shortname
        )));
    }
    Ok(())
}

pub fn create_field(conn: &Connection, input: &CreateFieldInput) -> Result<FieldDefinition, StorageError> {
    validate_shortname(&input.shortname)?;
    if input.name.trim().is_empty() {
        return Err(StorageError::Validation("Field name is required".to_string()));
    }

    conn.execute(
        "INSERT INTO metadata_fields (shortname, name, datatype, context_level, locked, param1)
         VALUES (?, ?, ?, ?, ?, ?)",
        params![
            input.shortname,
            input.name.trim(),
            input.datatype,
            input.context_level,
            input.locked,
            input.param1,
        ],
    ).map_err(|e| StorageError::Database(format!("Failed to create field: {}", e)))?;

    let id = conn.last_insert_rowid();
    info!(field_id = id, shortname = %input.shortname, datatype = %input.datatype, "Defined field");

    get_field(conn, id)?
        .ok_or_else(|| StorageError::Internal("Failed to retrieve created field".to_string()))
}

pub fn get_field(conn: &Connection, id: i64) -> Result<Option<FieldDefinition>, StorageError> {
    conn.query_row(
        "SELECT * FROM metadata_fields WHERE id = ?",
        params![id],
        |row| FieldDefinition::from_row(row),
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Failed to get field: {}", e)))
}

pub fn get_field_by_shortname(conn: &Connection, shortname: &str) -> Result<Option<FieldDefinition>, StorageError> {
    conn.query_row(
        "SELECT * FROM metadata_fields WHERE shortname = ?",
        params![shortname],
        |row| FieldDefinition::from_row(row),
    )
    .optional()
    .map_err(|e| StorageError::Database(format!("Failed to get field: {}", e)))
}

pub fn list_fields(conn: &Connection) -> Result<Vec<FieldDefinition>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT * FROM metadata_fields ORDER BY id")
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let fields = stmt
        .query_map([], |row| FieldDefinition::from_row(row))
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(shortname: &str) -> CreateFieldInput {
        CreateFieldInput {
            shortname: shortname.to_string(),
            name: "Course banner".to_string(),
            datatype: default_datatype(),
            context_level: 50,
            locked: false,
            param1: None,
        }
    }

    #[test]
    fn test_create_and_lookup() {
        let db = MetadataDb::open_in_memory().unwrap();

        let field = db.with_conn(|conn| create_field(conn, &input("banner"))).unwrap();
        assert_eq!(field.datatype, "fileupload");
        assert!(!field.locked);

        let by_name = db.with_conn(|conn| get_field_by_shortname(conn, "banner")).unwrap();
        assert_eq!(by_name, Some(field.clone()));

        let all = db.with_conn(|conn| list_fields(conn)).unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_rejects_bad_shortname() {
        let db = MetadataDb::open_in_memory().unwrap();
        let err = db.with_conn(|conn| create_field(conn, &input("bad name"))).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_duplicate_shortname_is_database_error() {
        let db = MetadataDb::open_in_memory().unwrap();
        db.with_conn(|conn| create_field(conn, &input("banner"))).unwrap();
        let err = db.with_conn(|conn| create_field(conn, &input("banner"))).unwrap_err();
        assert!(matches!(err, StorageError::Database(_)));
    }
}
