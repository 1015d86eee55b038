//! Context registry
//!
//! Every (level, instance) pair gets a stable context id the first time it is
//! asked for. Files are namespaced by that id.

use std::fmt;
use std::str::FromStr;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::MetadataDb;
use crate::error::StorageError;
use crate::host::ContextRegistry;

/// Scope level of a context. Codes match the host platform numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    System,
    User,
    #[serde(rename = "coursecat")]
    CourseCategory,
    Course,
    Module,
    Block,
}

impl ContextLevel {
    pub fn code(self) -> i64 {
        match self {
            ContextLevel::System => 10,
            ContextLevel::User => 30,
            ContextLevel::CourseCategory => 40,
            ContextLevel::Course => 50,
            ContextLevel::Module => 70,
            ContextLevel::Block => 80,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            10 => Some(ContextLevel::System),
            30 => Some(ContextLevel::User),
            40 => Some(ContextLevel::CourseCategory),
            50 => Some(ContextLevel::Course),
            70 => Some(ContextLevel::Module),
            80 => Some(ContextLevel::Block),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContextLevel::System => "system",
            ContextLevel::User => "user",
            ContextLevel::CourseCategory => "coursecat",
            ContextLevel::Course => "course",
            ContextLevel::Module => "module",
            ContextLevel::Block => "block",
        }
    }
}

impl FromStr for ContextLevel {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "system" => Ok(ContextLevel::System),
            "user" => Ok(ContextLevel::User),
            "coursecat" | "category" => Ok(ContextLevel::CourseCategory),
            "course" => Ok(ContextLevel::Course),
            "module" => Ok(ContextLevel::Module),
            "block" => Ok(ContextLevel::Block),
            other => Err(StorageError::Validation(format!("Unknown context level: {}", other))),
        }
    }
}

impl fmt::Display for ContextLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved context handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Context {
    pub id: i64,
    pub level: ContextLevel,
    pub instance_id: i64,
}

/// Get or create the context row for `(level, instance_id)`
pub fn context_instance(conn: &Connection, level: ContextLevel, instance_id: i64) -> Result<Context, StorageError> {
    conn.execute(
        "INSERT INTO contexts (context_level, instance_id) VALUES (?, ?)
         ON CONFLICT(context_level, instance_id) DO NOTHING",
        params![level.code(), instance_id],
    ).map_err(|e| StorageError::Database(format!("Failed to register context: {}", e)))?;

    let id: i64 = conn
        .query_row(
            "SELECT id FROM contexts WHERE context_level = ? AND instance_id = ?",
            params![level.code(), instance_id],
            |row| row.get(0),
        )
        .map_err(|e| StorageError::Database(format!("Failed to read context: {}", e)))?;

    debug!(context_id = id, level = %level, instance_id, "Resolved context");

    Ok(Context { id, level, instance_id })
}

impl ContextRegistry for MetadataDb {
    fn context_instance(&self, level: ContextLevel, instance_id: i64) -> Result<Context, StorageError> {
        self.with_conn(|conn| context_instance(conn, level, instance_id))
    }
}
