//! File records and draft areas
//!
//! A permanent area is addressed by `(context_id, component, file_area, item_id)`.
//! Areas that hold files also hold a directory entry named `.` for their root,
//! which every lookup skips.
//!
//! Draft areas are keyed by a token alone. Staging copies permanent files into
//! a draft; promotion makes a permanent area match a draft and releases the
//! draft. Drafts that are never promoted are removed by [`purge_drafts`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use rusqlite::{params, Connection, Row, Transaction};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::MetadataDb;
use crate::error::StorageError;
use crate::host::{DraftToken, FileStore};

/// Filename of the directory entry that marks an area root
pub const DIRECTORY_ENTRY: &str = ".";

/// Permanent file row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub id: i64,
    pub context_id: i64,
    pub component: String,
    pub file_area: String,
    pub item_id: i64,
    pub file_path: String,
    pub filename: String,
    pub content_hash: Option<String>,
    pub size_bytes: i64,
    pub created_at: String,
}

impl StoredFile {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            context_id: row.get("context_id")?,
            component: row.get("component")?,
            file_area: row.get("file_area")?,
            item_id: row.get("item_id")?,
            file_path: row.get("file_path")?,
            filename: row.get("filename")?,
            content_hash: row.get("content_hash")?,
            size_bytes: row.get("size_bytes")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn is_directory(&self) -> bool {
        self.filename == DIRECTORY_ENTRY
    }
}

/// File held in a draft area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftFile {
    pub id: i64,
    pub token: DraftToken,
    pub file_path: String,
    pub filename: String,
    pub content_hash: Option<String>,
    pub size_bytes: i64,
    pub created_at: String,
}

impl DraftFile {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            token: row.get("token")?,
            file_path: row.get("file_path")?,
            filename: row.get("filename")?,
            content_hash: row.get("content_hash")?,
            size_bytes: row.get("size_bytes")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Input for adding a file to a draft area
#[derive(Debug, Clone, Deserialize)]
pub struct NewDraftFile {
    #[serde(default = "default_file_path")]
    pub file_path: String,
    pub filename: String,
    pub content_hash: Option<String>,
    #[serde(default)]
    pub size_bytes: i64,
}

fn default_file_path() -> String { "/".to_string() }

/// Permanent area namespace, without the item id
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileArea {
    pub context_id: i64,
    pub component: String,
    pub file_area: String,
}

impl FileArea {
    pub fn new(context_id: i64, component: impl Into<String>, file_area: impl Into<String>) -> Self {
        Self {
            context_id,
            component: component.into(),
            file_area: file_area.into(),
        }
    }
}

fn validate_draft_file(file: &NewDraftFile) -> Result<(), StorageError> {
    if file.filename.is_empty() || file.filename == DIRECTORY_ENTRY || file.filename.contains('/') {
        return Err(StorageError::Validation(format!("Invalid filename: {:?}", file.filename)));
    }
    if !file.file_path.starts_with('/') || !file.file_path.ends_with('/') {
        return Err(StorageError::Validation(format!(
            "File path must start and end with '/': {:?}",
            file.file_path
        )));
    }
    if file.size_bytes < 0 {
        return Err(StorageError::Validation("File size cannot be negative".to_string()));
    }
    Ok(())
}

pub fn new_draft_token(conn: &Connection) -> Result<DraftToken, StorageError> {
    conn.execute("INSERT INTO draft_tokens DEFAULT VALUES", [])
        .map_err(|e| StorageError::Database(format!("Failed to allocate draft token: {}", e)))?;
    let token = conn.last_insert_rowid();
    debug!(token, "Allocated draft area");
    Ok(token)
}

/// Make sure a submitted token has a backing row
fn ensure_draft_token(conn: &Connection, token: DraftToken) -> Result<(), StorageError> {
    conn.execute(
        "INSERT INTO draft_tokens (token) VALUES (?) ON CONFLICT(token) DO NOTHING",
        params![token],
    ).map_err(|e| StorageError::Database(format!("Failed to register draft token: {}", e)))?;
    Ok(())
}

pub fn area_files(
    conn: &Connection,
    area: &FileArea,
    item_id: i64,
) -> Result<Vec<StoredFile>, StorageError> {
    let mut stmt = conn
        .prepare(
            "SELECT * FROM files
             WHERE context_id = ? AND component = ? AND file_area = ? AND item_id = ? AND filename != '.'
             ORDER BY id",
        )
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let files = stmt
        .query_map(
            params![area.context_id, area.component, area.file_area, item_id],
            |row| StoredFile::from_row(row),
        )
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    Ok(files)
}

pub fn draft_files(conn: &Connection, token: DraftToken) -> Result<Vec<DraftFile>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT * FROM draft_files WHERE token = ? ORDER BY id")
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let files = stmt
        .query_map(params![token], |row| DraftFile::from_row(row))
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    Ok(files)
}

pub fn query_files(conn: &Connection, context_id: i64, item_id: Option<i64>) -> Result<Vec<StoredFile>, StorageError> {
    let mut sql = String::from("SELECT * FROM files WHERE filename != '.' AND context_id = ?");
    let mut params: Vec<i64> = vec![context_id];
    if let Some(item_id) = item_id {
        sql.push_str(" AND item_id = ?");
        params.push(item_id);
    }
    sql.push_str(" ORDER BY id");

    let mut stmt = conn
        .prepare(&sql)
        .map_err(|e| StorageError::Database(format!("Prepare failed: {}", e)))?;

    let files = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), |row| StoredFile::from_row(row))
        .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StorageError::Database(format!("Row parse failed: {}", e)))?;

    debug!(context_id, ?item_id, found = files.len(), "Queried files");
    Ok(files)
}

pub fn add_draft_file(conn: &Connection, token: DraftToken, file: &NewDraftFile) -> Result<DraftFile, StorageError> {
    validate_draft_file(file)?;
    ensure_draft_token(conn, token)?;

    let now = chrono::Utc::now().to_rfc3339();
    conn.query_row(
        "INSERT INTO draft_files (token, file_path, filename, content_hash, size_bytes, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(token, file_path, filename) DO UPDATE SET
             content_hash = excluded.content_hash,
             size_bytes = excluded.size_bytes
         RETURNING *",
        params![token, file.file_path, file.filename, file.content_hash, file.size_bytes, now],
        |row| DraftFile::from_row(row),
    )
    .map_err(|e| StorageError::Database(format!("Failed to add draft file: {}", e)))
}

pub fn clear_draft(conn: &Connection, token: DraftToken) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM draft_files WHERE token = ?", params![token])
        .map_err(|e| StorageError::Database(format!("Failed to clear draft area: {}", e)))
}

/// Prepare a draft area, seeding a new one from a permanent area
pub fn stage_draft(
    conn: &mut Connection,
    token: Option<DraftToken>,
    area: &FileArea,
    source_item_id: Option<i64>,
) -> Result<DraftToken, StorageError> {
    if let Some(token) = token {
        // Already submitted; the user's pending edits win.
        ensure_draft_token(conn, token)?;
        return Ok(token);
    }

    let tx = conn.transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    let token = new_draft_token(&tx)?;
    let mut copied = 0;

    if let Some(item_id) = source_item_id {
        let now = chrono::Utc::now().to_rfc3339();
        for file in area_files(&tx, area, item_id)? {
            tx.execute(
                "INSERT INTO draft_files (token, file_path, filename, content_hash, size_bytes, created_at)
                 VALUES (?, ?, ?, ?, ?, ?)",
                params![token, file.file_path, file.filename, file.content_hash, file.size_bytes, now],
            ).map_err(|e| StorageError::Database(format!("Failed to copy file into draft: {}", e)))?;
            copied += 1;
        }
    }

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit draft: {}", e)))?;

    debug!(token, ?source_item_id, copied, "Staged draft area");
    Ok(token)
}

fn insert_directory_entry(tx: &Transaction, area: &FileArea, item_id: i64, now: &str) -> Result<(), StorageError> {
    tx.execute(
        "INSERT INTO files (context_id, component, file_area, item_id, file_path, filename, size_bytes, created_at)
         VALUES (?, ?, ?, ?, '/', '.', 0, ?)
         ON CONFLICT(context_id, component, file_area, item_id, file_path, filename) DO NOTHING",
        params![area.context_id, area.component, area.file_area, item_id, now],
    ).map_err(|e| StorageError::Database(format!("Failed to create directory entry: {}", e)))?;
    Ok(())
}

/// Synchronise the permanent area `(area, dest_item_id)` with a draft area
pub fn promote_draft(
    conn: &mut Connection,
    token: DraftToken,
    area: &FileArea,
    dest_item_id: i64,
    max_files: Option<usize>,
) -> Result<Vec<StoredFile>, StorageError> {
    let tx = conn.transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    let mut drafts = draft_files(&tx, token)?;
    if let Some(max) = max_files {
        drafts.truncate(max);
    }

    let keep: HashSet<(&str, &str)> = drafts
        .iter()
        .map(|f| (f.file_path.as_str(), f.filename.as_str()))
        .collect();

    let mut removed = 0;
    for existing in area_files(&tx, area, dest_item_id)? {
        if !keep.contains(&(existing.file_path.as_str(), existing.filename.as_str())) {
            tx.execute("DELETE FROM files WHERE id = ?", params![existing.id])
                .map_err(|e| StorageError::Database(format!("Failed to remove file: {}", e)))?;
            removed += 1;
        }
    }

    let now = chrono::Utc::now().to_rfc3339();
    if drafts.is_empty() {
        tx.execute(
            "DELETE FROM files WHERE context_id = ? AND component = ? AND file_area = ? AND item_id = ?",
            params![area.context_id, area.component, area.file_area, dest_item_id],
        ).map_err(|e| StorageError::Database(format!("Failed to clear area: {}", e)))?;
    } else {
        insert_directory_entry(&tx, area, dest_item_id, &now)?;
    }

    for draft in &drafts {
        tx.execute(
            "INSERT INTO files (context_id, component, file_area, item_id, file_path, filename, content_hash, size_bytes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(context_id, component, file_area, item_id, file_path, filename) DO UPDATE SET
                 content_hash = excluded.content_hash,
                 size_bytes = excluded.size_bytes",
            params![
                area.context_id,
                area.component,
                area.file_area,
                dest_item_id,
                draft.file_path,
                draft.filename,
                draft.content_hash,
                draft.size_bytes,
                now,
            ],
        ).map_err(|e| StorageError::Database(format!("Failed to store file: {}", e)))?;
    }

    let promoted = area_files(&tx, area, dest_item_id)?;
    release_draft(&tx, token)?;

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit promotion: {}", e)))?;

    info!(
        token,
        context_id = area.context_id,
        component = %area.component,
        file_area = %area.file_area,
        item_id = dest_item_id,
        files = promoted.len(),
        removed,
        "Promoted draft area"
    );

    Ok(promoted)
}

/// Drop a draft area together with its token
fn release_draft(conn: &Connection, token: DraftToken) -> Result<(), StorageError> {
    conn.execute("DELETE FROM draft_files WHERE token = ?", params![token])
        .map_err(|e| StorageError::Database(format!("Failed to release draft files: {}", e)))?;
    conn.execute("DELETE FROM draft_tokens WHERE token = ?", params![token])
        .map_err(|e| StorageError::Database(format!("Failed to release draft token: {}", e)))?;
    Ok(())
}

/// Delete every record of the permanent area `(area, item_id)`, directory
/// entry included. Returns the removed files.
pub fn remove_item_files(
    conn: &mut Connection,
    area: &FileArea,
    item_id: i64,
) -> Result<Vec<StoredFile>, StorageError> {
    let tx = conn.transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    let removed = area_files(&tx, area, item_id)?;
    tx.execute(
        "DELETE FROM files WHERE context_id = ? AND component = ? AND file_area = ? AND item_id = ?",
        params![area.context_id, area.component, area.file_area, item_id],
    ).map_err(|e| StorageError::Database(format!("Failed to remove area: {}", e)))?;

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit removal: {}", e)))?;

    if !removed.is_empty() {
        info!(context_id = area.context_id, item_id, removed = removed.len(), "Removed superseded files");
    }
    Ok(removed)
}

/// Whether any permanent or draft file still points at `hash`
pub fn is_content_referenced(conn: &Connection, hash: &str) -> Result<bool, StorageError> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM files WHERE content_hash = ?1)
             OR EXISTS(SELECT 1 FROM draft_files WHERE content_hash = ?1)",
        params![hash],
        |row| row.get(0),
    )
    .map_err(|e| StorageError::Database(format!("Query failed: {}", e)))
}

/// Remove draft areas created before `cutoff`. Returns how many were removed.
pub fn purge_drafts(conn: &mut Connection, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
    let cutoff = cutoff.format("%Y-%m-%d %H:%M:%S").to_string();
    let tx = conn.transaction()
        .map_err(|e| StorageError::Database(format!("Failed to begin transaction: {}", e)))?;

    tx.execute(
        "DELETE FROM draft_files WHERE token IN (SELECT token FROM draft_tokens WHERE created_at < ?)",
        params![cutoff],
    ).map_err(|e| StorageError::Database(format!("Failed to purge draft files: {}", e)))?;
    let purged = tx
        .execute("DELETE FROM draft_tokens WHERE created_at < ?", params![cutoff])
        .map_err(|e| StorageError::Database(format!("Failed to purge draft tokens: {}", e)))?;

    tx.commit()
        .map_err(|e| StorageError::Database(format!("Failed to commit purge: {}", e)))?;

    info!(purged, cutoff = %cutoff, "Purged stale draft areas");
    Ok(purged)
}

impl FileStore for MetadataDb {
    fn new_draft_token(&self) -> Result<DraftToken, StorageError> {
        self.with_conn(|conn| new_draft_token(conn))
    }

    fn stage_draft(
        &self,
        token: Option<DraftToken>,
        area: &FileArea,
        source_item_id: Option<i64>,
    ) -> Result<DraftToken, StorageError> {
        self.with_conn_mut(|conn| stage_draft(conn, token, area, source_item_id))
    }

    fn promote_draft(
        &self,
        token: DraftToken,
        area: &FileArea,
        dest_item_id: i64,
        max_files: Option<usize>,
    ) -> Result<Vec<StoredFile>, StorageError> {
        self.with_conn_mut(|conn| promote_draft(conn, token, area, dest_item_id, max_files))
    }

    fn query_files(&self, context_id: i64, item_id: Option<i64>) -> Result<Vec<StoredFile>, StorageError> {
        self.with_conn(|conn| query_files(conn, context_id, item_id))
    }

    fn add_draft_file(&self, token: DraftToken, file: &NewDraftFile) -> Result<DraftFile, StorageError> {
        self.with_conn(|conn| add_draft_file(conn, token, file))
    }

    fn clear_draft(&self, token: DraftToken) -> Result<usize, StorageError> {
        self.with_conn(|conn| clear_draft(conn, token))
    }

    fn draft_files(&self, token: DraftToken) -> Result<Vec<DraftFile>, StorageError> {
        self.with_conn(|conn| draft_files(conn, token))
    }

    fn remove_item_files(&self, area: &FileArea, item_id: i64) -> Result<Vec<StoredFile>, StorageError> {
        self.with_conn_mut(|conn| remove_item_files(conn, area, item_id))
    }

    fn is_content_referenced(&self, hash: &str) -> Result<bool, StorageError> {
        self.with_conn(|conn| is_content_referenced(conn, hash))
    }

    fn purge_drafts(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError> {
        self.with_conn_mut(|conn| purge_drafts(conn, cutoff))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> NewDraftFile {
        NewDraftFile {
            file_path: "/".to_string(),
            filename: name.to_string(),
            content_hash: Some(format!("sha256-{}", name)),
            size_bytes: 10,
        }
    }

    fn area() -> FileArea {
        FileArea::new(5, "metadata", "image")
    }

    #[test]
    fn test_promote_writes_directory_entry_hidden_from_queries() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("logo.png")).unwrap();

        let promoted = db.promote_draft(token, &area(), token, Some(1)).unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].item_id, token);

        let raw: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
                    .map_err(|e| StorageError::Database(e.to_string()))
            })
            .unwrap();
        assert_eq!(raw, 2);

        let visible = db.query_files(5, None).unwrap();
        assert_eq!(visible.len(), 1);
        assert!(!visible[0].is_directory());
    }

    #[test]
    fn test_promote_respects_max_files_and_replaces_area() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.add_draft_file(token, &image("b.png")).unwrap();

        let promoted = db.promote_draft(token, &area(), 99, Some(1)).unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].filename, "a.png");

        db.clear_draft(token).unwrap();
        db.add_draft_file(token, &image("c.png")).unwrap();
        let promoted = db.promote_draft(token, &area(), 99, Some(1)).unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].filename, "c.png");
    }

    #[test]
    fn test_promote_empty_draft_clears_area() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), 99, None).unwrap();

        let empty = db.new_draft_token().unwrap();
        let promoted = db.promote_draft(empty, &area(), 99, None).unwrap();
        assert!(promoted.is_empty());
        assert!(db.query_files(5, Some(99)).unwrap().is_empty());
    }

    #[test]
    fn test_stage_copies_existing_files_into_new_draft() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), 99, None).unwrap();

        let staged = db.stage_draft(None, &area(), Some(99)).unwrap();
        assert_ne!(staged, token);
        let files = db.draft_files(staged).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "a.png");

        let empty = db.stage_draft(None, &area(), None).unwrap();
        assert!(db.draft_files(empty).unwrap().is_empty());
    }

    #[test]
    fn test_stage_keeps_submitted_draft() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("pending.png")).unwrap();

        let staged = db.stage_draft(Some(token), &area(), Some(99)).unwrap();
        assert_eq!(staged, token);
        assert_eq!(db.draft_files(token).unwrap().len(), 1);
    }

    #[test]
    fn test_query_files_filters_by_item() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), 10, None).unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), 11, None).unwrap();

        assert_eq!(db.query_files(5, None).unwrap().len(), 2);
        assert_eq!(db.query_files(5, Some(11)).unwrap()[0].item_id, 11);
        assert!(db.query_files(5, Some(12)).unwrap().is_empty());
        assert!(db.query_files(6, None).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_directory_entry_upload() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        let err = db.add_draft_file(token, &image(".")).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_promote_releases_draft() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), token, Some(1)).unwrap();

        assert!(db.draft_files(token).unwrap().is_empty());
        assert_eq!(db.stats().unwrap().draft_file_count, 0);
        let tokens: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM draft_tokens", [], |row| row.get(0))
                    .map_err(|e| StorageError::Database(e.to_string()))
            })
            .unwrap();
        assert_eq!(tokens, 0);
        assert_eq!(db.query_files(5, Some(token)).unwrap().len(), 1);
    }

    #[test]
    fn test_remove_item_files_and_references() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("a.png")).unwrap();
        db.promote_draft(token, &area(), 10, None).unwrap();
        assert!(db.is_content_referenced("sha256-a.png").unwrap());

        let removed = db.remove_item_files(&area(), 10).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].filename, "a.png");
        assert!(!db.is_content_referenced("sha256-a.png").unwrap());

        let raw: i64 = db
            .with_conn(|conn| {
                conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))
                    .map_err(|e| StorageError::Database(e.to_string()))
            })
            .unwrap();
        assert_eq!(raw, 0);
    }

    #[test]
    fn test_purge_drafts_by_age() {
        let db = MetadataDb::open_in_memory().unwrap();
        let token = db.new_draft_token().unwrap();
        db.add_draft_file(token, &image("pending.png")).unwrap();

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(db.purge_drafts(past).unwrap(), 0);
        assert_eq!(db.draft_files(token).unwrap().len(), 1);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(db.purge_drafts(future).unwrap(), 1);
        assert!(db.draft_files(token).unwrap().is_empty());
        assert_eq!(db.stats().unwrap().draft_file_count, 0);
    }
}
