//! Host services consumed by field type adapters
//!
//! Field adapters never reach for global state. Everything they need from the
//! surrounding platform (file storage, value persistence, context lookup and
//! the current actor's capabilities) is injected through [`Host`].

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::db::{
    Context, ContextLevel, CreateFieldInput, DraftFile, FieldDefinition, FieldValue, FileArea,
    MetadataDb, NewDraftFile, StoredFile,
};
use crate::error::StorageError;

/// Token identifying a draft area
pub type DraftToken = i64;

/// File storage: draft areas plus permanent areas addressed by context
pub trait FileStore: Send + Sync {
    /// Allocate a token for a new, empty draft area
    fn new_draft_token(&self) -> Result<DraftToken, StorageError>;

    /// Prepare a draft area for editing.
    ///
    /// With `token = None` a fresh area is allocated and, when `source_item_id`
    /// is given, seeded with copies of that permanent area's files. An already
    /// submitted token is returned untouched.
    fn stage_draft(
        &self,
        token: Option<DraftToken>,
        area: &FileArea,
        source_item_id: Option<i64>,
    ) -> Result<DraftToken, StorageError>;

    /// Make the permanent area `(area, dest_item_id)` match the draft area,
    /// then release the draft.
    ///
    /// At most `max_files` files are promoted when a limit is given. Returns
    /// the promoted files.
    fn promote_draft(
        &self,
        token: DraftToken,
        area: &FileArea,
        dest_item_id: i64,
        max_files: Option<usize>,
    ) -> Result<Vec<StoredFile>, StorageError>;

    /// Files in a context, optionally restricted to one item, excluding
    /// directory entries. Ordered by file id.
    fn query_files(&self, context_id: i64, item_id: Option<i64>) -> Result<Vec<StoredFile>, StorageError>;

    /// Add (or replace) a file in a draft area
    fn add_draft_file(&self, token: DraftToken, file: &NewDraftFile) -> Result<DraftFile, StorageError>;

    /// Remove every file from a draft area. Returns how many were removed.
    fn clear_draft(&self, token: DraftToken) -> Result<usize, StorageError>;

    /// Files currently held in a draft area
    fn draft_files(&self, token: DraftToken) -> Result<Vec<DraftFile>, StorageError>;

    /// Delete the permanent area `(area, item_id)`. Returns the removed files.
    fn remove_item_files(&self, area: &FileArea, item_id: i64) -> Result<Vec<StoredFile>, StorageError>;

    /// Whether any permanent or draft file still uses the body `hash`
    fn is_content_referenced(&self, hash: &str) -> Result<bool, StorageError>;

    /// Drop draft areas allocated before `cutoff` that were never promoted
    fn purge_drafts(&self, cutoff: DateTime<Utc>) -> Result<usize, StorageError>;
}

/// Persistence of field definitions and field values
pub trait RecordStore: Send + Sync {
    fn find_value_id(&self, instance_id: i64, field_id: i64) -> Result<Option<i64>, StorageError>;

    /// Insert or update the value for `(instance_id, field_id)` atomically.
    /// Returns the row id.
    fn upsert_value(&self, instance_id: i64, field_id: i64, data: &str) -> Result<i64, StorageError>;

    fn get_value(&self, instance_id: i64, field_id: i64) -> Result<Option<FieldValue>, StorageError>;

    fn count_values(&self, instance_id: i64, field_id: i64) -> Result<u64, StorageError>;

    fn define_field(&self, input: &CreateFieldInput) -> Result<FieldDefinition, StorageError>;

    fn field(&self, id: i64) -> Result<Option<FieldDefinition>, StorageError>;

    fn field_by_shortname(&self, shortname: &str) -> Result<Option<FieldDefinition>, StorageError>;

    fn list_fields(&self) -> Result<Vec<FieldDefinition>, StorageError>;
}

/// Maps a (level, instance) pair to a context handle
pub trait ContextRegistry: Send + Sync {
    fn context_instance(&self, level: ContextLevel, instance_id: i64) -> Result<Context, StorageError>;
}

/// Capability checks for the current actor
pub trait CapabilityChecker: Send + Sync {
    /// Whether the actor may update user records site-wide
    fn actor_has_elevated_update_capability(&self) -> bool;
}

/// Capability checker with a fixed answer, resolved once per request
#[derive(Debug, Clone, Copy)]
pub struct StaticCapabilities {
    pub elevated: bool,
}

impl CapabilityChecker for StaticCapabilities {
    fn actor_has_elevated_update_capability(&self) -> bool {
        self.elevated
    }
}

/// Site settings the adapters need
#[derive(Debug, Clone)]
pub struct SiteSettings {
    /// Base URL for plugin file links
    pub wwwroot: String,
    /// Site upload limit in bytes (0 = unlimited)
    pub max_bytes: u64,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            wwwroot: "http://localhost".to_string(),
            max_bytes: 0,
        }
    }
}

/// Service container handed to field adapters
#[derive(Clone)]
pub struct Host {
    pub files: Arc<dyn FileStore>,
    pub records: Arc<dyn RecordStore>,
    pub contexts: Arc<dyn ContextRegistry>,
    pub capabilities: Arc<dyn CapabilityChecker>,
    pub site: SiteSettings,
}

impl Host {
    /// Wire every storage service to one database
    pub fn from_db(db: Arc<MetadataDb>, capabilities: Arc<dyn CapabilityChecker>, site: SiteSettings) -> Self {
        Self {
            files: db.clone(),
            records: db.clone(),
            contexts: db,
            capabilities,
            site,
        }
    }
}
