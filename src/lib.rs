//! Metadata Fields - custom metadata fields for course, category and module records
//!
//! Implements the "file upload" field type: an administrator defines the
//! field, edit forms get a single-file picker, saved files are kept per
//! context and shown as an inline image on profile pages.
//!
//! ## Architecture
//!
//! ```text
//! FieldTypeAdapter (fieldtype/)      one adapter per (field, instance)
//!     ↓ Host (host.rs)               injected collaborators
//! FileStore / RecordStore / ContextRegistry   → MetadataDb (SQLite, db/)
//! File bodies                        → BlobStore (content-addressed, sha256)
//! ```
//!
//! ## Storage Layout
//!
//! ```text
//! ~/.local/share/metadata-fields/
//! ├── blobs/            # Uploaded file bodies, by hash
//! ├── metadata.db       # Fields, values, contexts, file records
//! └── config.toml       # Configuration
//! ```

pub mod blob_store;
pub mod config;
pub mod db;
pub mod error;
pub mod fieldtype;
pub mod form;
pub mod host;
pub mod render;

// Re-exports
pub use blob_store::BlobStore;
pub use config::Config;
pub use db::MetadataDb;
pub use error::StorageError;
pub use fieldtype::{adapter_for, FieldKind, FieldTypeAdapter, FileStatus, FileUploadField};
pub use form::{EditForm, FormEntry};
pub use host::{CapabilityChecker, ContextRegistry, FileStore, Host, RecordStore, SiteSettings, StaticCapabilities};
