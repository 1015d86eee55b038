//! File upload field
//!
//! Lets an administrator attach a single file (usually an image) to a course,
//! course category or module record. The edit form gets a one-file picker
//! bound to a draft area; saving promotes the draft into the `metadata/image`
//! area of the instance's context and records the draft token as the value.
//! Profile pages show the file as an inline image.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use super::{FieldKind, FieldProperties, FieldTypeAdapter, Nullability, ParamType};
use crate::db::{Context, ContextLevel, DraftFile, FieldDefinition, FileArea, NewDraftFile, StoredFile};
use crate::error::StorageError;
use crate::form::{EditForm, FilePickerOptions, FormEntry, FILE_EXTERNAL, FILE_INTERNAL};
use crate::host::{DraftToken, Host};
use crate::render::{format_label, img_tag, pluginfile_url};

/// Component that owns every file saved by this field type
pub const COMPONENT: &str = "metadata";
/// File area within [`COMPONENT`]
pub const FILE_AREA: &str = "image";

/// Whether the configured file can be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    /// No value saved, or no applicable context
    NotConfigured,
    /// A value is saved but no file carries that item id
    Missing { item_id: i64 },
    Present { file: StoredFile },
}

pub struct FileUploadField {
    host: Arc<Host>,
    field: FieldDefinition,
    instance_id: i64,
    data: Option<String>,
    data_key: Option<usize>,
    options: Vec<String>,
    submitted_draft: Option<DraftToken>,
    released_hashes: Vec<String>,
}

impl FileUploadField {
    /// Build the adapter and load the stored value for `instance_id`
    pub fn load(host: Arc<Host>, field: FieldDefinition, instance_id: i64) -> Result<Self, StorageError> {
        let data = host
            .records
            .get_value(instance_id, field.id)?
            .map(|v| v.data)
            .filter(|d| !d.is_empty());

        let options = field
            .param1
            .as_deref()
            .map(|p| {
                p.lines()
                    .map(|l| l.trim_end_matches('\r').to_string())
                    .filter(|l| !l.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let mut adapter = Self {
            host,
            field,
            instance_id,
            data,
            data_key: None,
            options,
            submitted_draft: None,
            released_hashes: Vec::new(),
        };
        adapter.data_key = adapter.data.as_deref().and_then(|d| adapter.convert_external_data(d));
        Ok(adapter)
    }

    /// Draft token the current request submitted for this field, if any
    pub fn with_submitted_draft(mut self, token: Option<DraftToken>) -> Self {
        self.submitted_draft = token;
        self
    }

    /// Context handle for module, course and course category levels.
    /// Any other level has no applicable context.
    pub fn resolve_context(&self, context_level: i64, instance_id: i64) -> Result<Option<Context>, StorageError> {
        match ContextLevel::from_code(context_level) {
            Some(level @ (ContextLevel::Module | ContextLevel::Course | ContextLevel::CourseCategory)) => {
                Ok(Some(self.host.contexts.context_instance(level, instance_id)?))
            }
            _ => {
                debug!(context_level, instance_id, "No applicable context");
                Ok(None)
            }
        }
    }

    pub fn picker_options(&self) -> FilePickerOptions {
        FilePickerOptions {
            subdirs: false,
            max_bytes: self.host.site.max_bytes,
            area_max_bytes: None,
            max_files: 1,
            accepted_types: "*".to_string(),
            return_types: FILE_INTERNAL | FILE_EXTERNAL,
        }
    }

    fn area(context: &Context) -> FileArea {
        FileArea::new(context.id, COMPONENT, FILE_AREA)
    }

    /// Stored value read as a permanent item id
    fn data_item_id(&self) -> Option<i64> {
        self.data.as_deref().and_then(|d| d.trim().parse().ok())
    }

    /// First file in this instance's context, optionally for one item
    fn lookup(&self, item_id: Option<i64>) -> Result<Option<(Context, StoredFile)>, StorageError> {
        let Some(context) = self.resolve_context(self.field.context_level, self.instance_id)? else {
            return Ok(None);
        };
        let files = self.host.files.query_files(context.id, item_id)?;
        Ok(files.into_iter().next().map(|file| (context, file)))
    }

    fn url_for(&self, context: &Context, file: &StoredFile) -> Result<Url, StorageError> {
        pluginfile_url(
            &self.host.site.wwwroot,
            context.id,
            &file.component,
            &file.file_area,
            Some(file.item_id),
            &file.file_path,
            &file.filename,
        )
    }

    /// Link to the configured file. `None` both when no value is saved and
    /// when the saved item has no file; see [`Self::file_status`].
    pub fn file_url(&self) -> Option<Url> {
        let item_id = self.data_item_id()?;

        match self.lookup(Some(item_id)) {
            Ok(Some((context, file))) => match self.url_for(&context, &file) {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(field = %self.field.shortname, error = %e, "Failed to build file URL");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(field = %self.field.shortname, instance_id = self.instance_id, error = %e, "File lookup failed");
                None
            }
        }
    }

    pub fn file_status(&self) -> Result<FileStatus, StorageError> {
        let Some(item_id) = self.data_item_id() else {
            return Ok(FileStatus::NotConfigured);
        };
        if self.resolve_context(self.field.context_level, self.instance_id)?.is_none() {
            return Ok(FileStatus::NotConfigured);
        }
        Ok(match self.lookup(Some(item_id))? {
            Some((_, file)) => FileStatus::Present { file },
            None => FileStatus::Missing { item_id },
        })
    }

    /// Bodies of superseded files that no record uses any more. The caller
    /// owns the blob store and deletes them.
    pub fn take_released_hashes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.released_hashes)
    }

    /// Drop the files a previous save left under `item_id`
    fn remove_superseded(&mut self, area: &FileArea, item_id: i64) -> Result<(), StorageError> {
        for file in self.host.files.remove_item_files(area, item_id)? {
            let Some(hash) = file.content_hash else {
                continue;
            };
            if !self.released_hashes.contains(&hash) && !self.host.files.is_content_referenced(&hash)? {
                self.released_hashes.push(hash);
            }
        }
        Ok(())
    }

    /// Put an uploaded file into a draft area, replacing what it held
    pub fn accept_upload(&self, token: DraftToken, file: &NewDraftFile) -> Result<DraftFile, StorageError> {
        let options = self.picker_options();
        if !options.accepts_size(file.size_bytes.max(0) as u64) {
            return Err(StorageError::Validation(format!(
                "{} exceeds the upload limit of {} bytes",
                file.filename, options.max_bytes
            )));
        }

        // Single-file picker: a new upload replaces the previous one.
        self.host.files.clear_draft(token)?;
        self.host.files.add_draft_file(token, file)
    }
}

impl FieldTypeAdapter for FileUploadField {
    fn kind(&self) -> FieldKind {
        FieldKind::FileUpload
    }

    fn type_name(&self) -> &'static str {
        "File Upload"
    }

    fn field(&self) -> &FieldDefinition {
        &self.field
    }

    fn instance_id(&self) -> i64 {
        self.instance_id
    }

    fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    fn edit_field_add(&mut self, form: &mut EditForm) -> Result<(), StorageError> {
        let input = self.input_name();
        let context = self.resolve_context(self.field.context_level, self.instance_id)?;

        form.add_file_manager(&input, &format_label(&self.field.name), self.picker_options());

        match context {
            Some(context) => {
                let token = self.host.files.stage_draft(
                    self.submitted_draft,
                    &Self::area(&context),
                    self.data_item_id(),
                )?;
                form.set_default(&input, token.to_string());
                self.submitted_draft = Some(token);
            }
            None => {
                warn!(field = %self.field.shortname, context_level = self.field.context_level, "Field has no applicable context, picker left empty");
            }
        }

        Ok(())
    }

    fn edit_field_set_locked(&self, form: &mut EditForm) {
        let input = self.input_name();
        if !form.element_exists(&input) {
            return;
        }
        if self.is_locked() && !self.host.capabilities.actor_has_elevated_update_capability() {
            form.hard_freeze(&input);
            let key = self.data_key.map(|k| k.to_string()).unwrap_or_default();
            form.set_constant(&input, format_label(&key));
        }
    }

    fn edit_save_data(&mut self, entry: &FormEntry) -> Result<Option<i64>, StorageError> {
        let input = self.input_name();
        let Some(submitted) = entry.get(&input) else {
            // Control not on the form, e.g. locked and hidden.
            debug!(field = %self.field.shortname, "Field not submitted, skipping");
            return Ok(None);
        };

        let Some(instance_id) = entry.id else {
            warn!(field = %self.field.shortname, "Entry has no instance id, skipping");
            return Ok(None);
        };

        let context_level = entry.context_level.unwrap_or(self.field.context_level);
        let Some(context) = self.resolve_context(context_level, instance_id)? else {
            warn!(field = %self.field.shortname, context_level, instance_id, "No applicable context, value not saved");
            return Ok(None);
        };

        let submitted = self.field_properties().clean(Some(submitted))?;
        let submitted_token = submitted
            .as_deref()
            .and_then(|s| s.trim().parse::<DraftToken>().ok())
            .filter(|t| *t > 0);

        let previous_item = self
            .host
            .records
            .get_value(instance_id, self.field.id)?
            .and_then(|v| v.data.trim().parse::<i64>().ok());

        let area = Self::area(&context);
        let token = self.host.files.stage_draft(submitted_token, &area, None)?;
        let promoted = self.host.files.promote_draft(token, &area, token, Some(self.picker_options().max_files))?;

        let data = token.to_string();
        let value_id = self.host.records.upsert_value(instance_id, self.field.id, &data)?;

        // One item per context: whatever the last save promoted is now stale.
        if let Some(previous) = previous_item.filter(|p| *p != token) {
            self.remove_superseded(&area, previous)?;
        }

        info!(
            field = %self.field.shortname,
            instance_id,
            context_id = context.id,
            item_id = token,
            files = promoted.len(),
            "Saved file upload field"
        );

        self.instance_id = instance_id;
        self.data_key = self.convert_external_data(&data);
        self.data = Some(data);
        // Promotion released the draft; the next render stages a fresh one.
        self.submitted_draft = None;

        Ok(Some(value_id))
    }

    fn edit_load_instance_data(&self, instance: &mut FormEntry) -> Result<(), StorageError> {
        let instance_id = instance.id.unwrap_or(self.instance_id);
        let Some(context) = self.resolve_context(self.field.context_level, instance_id)? else {
            debug!(field = %self.field.shortname, instance_id, "No applicable context, nothing to load");
            return Ok(());
        };

        let token = self.host.files.stage_draft(
            self.submitted_draft,
            &Self::area(&context),
            self.data_item_id(),
        )?;
        instance.set(&self.input_name(), token.to_string());
        Ok(())
    }

    fn display_data(&self) -> String {
        // Without a saved value, fall back to whatever the context holds.
        let found = match self.data_item_id() {
            Some(item_id) => self.lookup(Some(item_id)),
            None => self.lookup(None),
        };

        match found {
            Ok(Some((context, file))) => match self.url_for(&context, &file) {
                Ok(url) => img_tag(url.as_str(), ""),
                Err(e) => {
                    warn!(field = %self.field.shortname, error = %e, "Failed to build file URL");
                    String::new()
                }
            },
            Ok(None) => String::new(),
            Err(e) => {
                warn!(field = %self.field.shortname, instance_id = self.instance_id, error = %e, "File lookup failed");
                String::new()
            }
        }
    }

    fn convert_external_data(&self, value: &str) -> Option<usize> {
        if let Ok(key) = value.parse::<usize>() {
            if key < self.options.len() {
                return Some(key);
            }
        }
        self.options.iter().position(|o| o == value)
    }

    fn field_properties(&self) -> FieldProperties {
        FieldProperties {
            param_type: ParamType::Text,
            nullability: Nullability::NotAllowed,
        }
    }
}
