//! Field type adapters
//!
//! Each custom field type implements [`FieldTypeAdapter`]. The type stored on
//! a field definition (`datatype`) is parsed into a [`FieldKind`] and
//! [`adapter_for`] builds the matching adapter for one (field, instance) pair.

pub mod fileupload;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use crate::db::FieldDefinition;
use crate::error::StorageError;
use crate::form::{EditForm, FormEntry};
use crate::host::Host;
use crate::render::strip_tags;

pub use fileupload::{FileStatus, FileUploadField};

/// Prefix of the form input key every field is submitted under
pub const INPUT_PREFIX: &str = "metadata_field_";

/// Registered field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    FileUpload,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKind::FileUpload => "fileupload",
        }
    }

    pub fn all() -> &'static [FieldKind] {
        &[FieldKind::FileUpload]
    }
}

impl FromStr for FieldKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fileupload" => Ok(FieldKind::FileUpload),
            other => Err(StorageError::Validation(format!("Unknown field type: {}", other))),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a generic validator should clean submitted values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamType {
    /// Free text, markup stripped
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Nullability {
    Allowed,
    NotAllowed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldProperties {
    pub param_type: ParamType,
    pub nullability: Nullability,
}

impl FieldProperties {
    /// Validate and clean a submitted value
    pub fn clean(&self, value: Option<&str>) -> Result<Option<String>, StorageError> {
        match (value, self.nullability) {
            (None, Nullability::NotAllowed) => {
                Err(StorageError::Validation("Value may not be null".to_string()))
            }
            (None, Nullability::Allowed) => Ok(None),
            (Some(v), _) => match self.param_type {
                ParamType::Text => Ok(Some(strip_tags(v))),
            },
        }
    }
}

/// Behavior every custom field type provides to the edit and display pages
pub trait FieldTypeAdapter {
    fn kind(&self) -> FieldKind;

    /// Human readable name of the field type
    fn type_name(&self) -> &'static str;

    fn field(&self) -> &FieldDefinition;

    fn instance_id(&self) -> i64;

    /// Stored value for this instance, if any
    fn data(&self) -> Option<&str>;

    /// Key the control is registered and submitted under
    fn input_name(&self) -> String {
        format!("{}{}", INPUT_PREFIX, self.field().shortname)
    }

    fn is_locked(&self) -> bool {
        self.field().locked
    }

    /// Register the edit control on `form`
    fn edit_field_add(&mut self, form: &mut EditForm) -> Result<(), StorageError>;

    /// Freeze the control when the field is locked for this actor
    fn edit_field_set_locked(&self, form: &mut EditForm);

    /// Persist a submitted value. Returns the value row id, or `None` when the
    /// entry carried nothing for this field.
    fn edit_save_data(&mut self, entry: &FormEntry) -> Result<Option<i64>, StorageError>;

    /// Pre-populate `instance` so the edit form shows the stored value
    fn edit_load_instance_data(&self, instance: &mut FormEntry) -> Result<(), StorageError>;

    /// Markup shown on profile pages; empty when there is nothing to show
    fn display_data(&self) -> String;

    /// Map an imported value to an option key
    fn convert_external_data(&self, value: &str) -> Option<usize>;

    fn field_properties(&self) -> FieldProperties;
}

/// Build the adapter for `field` on one instance
pub fn adapter_for(
    host: Arc<Host>,
    field: FieldDefinition,
    instance_id: i64,
) -> Result<Box<dyn FieldTypeAdapter>, StorageError> {
    match field.datatype.parse::<FieldKind>()? {
        FieldKind::FileUpload => Ok(Box::new(FileUploadField::load(host, field, instance_id)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("fileupload".parse::<FieldKind>().unwrap(), FieldKind::FileUpload);
        assert!("menu".parse::<FieldKind>().is_err());
        assert_eq!(FieldKind::all().len(), 1);
    }

    #[test]
    fn test_text_not_null_properties() {
        let props = FieldProperties {
            param_type: ParamType::Text,
            nullability: Nullability::NotAllowed,
        };
        assert!(props.clean(None).is_err());
        assert_eq!(props.clean(Some("<p>41</p>")).unwrap(), Some("41".to_string()));

        let optional = FieldProperties { nullability: Nullability::Allowed, ..props };
        assert_eq!(optional.clean(None).unwrap(), None);
    }
}
