//! Edit form state shared between the host and field adapters
//!
//! This is deliberately small: enough to register a file manager control,
//! give it a default, freeze it, and read back what a submission carried.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Files stored in the site's file storage
pub const FILE_INTERNAL: u8 = 1;
/// Links to files held by external repositories
pub const FILE_EXTERNAL: u8 = 2;

/// Constraints shown to and enforced by the file picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilePickerOptions {
    pub subdirs: bool,
    /// Per-file limit in bytes (0 = unlimited)
    pub max_bytes: u64,
    /// Whole-area limit in bytes, `None` = unlimited
    pub area_max_bytes: Option<u64>,
    pub max_files: usize,
    /// `*` accepts any type
    pub accepted_types: String,
    pub return_types: u8,
}

impl FilePickerOptions {
    pub fn accepts_size(&self, size_bytes: u64) -> bool {
        self.max_bytes == 0 || size_bytes <= self.max_bytes
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ElementKind {
    FileManager(FilePickerOptions),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormElement {
    pub name: String,
    pub label: String,
    pub kind: ElementKind,
    pub frozen: bool,
    pub constant: Option<String>,
}

/// Controls registered on an edit form
#[derive(Debug, Clone, Default)]
pub struct EditForm {
    elements: Vec<FormElement>,
    defaults: HashMap<String, String>,
}

impl EditForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file_manager(&mut self, name: &str, label: &str, options: FilePickerOptions) {
        self.elements.retain(|e| e.name != name);
        self.elements.push(FormElement {
            name: name.to_string(),
            label: label.to_string(),
            kind: ElementKind::FileManager(options),
            frozen: false,
            constant: None,
        });
    }

    pub fn element_exists(&self, name: &str) -> bool {
        self.elements.iter().any(|e| e.name == name)
    }

    pub fn element(&self, name: &str) -> Option<&FormElement> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn elements(&self) -> &[FormElement] {
        &self.elements
    }

    pub fn set_default(&mut self, name: &str, value: impl Into<String>) {
        self.defaults.insert(name.to_string(), value.into());
    }

    pub fn default_value(&self, name: &str) -> Option<&str> {
        self.defaults.get(name).map(String::as_str)
    }

    /// Freeze a control so submissions can no longer change it
    pub fn hard_freeze(&mut self, name: &str) -> bool {
        match self.elements.iter_mut().find(|e| e.name == name) {
            Some(element) => {
                element.frozen = true;
                true
            }
            None => false,
        }
    }

    pub fn set_constant(&mut self, name: &str, value: impl Into<String>) {
        if let Some(element) = self.elements.iter_mut().find(|e| e.name == name) {
            element.constant = Some(value.into());
        }
    }

    /// Value the control displays: its constant, else its default
    pub fn display_value(&self, name: &str) -> Option<&str> {
        self.element(name)
            .and_then(|e| e.constant.as_deref())
            .or_else(|| self.default_value(name))
    }

    /// Drop submitted values for frozen controls
    pub fn accept_submission(&self, mut entry: FormEntry) -> FormEntry {
        for element in self.elements.iter().filter(|e| e.frozen) {
            entry.values.remove(&element.name);
        }
        entry
    }
}

/// A submitted (or pre-populated) instance record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormEntry {
    /// Instance id, absent for records not created yet
    pub id: Option<i64>,
    /// Raw context level code of the instance
    pub context_level: Option<i64>,
    #[serde(default)]
    pub values: HashMap<String, String>,
}

impl FormEntry {
    pub fn new(id: i64, context_level: i64) -> Self {
        Self {
            id: Some(id),
            context_level: Some(context_level),
            values: HashMap::new(),
        }
    }

    pub fn with_value(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> FilePickerOptions {
        FilePickerOptions {
            subdirs: false,
            max_bytes: 100,
            area_max_bytes: None,
            max_files: 1,
            accepted_types: "*".to_string(),
            return_types: FILE_INTERNAL | FILE_EXTERNAL,
        }
    }

    #[test]
    fn test_freeze_and_constant() {
        let mut form = EditForm::new();
        assert!(!form.hard_freeze("missing"));

        form.add_file_manager("metadata_field_logo", "Logo", options());
        form.set_default("metadata_field_logo", "12");
        assert_eq!(form.display_value("metadata_field_logo"), Some("12"));

        assert!(form.hard_freeze("metadata_field_logo"));
        form.set_constant("metadata_field_logo", "locked");
        assert_eq!(form.display_value("metadata_field_logo"), Some("locked"));
        assert!(form.element("metadata_field_logo").unwrap().frozen);
    }

    #[test]
    fn test_frozen_values_are_not_accepted() {
        let mut form = EditForm::new();
        form.add_file_manager("a", "A", options());
        form.add_file_manager("b", "B", options());
        form.hard_freeze("a");

        let entry = FormEntry::new(1, 50).with_value("a", "1").with_value("b", "2");
        let accepted = form.accept_submission(entry);

        assert!(!accepted.contains("a"));
        assert_eq!(accepted.get("b"), Some("2"));
    }

    #[test]
    fn test_size_limits() {
        let mut opts = options();
        assert!(opts.accepts_size(100));
        assert!(!opts.accepts_size(101));
        opts.max_bytes = 0;
        assert!(opts.accepts_size(u64::MAX));
    }
}
