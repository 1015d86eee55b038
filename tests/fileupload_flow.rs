//! End-to-end tests for the file upload field
//!
//! Runs the same sequence the edit page does (load, render, upload, lock,
//! submit, save) against an on-disk database and blob store.

use metadata_fields::db::{ContextLevel, CreateFieldInput, FieldDefinition, NewDraftFile};
use metadata_fields::host::DraftToken;
use metadata_fields::{
    adapter_for, BlobStore, EditForm, FieldKind, FieldTypeAdapter, FileStatus, FileUploadField, FormEntry, Host,
    MetadataDb, SiteSettings, StaticCapabilities,
};
use std::sync::Arc;
use tempfile::TempDir;

const INPUT: &str = "metadata_field_logo";

fn open_host(temp: &TempDir, elevated: bool) -> Arc<Host> {
    let db = Arc::new(MetadataDb::open(&temp.path().join("metadata.db")).unwrap());
    Arc::new(Host::from_db(
        db,
        Arc::new(StaticCapabilities { elevated }),
        SiteSettings {
            wwwroot: "https://lms.example.org".to_string(),
            max_bytes: 0,
        },
    ))
}

fn define_logo(host: &Host, locked: bool) -> FieldDefinition {
    host.records
        .define_field(&CreateFieldInput {
            shortname: "logo".to_string(),
            name: "Module logo".to_string(),
            datatype: "fileupload".to_string(),
            context_level: ContextLevel::Module.code(),
            locked,
            param1: None,
        })
        .unwrap()
}

/// Drive one edit-page round trip, returning the saved value id
async fn edit_and_submit(
    host: &Arc<Host>,
    blobs: &BlobStore,
    field: &FieldDefinition,
    instance: i64,
    bytes: &[u8],
    filename: &str,
) -> Option<i64> {
    let adapter = FileUploadField::load(host.clone(), field.clone(), instance).unwrap();
    let mut entry = FormEntry::new(instance, ContextLevel::Module.code());
    adapter.edit_load_instance_data(&mut entry).unwrap();
    let token: DraftToken = entry.get(INPUT).unwrap().parse().unwrap();

    let mut adapter = adapter.with_submitted_draft(Some(token));
    let mut form = EditForm::new();
    adapter.edit_field_add(&mut form).unwrap();
    adapter.edit_field_set_locked(&mut form);
    assert_eq!(form.default_value(INPUT), Some(token.to_string().as_str()));

    let stored = blobs.store(bytes).await.unwrap();
    adapter
        .accept_upload(
            token,
            &NewDraftFile {
                file_path: "/".to_string(),
                filename: filename.to_string(),
                content_hash: Some(stored.hash),
                size_bytes: stored.size_bytes as i64,
            },
        )
        .unwrap();

    let entry = form.accept_submission(entry);
    let saved = adapter.edit_save_data(&entry).unwrap();
    for hash in adapter.take_released_hashes() {
        blobs.delete(&hash).await.unwrap();
    }
    saved
}

#[tokio::test]
async fn test_upload_save_and_display() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, false);

    let saved = edit_and_submit(&host, &blobs, &field, 21, b"logo-v1", "logo.png").await;
    assert!(saved.is_some());

    let adapter = adapter_for(host.clone(), field.clone(), 21).unwrap();
    assert_eq!(adapter.kind(), FieldKind::FileUpload);
    assert_eq!(adapter.instance_id(), 21);
    let item = adapter.data().unwrap().to_string();
    let markup = adapter.display_data();
    assert!(markup.starts_with(r#"<img src="https://lms.example.org/pluginfile.php/"#), "{}", markup);
    assert!(markup.contains(&format!("/metadata/image/{}/logo.png", item)), "{}", markup);

    // The file record points at the stored body
    let upload = FileUploadField::load(host.clone(), field, 21).unwrap();
    let FileStatus::Present { file } = upload.file_status().unwrap() else {
        panic!("file should be present");
    };
    let body = blobs.get(file.content_hash.as_deref().unwrap()).await.unwrap();
    assert_eq!(body, b"logo-v1");
}

#[tokio::test]
async fn test_resave_keeps_single_value_row() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, false);

    let first = edit_and_submit(&host, &blobs, &field, 21, b"logo-v1", "logo.png").await;
    let second = edit_and_submit(&host, &blobs, &field, 21, b"logo-v2", "logo-2.png").await;

    assert_eq!(first, second);
    assert_eq!(host.records.count_values(21, field.id).unwrap(), 1);

    let upload = FileUploadField::load(host.clone(), field, 21).unwrap();
    let url = upload.file_url().unwrap();
    assert!(url.as_str().ends_with("/logo-2.png"));
}

#[tokio::test]
async fn test_replaced_upload_releases_old_body() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, false);

    edit_and_submit(&host, &blobs, &field, 21, b"logo-v1", "logo.png").await;
    let old_hash = BlobStore::compute_hash(b"logo-v1");
    assert!(blobs.exists(&old_hash).await);

    edit_and_submit(&host, &blobs, &field, 21, b"logo-v2", "logo-2.png").await;
    assert!(!blobs.exists(&old_hash).await);
    assert!(blobs.exists(&BlobStore::compute_hash(b"logo-v2")).await);
}

#[tokio::test]
async fn test_same_body_is_kept_across_saves() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, false);

    edit_and_submit(&host, &blobs, &field, 21, b"logo", "logo.png").await;
    edit_and_submit(&host, &blobs, &field, 21, b"logo", "renamed.png").await;

    assert!(blobs.exists(&BlobStore::compute_hash(b"logo")).await);
}

#[tokio::test]
async fn test_values_survive_reopen() {
    let temp = TempDir::new().unwrap();
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();

    let field = {
        let host = open_host(&temp, false);
        let field = define_logo(&host, false);
        edit_and_submit(&host, &blobs, &field, 5, b"persisted", "p.png").await;
        field
    };

    let host = open_host(&temp, false);
    let upload = FileUploadField::load(host, field, 5).unwrap();
    assert!(upload.file_url().is_some());
}

#[tokio::test]
async fn test_locked_field_is_not_saved_for_regular_actor() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, true);

    let saved = edit_and_submit(&host, &blobs, &field, 21, b"logo", "logo.png").await;

    assert_eq!(saved, None);
    assert_eq!(host.records.count_values(21, field.id).unwrap(), 0);
    let upload = FileUploadField::load(host.clone(), field, 21).unwrap();
    assert_eq!(upload.display_data(), "");
}

#[tokio::test]
async fn test_locked_field_is_saved_for_elevated_actor() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, true);
    let blobs = BlobStore::new(temp.path().join("blobs")).await.unwrap();
    let field = define_logo(&host, true);

    let saved = edit_and_submit(&host, &blobs, &field, 21, b"logo", "logo.png").await;
    assert!(saved.is_some());
}

#[test]
fn test_unknown_datatype_has_no_adapter() {
    let temp = TempDir::new().unwrap();
    let host = open_host(&temp, false);
    let field = host
        .records
        .define_field(&CreateFieldInput {
            shortname: "colour".to_string(),
            name: "Colour".to_string(),
            datatype: "menu".to_string(),
            context_level: ContextLevel::Course.code(),
            locked: false,
            param1: Some("Red\nBlue".to_string()),
        })
        .unwrap();

    assert!(adapter_for(host, field, 1).is_err());
}
