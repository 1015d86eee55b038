//! Metadata Fields command line
//!
//! ## Usage
//!
//! ```bash
//! # Define a file upload field on courses
//! metadata-fields define-field --shortname banner --name "Course banner" --level course
//!
//! # Upload and save a file for course 7
//! metadata-fields --actor 2 upload --field banner --instance 7 --file ./banner.png
//!
//! # Render the profile markup / link
//! metadata-fields show --field banner --instance 7
//! metadata-fields url --field banner --instance 7
//!
//! # Drop drafts older than a day
//! metadata-fields purge-drafts --older-than-hours 24
//! ```

use clap::{Parser, Subcommand};
use metadata_fields::db::{ContextLevel, CreateFieldInput, NewDraftFile};
use metadata_fields::{
    BlobStore, Config, EditForm, FieldTypeAdapter, FileStatus, FileStore, FileUploadField, FormEntry, Host, MetadataDb,
    RecordStore, SiteSettings, StaticCapabilities, StorageError,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "metadata-fields")]
#[command(about = "File upload metadata fields for courses, categories and modules")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage directory
    #[arg(long)]
    storage_dir: Option<PathBuf>,

    /// Base URL for file links
    #[arg(long, env = "METADATA_WWWROOT")]
    wwwroot: Option<String>,

    /// User id of the acting user
    #[arg(long, env = "METADATA_ACTOR", default_value_t = 0)]
    actor: i64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Define a new field
    DefineField {
        #[arg(long)]
        shortname: String,
        #[arg(long)]
        name: String,
        /// Context level: course, coursecat or module
        #[arg(long)]
        level: ContextLevel,
        #[arg(long)]
        locked: bool,
        /// Option list, one option per line
        #[arg(long)]
        options: Option<String>,
    },
    /// List defined fields
    ListFields,
    /// Upload a file into a field and save it
    Upload {
        #[arg(long)]
        field: String,
        #[arg(long)]
        instance: i64,
        #[arg(long)]
        file: PathBuf,
    },
    /// Print the profile markup for a field
    Show {
        #[arg(long)]
        field: String,
        #[arg(long)]
        instance: i64,
    },
    /// Print the file link and its status
    Url {
        #[arg(long)]
        field: String,
        #[arg(long)]
        instance: i64,
    },
    /// Write the stored body of a field's file to disk
    Export {
        #[arg(long)]
        field: String,
        #[arg(long)]
        instance: i64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Map an imported value to its option key
    #[command(name = "value")]
    ConvertValue {
        #[arg(long)]
        field: String,
        #[arg(long)]
        value: String,
    },
    /// Remove draft areas that were never saved
    PurgeDrafts {
        /// Minimum draft age in hours
        #[arg(long, default_value_t = 24)]
        older_than_hours: i64,
    },
    /// Print storage statistics
    Stats,
}

fn load_field(host: &Arc<Host>, shortname: &str, instance: i64) -> Result<FileUploadField, StorageError> {
    let field = host
        .records
        .field_by_shortname(shortname)?
        .ok_or_else(|| StorageError::NotFound(format!("field {}", shortname)))?;
    FileUploadField::load(host.clone(), field, instance)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("metadata_fields=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load(config_path)?
    } else {
        Config::default()
    };

    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    if let Some(wwwroot) = args.wwwroot {
        config.wwwroot = wwwroot;
    }

    tokio::fs::create_dir_all(&config.storage_dir).await?;

    let config_path = config.config_path();
    if !config_path.exists() {
        config.save(&config_path)?;
        info!(path = %config_path.display(), "Created default config");
    }

    let db = Arc::new(MetadataDb::open(&config.database_path())?);
    let blob_store = BlobStore::new(config.blobs_dir()).await?;
    let host = Arc::new(Host::from_db(
        db.clone(),
        Arc::new(StaticCapabilities {
            elevated: config.is_elevated(args.actor),
        }),
        SiteSettings {
            wwwroot: config.wwwroot.clone(),
            max_bytes: config.max_bytes,
        },
    ));

    match args.command {
        Command::DefineField { shortname, name, level, locked, options } => {
            let field = host.records.define_field(&CreateFieldInput {
                shortname,
                name,
                datatype: "fileupload".to_string(),
                context_level: level.code(),
                locked,
                param1: options,
            })?;
            println!("{}", serde_json::to_string_pretty(&field)?);
        }
        Command::ListFields => {
            for field in host.records.list_fields()? {
                let level = ContextLevel::from_code(field.context_level)
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| field.context_level.to_string());
                println!(
                    "{}\t{}\t{}\t{}{}",
                    field.id,
                    field.shortname,
                    field.datatype,
                    level,
                    if field.locked { "\tlocked" } else { "" }
                );
            }
        }
        Command::Upload { field, instance, file } => {
            let filename = file
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .ok_or_else(|| StorageError::Validation(format!("Not a file: {}", file.display())))?;

            let adapter = load_field(&host, &field, instance)?;
            let mut entry = FormEntry::new(instance, adapter.field().context_level);
            adapter.edit_load_instance_data(&mut entry)?;

            let input = adapter.input_name();
            let token = entry
                .get(&input)
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| StorageError::Validation(format!("Field {} has no applicable context", field)))?;

            let mut adapter = adapter.with_submitted_draft(Some(token));
            let mut form = EditForm::new();
            adapter.edit_field_add(&mut form)?;
            adapter.edit_field_set_locked(&mut form);

            let stored = blob_store.store_file(&file).await?;
            adapter.accept_upload(
                token,
                &NewDraftFile {
                    file_path: "/".to_string(),
                    filename,
                    content_hash: Some(stored.hash),
                    size_bytes: stored.size_bytes as i64,
                },
            )?;

            let entry = form.accept_submission(entry);
            match adapter.edit_save_data(&entry)? {
                Some(value_id) => {
                    for hash in adapter.take_released_hashes() {
                        blob_store.delete(&hash).await?;
                    }
                    println!("saved value {} (item {})", value_id, adapter.data().unwrap_or_default());
                }
                None => {
                    warn!(field = %field, instance, "Field is locked for this user, nothing saved");
                    println!("not saved: field is locked");
                }
            }
        }
        Command::Show { field, instance } => {
            let adapter = load_field(&host, &field, instance)?;
            println!("{}", adapter.display_data());
        }
        Command::Url { field, instance } => {
            let adapter = load_field(&host, &field, instance)?;
            match adapter.file_url() {
                Some(url) => println!("{}", url),
                None => println!("(none)"),
            }
            println!("{}", serde_json::to_string_pretty(&adapter.file_status()?)?);
        }
        Command::Export { field, instance, out } => {
            let adapter = load_field(&host, &field, instance)?;
            let file = match adapter.file_status()? {
                FileStatus::Present { file } => file,
                status => {
                    return Err(StorageError::NotFound(format!("file for {} on {}: {:?}", field, instance, status)).into());
                }
            };
            let hash = file
                .content_hash
                .ok_or_else(|| StorageError::NotFound(format!("body of {}", file.filename)))?;
            let body = blob_store.get(&hash).await?;
            tokio::fs::write(&out, &body).await?;
            println!("wrote {} bytes to {}", body.len(), out.display());
        }
        Command::ConvertValue { field, value } => {
            let adapter = load_field(&host, &field, 0)?;
            match adapter.convert_external_data(&value) {
                Some(key) => println!("{}", key),
                None => println!("(unresolved)"),
            }
        }
        Command::PurgeDrafts { older_than_hours } => {
            let cutoff = chrono::Utc::now() - chrono::Duration::hours(older_than_hours);
            let purged = host.files.purge_drafts(cutoff)?;
            println!("purged {} draft areas", purged);
        }
        Command::Stats => {
            println!("{}", serde_json::to_string_pretty(&db.stats()?)?);
        }
    }

    Ok(())
}
