//! Configuration for metadata-fields

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("metadata-fields")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Storage directory for the database and blobs
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Public base URL that plugin file links are built on
    #[serde(default = "default_wwwroot")]
    pub wwwroot: String,

    /// Site-wide upload limit in bytes (0 = unlimited)
    #[serde(default)]
    pub max_bytes: u64,

    /// User ids holding the elevated user-update capability
    #[serde(default)]
    pub elevated_actors: Vec<i64>,
}

fn default_wwwroot() -> String {
    "http://localhost".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            wwwroot: default_wwwroot(),
            max_bytes: 0,
            elevated_actors: Vec::new(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get blobs directory
    pub fn blobs_dir(&self) -> PathBuf {
        self.storage_dir.join("blobs")
    }

    /// Get SQLite database path
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("metadata.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Whether `user_id` holds the elevated update capability
    pub fn is_elevated(&self, user_id: i64) -> bool {
        self.elevated_actors.contains(&user_id)
    }
}
