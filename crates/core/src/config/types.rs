use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ingestion: IngestionConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub media_sources: Vec<MediaSourceEntry>,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("nota.db")
}

/// Ingestion configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Maximum concurrent annotation document reads per run.
    #[serde(default = "default_max_parallel_reads")]
    pub max_parallel_reads: usize,
    /// Suffix appended to a media item name to locate its annotation document.
    #[serde(default = "default_annotation_suffix")]
    pub annotation_suffix: String,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_parallel_reads: default_max_parallel_reads(),
            annotation_suffix: default_annotation_suffix(),
        }
    }
}

fn default_max_parallel_reads() -> usize {
    4
}

fn default_annotation_suffix() -> String {
    ".json".to_string()
}

/// Export configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Host prefix for the per-item reference URL (e.g., "https://nota.example.com").
    #[serde(default)]
    pub base_url: String,
    /// Resource (directory) on the media source where archives are written.
    #[serde(default = "default_export_directory")]
    pub directory: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            directory: default_export_directory(),
        }
    }
}

fn default_export_directory() -> String {
    "exports".to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human-readable format.
    #[serde(default)]
    pub json: bool,
}

/// A media source known to this deployment.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MediaSourceEntry {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub kind: MediaSourceKind,
    /// Root directory (filesystem sources).
    pub root: PathBuf,
}

/// Available media source backends
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaSourceKind {
    #[default]
    Filesystem,
    // Future: S3, Gcs
}
