//! Loader configuration
//!
//! Every component receives the part of [`LoaderConfig`] it needs at
//! construction; nothing reads process-wide constants at run time.

use crate::rdo::{RdoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Defaults
// ============================================================================

/// RGD publishes RDO as a single OBO file
pub const DEFAULT_SOURCE_URL: &str = "ftp://ftp.rgd.mcw.edu/pub/ontology/disease/RDO.obo";

/// Directory the OBO file is downloaded into
pub const DEFAULT_DOWNLOAD_DIR: &str = "../data/RGD";

pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_NAME: &str = "tcrd";
pub const DEFAULT_DB_PORT: u16 = 5432;

/// Default database connection timeout in seconds.
pub const DEFAULT_DB_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Name recorded in the dataset registry
pub const DATASET_NAME: &str = "RGD Disease Ontology";

pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Configuration
// ============================================================================

/// Complete configuration for one loader run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub source: SourceConfig,
    pub database: DatabaseConfig,
    pub dataset: DatasetConfig,
}

/// Where the ontology comes from and where it is kept locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// FTP URL of the OBO file
    pub url: String,

    /// Local directory for the downloaded file
    pub download_dir: PathBuf,

    /// Use this file instead of downloading
    pub local_obo_path: Option<PathBuf>,
}

/// Target TCRD database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub connect_timeout_secs: u64,
}

/// Descriptor written to the dataset registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    pub app: String,
    pub app_version: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_SOURCE_URL.to_string(),
            download_dir: PathBuf::from(DEFAULT_DOWNLOAD_DIR),
            local_obo_path: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_DB_HOST.to_string(),
            port: DEFAULT_DB_PORT,
            name: DEFAULT_DB_NAME.to_string(),
            user: None,
            password: None,
            connect_timeout_secs: DEFAULT_DB_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            name: DATASET_NAME.to_string(),
            app: APP_NAME.to_string(),
            app_version: APP_VERSION.to_string(),
        }
    }
}

impl SourceConfig {
    /// File name component of the source URL (e.g. "RDO.obo")
    pub fn file_name(&self) -> Result<String> {
        let url = url::Url::parse(&self.url)?;
        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .ok_or_else(|| RdoError::Config(format!("Source URL has no file name: {}", self.url)))
    }

    /// Path the OBO file is read from: the local override or the download target
    pub fn local_path(&self) -> Result<PathBuf> {
        match &self.local_obo_path {
            Some(path) => Ok(path.clone()),
            None => Ok(self.download_dir.join(self.file_name()?)),
        }
    }
}

impl LoaderConfig {
    /// Load configuration from environment variables (and `.env`) over defaults
    ///
    /// Environment variables:
    /// - `RDO_SOURCE_URL`, `RDO_DOWNLOAD_DIR`, `RDO_OBO_FILE`
    /// - `RDO_DB_HOST`, `RDO_DB_PORT`, `RDO_DB_NAME`, `RDO_DB_USER`, `RDO_DB_PASSWORD`
    /// - `RDO_DB_CONNECT_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let defaults = LoaderConfig::default();

        LoaderConfig {
            source: SourceConfig {
                url: std::env::var("RDO_SOURCE_URL").unwrap_or(defaults.source.url),
                download_dir: std::env::var("RDO_DOWNLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.source.download_dir),
                local_obo_path: std::env::var("RDO_OBO_FILE").ok().map(PathBuf::from),
            },
            database: DatabaseConfig {
                host: std::env::var("RDO_DB_HOST").unwrap_or(defaults.database.host),
                port: std::env::var("RDO_DB_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.database.port),
                name: std::env::var("RDO_DB_NAME").unwrap_or(defaults.database.name),
                user: std::env::var("RDO_DB_USER").ok(),
                password: std::env::var("RDO_DB_PASSWORD").ok(),
                connect_timeout_secs: std::env::var("RDO_DB_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.database.connect_timeout_secs),
            },
            dataset: defaults.dataset,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.source.local_obo_path.is_none() {
            if !self.source.url.starts_with("ftp://") {
                return Err(RdoError::Config(format!(
                    "Source URL must be an ftp:// URL: {}",
                    self.source.url
                )));
            }
            self.source.file_name()?;
        }

        if self.database.host.is_empty() {
            return Err(RdoError::Config("Database host cannot be empty".to_string()));
        }

        if self.database.name.is_empty() {
            return Err(RdoError::Config("Database name cannot be empty".to_string()));
        }

        if self.database.connect_timeout_secs == 0 {
            return Err(RdoError::Config(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        if self.dataset.name.is_empty() {
            return Err(RdoError::Config("Dataset name cannot be empty".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
