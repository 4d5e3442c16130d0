// RDO Downloader (FTP)

use crate::config::SourceConfig;
use crate::rdo::{RdoError, Result};
use std::path::{Path, PathBuf};
use suppaftp::types::FileType;
use suppaftp::{FtpStream, Mode};
use tracing::{debug, info, warn};
use url::Url;

/// Anonymous FTP credentials used when the URL carries none
const ANONYMOUS_USER: &str = "anonymous";
const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Host, port and path of an `ftp://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpLocation {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub username: String,
    pub password: String,
}

impl FtpLocation {
    /// Parse an `ftp://[user[:pass]@]host[:port]/path` URL
    pub fn parse(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;

        if parsed.scheme() != "ftp" {
            return Err(RdoError::Config(format!(
                "Unsupported scheme '{}' in {}, expected ftp",
                parsed.scheme(),
                url
            )));
        }

        let host = parsed
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RdoError::Config(format!("FTP URL has no host: {}", url)))?
            .to_string();

        let path = parsed.path().to_string();
        if path.is_empty() || path.ends_with('/') {
            return Err(RdoError::Config(format!("FTP URL has no file path: {}", url)));
        }

        let username = match parsed.username() {
            "" => ANONYMOUS_USER.to_string(),
            user => user.to_string(),
        };
        let password = parsed.password().unwrap_or(ANONYMOUS_PASSWORD).to_string();

        Ok(Self {
            host,
            port: parsed.port_or_known_default().unwrap_or(21),
            path,
            username,
            password,
        })
    }
}

/// Fetches the RDO OBO file to local disk
pub struct RdoDownloader {
    config: SourceConfig,
}

impl RdoDownloader {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    /// Make the OBO file available locally and return its path
    ///
    /// With a configured local file nothing is downloaded; otherwise the
    /// source URL is fetched into the download directory, replacing any
    /// previous copy.
    pub async fn fetch(&self) -> Result<PathBuf> {
        if let Some(local) = &self.config.local_obo_path {
            if !tokio::fs::try_exists(local).await? {
                return Err(RdoError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("Local OBO file not found: {}", local.display()),
                )));
            }
            info!("Using local OBO file {}, skipping download", local.display());
            return Ok(local.clone());
        }

        let dest = self.config.local_path()?;
        self.fetch_to(&self.config.url, &dest).await?;
        Ok(dest)
    }

    /// Download `url` to `dest`, deleting any existing file first
    ///
    /// Returns the number of bytes written. There is no retry: a failed
    /// transfer leaves no file at `dest`.
    pub async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64> {
        let location = FtpLocation::parse(url)?;

        if tokio::fs::try_exists(dest).await? {
            debug!("Removing previous download {}", dest.display());
            tokio::fs::remove_file(dest).await?;
        }

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Downloading {} to {}", url, dest.display());

        let data = tokio::task::spawn_blocking(move || Self::download_ftp(&location))
            .await
            .map_err(|e| RdoError::Download(format!("FTP download task failed: {}", e)))??;

        tokio::fs::write(dest, &data).await?;

        info!("Downloaded {} bytes ({} KB)", data.len(), data.len() / 1024);

        Ok(data.len() as u64)
    }

    /// Blocking FTP retrieval of a single file
    fn download_ftp(location: &FtpLocation) -> Result<Vec<u8>> {
        info!("Connecting to FTP server: {}:{}", location.host, location.port);

        let mut ftp_stream = FtpStream::connect(format!("{}:{}", location.host, location.port))?;

        ftp_stream.login(&location.username, &location.password)?;

        // Enable passive mode for firewall/NAT compatibility
        ftp_stream.set_mode(Mode::Passive);
        ftp_stream.transfer_type(FileType::Binary)?;

        debug!("Retrieving {}", location.path);
        let cursor = ftp_stream.retr_as_buffer(&location.path)?;

        if let Err(e) = ftp_stream.quit() {
            warn!("Failed to quit FTP session gracefully: {}", e);
        }

        Ok(cursor.into_inner())
    }

    /// Get configuration
    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
