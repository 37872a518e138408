//! Geoid grid download functionality.
//!
//! This module provides functionality to fetch geoid grids from remote
//! servers. It is only available when the `download` feature is enabled.
//!
//! The exact resource locations are deployment configuration: callers
//! supply a URL template and the model contributes only the grid file name.

use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use zip::ZipArchive;

use crate::error::{GeoidError, Result};
use crate::model::GeoidModel;

/// Compression format of a downloaded grid file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression - raw grid file
    #[default]
    None,
    /// Gzip compression (.egm.gz)
    Gzip,
    /// ZIP archive (.egm.zip)
    Zip,
}

impl Compression {
    /// Detect compression format from a URL or filename.
    pub fn from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.ends_with(".gz") {
            Compression::Gzip
        } else if lower.ends_with(".zip") {
            Compression::Zip
        } else {
            Compression::None
        }
    }
}

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for downloading geoid grids.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    /// URL template. `{grid}` expands to the grid file name
    /// (e.g. "egm96_15.egm"), `{model}` to the lowercase model name
    /// (e.g. "egm96").
    pub url_template: String,
    /// Compression format of the downloaded file.
    pub compression: Compression,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Number of retry attempts on failure.
    pub max_retries: u32,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            url_template: String::new(),
            compression: Compression::None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: 3,
        }
    }
}

impl DownloadConfig {
    /// Create a download configuration from a URL template.
    ///
    /// Compression is auto-detected from the URL extension:
    /// `.gz` → Gzip, `.zip` → ZIP, otherwise raw.
    ///
    /// # Example
    ///
    /// ```ignore
    /// use egm::download::DownloadConfig;
    ///
    /// let config = DownloadConfig::with_url_template(
    ///     "https://grids.example.com/geoids/{grid}.gz",
    /// );
    /// ```
    pub fn with_url_template(url_template: impl Into<String>) -> Self {
        let template = url_template.into();
        let compression = Compression::from_url(&template);
        Self {
            url_template: template,
            compression,
            ..Default::default()
        }
    }

    /// Create a download configuration with an explicit compression setting.
    pub fn with_url_template_and_compression(
        url_template: impl Into<String>,
        compression: Compression,
    ) -> Self {
        Self {
            url_template: url_template.into(),
            compression,
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Set the maximum number of retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Geoid grid downloader.
pub struct Downloader {
    client: Client,
    config: DownloadConfig,
}

impl Downloader {
    /// Create a new downloader with the given configuration.
    pub fn new(config: DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GeoidError::DownloadFailed {
                grid: String::new(),
                reason: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client, config })
    }

    /// Download the grid for a model into `dest_dir`.
    ///
    /// Skips the download when the grid file already exists. Retries with a
    /// short backoff on failure; the data is written to the destination path
    /// only after a complete, decompressed payload is in hand, so a failed
    /// fetch never leaves a partial grid behind.
    ///
    /// # Returns
    ///
    /// The path to the grid file.
    pub fn download_grid(&self, model: GeoidModel, dest_dir: &Path) -> Result<PathBuf> {
        let grid_name = model.grid_file_name();
        let url = self.build_url(model)?;
        let dest_path = dest_dir.join(grid_name);

        if dest_path.exists() {
            return Ok(dest_path);
        }

        fs::create_dir_all(dest_dir)?;

        let mut last_error = None;
        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(std::time::Duration::from_millis(500 * attempt as u64));
            }

            match self.do_download(&url, &dest_path) {
                Ok(()) => return Ok(dest_path),
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GeoidError::DownloadFailed {
            grid: grid_name.to_string(),
            reason: "Unknown error".to_string(),
        }))
    }

    /// Build the download URL for a model's grid.
    fn build_url(&self, model: GeoidModel) -> Result<String> {
        if self.config.url_template.is_empty() {
            return Err(GeoidError::DownloadFailed {
                grid: model.grid_file_name().to_string(),
                reason: "No download URL template configured".to_string(),
            });
        }

        Ok(self
            .config
            .url_template
            .replace("{grid}", model.grid_file_name())
            .replace("{model}", &model.to_string().to_lowercase()))
    }

    /// Perform the actual download.
    fn do_download(&self, url: &str, dest_path: &Path) -> Result<()> {
        let grid = dest_path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| GeoidError::DownloadFailed {
                grid: grid.clone(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(GeoidError::DownloadFailed {
                grid,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().map_err(|e| GeoidError::DownloadFailed {
            grid: grid.clone(),
            reason: e.to_string(),
        })?;

        let decompressed = match self.config.compression {
            Compression::None => bytes.to_vec(),
            Compression::Gzip => {
                let mut decoder = GzDecoder::new(&bytes[..]);
                let mut data = Vec::new();
                decoder
                    .read_to_end(&mut data)
                    .map_err(|e| GeoidError::DownloadFailed {
                        grid: grid.clone(),
                        reason: format!("Failed to decompress gzip: {}", e),
                    })?;
                data
            }
            Compression::Zip => extract_grid_from_zip(&bytes, &grid)?,
        };

        let mut file = File::create(dest_path)?;
        file.write_all(&decompressed)?;

        Ok(())
    }
}

/// Extract a `.egm` grid file from a ZIP archive.
///
/// Searches the archive for a file ending in ".egm" (case-insensitive) and
/// returns its contents.
fn extract_grid_from_zip(data: &[u8], grid: &str) -> Result<Vec<u8>> {
    let cursor = Cursor::new(data);
    let mut archive = ZipArchive::new(cursor).map_err(|e| GeoidError::DownloadFailed {
        grid: grid.to_string(),
        reason: format!("Failed to read ZIP archive: {}", e),
    })?;

    for i in 0..archive.len() {
        let mut zip_file = archive.by_index(i).map_err(|e| GeoidError::DownloadFailed {
            grid: grid.to_string(),
            reason: format!("Failed to read ZIP entry: {}", e),
        })?;

        let name = zip_file.name().to_lowercase();
        if name.ends_with(".egm") {
            let mut contents = Vec::new();
            zip_file
                .read_to_end(&mut contents)
                .map_err(|e| GeoidError::DownloadFailed {
                    grid: grid.to_string(),
                    reason: format!("Failed to extract grid from ZIP: {}", e),
                })?;
            return Ok(contents);
        }
    }

    Err(GeoidError::DownloadFailed {
        grid: grid.to_string(),
        reason: "No .egm file found in ZIP archive".to_string(),
    })
}
