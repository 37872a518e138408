//! Geoid grid source with per-model caching.
//!
//! This module provides [`GeoidSource`], the single place where geoid model
//! identifiers resolve to raster resources. A grid is opened at most once
//! per model per source; every sampler in a batch run shares the same
//! read-only [`Arc<GeoidGrid>`](crate::grid::GeoidGrid).
//!
//! # Auto-Download Feature
//!
//! When compiled with the `download` feature, `GeoidSource` can fetch a
//! missing grid from a configured URL template.
//!
//! ```ignore
//! use egm::{GeoidSourceBuilder, download::DownloadConfig};
//!
//! let source = GeoidSourceBuilder::new("/data/geoids")
//!     .auto_download(DownloadConfig::with_url_template(
//!         "https://grids.example.com/{grid}.gz", // compression auto-detected
//!     ))
//!     .build()?;
//!
//! // Will download egm96_15.egm if not present locally
//! let grid = source.open(GeoidModel::Egm96)?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;

use crate::error::{GeoidError, Result};
use crate::grid::GeoidGrid;
use crate::model::GeoidModel;

#[cfg(feature = "download")]
use crate::download::{DownloadConfig, Downloader};

/// Statistics about grid cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of grids currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (opens served from cache).
    pub hit_count: u64,
    /// Number of cache misses (grids loaded from disk).
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no opens have happened.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Resolves geoid models to opened, shared grids.
///
/// # Example
///
/// ```ignore
/// use egm::{GeoidModel, GeoidSource};
///
/// let source = GeoidSource::new("/data/geoids");
///
/// // First open loads from disk; later opens share the cached grid
/// let grid = source.open(GeoidModel::Egm96)?;
/// let undulation = grid.undulation(7.4, 46.9)?;
/// ```
pub struct GeoidSource {
    /// Directory containing grid files.
    data_dir: PathBuf,
    /// Cache of opened grids, keyed by model.
    grid_cache: Cache<GeoidModel, Arc<GeoidGrid>>,
    /// Number of cache hits.
    hit_count: AtomicU64,
    /// Number of cache misses.
    miss_count: AtomicU64,
    /// Optional downloader for fetching missing grids.
    #[cfg(feature = "download")]
    downloader: Option<Downloader>,
}

impl GeoidSource {
    /// Create a new source over a grid data directory.
    ///
    /// The cache holds one entry per supported model.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            grid_cache: Cache::builder()
                .max_capacity(GeoidModel::ALL.len() as u64)
                .build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            #[cfg(feature = "download")]
            downloader: None,
        }
    }

    /// Create a builder for more configuration options.
    pub fn builder<P: AsRef<Path>>(data_dir: P) -> GeoidSourceBuilder {
        GeoidSourceBuilder::new(data_dir)
    }

    /// Open the grid for a model, loading it at most once.
    ///
    /// Resolution order: cache, `<data_dir>/<grid>`, a sibling
    /// `<grid>.zip` archive (extracted in place), then download when
    /// configured.
    ///
    /// # Errors
    ///
    /// Returns [`GeoidError::ResourceUnavailable`] if the grid cannot be
    /// fetched or opened. This is fatal for the whole batch; there is no
    /// fallback to a different model.
    pub fn open(&self, model: GeoidModel) -> Result<Arc<GeoidGrid>> {
        if let Some(grid) = self.grid_cache.get(&model) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(grid);
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let grid_name = model.grid_file_name();
        let path = self.data_dir.join(grid_name);

        if !path.exists() {
            let zip_path = self.data_dir.join(format!("{}.zip", grid_name));
            if zip_path.exists() {
                self.extract_grid_from_zip(&zip_path, grid_name)?;
            } else {
                #[cfg(feature = "download")]
                {
                    match &self.downloader {
                        Some(downloader) => {
                            downloader
                                .download_grid(model, &self.data_dir)
                                .map_err(|e| GeoidError::ResourceUnavailable {
                                    model,
                                    reason: e.to_string(),
                                })?;
                        }
                        None => {
                            return Err(GeoidError::ResourceUnavailable {
                                model,
                                reason: format!("grid file not found: {}", path.display()),
                            })
                        }
                    }
                }

                #[cfg(not(feature = "download"))]
                {
                    return Err(GeoidError::ResourceUnavailable {
                        model,
                        reason: format!("grid file not found: {}", path.display()),
                    });
                }
            }
        }

        let grid = Arc::new(GeoidGrid::from_file(&path)?);

        // A grid of the wrong layout under this model's file name would
        // silently produce wrong undulations.
        if grid.model() != model {
            return Err(GeoidError::ResourceUnavailable {
                model,
                reason: format!("{} holds a {} grid", path.display(), grid.model()),
            });
        }

        self.grid_cache.insert(model, grid.clone());

        Ok(grid)
    }

    /// Extract a grid file from a local zip archive into the data directory.
    fn extract_grid_from_zip(&self, zip_path: &Path, grid_name: &str) -> Result<()> {
        let file = std::fs::File::open(zip_path).map_err(GeoidError::Io)?;
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| GeoidError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut found = false;
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).map_err(|e| {
                GeoidError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
            })?;

            let entry_name = entry.name().to_string();
            if entry_name.ends_with(".egm") || entry_name == grid_name {
                let out_path = self.data_dir.join(grid_name);
                let mut out_file = std::fs::File::create(&out_path)?;
                std::io::copy(&mut entry, &mut out_file)?;
                found = true;
                break;
            }
        }

        if !found {
            return Err(GeoidError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("No grid file found in {}", zip_path.display()),
            )));
        }

        Ok(())
    }

    /// Check if auto-download is enabled.
    #[cfg(feature = "download")]
    pub fn has_auto_download(&self) -> bool {
        self.downloader.is_some()
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.grid_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Remove a model's grid from the cache, e.g. after the file changed.
    pub fn invalidate(&self, model: GeoidModel) {
        self.grid_cache.invalidate(&model);
    }

    /// Clear all grids from the cache.
    pub fn clear_cache(&self) {
        self.grid_cache.invalidate_all();
    }

    /// Models whose grid is present in the data directory, either as a raw
    /// grid file or a zip archive.
    pub fn available_models(&self) -> Vec<GeoidModel> {
        GeoidModel::ALL
            .into_iter()
            .filter(|model| {
                let grid_name = model.grid_file_name();
                self.data_dir.join(grid_name).exists()
                    || self.data_dir.join(format!("{}.zip", grid_name)).exists()
            })
            .collect()
    }
}

/// Builder for creating [`GeoidSource`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use egm::GeoidSourceBuilder;
///
/// let source = GeoidSourceBuilder::new("/data/geoids")
///     .cache_size(2)
///     .build();
/// ```
pub struct GeoidSourceBuilder {
    data_dir: PathBuf,
    cache_size: u64,
    #[cfg(feature = "download")]
    download_config: Option<DownloadConfig>,
}

impl GeoidSourceBuilder {
    /// Create a new builder with the specified data directory.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_size: GeoidModel::ALL.len() as u64,
            #[cfg(feature = "download")]
            download_config: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `EGM_DATA_DIR` | Directory containing grid files | Required |
    /// | `EGM_CACHE_SIZE` | Maximum grids in cache | 2 |
    /// | `EGM_DOWNLOAD_URL` | URL template for downloads* | None |
    /// | `EGM_DOWNLOAD_GZIP` | Whether the URL serves gzip files* | auto |
    ///
    /// *Only used when the `download` feature is enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if `EGM_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("EGM_DATA_DIR").map_err(|_| {
            GeoidError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "EGM_DATA_DIR environment variable not set",
            ))
        })?;

        let cache_size: u64 = std::env::var("EGM_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(GeoidModel::ALL.len() as u64);

        #[cfg(feature = "download")]
        let download_config = match std::env::var("EGM_DOWNLOAD_URL") {
            Ok(url_template) => {
                // Explicit compression setting overrides URL auto-detection
                if let Ok(gzip_setting) = std::env::var("EGM_DOWNLOAD_GZIP") {
                    let is_gzipped =
                        gzip_setting.eq_ignore_ascii_case("true") || gzip_setting == "1";
                    let compression = if is_gzipped {
                        crate::download::Compression::Gzip
                    } else {
                        crate::download::Compression::None
                    };
                    Some(DownloadConfig::with_url_template_and_compression(
                        url_template,
                        compression,
                    ))
                } else {
                    Some(DownloadConfig::with_url_template(url_template))
                }
            }
            Err(_) => None,
        };

        Ok(Self {
            data_dir: PathBuf::from(data_dir),
            cache_size,
            #[cfg(feature = "download")]
            download_config,
        })
    }

    /// Set the data directory.
    pub fn data_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.data_dir = path.as_ref().to_path_buf();
        self
    }

    /// Set the maximum number of grids to keep in cache.
    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    /// Enable auto-download with the specified configuration.
    #[cfg(feature = "download")]
    pub fn auto_download(mut self, config: DownloadConfig) -> Self {
        self.download_config = Some(config);
        self
    }

    /// Build the [`GeoidSource`].
    ///
    /// # Errors
    ///
    /// Returns an error if auto-download is enabled but the downloader
    /// cannot be created (e.g. due to TLS initialization failure).
    #[cfg(feature = "download")]
    pub fn build(self) -> Result<GeoidSource> {
        let downloader = match self.download_config {
            Some(config) => Some(Downloader::new(config)?),
            None => None,
        };

        Ok(GeoidSource {
            data_dir: self.data_dir,
            grid_cache: Cache::builder().max_capacity(self.cache_size).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            downloader,
        })
    }

    /// Build the [`GeoidSource`].
    #[cfg(not(feature = "download"))]
    pub fn build(self) -> GeoidSource {
        GeoidSource {
            data_dir: self.data_dir,
            grid_cache: Cache::builder().max_capacity(self.cache_size).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    /// File size for the EGM96 grid layout (721 × 1440 × 4 bytes).
    const EGM96_SIZE: usize = 721 * 1440 * 4;

    /// Create a test EGM96 grid filled with a constant undulation.
    fn create_test_grid(dir: &Path, undulation: f32) {
        let mut data = Vec::with_capacity(EGM96_SIZE);
        for _ in 0..EGM96_SIZE / 4 {
            data.extend_from_slice(&undulation.to_be_bytes());
        }

        let path = dir.join(GeoidModel::Egm96.grid_file_name());
        let mut file = fs::File::create(path).unwrap();
        file.write_all(&data).unwrap();
    }

    #[test]
    fn test_open_basic() {
        let temp_dir = TempDir::new().unwrap();
        create_test_grid(temp_dir.path(), 47.25);

        let source = GeoidSource::new(temp_dir.path());
        let grid = source.open(GeoidModel::Egm96).unwrap();

        assert_eq!(grid.undulation(7.4, 46.9).unwrap(), 47.25);
    }

    #[test]
    fn test_grid_opened_once_per_model() {
        let temp_dir = TempDir::new().unwrap();
        create_test_grid(temp_dir.path(), 47.25);

        let source = GeoidSource::new(temp_dir.path());

        let first = source.open(GeoidModel::Egm96).unwrap();
        let second = source.open(GeoidModel::Egm96).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let stats = source.cache_stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 1);
    }

    #[test]
    fn test_missing_grid_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let source = GeoidSource::new(temp_dir.path());

        let err = source.open(GeoidModel::Egm2008).unwrap_err();
        assert!(matches!(
            err,
            GeoidError::ResourceUnavailable {
                model: GeoidModel::Egm2008,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_grid_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(GeoidModel::Egm96.grid_file_name());
        fs::write(&path, vec![0u8; 1000]).unwrap();

        let source = GeoidSource::new(temp_dir.path());
        assert!(matches!(
            source.open(GeoidModel::Egm96),
            Err(GeoidError::InvalidGridSize { size: 1000 })
        ));
    }

    #[test]
    fn test_zip_extraction() {
        let temp_dir = TempDir::new().unwrap();

        // Zip a zero-filled grid next to where the raw grid would live
        let grid_data = vec![0u8; EGM96_SIZE];
        let zip_path = temp_dir.path().join("egm96_15.egm.zip");
        let file = fs::File::create(&zip_path).unwrap();
        let mut zip_writer = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();
        zip_writer.start_file("egm96_15.egm", options).unwrap();
        zip_writer.write_all(&grid_data).unwrap();
        zip_writer.finish().unwrap();

        let source = GeoidSource::new(temp_dir.path());
        let grid = source.open(GeoidModel::Egm96).unwrap();
        assert_eq!(grid.undulation(0.0, 0.0).unwrap(), 0.0);

        // Extracted grid file should now exist
        assert!(temp_dir.path().join("egm96_15.egm").exists());
    }

    #[test]
    fn test_invalidate_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        create_test_grid(temp_dir.path(), 47.25);

        let source = GeoidSource::new(temp_dir.path());
        let _ = source.open(GeoidModel::Egm96).unwrap();
        assert_eq!(source.cache_stats().miss_count, 1);

        source.invalidate(GeoidModel::Egm96);

        let _ = source.open(GeoidModel::Egm96).unwrap();
        assert_eq!(source.cache_stats().miss_count, 2);
    }

    #[test]
    fn test_available_models() {
        let temp_dir = TempDir::new().unwrap();
        create_test_grid(temp_dir.path(), 47.25);

        let source = GeoidSource::new(temp_dir.path());
        assert_eq!(source.available_models(), vec![GeoidModel::Egm96]);
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            entry_count: 1,
            hit_count: 80,
            miss_count: 20,
        };
        assert_eq!(stats.hit_rate(), 0.8);

        let empty_stats = CacheStats::default();
        assert_eq!(empty_stats.hit_rate(), 0.0);
    }

    #[test]
    fn test_from_env_missing_data_dir() {
        let original = std::env::var("EGM_DATA_DIR").ok();
        std::env::remove_var("EGM_DATA_DIR");

        let result = GeoidSourceBuilder::from_env();
        assert!(result.is_err());

        if let Some(val) = original {
            std::env::set_var("EGM_DATA_DIR", val);
        }
    }

    #[test]
    fn test_from_env_with_values() {
        let temp_dir = TempDir::new().unwrap();

        let orig_dir = std::env::var("EGM_DATA_DIR").ok();
        let orig_size = std::env::var("EGM_CACHE_SIZE").ok();

        std::env::set_var("EGM_DATA_DIR", temp_dir.path());
        std::env::set_var("EGM_CACHE_SIZE", "1");

        let builder = GeoidSourceBuilder::from_env().unwrap();
        assert_eq!(builder.data_dir, temp_dir.path());
        assert_eq!(builder.cache_size, 1);

        match orig_dir {
            Some(v) => std::env::set_var("EGM_DATA_DIR", v),
            None => std::env::remove_var("EGM_DATA_DIR"),
        }
        match orig_size {
            Some(v) => std::env::set_var("EGM_CACHE_SIZE", v),
            None => std::env::remove_var("EGM_CACHE_SIZE"),
        }
    }
}
