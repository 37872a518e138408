//! # EGM - Geoid Height Conversion Library
//!
//! Memory-efficient library for sampling geoid undulations from global
//! EGM96/EGM2008 grids and converting ellipsoidal (GNSS) heights in geotag
//! CSV files to orthometric heights.
//!
//! ## Features
//!
//! - **Fast**: Memory-mapped I/O for instant grid access
//! - **Memory Efficient**: Grids are mapped, not loaded; opened on demand and cached
//! - **Automatic Detection**: Determines grid layout (EGM96/EGM2008) from file size
//! - **Batch Oriented**: Validate, convert, and export whole sets of geotag files
//! - **Offline**: Works with local `.egm` files; downloading is an optional feature
//!
//! ## Quick Start
//!
//! ```ignore
//! use egm::{BatchPipeline, GeoidModel, GeoidSource};
//!
//! let source = GeoidSource::new("/data/geoids");
//!
//! let mut pipeline = BatchPipeline::new();
//! pipeline.ingest_reader("flight1.csv", std::fs::File::open("flight1.csv")?)?;
//! pipeline.validate()?;
//! pipeline.convert(&source, GeoidModel::Egm96)?;
//!
//! let artifact = pipeline.export()?;
//! std::fs::write(artifact.file_name(), artifact.bytes())?;
//! ```
//!
//! ## Grid Data Format
//!
//! Geoid grids are plain binary rasters of 32-bit big-endian floats, one
//! undulation in meters per cell, row-major from the north-west corner:
//!
//! - **EGM96**: 721×1440 cells, 15 arc-minute resolution
//! - **EGM2008**: 10801×21600 cells, 1 arc-minute resolution
//!
//! The special value -32768.0 indicates no data. Grid file locations are
//! deployment configuration; see [`GeoidSourceBuilder`].

pub mod convert;
#[cfg(feature = "download")]
pub mod download;
pub mod error;
pub mod geotags;
pub mod grid;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod source;

// Re-export main types at crate root for convenience
pub use error::{GeoidError, Result};
pub use geotags::GeotagDataset;
pub use grid::{GeoTransform, GeoidGrid, NO_DATA_VALUE};
pub use model::GeoidModel;
pub use pipeline::{BatchPipeline, BatchState, ExportArtifact};
pub use source::{CacheStats, GeoidSource, GeoidSourceBuilder};
