//! Geoid grid loading and undulation sampling.
//!
//! This module provides the [`GeoidGrid`] struct for reading raw binary
//! geoid undulation grids and sampling them at arbitrary (lon, lat) points.
//!
//! Grids are raw big-endian `f32` samples in row-major order, row 0 at the
//! north edge (+90°), column 0 at the west edge (-180°), covering the whole
//! globe. The grid layout is detected from the file size.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{GeoidError, Result};
use crate::model::GeoidModel;

/// EGM96 15-arc-minute grid: 721 rows × 1440 columns
const EGM96_ROWS: usize = 721;
const EGM96_COLS: usize = 1440;

/// EGM2008 1-arc-minute grid: 10801 rows × 21600 columns
const EGM2008_ROWS: usize = 10801;
const EGM2008_COLS: usize = 21600;

/// File size for the EGM96 grid: 721 × 1440 × 4 bytes
pub(crate) const EGM96_SIZE: usize = EGM96_ROWS * EGM96_COLS * 4; // 4,152,960 bytes

/// File size for the EGM2008 grid: 10801 × 21600 × 4 bytes
pub(crate) const EGM2008_SIZE: usize = EGM2008_ROWS * EGM2008_COLS * 4; // 933,206,400 bytes

/// Value indicating a cell with no defined undulation.
pub const NO_DATA_VALUE: f32 = -32768.0;

/// Six-term affine georeferencing transform (GDAL convention).
///
/// Maps fractional pixel coordinates to geographic coordinates:
///
/// ```text
/// lon = top_left_x + col * pixel_width + row * rotation_x
/// lat = top_left_y + col * rotation_y  + row * pixel_height
/// ```
///
/// Pixel (0, 0) covers the top-left cell; cell centers sit at half-pixel
/// offsets. The global geoid grids are north-up (rotation terms zero), but
/// the inverse handles the general case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Longitude of the top-left corner of the top-left cell.
    pub top_left_x: f64,
    /// Cell width in degrees of longitude.
    pub pixel_width: f64,
    /// Row rotation term.
    pub rotation_x: f64,
    /// Latitude of the top-left corner of the top-left cell.
    pub top_left_y: f64,
    /// Column rotation term.
    pub rotation_y: f64,
    /// Cell height in degrees of latitude (negative for north-up grids).
    pub pixel_height: f64,
}

impl GeoTransform {
    /// North-up transform for a global grid with cell centers at
    /// `lon = -180 + col * step` and `lat = 90 - row * step`.
    pub fn global(step: f64) -> Self {
        Self {
            top_left_x: -180.0 - step / 2.0,
            pixel_width: step,
            rotation_x: 0.0,
            top_left_y: 90.0 + step / 2.0,
            rotation_y: 0.0,
            pixel_height: -step,
        }
    }

    /// Map a geographic coordinate to fractional (col, row) pixel
    /// coordinates via the inverse affine transform.
    pub fn invert(&self, lon: f64, lat: f64) -> (f64, f64) {
        let dx = lon - self.top_left_x;
        let dy = lat - self.top_left_y;
        let det = self.pixel_width * self.pixel_height - self.rotation_x * self.rotation_y;

        let col = (dx * self.pixel_height - dy * self.rotation_x) / det;
        let row = (dy * self.pixel_width - dx * self.rotation_y) / det;
        (col, row)
    }
}

/// A memory-mapped geoid undulation grid for fast point sampling.
///
/// # Example
///
/// ```ignore
/// use egm::GeoidGrid;
///
/// let grid = GeoidGrid::from_file("/data/geoids/egm96_15.egm")?;
/// let undulation = grid.undulation(138.5, 35.5)?;
/// println!("Undulation: {:.2}m", undulation);
/// ```
#[derive(Debug)]
pub struct GeoidGrid {
    /// Memory-mapped grid data.
    data: Mmap,
    /// The model this grid belongs to, detected from the file size.
    model: GeoidModel,
    /// Number of rows (latitude samples).
    rows: usize,
    /// Number of columns (longitude samples).
    cols: usize,
    /// Affine georeferencing transform.
    transform: GeoTransform,
}

impl GeoidGrid {
    /// Load a geoid grid from a raw binary grid file.
    ///
    /// The model (EGM96 vs EGM2008) is detected from the file size.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or memory-mapped, or
    /// if its size doesn't match a known grid layout.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;

        // SAFETY: Memory mapping is safe as long as the file is not modified
        // while mapped. We open the file read-only and don't expose the mapping.
        let mmap = unsafe { Mmap::map(&file)? };

        let (model, rows, cols) = match mmap.len() {
            EGM96_SIZE => (GeoidModel::Egm96, EGM96_ROWS, EGM96_COLS),
            EGM2008_SIZE => (GeoidModel::Egm2008, EGM2008_ROWS, EGM2008_COLS),
            size => return Err(GeoidError::InvalidGridSize { size }),
        };

        let step = model.resolution_arc_minutes() / 60.0;

        Ok(Self {
            data: mmap,
            model,
            rows,
            cols,
            transform: GeoTransform::global(step),
        })
    }

    /// Get the undulation at the specified coordinates.
    ///
    /// Maps the coordinate to a fractional cell position via the inverse
    /// affine transform and returns the value of the nearest grid cell
    /// (no interpolation). Longitude wraps across the antimeridian.
    ///
    /// # Arguments
    ///
    /// * `lon` - Longitude in decimal degrees (-180 to 180)
    /// * `lat` - Latitude in decimal degrees (-90 to 90)
    ///
    /// # Errors
    ///
    /// Returns [`GeoidError::OutOfCoverage`] if the coordinates fall outside
    /// the valid range or the nearest cell holds the no-data sentinel.
    pub fn undulation(&self, lon: f64, lat: f64) -> Result<f64> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoidError::OutOfCoverage {
                model: self.model,
                lon,
                lat,
            });
        }

        let (col_f, row_f) = self.transform.invert(lon, lat);

        // Nearest cell: the fractional position falls inside exactly one
        // cell; its center is the nearest sample.
        let col = col_f.floor() as isize;
        let row = row_f.floor() as isize;

        // Longitude wraps (the column one past the east edge is the west
        // edge); latitude clamps at the poles.
        let col = col.rem_euclid(self.cols as isize) as usize;
        let row = row.clamp(0, self.rows as isize - 1) as usize;

        let value = self.value_at(row, col);
        if value == NO_DATA_VALUE {
            return Err(GeoidError::OutOfCoverage {
                model: self.model,
                lon,
                lat,
            });
        }

        Ok(f64::from(value))
    }

    /// Sample the grid at a sequence of (lon, lat) points.
    ///
    /// Returns one undulation value per input point, in the same order.
    /// Fails on the first point without a defined undulation.
    pub fn sample(&self, points: &[(f64, f64)]) -> Result<Vec<f64>> {
        points
            .iter()
            .map(|&(lon, lat)| self.undulation(lon, lat))
            .collect()
    }

    /// Read the raw sample at a row/column index.
    fn value_at(&self, row: usize, col: usize) -> f32 {
        // 4 bytes per sample, row-major order
        let offset = (row * self.cols + col) * 4;
        f32::from_be_bytes([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
            self.data[offset + 3],
        ])
    }

    /// Iterate over all raw sample values, row-major.
    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.data
            .chunks_exact(4)
            .map(|b| f32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// The model this grid was detected as.
    pub fn model(&self) -> GeoidModel {
        self.model
    }

    /// Number of latitude samples.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of longitude samples.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The grid's affine georeferencing transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Write a value into a raw EGM96-layout grid buffer.
    fn set_cell(data: &mut [u8], row: usize, col: usize, value: f32) {
        let offset = (row * EGM96_COLS + col) * 4;
        data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    }

    /// Create a test EGM96 grid file with known undulation values.
    fn create_test_grid() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0u8; EGM96_SIZE];

        // Cell centered on (lon 0, lat 0): col 720, row 360
        set_cell(&mut data, 360, 720, 17.25);
        // Cell centered on (lon -180, lat 0): col 0, row 360
        set_cell(&mut data, 360, 0, -4.5);
        // North pole row
        set_cell(&mut data, 0, 0, 13.6);
        // South pole row
        set_cell(&mut data, EGM96_ROWS - 1, 0, -29.5);

        file.write_all(&data).unwrap();
        file
    }

    #[test]
    fn test_load_egm96_grid() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        assert_eq!(grid.model(), GeoidModel::Egm96);
        assert_eq!(grid.rows(), EGM96_ROWS);
        assert_eq!(grid.cols(), EGM96_COLS);
    }

    #[test]
    fn test_invalid_grid_size() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&vec![0u8; 1000]).unwrap();

        let result = GeoidGrid::from_file(file.path());
        assert!(matches!(
            result,
            Err(GeoidError::InvalidGridSize { size: 1000 })
        ));
    }

    #[test]
    fn test_nearest_cell_sampling() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        // Exactly on the cell center
        assert_eq!(grid.undulation(0.0, 0.0).unwrap(), 17.25);
        // Within half a cell of the center still hits the same cell
        assert_eq!(grid.undulation(0.1, -0.05).unwrap(), 17.25);
        // The neighboring cell holds zero
        assert_eq!(grid.undulation(0.3, 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_antimeridian_wrap() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        // lon 180 and lon -180 address the same column
        assert_eq!(grid.undulation(-180.0, 0.0).unwrap(), -4.5);
        assert_eq!(grid.undulation(180.0, 0.0).unwrap(), -4.5);
    }

    #[test]
    fn test_pole_rows() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        assert_eq!(grid.undulation(-180.0, 90.0).unwrap(), 13.6);
        assert_eq!(grid.undulation(-180.0, -90.0).unwrap(), -29.5);
    }

    #[test]
    fn test_out_of_range_coordinates() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        assert!(matches!(
            grid.undulation(0.0, 90.5),
            Err(GeoidError::OutOfCoverage { .. })
        ));
        assert!(matches!(
            grid.undulation(-200.0, 0.0),
            Err(GeoidError::OutOfCoverage { .. })
        ));
    }

    #[test]
    fn test_no_data_cell_fails() {
        let mut file = NamedTempFile::new().unwrap();
        let mut data = vec![0u8; EGM96_SIZE];
        set_cell(&mut data, 360, 720, NO_DATA_VALUE);
        file.write_all(&data).unwrap();

        let grid = GeoidGrid::from_file(file.path()).unwrap();
        assert!(matches!(
            grid.undulation(0.0, 0.0),
            Err(GeoidError::OutOfCoverage { .. })
        ));
    }

    #[test]
    fn test_sample_preserves_order() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        let points = vec![(0.0, 0.0), (-180.0, 0.0), (10.0, 10.0)];
        let values = grid.sample(&points).unwrap();
        assert_eq!(values, vec![17.25, -4.5, 0.0]);

        // Permuting the input permutes the output identically
        let permuted = vec![(10.0, 10.0), (0.0, 0.0), (-180.0, 0.0)];
        let values = grid.sample(&permuted).unwrap();
        assert_eq!(values, vec![0.0, 17.25, -4.5]);
    }

    #[test]
    fn test_sample_is_deterministic() {
        let file = create_test_grid();
        let grid = GeoidGrid::from_file(file.path()).unwrap();

        let points = vec![(0.0, 0.0), (45.25, -12.5), (-77.0, 38.9)];
        let first = grid.sample(&points).unwrap();
        let second = grid.sample(&points).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_transform_invert_with_rotation() {
        // Synthetic transform with rotation terms to exercise the general
        // inverse, not just the north-up case.
        let t = GeoTransform {
            top_left_x: 10.0,
            pixel_width: 0.5,
            rotation_x: 0.1,
            top_left_y: 50.0,
            rotation_y: 0.2,
            pixel_height: -0.5,
        };

        // Forward-map a known pixel position, then invert it.
        let (col, row) = (12.25, 7.75);
        let lon = t.top_left_x + col * t.pixel_width + row * t.rotation_x;
        let lat = t.top_left_y + col * t.rotation_y + row * t.pixel_height;

        let (col_back, row_back) = t.invert(lon, lat);
        assert!((col_back - col).abs() < 1e-9);
        assert!((row_back - row).abs() < 1e-9);
    }
}
