//! Error types for the EGM library.

use thiserror::Error;

use crate::model::GeoidModel;
use crate::pipeline::BatchState;

/// Errors that can occur when working with geoid grids and geotag datasets.
#[derive(Error, Debug)]
pub enum GeoidError {
    /// IO error when reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing or serialization error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// File size doesn't match any known geoid grid layout.
    #[error("Invalid grid size: {size} bytes (expected 4152960 for EGM96 or 933206400 for EGM2008)")]
    InvalidGridSize { size: usize },

    /// A dataset is missing one or more required columns. Every missing
    /// column of the offending dataset is reported before the batch halts.
    #[error("dataset '{dataset}' is missing required columns: {}", missing.join(", "))]
    MissingColumns {
        dataset: String,
        missing: Vec<String>,
    },

    /// The geoid grid for the requested model could not be fetched or opened.
    #[error("{model} grid unavailable: {reason}")]
    ResourceUnavailable { model: GeoidModel, reason: String },

    /// A query point has no defined undulation in the grid (outside the
    /// covered extent or landing on a no-data cell).
    #[error("point (lon={lon}, lat={lat}) has no defined undulation in the {model} grid")]
    OutOfCoverage { model: GeoidModel, lon: f64, lat: f64 },

    /// A record violates the coordinate invariant (lat within [-90, 90],
    /// lon within [-180, 180]).
    #[error("row {row} of '{dataset}' has coordinates outside valid range: lat={lat}, lon={lon}")]
    InvalidCoordinate {
        dataset: String,
        row: usize,
        lat: f64,
        lon: f64,
    },

    /// A record field could not be parsed as a number.
    #[error("row {row} of '{dataset}' has an invalid value in column '{column}'")]
    InvalidValue {
        dataset: String,
        row: usize,
        column: String,
    },

    /// Sampled-value count does not match record count. Indicates a
    /// programming error, never expected in correct operation.
    #[error("sampled {values} undulation values for {records} records in '{dataset}'")]
    ShapeMismatch {
        dataset: String,
        records: usize,
        values: usize,
    },

    /// A pipeline method was called out of order.
    #[error("batch pipeline is in state {actual:?}, expected {expected:?}")]
    InvalidState {
        expected: BatchState,
        actual: BatchState,
    },

    /// Downloading a grid failed.
    #[error("Failed to download {grid}: {reason}")]
    DownloadFailed { grid: String, reason: String },
}

/// Result type alias using [`GeoidError`].
pub type Result<T> = std::result::Result<T, GeoidError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GeoidError::InvalidGridSize { size: 1000 };
        assert!(err.to_string().contains("1000"));

        let err = GeoidError::MissingColumns {
            dataset: "flight1.csv".to_string(),
            missing: vec![
                "altitude [meter]".to_string(),
                "accuracy vertical [meter]".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("flight1.csv"));
        assert!(msg.contains("altitude [meter]"));
        assert!(msg.contains("accuracy vertical [meter]"));

        let err = GeoidError::OutOfCoverage {
            model: GeoidModel::Egm96,
            lon: 7.4,
            lat: 46.9,
        };
        assert!(err.to_string().contains("EGM96"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = GeoidError::ShapeMismatch {
            dataset: "flight1.csv".to_string(),
            records: 3,
            values: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('3'));
        assert!(msg.contains('2'));
    }
}
