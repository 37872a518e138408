//! Ellipsoidal-to-orthometric height conversion.
//!
//! For each record `i`, `orthometric[i] = ellipsoidal[i] - undulation[i]`.
//! The altitude column is replaced and relabeled to the model-specific
//! output column; every other column and the row order pass through
//! unchanged. The input dataset is never mutated.

use csv::StringRecord;

use crate::error::{GeoidError, Result};
use crate::geotags::GeotagDataset;
use crate::model::GeoidModel;
use crate::schema;

/// Apply the height conversion to a dataset.
///
/// `undulations` must hold exactly one value per record, where the value at
/// index `i` was sampled at record `i`'s (lon, lat).
///
/// # Errors
///
/// Returns [`GeoidError::ShapeMismatch`] if the undulation count doesn't
/// match the record count, and [`GeoidError::InvalidValue`] if an altitude
/// field cannot be parsed.
pub fn convert(
    dataset: &GeotagDataset,
    undulations: &[f64],
    model: GeoidModel,
) -> Result<GeotagDataset> {
    if undulations.len() != dataset.len() {
        return Err(GeoidError::ShapeMismatch {
            dataset: dataset.name().to_string(),
            records: dataset.len(),
            values: undulations.len(),
        });
    }

    let alt_idx = dataset.require_column(schema::ALTITUDE)?;

    let headers: StringRecord = dataset
        .headers()
        .iter()
        .enumerate()
        .map(|(i, h)| if i == alt_idx { model.output_column() } else { h })
        .collect();

    let mut rows = Vec::with_capacity(dataset.len());
    for (row, undulation) in undulations.iter().enumerate() {
        let ellipsoidal = dataset.parse_field(row, alt_idx, schema::ALTITUDE)?;
        // Shortest round-trip formatting, so parsing the output reproduces
        // the computed value exactly.
        let orthometric = (ellipsoidal - undulation).to_string();

        let record: StringRecord = dataset.rows()[row]
            .iter()
            .enumerate()
            .map(|(i, v)| if i == alt_idx { orthometric.as_str() } else { v })
            .collect();
        rows.push(record);
    }

    Ok(GeotagDataset::from_parts(
        dataset.name().to_string(),
        headers,
        rows,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CSV: &str = "\
# image name,latitude [decimal degrees],longitude [decimal degrees],altitude [meter],accuracy horizontal [meter],accuracy vertical [meter]
IMG_0001.JPG,46.9,7.4,598.2,0.02,0.04
IMG_0002.JPG,46.901,7.401,598.5,0.02,0.04
IMG_0003.JPG,46.902,7.402,599.1,0.03,0.05
";

    fn sample_dataset() -> GeotagDataset {
        GeotagDataset::from_reader("flight1.csv", SAMPLE_CSV.as_bytes()).unwrap()
    }

    #[test]
    fn test_conversion_arithmetic() {
        let ds = sample_dataset();
        let undulations = vec![47.3, 47.31, 47.32];
        let result = convert(&ds, &undulations, GeoidModel::Egm96).unwrap();

        let heights = ds.ellipsoidal_heights().unwrap();
        let out_idx = result
            .column_index("orthometric height egm96 [meters]")
            .unwrap();

        for (i, row) in result.rows().iter().enumerate() {
            let orthometric: f64 = row.get(out_idx).unwrap().parse().unwrap();
            assert_eq!(orthometric, heights[i] - undulations[i]);
        }
    }

    #[test]
    fn test_header_relabeled_in_place() {
        let ds = sample_dataset();
        let result = convert(&ds, &[47.3, 47.31, 47.32], GeoidModel::Egm2008).unwrap();

        // Same position as the original altitude column
        assert_eq!(
            result.headers().get(3),
            Some("orthometric height egm2008 [meters]")
        );
        assert!(result.column_index("altitude [meter]").is_none());
    }

    #[test]
    fn test_other_columns_pass_through() {
        let ds = sample_dataset();
        let result = convert(&ds, &[47.3, 47.31, 47.32], GeoidModel::Egm96).unwrap();

        assert_eq!(result.len(), ds.len());
        for (before, after) in ds.rows().iter().zip(result.rows()) {
            for idx in [0usize, 1, 2, 4, 5] {
                assert_eq!(before.get(idx), after.get(idx));
            }
        }
    }

    #[test]
    fn test_input_dataset_untouched() {
        let ds = sample_dataset();
        let _ = convert(&ds, &[47.3, 47.31, 47.32], GeoidModel::Egm96).unwrap();

        assert_eq!(ds.headers().get(3), Some("altitude [meter]"));
        assert_eq!(ds.rows()[0].get(3), Some("598.2"));
    }

    #[test]
    fn test_shape_mismatch() {
        let ds = sample_dataset();
        let err = convert(&ds, &[47.3, 47.31], GeoidModel::Egm96).unwrap_err();
        assert!(matches!(
            err,
            GeoidError::ShapeMismatch {
                records: 3,
                values: 2,
                ..
            }
        ));
    }
}
