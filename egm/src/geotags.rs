//! Geotag dataset ingestion and serialization.
//!
//! A [`GeotagDataset`] is an ordered sequence of geotag records plus the
//! source name used for output file naming. Rows are kept as raw
//! [`csv::StringRecord`]s so columns beyond the required schema pass through
//! byte-for-byte, and row order is preserved end-to-end.

use std::io::Read;

use csv::StringRecord;

use crate::error::{GeoidError, Result};
use crate::schema;

/// One ingested geotag table.
#[derive(Debug, Clone)]
pub struct GeotagDataset {
    /// Source name (e.g. the uploaded file name), used for output naming.
    name: String,
    /// Header record.
    headers: StringRecord,
    /// Data rows, in input order.
    rows: Vec<StringRecord>,
}

impl GeotagDataset {
    /// Read a dataset from CSV content.
    ///
    /// No schema validation happens here; ingestion and validation are
    /// separate pipeline stages.
    pub fn from_reader<R: Read>(name: impl Into<String>, reader: R) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers()?.clone();
        let rows = rdr.records().collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            headers,
            rows,
        })
    }

    /// Assemble a dataset from already-parsed parts. Used by the converter
    /// to produce results without re-serializing through CSV.
    pub(crate) fn from_parts(name: String, headers: StringRecord, rows: Vec<StringRecord>) -> Self {
        Self {
            name,
            headers,
            rows,
        }
    }

    /// The dataset's source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The header record.
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// The data rows, in input order.
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header record, if present.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Column index or a single-column missing-column error.
    pub(crate) fn require_column(&self, column: &str) -> Result<usize> {
        self.column_index(column)
            .ok_or_else(|| GeoidError::MissingColumns {
                dataset: self.name.clone(),
                missing: vec![column.to_string()],
            })
    }

    /// Parse a float field of a row.
    pub(crate) fn parse_field(&self, row: usize, idx: usize, column: &str) -> Result<f64> {
        self.rows[row]
            .get(idx)
            .and_then(|v| v.trim().parse().ok())
            .ok_or_else(|| GeoidError::InvalidValue {
                dataset: self.name.clone(),
                row,
                column: column.to_string(),
            })
    }

    /// Extract the (lon, lat) query points, one per record, in record order.
    ///
    /// Enforces the coordinate invariant: latitude within [-90, 90],
    /// longitude within [-180, 180].
    pub fn points(&self) -> Result<Vec<(f64, f64)>> {
        let lat_idx = self.require_column(schema::LATITUDE)?;
        let lon_idx = self.require_column(schema::LONGITUDE)?;

        let mut points = Vec::with_capacity(self.rows.len());
        for row in 0..self.rows.len() {
            let lat = self.parse_field(row, lat_idx, schema::LATITUDE)?;
            let lon = self.parse_field(row, lon_idx, schema::LONGITUDE)?;

            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(GeoidError::InvalidCoordinate {
                    dataset: self.name.clone(),
                    row,
                    lat,
                    lon,
                });
            }

            points.push((lon, lat));
        }

        Ok(points)
    }

    /// Extract the ellipsoidal heights, one per record, in record order.
    pub fn ellipsoidal_heights(&self) -> Result<Vec<f64>> {
        let alt_idx = self.require_column(schema::ALTITUDE)?;

        (0..self.rows.len())
            .map(|row| self.parse_field(row, alt_idx, schema::ALTITUDE))
            .collect()
    }

    /// The dataset name up to the first `.`, used to derive output names.
    pub fn basename(&self) -> &str {
        self.name.split('.').next().unwrap_or(&self.name)
    }

    /// Name of the output artifact derived from this dataset.
    pub fn output_name(&self) -> String {
        format!("{}_orthometric.csv", self.basename())
    }

    /// Serialize the dataset back to CSV bytes.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        {
            let mut wtr = csv::Writer::from_writer(&mut buf);
            wtr.write_record(&self.headers)?;
            for row in &self.rows {
                wtr.write_record(row)?;
            }
            wtr.flush()?;
        }
        Ok(buf)
    }
}
