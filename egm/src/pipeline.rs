//! Batch conversion pipeline.
//!
//! [`BatchPipeline`] orchestrates validation, sampling, conversion, and
//! export across any number of ingested datasets. A pipeline is constructed
//! fresh per conversion run and walks an explicit state machine:
//!
//! ```text
//! Empty -> Ingested -> Validated -> Converted -> Exported
//!                \           \
//!                 `-> Failed <´ (validation or conversion/export failure)
//! ```
//!
//! The batch is atomic: a schema failure in any dataset halts the whole
//! batch before any conversion, and a sampling or export failure never
//! leaves a partial artifact behind.

use std::io::{Cursor, Read, Write};

use crate::convert;
use crate::error::{GeoidError, Result};
use crate::geotags::GeotagDataset;
use crate::model::GeoidModel;
use crate::schema::{self, ValidationOutcome};
use crate::source::GeoidSource;

/// File name of the archive artifact produced for multi-dataset batches.
const ARCHIVE_NAME: &str = "Converted_CSV.zip";

/// Where a [`BatchPipeline`] currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchState {
    /// No datasets ingested yet.
    Empty,
    /// All input datasets loaded, none processed.
    Ingested,
    /// Schema check passed for every dataset in the batch.
    Validated,
    /// Every dataset sampled and converted under the selected model.
    Converted,
    /// Results serialized into an output artifact.
    Exported,
    /// Terminal failure; the batch produced no output.
    Failed,
}

/// The serialized output of a batch run.
#[derive(Debug, Clone)]
pub enum ExportArtifact {
    /// A single converted dataset as one CSV file.
    Csv { file_name: String, bytes: Vec<u8> },
    /// Two or more converted datasets bundled into one zip archive.
    Archive { file_name: String, bytes: Vec<u8> },
}

impl ExportArtifact {
    /// Suggested file name for the artifact.
    pub fn file_name(&self) -> &str {
        match self {
            ExportArtifact::Csv { file_name, .. } => file_name,
            ExportArtifact::Archive { file_name, .. } => file_name,
        }
    }

    /// The artifact's content.
    pub fn bytes(&self) -> &[u8] {
        match self {
            ExportArtifact::Csv { bytes, .. } => bytes,
            ExportArtifact::Archive { bytes, .. } => bytes,
        }
    }

    /// Consume the artifact, returning its content.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            ExportArtifact::Csv { bytes, .. } => bytes,
            ExportArtifact::Archive { bytes, .. } => bytes,
        }
    }

    /// Whether the artifact is a zip archive.
    pub fn is_archive(&self) -> bool {
        matches!(self, ExportArtifact::Archive { .. })
    }
}

/// Orchestrates one batch conversion run.
///
/// # Example
///
/// ```ignore
/// use egm::{BatchPipeline, GeoidModel, GeoidSource};
///
/// let source = GeoidSource::new("/data/geoids");
/// let mut pipeline = BatchPipeline::new();
///
/// pipeline.ingest_reader("flight1.csv", file)?;
/// pipeline.validate()?;
/// pipeline.convert(&source, GeoidModel::Egm96)?;
/// let artifact = pipeline.export()?;
///
/// std::fs::write(artifact.file_name(), artifact.bytes())?;
/// ```
pub struct BatchPipeline {
    datasets: Vec<GeotagDataset>,
    results: Vec<GeotagDataset>,
    state: BatchState,
}

impl BatchPipeline {
    /// Create an empty pipeline. No state survives from earlier runs.
    pub fn new() -> Self {
        Self {
            datasets: Vec::new(),
            results: Vec::new(),
            state: BatchState::Empty,
        }
    }

    /// The pipeline's current state.
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// The ingested datasets, in input order.
    pub fn datasets(&self) -> &[GeotagDataset] {
        &self.datasets
    }

    /// The conversion results, in input order. Empty before `Converted`.
    pub fn results(&self) -> &[GeotagDataset] {
        &self.results
    }

    fn expect_state(&self, expected: BatchState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(GeoidError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    /// Ingest a dataset read from CSV content.
    pub fn ingest_reader<R: Read>(&mut self, name: impl Into<String>, reader: R) -> Result<()> {
        let dataset = GeotagDataset::from_reader(name, reader)?;
        self.ingest(dataset)
    }

    /// Ingest an already-parsed dataset. Input order is processing order.
    pub fn ingest(&mut self, dataset: GeotagDataset) -> Result<()> {
        match self.state {
            BatchState::Empty | BatchState::Ingested => {}
            actual => {
                return Err(GeoidError::InvalidState {
                    expected: BatchState::Ingested,
                    actual,
                })
            }
        }

        self.datasets.push(dataset);
        self.state = BatchState::Ingested;
        Ok(())
    }

    /// Validate the schema of every ingested dataset.
    ///
    /// Datasets are checked in input order. The first invalid dataset fails
    /// the whole batch, reporting every column it is missing; no dataset is
    /// converted when any sibling in the batch is invalid.
    pub fn validate(&mut self) -> Result<()> {
        self.expect_state(BatchState::Ingested)?;

        for dataset in &self.datasets {
            if let ValidationOutcome::Invalid(missing) =
                schema::validate(dataset.name(), dataset.headers().iter())
            {
                self.state = BatchState::Failed;
                return Err(GeoidError::MissingColumns {
                    dataset: dataset.name().to_string(),
                    missing: missing.into_iter().map(|m| m.column).collect(),
                });
            }
        }

        self.state = BatchState::Validated;
        Ok(())
    }

    /// Sample and convert every dataset under the selected model.
    ///
    /// The model's grid is opened once and shared across all datasets.
    /// Any error fails the whole batch; no partially-converted state is
    /// observable afterwards.
    pub fn convert(&mut self, source: &GeoidSource, model: GeoidModel) -> Result<()> {
        self.expect_state(BatchState::Validated)?;

        match Self::convert_all(&self.datasets, source, model) {
            Ok(results) => {
                self.results = results;
                self.state = BatchState::Converted;
                Ok(())
            }
            Err(e) => {
                self.state = BatchState::Failed;
                Err(e)
            }
        }
    }

    fn convert_all(
        datasets: &[GeotagDataset],
        source: &GeoidSource,
        model: GeoidModel,
    ) -> Result<Vec<GeotagDataset>> {
        let grid = source.open(model)?;

        datasets
            .iter()
            .map(|dataset| {
                let points = dataset.points()?;
                let undulations = grid.sample(&points)?;
                convert::convert(dataset, &undulations, model)
            })
            .collect()
    }

    /// Serialize the conversion results into an output artifact.
    ///
    /// One dataset yields a single CSV named `<basename>_orthometric.csv`;
    /// two or more are bundled into one zip archive, member order matching
    /// input order.
    pub fn export(&mut self) -> Result<ExportArtifact> {
        self.expect_state(BatchState::Converted)?;

        match self.export_artifact() {
            Ok(artifact) => {
                self.state = BatchState::Exported;
                Ok(artifact)
            }
            Err(e) => {
                self.state = BatchState::Failed;
                Err(e)
            }
        }
    }

    fn export_artifact(&self) -> Result<ExportArtifact> {
        if self.results.len() == 1 {
            let dataset = &self.results[0];
            return Ok(ExportArtifact::Csv {
                file_name: dataset.output_name(),
                bytes: dataset.to_csv_bytes()?,
            });
        }

        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();

        for dataset in &self.results {
            zip.start_file(dataset.output_name(), options)
                .map_err(zip_io_error)?;
            zip.write_all(&dataset.to_csv_bytes()?)?;
        }

        let cursor = zip.finish().map_err(zip_io_error)?;

        Ok(ExportArtifact::Archive {
            file_name: ARCHIVE_NAME.to_string(),
            bytes: cursor.into_inner(),
        })
    }
}

impl Default for BatchPipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn zip_io_error(e: zip::result::ZipError) -> GeoidError {
    GeoidError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
