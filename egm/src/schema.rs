//! Geotag CSV schema validation.

/// Column holding the image identifier.
pub const IMAGE_NAME: &str = "# image name";
/// Column holding latitude in decimal degrees.
pub const LATITUDE: &str = "latitude [decimal degrees]";
/// Column holding longitude in decimal degrees.
pub const LONGITUDE: &str = "longitude [decimal degrees]";
/// Column holding the ellipsoidal height in meters.
pub const ALTITUDE: &str = "altitude [meter]";
/// Column holding horizontal accuracy in meters.
pub const ACCURACY_HORIZONTAL: &str = "accuracy horizontal [meter]";
/// Column holding vertical accuracy in meters.
pub const ACCURACY_VERTICAL: &str = "accuracy vertical [meter]";

/// Columns every geotag dataset must carry, matched exactly and
/// case-sensitively. Column order is not significant and extra columns are
/// allowed.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    IMAGE_NAME,
    LATITUDE,
    LONGITUDE,
    ALTITUDE,
    ACCURACY_HORIZONTAL,
    ACCURACY_VERTICAL,
];

/// A required column absent from a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingColumn {
    /// Name of the dataset the column is missing from.
    pub dataset: String,
    /// The missing column name.
    pub column: String,
}

/// Result of validating a dataset's column set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// All required columns are present.
    Valid,
    /// One finding per missing required column.
    Invalid(Vec<MissingColumn>),
}

impl ValidationOutcome {
    /// Whether the dataset passed validation.
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Check that a dataset's columns contain every required column.
///
/// Pure check with no side effects; reports every missing column, not just
/// the first one.
pub fn validate<'a, I>(dataset: &str, columns: I) -> ValidationOutcome
where
    I: IntoIterator<Item = &'a str>,
{
    let present: Vec<&str> = columns.into_iter().collect();

    let missing: Vec<MissingColumn> = REQUIRED_COLUMNS
        .iter()
        .filter(|required| !present.contains(required))
        .map(|&column| MissingColumn {
            dataset: dataset.to_string(),
            column: column.to_string(),
        })
        .collect();

    if missing.is_empty() {
        ValidationOutcome::Valid
    } else {
        ValidationOutcome::Invalid(missing)
    }
}
