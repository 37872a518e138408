//! Supported geoid models.
//!
//! Each model binds a grid resource name to a fixed output column label.
//! The grid resource is resolved against a configured data directory or
//! download URL by [`GeoidSource`](crate::source::GeoidSource); nothing in
//! the conversion pipeline depends on where the grid actually lives.

use std::fmt;
use std::str::FromStr;

/// A supported global geoid model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoidModel {
    /// EGM96, distributed as a 15-arc-minute undulation grid.
    Egm96,
    /// EGM2008, distributed as a 1-arc-minute undulation grid.
    Egm2008,
}

impl GeoidModel {
    /// All supported models, in release order.
    pub const ALL: [GeoidModel; 2] = [GeoidModel::Egm96, GeoidModel::Egm2008];

    /// File name of the grid resource for this model.
    pub fn grid_file_name(&self) -> &'static str {
        match self {
            GeoidModel::Egm96 => "egm96_15.egm",
            GeoidModel::Egm2008 => "egm2008_1.egm",
        }
    }

    /// Label of the orthometric height column written by the converter.
    pub fn output_column(&self) -> &'static str {
        match self {
            GeoidModel::Egm96 => "orthometric height egm96 [meters]",
            GeoidModel::Egm2008 => "orthometric height egm2008 [meters]",
        }
    }

    /// Grid resolution in arc-minutes.
    pub fn resolution_arc_minutes(&self) -> f64 {
        match self {
            GeoidModel::Egm96 => 15.0,
            GeoidModel::Egm2008 => 1.0,
        }
    }
}

impl fmt::Display for GeoidModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoidModel::Egm96 => write!(f, "EGM96"),
            GeoidModel::Egm2008 => write!(f, "EGM2008"),
        }
    }
}

impl FromStr for GeoidModel {
    type Err = String;

    /// Parse a model name. Accepts the forms "egm96", "egm 96", "egm2008",
    /// "egm 2008", case-insensitive.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "egm96" => Ok(GeoidModel::Egm96),
            "egm2008" => Ok(GeoidModel::Egm2008),
            _ => Err(format!(
                "unknown geoid model '{}' (expected egm96 or egm2008)",
                s
            )),
        }
    }
}
