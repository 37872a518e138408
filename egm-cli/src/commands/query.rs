use anyhow::{Context, Result};
use egm::{download::DownloadConfig, GeoidModel, GeoidSourceBuilder};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Serialize)]
struct UndulationResponse {
    lat: f64,
    lon: f64,
    geoid: String,
    undulation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ellipsoidal_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    orthometric_height: Option<f64>,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    data_dir: Option<PathBuf>,
    cache_size: u64,
    auto_download: bool,
    download_url: Option<String>,
    lat: f64,
    lon: f64,
    geoid: GeoidModel,
    ellipsoidal_height: Option<f64>,
    json: bool,
) -> Result<()> {
    // Build the source
    let mut builder = match data_dir {
        Some(dir) => GeoidSourceBuilder::new(dir),
        None => GeoidSourceBuilder::from_env().context(
            "EGM_DATA_DIR environment variable not set. Use --data-dir or set EGM_DATA_DIR",
        )?,
    };

    builder = builder.cache_size(cache_size);

    if auto_download {
        let url = download_url
            .context("Auto-download requires --download-url or EGM_DOWNLOAD_URL")?;
        builder = builder.auto_download(DownloadConfig::with_url_template(url));
    }

    let source = builder.build().context("Failed to create geoid source")?;

    // Sample the undulation
    let grid = source
        .open(geoid)
        .with_context(|| format!("Failed to open {} grid", geoid))?;
    let undulation = grid
        .undulation(lon, lat)
        .context("Failed to get undulation")?;

    let orthometric_height = ellipsoidal_height.map(|h| h - undulation);

    // Output result
    if json {
        let response = UndulationResponse {
            lat,
            lon,
            geoid: geoid.to_string(),
            undulation,
            ellipsoidal_height,
            orthometric_height,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        println!("Undulation ({}): {:.3}m", geoid, undulation);
        if let (Some(ellipsoidal), Some(orthometric)) = (ellipsoidal_height, orthometric_height) {
            println!("Ellipsoidal height: {:.3}m", ellipsoidal);
            println!("Orthometric height: {:.3}m", orthometric);
        }
    }

    Ok(())
}
