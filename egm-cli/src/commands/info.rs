use anyhow::{bail, Context, Result};
use egm::{GeoidGrid, GeoidModel, NO_DATA_VALUE};
use std::path::PathBuf;

pub fn run(data_dir: Option<PathBuf>, geoid: GeoidModel) -> Result<()> {
    let grid_path = get_grid_path(data_dir, geoid)?;

    if !grid_path.exists() {
        bail!("Grid not found: {}", grid_path.display());
    }

    let grid = GeoidGrid::from_file(&grid_path).context("Failed to load grid")?;

    // Get file metadata
    let metadata = std::fs::metadata(&grid_path)?;
    let file_size = metadata.len();

    // Scan the whole raster for undulation range and no-data cells
    let (mut min_und, mut max_und) = (f32::MAX, f32::MIN);
    let mut no_data_count = 0u64;

    for value in grid.values() {
        if value == NO_DATA_VALUE {
            no_data_count += 1;
        } else {
            min_und = min_und.min(value);
            max_und = max_und.max(value);
        }
    }

    // Display information
    println!("Model: {}", grid.model());
    println!("Path: {}", grid_path.display());
    println!();
    println!(
        "Resolution: {} arc-minute ({}x{} cells)",
        grid.model().resolution_arc_minutes(),
        grid.rows(),
        grid.cols()
    );
    println!("Coverage: global (90N-90S, 180W-180E)");
    println!("File size: {}", format_size(file_size));
    println!();

    if min_und <= max_und {
        println!("Min undulation: {:.3}m", min_und);
        println!("Max undulation: {:.3}m", max_und);
    }

    let total_cells = (grid.rows() * grid.cols()) as u64;
    if no_data_count > 0 {
        let no_data_pct = (no_data_count as f64 / total_cells as f64) * 100.0;
        println!("No-data cells: {} ({:.1}%)", no_data_count, no_data_pct);
    }

    Ok(())
}

fn get_grid_path(data_dir: Option<PathBuf>, geoid: GeoidModel) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir.join(geoid.grid_file_name())),
        None => {
            let dir = std::env::var("EGM_DATA_DIR").context(
                "EGM_DATA_DIR environment variable not set. Use --data-dir or set EGM_DATA_DIR",
            )?;
            Ok(PathBuf::from(dir).join(geoid.grid_file_name()))
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
