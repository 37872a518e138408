use anyhow::{Context, Result};
use egm::GeoidModel;
use std::fs;
use std::path::PathBuf;

pub fn run(data_dir: Option<PathBuf>) -> Result<()> {
    let dir = match data_dir {
        Some(dir) => dir,
        None => {
            let dir = std::env::var("EGM_DATA_DIR").context(
                "EGM_DATA_DIR environment variable not set. Use --data-dir or set EGM_DATA_DIR",
            )?;
            PathBuf::from(dir)
        }
    };

    if !dir.exists() {
        anyhow::bail!("Data directory does not exist: {}", dir.display());
    }

    // Collect .egm files
    let mut grids: Vec<_> = fs::read_dir(&dir)
        .context("Failed to read data directory")?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|e| e == "egm")
                .unwrap_or(false)
        })
        .collect();

    if grids.is_empty() {
        println!("No .egm files found in: {}", dir.display());
        return Ok(());
    }

    // Sort by filename
    grids.sort_by_key(|e| e.file_name());

    // Detect model from file size
    const EGM96_SIZE: u64 = 721 * 1440 * 4;
    const EGM2008_SIZE: u64 = 10801 * 21600 * 4;

    let mut known_count = 0;
    let mut unknown_count = 0;
    let mut total_size: u64 = 0;

    println!("{:<20} {:>8} {:>16}", "GRID", "MODEL", "RESOLUTION");
    println!("{}", "-".repeat(46));

    for entry in &grids {
        let filename = entry.file_name();
        let filename_str = filename.to_string_lossy();
        let path = entry.path();

        let metadata = fs::metadata(&path).ok();
        let size = metadata.as_ref().map(|m| m.len()).unwrap_or(0);
        total_size += size;

        let (model, resolution) = match size {
            s if s == EGM96_SIZE => {
                known_count += 1;
                ("EGM96", "15 arc-minute")
            }
            s if s == EGM2008_SIZE => {
                known_count += 1;
                ("EGM2008", "1 arc-minute")
            }
            _ => {
                unknown_count += 1;
                ("???", "unknown")
            }
        };

        println!("{:<20} {:>8} {:>16}", filename_str, model, resolution);
    }

    // Summary
    println!();
    println!("Summary:");
    println!("  Total grids: {}", grids.len());
    if unknown_count > 0 {
        println!("  Unrecognized: {}", unknown_count);
    }
    let missing: Vec<_> = GeoidModel::ALL
        .into_iter()
        .filter(|m| !dir.join(m.grid_file_name()).exists())
        .map(|m| m.to_string())
        .collect();
    if known_count > 0 && !missing.is_empty() {
        println!("  Not present: {}", missing.join(", "));
    }
    println!("  Total size: {}", format_size(total_size));
    println!("  Data directory: {}", dir.display());

    Ok(())
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
