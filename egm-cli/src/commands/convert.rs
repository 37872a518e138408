use anyhow::{Context, Result};
use egm::{download::DownloadConfig, BatchPipeline, GeoidModel, GeoidSourceBuilder};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

pub fn run(
    data_dir: Option<PathBuf>,
    cache_size: u64,
    auto_download: bool,
    download_url: Option<String>,
    inputs: Vec<PathBuf>,
    geoid: GeoidModel,
    output: Option<PathBuf>,
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

    // Ingest all inputs in the order given
    let mut pipeline = BatchPipeline::new();
    for input in &inputs {
        let name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .with_context(|| format!("Invalid input path: {}", input.display()))?;
        let file =
            File::open(input).with_context(|| format!("Failed to open {}", input.display()))?;
        pipeline
            .ingest_reader(name, BufReader::new(file))
            .with_context(|| format!("Failed to read {}", input.display()))?;
    }

    let record_count: usize = pipeline.datasets().iter().map(|d| d.len()).sum();

    pipeline
        .validate()
        .context("Schema validation failed; no file was converted")?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(format!(
        "Converting {} records against {}...",
        record_count, geoid
    ));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    pipeline
        .convert(&source, geoid)
        .with_context(|| format!("Conversion against {} failed", geoid))?;
    pb.finish_with_message("done");

    let artifact = pipeline.export().context("Export failed")?;

    // Write the artifact
    let output_dir = output.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let output_path = output_dir.join(artifact.file_name());
    std::fs::write(&output_path, artifact.bytes())
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    println!("Converted {} records against {}", record_count, geoid);
    println!("Output written to: {}", output_path.display());
    Ok(())
}
