use anyhow::Result;
use clap::{Parser, Subcommand};
use egm::GeoidModel;
use std::path::PathBuf;

mod commands;

/// Geoid undulation and height conversion CLI tool
#[derive(Parser)]
#[command(name = "egm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory containing .egm grid files
    #[arg(short, long, env = "EGM_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Maximum grids in cache
    #[arg(
        short,
        long,
        env = "EGM_CACHE_SIZE",
        default_value = "2",
        global = true
    )]
    cache_size: u64,

    /// Enable automatic grid download
    #[arg(short, long, global = true)]
    auto_download: bool,

    /// Download URL template ({grid} and {model} placeholders)
    #[arg(long, env = "EGM_DOWNLOAD_URL", global = true)]
    download_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert geotag CSV files to orthometric heights
    Convert {
        /// Input geotag CSV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Geoid model (egm96 or egm2008)
        #[arg(short, long, default_value = "egm96")]
        geoid: GeoidModel,

        /// Output directory (current directory if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query the geoid undulation at a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Geoid model (egm96 or egm2008)
        #[arg(short, long, default_value = "egm96")]
        geoid: GeoidModel,

        /// Ellipsoidal height to convert to orthometric
        #[arg(short, long)]
        ellipsoidal_height: Option<f64>,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Display information about a geoid grid
    Info {
        /// Geoid model (egm96 or egm2008)
        #[arg(short, long, default_value = "egm96")]
        geoid: GeoidModel,
    },

    /// List available geoid grids
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            inputs,
            geoid,
            output,
        } => commands::convert::run(
            cli.data_dir,
            cli.cache_size,
            cli.auto_download,
            cli.download_url,
            inputs,
            geoid,
            output,
        ),
        Commands::Query {
            lat,
            lon,
            geoid,
            ellipsoidal_height,
            json,
        } => commands::query::run(
            cli.data_dir,
            cli.cache_size,
            cli.auto_download,
            cli.download_url,
            lat,
            lon,
            geoid,
            ellipsoidal_height,
            json,
        ),
        Commands::Info { geoid } => commands::info::run(cli.data_dir, geoid),
        Commands::List => commands::list::run(cli.data_dir),
    }
}
