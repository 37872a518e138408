//! Basic example demonstrating egm library usage.
//!
//! Run with: cargo run --example basic -- /path/to/egm/grids

use egm::{GeoidError, GeoidModel, GeoidSource};
use std::env;

fn main() -> Result<(), GeoidError> {
    // Get data directory from command line
    let data_dir = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: cargo run --example basic -- /path/to/egm/grids");
        std::process::exit(1);
    });

    let source = GeoidSource::new(&data_dir);

    // Query some well-known locations
    let locations = [
        ("Bern, Switzerland", 46.9480, 7.4474),
        ("Lima, Peru", -12.0464, -77.0428),
        ("Mount Everest, Nepal", 27.9881, 86.9250),
    ];

    for model in GeoidModel::ALL {
        println!("\n{} undulations (nearest cell):", model);
        println!("{:-<50}", "");

        let grid = match source.open(model) {
            Ok(grid) => grid,
            Err(GeoidError::ResourceUnavailable { .. }) => {
                println!("  grid not available locally");
                continue;
            }
            Err(e) => return Err(e),
        };

        for (name, lat, lon) in &locations {
            match grid.undulation(*lon, *lat) {
                Ok(undulation) => println!("  {}: {:.3}m", name, undulation),
                Err(e) => println!("  {}: error - {}", name, e),
            }
        }
    }

    // Show cache statistics
    let stats = source.cache_stats();
    println!("\nCache statistics:");
    println!("  Cached grids: {}", stats.entry_count);
    println!("  Hits: {}", stats.hit_count);
    println!("  Misses: {}", stats.miss_count);
    println!("  Hit rate: {:.1}%", stats.hit_rate() * 100.0);

    Ok(())
}
