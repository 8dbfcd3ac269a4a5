//! Example: Sample elevations through a query envelope.
//!
//! Usage: cargo run --example query_envelope -- <lat> <lon> [pyramid_dir]
//!
//! Without a pyramid directory the store serves a synthetic surface.
//! Set `RUST_LOG=elevpool=debug` to watch tiles load.

use elevpool::{
    GeoExtent, GeoTiffPyramid, HeightField, PoolConfig, Profile, Srs, TileKey, TileStore,
};
use std::env;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Smooth hills standing in for real terrain.
fn synthetic_tile(_key: &TileKey, bounds: &GeoExtent) -> elevpool::Result<HeightField> {
    let step_x = bounds.width() / 32.0;
    let step_y = bounds.height() / 32.0;
    HeightField::from_fn(33, 33, |col, row| {
        let lon = (bounds.xmin + col as f64 * step_x).to_radians();
        let lat = (bounds.ymax - row as f64 * step_y).to_radians();
        (1500.0 + 1200.0 * (lon * 8.0).sin() * (lat * 6.0).cos()) as f32
    })
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <lat> <lon> [pyramid_dir]", args[0]);
        eprintln!("Example: {} 47.6062 -122.3321 ./elevation_cache", args[0]);
        std::process::exit(1);
    }

    let lat: f64 = args[1].parse().expect("Invalid latitude");
    let lon: f64 = args[2].parse().expect("Invalid longitude");

    let config = PoolConfig {
        name: "example".to_string(),
        max_entries: 64,
        ..Default::default()
    };
    let store: Arc<TileStore> = match args.get(3) {
        Some(dir) => {
            println!("Reading tiles from {}", dir);
            TileStore::with_config(Profile::global_geodetic(), GeoTiffPyramid::new(dir), config)
        }
        None => TileStore::with_config(Profile::global_geodetic(), synthetic_tile, config),
    }
    .expect("Invalid store configuration");

    let mut envelope = store.create_envelope(Srs::Geographic, 12);

    println!("\nQuerying elevation at ({}, {})...", lat, lon);
    let query_start = Instant::now();
    let sample = envelope.elevation_and_resolution(lon, lat);
    if sample.is_valid() {
        println!(
            "Elevation: {:.2} meters from a {:.6}° tile ({:.3}ms)",
            sample.elevation,
            sample.resolution,
            query_start.elapsed().as_secs_f64() * 1000.0
        );
    } else {
        println!("No data at ({}, {})", lat, lon);
    }

    // Second query is answered from the envelope's tracked tiles
    let query_start = Instant::now();
    let again = envelope.elevation(lon, lat);
    println!(
        "Elevation (cached): {:.2} meters ({:.6}s)",
        again,
        query_start.elapsed().as_secs_f64()
    );

    // Profile 10km east along the parallel
    let end_lon = lon + 10_000.0 / (111_320.0 * lat.to_radians().cos().max(1e-6));
    println!("\nProfile to ({}, {:.4}):", lat, end_lon);
    for (distance, sample) in envelope.sample_line((lon, lat), (end_lon, lat), 6) {
        if sample.is_valid() {
            println!("  {:>8.1} m  {:>8.2} m", distance, sample.elevation);
        } else {
            println!("  {:>8.1} m  no data", distance);
        }
    }

    let points: Vec<(f64, f64)> = (0..100)
        .map(|i| (lon + i as f64 * 0.001, lat))
        .collect();
    if let Some((lo, hi)) = envelope.elevation_extrema(&points) {
        println!("\nRange over {} points: {:.2} to {:.2} meters", points.len(), lo, hi);
    }

    println!("\nTracked tiles, finest first:");
    for record in envelope.query_set().iter() {
        println!("  {} {:?}", record.key(), record.status());
    }

    let stats = store.stats();
    println!(
        "\nStore: {} of {} entries, {} loads, {} failures, {} hits",
        stats.entries, stats.max_entries, stats.loads, stats.failures, stats.hits
    );
}
