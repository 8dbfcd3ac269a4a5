//! End-to-end sampling through query envelopes.

mod common;

use approx::assert_relative_eq;
use common::{logged_store, not_found, plane, plane_store, plane_tile};
use elevpool::{
    ElevationEnvelope, GeoExtent, GeoTiffPyramid, HeightField, PoolConfig, Profile, Srs, TileKey,
    TileStore, MERCATOR_HALF_EXTENT, NO_DATA_VALUE,
};
use std::sync::{Arc, Barrier};
use std::thread;
use tiff::encoder::{colortype, TiffEncoder};

#[test]
fn test_samples_target_lod() {
    let (store, _) = plane_store(32);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    let sample = envelope.elevation_and_resolution(1.5, 1.5);
    assert_relative_eq!(sample.elevation, plane(1.5, 1.5), epsilon = 1e-4);
    assert_relative_eq!(sample.resolution, 0.25);
    assert_eq!(envelope.query_set().len(), 1);
    assert!(envelope.query_set().contains(&TileKey::new(2, 1, 2)));
}

#[test]
fn test_falls_back_to_coarser_lod() {
    let (store, log) = logged_store(32, |key, _| {
        if key.lod == 2 {
            Err(not_found(key))
        } else {
            HeightField::filled(5, 5, 100.0 * key.lod as f32)
        }
    });
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    let sample = envelope.elevation_and_resolution(1.5, 1.5);
    assert_relative_eq!(sample.elevation, 100.0);
    assert_relative_eq!(sample.resolution, 0.5);

    // The walk stops at LOD 1; the root is never requested.
    assert_eq!(log.count(&TileKey::new(0, 0, 0)), 0);
    assert_eq!(envelope.query_set().len(), 2);
}

#[test]
fn test_no_data_outside_extent() {
    let (store, log) = plane_store(32);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    assert_eq!(envelope.elevation(-1.0, 2.0), NO_DATA_VALUE);
    assert_eq!(envelope.elevation(2.0, 4.5), NO_DATA_VALUE);
    assert!(!envelope.elevation_and_resolution(f64::NAN, 1.0).is_valid());
    assert_eq!(log.total(), 0);
    assert!(envelope.query_set().is_empty());
}

#[test]
fn test_no_data_when_every_level_fails() {
    let (store, _) = logged_store(32, |key, _| Err(not_found(key)));
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    let sample = envelope.elevation_and_resolution(3.0, 3.0);
    assert_eq!(sample.elevation, NO_DATA_VALUE);
    assert_eq!(sample.resolution, 0.0);
    // The whole lineage was visited.
    assert_eq!(envelope.query_set().len(), 3);
}

#[test]
fn test_repeated_query_is_identical() {
    let (store, log) = plane_store(32);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    let first = envelope.elevation(0.7, 3.2);
    for _ in 0..10 {
        assert_eq!(envelope.elevation(0.7, 3.2).to_bits(), first.to_bits());
    }
    assert_eq!(log.total(), 1);
}

#[test]
fn test_extrema_skips_no_data() {
    let (store, _) = logged_store(32, |key, bounds| {
        if key.lod < 2 || *key == TileKey::new(2, 2, 2) {
            Err(not_found(key))
        } else {
            Ok(plane_tile(bounds, 5))
        }
    });
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    let (lo, hi) = envelope
        .elevation_extrema(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)])
        .unwrap();
    assert_relative_eq!(lo, 10.0, epsilon = 1e-4);
    assert_relative_eq!(hi, 20.0, epsilon = 1e-4);

    assert_eq!(envelope.elevation_extrema(&[(2.0, 2.0), (9.0, 9.0)]), None);
    assert_eq!(envelope.elevation_extrema(&[]), None);
}

#[test]
fn test_batch_elevations() {
    let (store, _) = plane_store(32);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);
    let points = [(0.5, 0.5), (10.0, 0.0), (3.5, 2.25), (0.0, -3.0)];
    let mut output = vec![1.0; 9];

    let valid = envelope.elevations(&points, &mut output);

    assert_eq!(valid, 2);
    assert_eq!(output.len(), points.len());
    assert_relative_eq!(output[0], plane(0.5, 0.5), epsilon = 1e-4);
    assert_eq!(output[1], NO_DATA_VALUE);
    assert_relative_eq!(output[2], plane(3.5, 2.25), epsilon = 1e-4);
    assert_eq!(output[3], NO_DATA_VALUE);
}

#[test]
fn test_query_set_grows_lazily() {
    let (store, log) = plane_store(32);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);

    envelope.elevation(0.5, 3.5);
    envelope.elevation(0.6, 3.4);
    assert_eq!(envelope.query_set().len(), 1);

    envelope.elevation(3.5, 0.5);
    assert_eq!(envelope.query_set().len(), 2);
    assert_eq!(log.total(), 2);

    envelope.clear();
    assert!(envelope.query_set().is_empty());
    // Cleared tiles are still cached by the store.
    envelope.elevation(0.5, 3.5);
    assert_eq!(log.total(), 2);
}

#[test]
fn test_in_progress_tile_falls_back_then_refines() {
    let entered = Arc::new(Barrier::new(2));
    let release = Arc::new(Barrier::new(2));
    let target = TileKey::new(2, 1, 2);

    let (store, log) = {
        let entered = Arc::clone(&entered);
        let release = Arc::clone(&release);
        logged_store(32, move |key, bounds| {
            if *key == target {
                entered.wait();
                release.wait();
            }
            Ok(plane_tile(bounds, 5))
        })
    };

    let loader = {
        let store = Arc::clone(&store);
        thread::spawn(move || store.try_tile(&target).map(|(_, ready)| ready))
    };
    entered.wait();

    let mut envelope = store.create_envelope(Srs::Geographic, 2);
    let coarse = envelope.elevation_and_resolution(1.5, 1.5);
    assert_relative_eq!(coarse.elevation, plane(1.5, 1.5), epsilon = 1e-4);
    assert_relative_eq!(coarse.resolution, 0.5);

    release.wait();
    assert_eq!(loader.join().unwrap(), Some(true));

    let fine = envelope.elevation_and_resolution(1.5, 1.5);
    assert_relative_eq!(fine.resolution, 0.25);
    assert_eq!(log.count(&target), 1);
}

#[test]
fn test_envelopes_share_one_store() {
    let (store, log) = plane_store(64);

    thread::scope(|s| {
        for t in 0..6 {
            let store = &store;
            s.spawn(move || {
                let mut envelope = ElevationEnvelope::new(store, Srs::Geographic, 2);
                for i in 0..40 {
                    let x = ((i * 7 + t) % 40) as f64 * 0.1;
                    let y = ((i * 3 + t * 5) % 40) as f64 * 0.1;
                    let elevation = envelope.elevation(x, y);
                    assert_relative_eq!(elevation, plane(x, y), epsilon = 1e-3);
                }
            });
        }
    });

    assert_eq!(log.max_per_key(), 1);
}

#[test]
fn test_envelope_outlives_store() {
    let (store, _) = plane_store(8);
    let mut envelope = store.create_envelope(Srs::Geographic, 2);
    assert!(envelope.elevation_and_resolution(1.0, 1.0).is_valid());

    drop(store);
    assert_eq!(envelope.elevation(1.0, 1.0), NO_DATA_VALUE);
}

#[test]
fn test_mercator_store_rejects_polar_points() {
    let loader = |_: &TileKey, _: &GeoExtent| HeightField::filled(5, 5, 7.0);
    let store = TileStore::new(Profile::spherical_mercator(), loader);
    let mut envelope = store.create_envelope(Srs::Geographic, 3);

    assert_eq!(envelope.elevation(10.0, 45.0), 7.0);
    assert_eq!(envelope.elevation(-170.0, -85.0), 7.0);
    assert_eq!(envelope.elevation(10.0, 89.0), NO_DATA_VALUE);
    assert_eq!(envelope.elevation(10.0, 90.0), NO_DATA_VALUE);
    assert_eq!(envelope.elevation(10.0, -86.0), NO_DATA_VALUE);

    let mut output = Vec::new();
    let valid = envelope.elevations(&[(0.0, 0.0), (0.0, 88.0)], &mut output);
    assert_eq!(valid, 1);
    assert_eq!(output[1], NO_DATA_VALUE);
}

#[test]
fn test_mercator_envelope_on_mercator_store() {
    let store = TileStore::new(Profile::spherical_mercator(), |key: &TileKey, _: &GeoExtent| {
        HeightField::filled(3, 3, key.lod as f32)
    });
    let mut envelope = store.create_envelope(Srs::SphericalMercator, 4);

    let sample = envelope.elevation_and_resolution(1_000_000.0, -2_000_000.0);
    assert_eq!(sample.elevation, 4.0);
    // 2 * half extent / 16 tiles / 2 post intervals.
    assert_relative_eq!(sample.resolution, MERCATOR_HALF_EXTENT / 16.0, epsilon = 1e-6);
    assert!(!envelope.elevation_and_resolution(MERCATOR_HALF_EXTENT * 1.01, 0.0).is_valid());
}

#[test]
fn test_sample_line_geographic() {
    let loader = |_: &TileKey, _: &GeoExtent| HeightField::filled(3, 3, 42.0);
    let store = TileStore::new(Profile::global_geodetic(), loader);
    let mut envelope = store.create_envelope(Srs::Geographic, 1);

    let samples = envelope.sample_line((0.0, 0.0), (1.0, 0.0), 3);
    assert_eq!(samples.len(), 3);
    assert_relative_eq!(samples[0].0, 0.0);
    // One degree of longitude on the equator.
    assert_relative_eq!(samples[2].0, 111_195.0, epsilon = 1.0);
    assert!(samples.iter().all(|(_, s)| s.elevation == 42.0));
}

#[test]
fn test_geotiff_pyramid_falls_back_to_root() {
    let dir = tempfile::tempdir().unwrap();
    let pyramid = GeoTiffPyramid::new(dir.path());

    let root = pyramid.tile_path(&TileKey::new(0, 0, 0));
    std::fs::create_dir_all(root.parent().unwrap()).unwrap();
    let data: Vec<f32> = (0..9).map(|i| i as f32 * 10.0).collect();
    let file = std::fs::File::create(&root).unwrap();
    TiffEncoder::new(file)
        .unwrap()
        .write_image::<colortype::Gray32Float>(3, 3, &data)
        .unwrap();

    let config = PoolConfig {
        name: "geotiff".to_string(),
        ..Default::default()
    };
    let store = TileStore::with_config(common::local_profile(), pyramid, config).unwrap();
    let mut envelope = store.create_envelope(Srs::Geographic, 3);

    // North-west corner post, then the center post.
    assert_relative_eq!(envelope.elevation(0.0, 4.0), 0.0);
    let center = envelope.elevation_and_resolution(2.0, 2.0);
    assert_relative_eq!(center.elevation, 40.0, epsilon = 1e-4);
    assert_relative_eq!(center.resolution, 2.0);
    assert_eq!(store.stats().failures, 6);
}
