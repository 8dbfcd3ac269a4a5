//! Shared fixtures for the elevpool integration tests.

#![allow(dead_code)]

use elevpool::{GeoExtent, HeightField, PoolConfig, PoolError, Profile, Srs, TileKey, TileStore};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A 4x4 unit dataset with a single root tile.
///
/// LOD 1 tiles are 2 units wide, LOD 2 tiles are 1 unit wide.
pub fn local_profile() -> Profile {
    Profile::new(Srs::Geographic, GeoExtent::new(0.0, 0.0, 4.0, 4.0), 1, 1).unwrap()
}

/// Elevation surface shared by every LOD of the test dataset.
pub fn plane(x: f64, y: f64) -> f32 {
    (10.0 + 5.0 * x + 5.0 * y) as f32
}

/// Heightfield sampling [`plane`] at `posts x posts` posts over `bounds`.
pub fn plane_tile(bounds: &GeoExtent, posts: u32) -> HeightField {
    let step_x = bounds.width() / (posts - 1) as f64;
    let step_y = bounds.height() / (posts - 1) as f64;
    HeightField::from_fn(posts, posts, |col, row| {
        plane(
            bounds.xmin + col as f64 * step_x,
            bounds.ymax - row as f64 * step_y,
        )
    })
    .unwrap()
}

pub fn not_found(key: &TileKey) -> PoolError {
    PoolError::TileNotFound {
        lod: key.lod,
        x: key.x,
        y: key.y,
    }
}

/// Per-key count of loader invocations.
#[derive(Debug, Default)]
pub struct LoadLog {
    counts: Mutex<HashMap<TileKey, usize>>,
}

impl LoadLog {
    pub fn record(&self, key: &TileKey) {
        *self.counts.lock().entry(*key).or_default() += 1;
    }

    pub fn count(&self, key: &TileKey) -> usize {
        self.counts.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.lock().values().sum()
    }

    pub fn max_per_key(&self) -> usize {
        self.counts.lock().values().copied().max().unwrap_or(0)
    }
}

/// Store over [`local_profile`] whose loader records every call in a log.
pub fn logged_store<F>(max_entries: usize, load: F) -> (Arc<TileStore>, Arc<LoadLog>)
where
    F: Fn(&TileKey, &GeoExtent) -> elevpool::Result<HeightField> + Send + Sync + 'static,
{
    let log = Arc::new(LoadLog::default());
    let loader_log = Arc::clone(&log);
    let config = PoolConfig {
        name: "test".to_string(),
        max_entries,
        ..Default::default()
    };
    let store = TileStore::with_config(
        local_profile(),
        move |key: &TileKey, bounds: &GeoExtent| -> elevpool::Result<HeightField> {
            loader_log.record(key);
            load(key, bounds)
        },
        config,
    )
    .unwrap();
    (store, log)
}

/// Store whose every tile is the [`plane`] surface with 5x5 posts.
pub fn plane_store(max_entries: usize) -> (Arc<TileStore>, Arc<LoadLog>) {
    logged_store(max_entries, |_, bounds| Ok(plane_tile(bounds, 5)))
}
