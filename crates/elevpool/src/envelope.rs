//! Query envelopes: per-consumer elevation sampling contexts.
//!
//! An [`ElevationEnvelope`] answers point queries in its own spatial
//! reference at a target LOD. For each point it walks the covering tile and
//! then its ancestors, finest first, and samples the first one that is loaded
//! and has data there. Tiles are pulled from the store only when the walk
//! reaches them, so a query that is answered at the target LOD never touches
//! the coarser levels.
//!
//! Envelopes are meant for one thread at a time. Create one per area of
//! interest (for example one per terrain tile being built); the store they
//! share is safe to use from many threads.

use crate::heightfield::Interpolation;
use crate::key::TileKey;
use crate::profile::{Profile, Srs};
use crate::query_set::QuerySet;
use crate::store::TileStore;
use elevpool_metrics::metric_defs;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Sentinel elevation for "no data at this point".
pub const NO_DATA_VALUE: f32 = f32::MIN;

/// One elevation sample and the post spacing of the tile it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationSample {
    /// Elevation, or [`NO_DATA_VALUE`].
    pub elevation: f32,
    /// East-west post spacing of the source tile in profile units; 0 for no data.
    pub resolution: f64,
}

impl ElevationSample {
    /// The "no data" sample.
    pub const NO_DATA: ElevationSample = ElevationSample {
        elevation: NO_DATA_VALUE,
        resolution: 0.0,
    };

    /// Whether the sample carries an elevation.
    pub fn is_valid(&self) -> bool {
        self.elevation != NO_DATA_VALUE
    }
}

/// Sampling context bound to one store, input reference and target LOD.
#[derive(Debug)]
pub struct ElevationEnvelope {
    store: Weak<TileStore>,
    srs: Srs,
    profile: Profile,
    lod: u8,
    interpolation: Interpolation,
    tiles: QuerySet,
}

impl ElevationEnvelope {
    /// Create an envelope over `store` for points in `srs`.
    ///
    /// `lod` is clamped to the store's finest allowed LOD.
    pub fn new(store: &Arc<TileStore>, srs: Srs, lod: u8) -> Self {
        Self {
            store: Arc::downgrade(store),
            srs,
            profile: store.profile().clone(),
            lod: lod.min(store.max_lod()),
            interpolation: store.interpolation(),
            tiles: QuerySet::new(),
        }
    }

    /// Spatial reference of query points.
    pub fn srs(&self) -> Srs {
        self.srs
    }

    /// Target level of detail.
    pub fn lod(&self) -> u8 {
        self.lod
    }

    /// Tiles pulled in by queries so far.
    pub fn query_set(&self) -> &QuerySet {
        &self.tiles
    }

    /// Release every tracked tile.
    pub fn clear(&mut self) {
        self.tiles.clear();
    }

    /// Elevation at a point, or [`NO_DATA_VALUE`].
    pub fn elevation(&mut self, x: f64, y: f64) -> f32 {
        self.elevation_and_resolution(x, y).elevation
    }

    /// Elevation at a point together with the resolution of the source tile.
    pub fn elevation_and_resolution(&mut self, x: f64, y: f64) -> ElevationSample {
        let Some(store) = self.store.upgrade() else {
            return ElevationSample::NO_DATA;
        };
        let sample = self
            .srs
            .transform(self.profile.srs(), x, y)
            .and_then(|(px, py)| self.sample_native(&store, px, py));

        match sample {
            Some(sample) => sample,
            None => {
                metrics::counter!(metric_defs::ENVELOPE_NO_DATA.name, store.labels()).increment(1);
                trace!("ElevationEnvelope: no data at ({}, {})", x, y);
                ElevationSample::NO_DATA
            }
        }
    }

    /// Sample many points into `output`, one slot per point.
    ///
    /// Points without data get [`NO_DATA_VALUE`]. Returns the number of
    /// points that produced an elevation.
    pub fn elevations(&mut self, points: &[(f64, f64)], output: &mut Vec<f32>) -> usize {
        output.clear();
        output.reserve(points.len());
        let mut count = 0;
        for &(x, y) in points {
            let elevation = self.elevation(x, y);
            if elevation != NO_DATA_VALUE {
                count += 1;
            }
            output.push(elevation);
        }
        count
    }

    /// Minimum and maximum elevation over the points that have data.
    ///
    /// Returns `None` if none of the points produced an elevation.
    pub fn elevation_extrema(&mut self, points: &[(f64, f64)]) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        for &(x, y) in points {
            let elevation = self.elevation(x, y);
            if elevation == NO_DATA_VALUE {
                continue;
            }
            range = Some(match range {
                Some((lo, hi)) => (lo.min(elevation), hi.max(elevation)),
                None => (elevation, elevation),
            });
        }
        range
    }

    /// Sample elevations along a line between two points.
    ///
    /// Returns `num_samples` evenly spaced (distance, sample) pairs including
    /// both endpoints. Distance is measured from the start in meters:
    /// great-circle for geographic input, planar for mercator input.
    pub fn sample_line(
        &mut self,
        start: (f64, f64),
        end: (f64, f64),
        num_samples: usize,
    ) -> Vec<(f64, ElevationSample)> {
        let mut results = Vec::with_capacity(num_samples);
        if num_samples == 0 {
            return results;
        }

        let total_distance = match self.srs {
            Srs::Geographic => haversine_distance(start.1, start.0, end.1, end.0),
            Srs::SphericalMercator => (end.0 - start.0).hypot(end.1 - start.1),
        };

        for i in 0..num_samples {
            let t = if num_samples == 1 {
                0.0
            } else {
                i as f64 / (num_samples - 1) as f64
            };
            let x = start.0 + t * (end.0 - start.0);
            let y = start.1 + t * (end.1 - start.1);
            results.push((t * total_distance, self.elevation_and_resolution(x, y)));
        }

        results
    }

    /// Walk the covering tile's lineage, finest first, pulling each tile into
    /// the query set as the walk reaches it.
    fn sample_native(&mut self, store: &TileStore, px: f64, py: f64) -> Option<ElevationSample> {
        let target = self.profile.tile_key(px, py, self.lod)?;

        for key in target.lineage() {
            let record = match self.tiles.get(&key) {
                Some(record) => Arc::clone(record),
                None => {
                    let Some((record, _)) = store.try_tile(&key) else {
                        continue;
                    };
                    Arc::clone(self.tiles.insert(record))
                }
            };

            // Tracked records may have finished loading since this envelope
            // last looked at them.
            let Some(heightfield) = record.heightfield() else {
                continue;
            };
            let bounds = record.bounds();
            let Some(elevation) = heightfield.sample(&bounds, px, py, self.interpolation) else {
                continue;
            };

            if key != target {
                self.note_fallback(store, &target, &key);
            }
            return Some(ElevationSample {
                elevation,
                resolution: heightfield.resolution(&bounds).0,
            });
        }

        None
    }

    fn note_fallback(&self, store: &TileStore, target: &TileKey, used: &TileKey) {
        metrics::counter!(metric_defs::ENVELOPE_FALLBACKS.name, store.labels()).increment(1);
        trace!("ElevationEnvelope: {} not ready, sampled {}", target, used);
    }
}

/// Calculate the distance between two points using the haversine formula.
///
/// Returns the distance in meters.
fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_M * c
}
