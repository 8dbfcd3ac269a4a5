//! Spatial references, extents and quadtree tiling profiles.
//!
//! A [`Profile`] describes how a dataset's native extent is split into a
//! quadtree: `tiles_wide x tiles_high` root tiles at LOD 0, each of which
//! splits into four children at the next LOD. Two standard profiles are
//! provided:
//!
//! - [`Profile::global_geodetic`]: longitude/latitude degrees, 2x1 root tiles
//! - [`Profile::spherical_mercator`]: Web Mercator meters, one root tile
//!   (the OpenStreetMap Slippy Map layout)

use crate::key::TileKey;
use crate::{PoolError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// WGS84 semi-major axis used by spherical mercator.
const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Half the width of the spherical mercator extent, in meters.
pub const MERCATOR_HALF_EXTENT: f64 = PI * EARTH_RADIUS_M;

/// Latitude limit of the square mercator extent (arctan(sinh(π))).
pub const MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Finest LOD any profile will produce keys for.
pub const MAX_LOD: u8 = 30;

/// Spatial reference of a coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Srs {
    /// Longitude and latitude in decimal degrees (x = lon, y = lat).
    Geographic,
    /// Spherical (Web) mercator in meters.
    SphericalMercator,
}

impl Srs {
    /// Convert a point from this reference into `to`.
    ///
    /// Returns `None` when the point has no finite image in the target
    /// reference, including geographic latitudes beyond the mercator limit.
    pub fn transform(self, to: Srs, x: f64, y: f64) -> Option<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let (tx, ty) = match (self, to) {
            (Srs::Geographic, Srs::Geographic)
            | (Srs::SphericalMercator, Srs::SphericalMercator) => (x, y),
            (Srs::Geographic, Srs::SphericalMercator) => {
                // The square mercator extent ends at MERCATOR_MAX_LAT.
                if y.abs() > MERCATOR_MAX_LAT {
                    return None;
                }
                let lat = y.to_radians();
                let mx = x.to_radians() * EARTH_RADIUS_M;
                let my = (PI / 4.0 + lat / 2.0).tan().ln() * EARTH_RADIUS_M;
                (mx, my)
            }
            (Srs::SphericalMercator, Srs::Geographic) => {
                let lon = (x / EARTH_RADIUS_M).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
                (lon, lat)
            }
        };
        (tx.is_finite() && ty.is_finite()).then_some((tx, ty))
    }
}

/// Axis-aligned bounding box in some reference's units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoExtent {
    /// West edge.
    pub xmin: f64,
    /// South edge.
    pub ymin: f64,
    /// East edge.
    pub xmax: f64,
    /// North edge.
    pub ymax: f64,
}

impl GeoExtent {
    /// Create an extent from its edges.
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Check if a point is within the extent (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// East-west size.
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// North-south size.
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// Quadtree tiling of a dataset's native extent.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    srs: Srs,
    extent: GeoExtent,
    tiles_wide: u32,
    tiles_high: u32,
}

impl Profile {
    /// Create a profile over `extent` with the given number of root tiles.
    pub fn new(srs: Srs, extent: GeoExtent, tiles_wide: u32, tiles_high: u32) -> Result<Self> {
        if tiles_wide == 0 || tiles_high == 0 {
            return Err(PoolError::InvalidConfig(
                "profile needs at least one root tile in each direction".to_string(),
            ));
        }
        if (tiles_wide.max(tiles_high) as u64) << MAX_LOD > u32::MAX as u64 {
            return Err(PoolError::InvalidConfig(format!(
                "{}x{} root tiles overflow the key space at LOD {}",
                tiles_wide, tiles_high, MAX_LOD
            )));
        }
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(PoolError::InvalidConfig(format!(
                "profile extent {:?} is empty",
                extent
            )));
        }
        Ok(Self {
            srs,
            extent,
            tiles_wide,
            tiles_high,
        })
    }

    /// Whole-earth longitude/latitude profile with two root tiles.
    pub fn global_geodetic() -> Self {
        Self {
            srs: Srs::Geographic,
            extent: GeoExtent::new(-180.0, -90.0, 180.0, 90.0),
            tiles_wide: 2,
            tiles_high: 1,
        }
    }

    /// Web mercator profile with a single root tile.
    pub fn spherical_mercator() -> Self {
        Self {
            srs: Srs::SphericalMercator,
            extent: GeoExtent::new(
                -MERCATOR_HALF_EXTENT,
                -MERCATOR_HALF_EXTENT,
                MERCATOR_HALF_EXTENT,
                MERCATOR_HALF_EXTENT,
            ),
            tiles_wide: 1,
            tiles_high: 1,
        }
    }

    /// Spatial reference of the profile's native coordinates.
    pub fn srs(&self) -> Srs {
        self.srs
    }

    /// Full extent covered by the root tiles.
    pub fn extent(&self) -> GeoExtent {
        self.extent
    }

    /// Number of (columns, rows) at a level of detail.
    ///
    /// LODs finer than [`MAX_LOD`] report the [`MAX_LOD`] grid.
    pub fn tiles_at(&self, lod: u8) -> (u32, u32) {
        let lod = lod.min(MAX_LOD);
        (self.tiles_wide << lod, self.tiles_high << lod)
    }

    /// Key of the tile at `lod` covering a point in native coordinates.
    ///
    /// Points on a shared edge resolve to the tile east/south of that edge,
    /// except on the profile's own east and south edges.
    pub fn tile_key(&self, x: f64, y: f64, lod: u8) -> Option<TileKey> {
        if lod > MAX_LOD || !self.extent.contains(x, y) {
            return None;
        }
        let (cols, rows) = self.tiles_at(lod);
        let tile_w = self.extent.width() / cols as f64;
        let tile_h = self.extent.height() / rows as f64;

        let col = ((x - self.extent.xmin) / tile_w).floor() as u32;
        let row = ((self.extent.ymax - y) / tile_h).floor() as u32;

        Some(TileKey::new(lod, col.min(cols - 1), row.min(rows - 1)))
    }

    /// Native extent of a tile.
    pub fn tile_extent(&self, key: &TileKey) -> GeoExtent {
        let (cols, rows) = self.tiles_at(key.lod);
        let tile_w = self.extent.width() / cols as f64;
        let tile_h = self.extent.height() / rows as f64;

        let xmin = self.extent.xmin + key.x as f64 * tile_w;
        let ymax = self.extent.ymax - key.y as f64 * tile_h;
        GeoExtent::new(xmin, ymax - tile_h, xmin + tile_w, ymax)
    }

    /// Whether a key addresses a tile inside this profile.
    pub fn is_valid_key(&self, key: &TileKey) -> bool {
        if key.lod > MAX_LOD {
            return false;
        }
        let (cols, rows) = self.tiles_at(key.lod);
        key.x < cols && key.y < rows
    }
}
