//! Quadtree tile keys.

use std::cmp::Ordering;
use std::fmt;

/// Identifier of one tile in a quadtree raster pyramid.
///
/// Keys order finest level first, then by column and row, so iterating a
/// sorted collection of keys walks from high resolution to low resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileKey {
    /// Level of detail (0 is the coarsest).
    pub lod: u8,
    /// Column, increasing eastward.
    pub x: u32,
    /// Row, increasing southward.
    pub y: u32,
}

impl TileKey {
    /// Create a new tile key.
    pub const fn new(lod: u8, x: u32, y: u32) -> Self {
        Self { lod, x, y }
    }

    /// The key one level coarser that contains this tile, or `None` at LOD 0.
    pub fn parent(&self) -> Option<TileKey> {
        if self.lod == 0 {
            return None;
        }
        Some(TileKey {
            lod: self.lod - 1,
            x: self.x >> 1,
            y: self.y >> 1,
        })
    }

    /// This key followed by each of its ancestors down to LOD 0.
    pub fn lineage(&self) -> impl Iterator<Item = TileKey> {
        std::iter::successors(Some(*self), TileKey::parent)
    }
}

impl Ord for TileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .lod
            .cmp(&self.lod)
            .then_with(|| self.x.cmp(&other.x))
            .then_with(|| self.y.cmp(&other.y))
    }
}

impl PartialOrd for TileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.lod, self.x, self.y)
    }
}
