//! Tile store configuration.

use crate::heightfield::Interpolation;
use crate::profile::MAX_LOD;
use crate::{PoolError, Result};
use serde::{Deserialize, Serialize};

/// Default number of records the store keeps resident.
pub const DEFAULT_MAX_ENTRIES: usize = 128;

/// Default finest LOD an envelope may target.
pub const DEFAULT_MAX_LOD: u8 = 19;

/// Configuration for a [`TileStore`](crate::TileStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Name used in log messages and metric labels.
    pub name: String,
    /// Ceiling on records owned by the recency list.
    pub max_entries: usize,
    /// How heightfields are sampled.
    pub interpolation: Interpolation,
    /// Envelopes targeting a finer LOD are clamped to this one.
    pub max_lod: u8,
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig {
            name: "elevation".to_string(),
            max_entries: DEFAULT_MAX_ENTRIES,
            interpolation: Interpolation::Bilinear,
            max_lod: DEFAULT_MAX_LOD,
        }
    }
}

impl PoolConfig {
    /// Check that the configuration can drive a store.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(PoolError::InvalidConfig(
                "max_entries must be at least 1".to_string(),
            ));
        }
        if self.max_lod > MAX_LOD {
            return Err(PoolError::InvalidLod(self.max_lod));
        }
        Ok(())
    }
}
