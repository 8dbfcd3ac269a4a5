//! # elevpool
//!
//! Shared, bounded elevation tile cache with multi-resolution sampling.
//!
//! Terrain and feature-draping pipelines issue many spatially clustered point
//! queries per frame. This crate answers them from a tiled elevation dataset
//! while keeping memory bounded and never loading the same tile twice at once.
//!
//! ## Overview
//!
//! - [`TileStore`]: one per backing dataset, shared by every consumer. Maps
//!   [`TileKey`]s to [`TileRecord`]s, evicts least recently used records past
//!   `max_entries`, and lets exactly one caller load each tile.
//! - [`ElevationEnvelope`]: one per area of interest. Converts query points
//!   into the dataset's [`Profile`], pulls the covering tile into its
//!   [`QuerySet`], and falls back to coarser ancestors while a tile is still
//!   loading, has failed, or has no data at the point.
//! - [`TileLoader`]: the dataset itself. Any closure works; [`GeoTiffPyramid`]
//!   reads `{root}/{lod}/{x}/{y}.tif` files.
//!
//! Queries never fail loudly. A point with no data anywhere in its ancestor
//! chain returns [`NO_DATA_VALUE`]; extrema over points with no data at all
//! return `None`.
//!
//! ## Example
//!
//! ```no_run
//! use elevpool::{GeoTiffPyramid, PoolConfig, Profile, Srs, TileStore};
//!
//! let config = PoolConfig {
//!     max_entries: 256,
//!     ..Default::default()
//! };
//! let store = TileStore::with_config(
//!     Profile::spherical_mercator(),
//!     GeoTiffPyramid::new("./elevation_cache"),
//!     config,
//! )?;
//!
//! // One envelope per terrain tile being built
//! let mut envelope = store.create_envelope(Srs::Geographic, 12);
//! let sample = envelope.elevation_and_resolution(-122.3321, 47.6062);
//! if sample.is_valid() {
//!     println!("Seattle: {} m (posts every {:.1} m)", sample.elevation, sample.resolution);
//! }
//!
//! let points = [(-122.33, 47.60), (-122.30, 47.62)];
//! if let Some((min, max)) = envelope.elevation_extrema(&points) {
//!     println!("range {}..{}", min, max);
//! }
//! # Ok::<(), elevpool::PoolError>(())
//! ```

mod config;
mod envelope;
mod error;
mod heightfield;
mod key;
mod loader;
mod lru;
mod profile;
mod query_set;
mod record;
mod store;

pub use config::{PoolConfig, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_LOD};
pub use envelope::{ElevationEnvelope, ElevationSample, NO_DATA_VALUE};
pub use error::PoolError;
pub use heightfield::{HeightField, Interpolation};
pub use key::TileKey;
pub use loader::{GeoTiffPyramid, TileLoader};
pub use profile::{GeoExtent, Profile, Srs, MAX_LOD, MERCATOR_HALF_EXTENT, MERCATOR_MAX_LAT};
pub use query_set::QuerySet;
pub use record::{LoadClaim, TileRecord, TileStatus};
pub use store::{StoreStats, TileStore};

/// Result type for elevation pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
