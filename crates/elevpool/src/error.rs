//! Error types for the elevation pool.

use thiserror::Error;

/// Errors that can occur while loading tiles or configuring a store.
///
/// Elevation queries never return these. A failed load marks the tile record
/// `Failed` and sampling falls back to a coarser ancestor.
#[derive(Debug, Error)]
pub enum PoolError {
    /// I/O error reading a tile file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding error.
    #[error("TIFF decode error: {0}")]
    TiffDecode(#[from] tiff::TiffError),

    /// Unsupported sample type in a TIFF file.
    #[error("Unsupported TIFF data type: {0}")]
    UnsupportedDataType(String),

    /// The backing dataset has no tile for this key.
    #[error("No tile found for key lod={lod} x={x} y={y}")]
    TileNotFound {
        /// Level of detail.
        lod: u8,
        /// Column.
        x: u32,
        /// Row.
        y: u32,
    },

    /// Level of detail beyond what the profile supports.
    #[error("Invalid level of detail {0}")]
    InvalidLod(u8),

    /// Heightfield sample count does not match its dimensions.
    #[error("Heightfield has {actual} samples, expected {expected}")]
    DimensionMismatch {
        /// Samples implied by width * height.
        expected: usize,
        /// Samples supplied.
        actual: usize,
    },

    /// Configuration value rejected by validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
