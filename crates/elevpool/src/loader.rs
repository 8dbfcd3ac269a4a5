//! Tile loading collaborators.
//!
//! The store calls a [`TileLoader`] at most once per record, outside of any
//! lock. Any `Fn(&TileKey, &GeoExtent) -> Result<HeightField>` closure is a
//! loader; [`GeoTiffPyramid`] reads tiles from a directory tree.

use crate::heightfield::HeightField;
use crate::key::TileKey;
use crate::profile::GeoExtent;
use crate::{PoolError, Result};
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;

/// Source of heightfields for tile keys.
pub trait TileLoader: Send + Sync {
    /// Produce the heightfield for `key`, which covers `bounds`.
    fn load(&self, key: &TileKey, bounds: &GeoExtent) -> Result<HeightField>;
}

impl<F> TileLoader for F
where
    F: Fn(&TileKey, &GeoExtent) -> Result<HeightField> + Send + Sync,
{
    fn load(&self, key: &TileKey, bounds: &GeoExtent) -> Result<HeightField> {
        self(key, bounds)
    }
}

/// GDAL_NODATA, stored as an ASCII string.
const GDAL_NODATA_TAG: u16 = 42113;

/// Single-band GeoTIFF tiles stored as `{root}/{lod}/{x}/{y}.tif`.
///
/// Tiles missing from disk load as [`PoolError::TileNotFound`], which the
/// store records as a failed tile so sampling falls back to an ancestor.
#[derive(Debug, Clone)]
pub struct GeoTiffPyramid {
    root: PathBuf,
}

impl GeoTiffPyramid {
    /// Create a loader over a pyramid directory.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory of the pyramid.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path for a tile.
    pub fn tile_path(&self, key: &TileKey) -> PathBuf {
        self.root
            .join(key.lod.to_string())
            .join(key.x.to_string())
            .join(format!("{}.tif", key.y))
    }

    /// Decode one GeoTIFF file into a heightfield.
    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<HeightField> {
        let file = std::fs::File::open(path.as_ref())?;
        let mut decoder = Decoder::new(file)?;

        // Allow large DEM tiles
        let mut limits = Limits::default();
        limits.decoding_buffer_size = 1024 * 1024 * 1024;
        limits.intermediate_buffer_size = 1024 * 1024 * 1024;
        limits.ifd_value_size = 1024 * 1024 * 1024;
        decoder = decoder.with_limits(limits);

        let (width, height) = decoder.dimensions()?;
        let no_data_value = Self::read_nodata_value(&mut decoder);
        let data = Self::decode_elevation_data(&mut decoder)?;

        let heightfield = HeightField::new(width, height, data)?;
        Ok(match no_data_value {
            Some(value) => heightfield.with_no_data_value(value),
            None => heightfield,
        })
    }

    fn decode_elevation_data<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Result<Vec<f32>> {
        let result = decoder.read_image()?;

        match result {
            DecodingResult::F32(data) => Ok(data),
            DecodingResult::F64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U16(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U32(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I8(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::I64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U64(data) => Ok(data.into_iter().map(|v| v as f32).collect()),
            DecodingResult::U8(_) => Err(PoolError::UnsupportedDataType(
                "8-bit samples are imagery, not elevation".to_string(),
            )),
        }
    }

    fn read_nodata_value<R: std::io::Read + std::io::Seek>(
        decoder: &mut Decoder<R>,
    ) -> Option<f32> {
        decoder
            .get_tag_ascii_string(Tag::Unknown(GDAL_NODATA_TAG))
            .ok()
            .and_then(|s| s.trim_end_matches('\0').trim().parse().ok())
    }
}

impl TileLoader for GeoTiffPyramid {
    fn load(&self, key: &TileKey, _bounds: &GeoExtent) -> Result<HeightField> {
        let path = self.tile_path(key);
        if !path.exists() {
            return Err(PoolError::TileNotFound {
                lod: key.lod,
                x: key.x,
                y: key.y,
            });
        }
        Self::read_file(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tiff::encoder::{colortype, TiffEncoder};

    fn write_tile(path: &Path, width: u32, height: u32, data: &[f32]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = std::fs::File::create(path).unwrap();
        let mut encoder = TiffEncoder::new(file).unwrap();
        encoder
            .write_image::<colortype::Gray32Float>(width, height, data)
            .unwrap();
    }

    #[test]
    fn test_tile_path() {
        let pyramid = GeoTiffPyramid::new("./elevation_cache");
        assert_eq!(
            pyramid.tile_path(&TileKey::new(12, 655, 1407)),
            PathBuf::from("./elevation_cache/12/655/1407.tif")
        );
    }

    #[test]
    fn test_missing_tile_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pyramid = GeoTiffPyramid::new(dir.path());
        let bounds = GeoExtent::new(0.0, 0.0, 1.0, 1.0);
        let err = pyramid.load(&TileKey::new(3, 1, 2), &bounds).unwrap_err();
        assert!(matches!(err, PoolError::TileNotFound { lod: 3, x: 1, y: 2 }));
    }

    #[test]
    fn test_load_written_tile() {
        let dir = tempfile::tempdir().unwrap();
        let pyramid = GeoTiffPyramid::new(dir.path());
        let key = TileKey::new(2, 1, 3);
        let data: Vec<f32> = (0..16).map(|v| v as f32 * 2.5).collect();
        write_tile(&pyramid.tile_path(&key), 4, 4, &data);

        let hf = pyramid.load(&key, &GeoExtent::new(0.0, 0.0, 1.0, 1.0)).unwrap();
        assert_eq!(hf.dimensions(), (4, 4));
        assert_eq!(hf.get(0, 0), Some(0.0));
        assert_eq!(hf.get(3, 3), Some(37.5));
    }

    #[test]
    fn test_closure_loader() {
        let loader = |key: &TileKey, _: &GeoExtent| HeightField::filled(2, 2, key.lod as f32);
        let hf = loader
            .load(&TileKey::new(7, 0, 0), &GeoExtent::new(0.0, 0.0, 1.0, 1.0))
            .unwrap();
        assert_eq!(hf.get(1, 1), Some(7.0));
    }
}
