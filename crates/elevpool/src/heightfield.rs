//! Elevation grids.

use crate::profile::GeoExtent;
use crate::{PoolError, Result};
use serde::{Deserialize, Serialize};

/// How a heightfield is sampled between grid posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Bilinear interpolation between the four surrounding posts.
    #[default]
    Bilinear,
    /// Value of the closest post.
    Nearest,
}

/// A grid of elevation posts covering a tile.
///
/// Posts are stored in row-major order from north to south, west to east.
/// The first and last columns sit on the west and east edges of the tile's
/// extent (the same post layout as a GeoTIFF DEM tile).
#[derive(Debug, Clone, PartialEq)]
pub struct HeightField {
    data: Vec<f32>,
    width: u32,
    height: u32,
    no_data_value: Option<f32>,
}

impl HeightField {
    /// Create a heightfield from row-major posts.
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if expected == 0 || data.len() != expected {
            return Err(PoolError::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            no_data_value: None,
        })
    }

    /// Create a heightfield by evaluating `f(column, row)` at every post.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Result<Self> {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(col, row));
            }
        }
        Self::new(width, height, data)
    }

    /// Create a heightfield where every post has the same value.
    pub fn filled(width: u32, height: u32, value: f32) -> Result<Self> {
        Self::new(width, height, vec![value; width as usize * height as usize])
    }

    /// Mark posts equal to `value` as missing.
    pub fn with_no_data_value(mut self, value: f32) -> Self {
        self.no_data_value = Some(value);
        self
    }

    /// Get the dimensions in posts.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Raw posts in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at a post, or `None` for missing data.
    pub fn get(&self, col: u32, row: u32) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        let value = self.data[row as usize * self.width as usize + col as usize];
        if value.is_nan() {
            return None;
        }
        if let Some(nodata) = self.no_data_value {
            if (value - nodata).abs() < 0.001 {
                return None;
            }
        }
        Some(value)
    }

    /// Post spacing in extent units as (x, y).
    pub fn resolution(&self, extent: &GeoExtent) -> (f64, f64) {
        let cols = self.width.saturating_sub(1).max(1) as f64;
        let rows = self.height.saturating_sub(1).max(1) as f64;
        (extent.width() / cols, extent.height() / rows)
    }

    /// Sample the grid at a point, treating it as covering `extent`.
    ///
    /// Returns `None` if the point is outside the extent or touches a
    /// missing post.
    pub fn sample(&self, extent: &GeoExtent, x: f64, y: f64, mode: Interpolation) -> Option<f32> {
        if !extent.contains(x, y) {
            return None;
        }

        // Row 0 is at the north edge and increases southward.
        let px = ((x - extent.xmin) / extent.width()) * (self.width - 1) as f64;
        let py = ((extent.ymax - y) / extent.height()) * (self.height - 1) as f64;

        match mode {
            Interpolation::Nearest => self.get(px.round() as u32, py.round() as u32),
            Interpolation::Bilinear => {
                let x0 = px.floor() as u32;
                let y0 = py.floor() as u32;
                let x1 = (x0 + 1).min(self.width - 1);
                let y1 = (y0 + 1).min(self.height - 1);

                let fx = px - x0 as f64;
                let fy = py - y0 as f64;

                let v00 = self.get(x0, y0)? as f64;
                let v10 = self.get(x1, y0)? as f64;
                let v01 = self.get(x0, y1)? as f64;
                let v11 = self.get(x1, y1)? as f64;

                let elevation = v00 * (1.0 - fx) * (1.0 - fy)
                    + v10 * fx * (1.0 - fy)
                    + v01 * (1.0 - fx) * fy
                    + v11 * fx * fy;

                Some(elevation as f32)
            }
        }
    }
}
