use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A 2D scalar field stored as f32, row-major.
///
/// `width` is the number of columns and `height` the number of rows, so
/// `get(row, col)` addresses `data[row * width + col]`. Height, slope and
/// growth-probability surfaces all share this representation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Row-major values.
    pub data: Vec<f32>,
    pub width: usize,
    pub height: usize,
}

impl Field {
    /// Create a new Field filled with the given value.
    pub fn new(width: usize, height: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }

    /// Create an all-zero Field.
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::new(width, height, 0.0)
    }

    /// Wrap an existing row-major buffer, checking that it covers `width × height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self, ConfigError> {
        if data.len() != width * height {
            return Err(ConfigError::LengthMismatch {
                expected: width * height,
                actual: data.len(),
            });
        }
        Ok(Self { data, width, height })
    }

    /// Build a Field by evaluating `f(row, col)` at every cell.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for r in 0..height {
            for c in 0..width {
                data.push(f(r, c));
            }
        }
        Self { data, width, height }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f32) {
        self.data[row * self.width + col] = val;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().cloned().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Min-max rescale into [0, 1] using the field's own extremes.
    /// A constant (or empty) field maps to all-zero.
    ///
    /// Arithmetic runs in f64 so that extremes near `f32::MAX` do not
    /// overflow the range.
    pub fn normalized(&self) -> Field {
        let min_v = self.min_value() as f64;
        let range = self.max_value() as f64 - min_v;
        let data = if range > 0.0 {
            self.data
                .iter()
                .map(|&v| ((v as f64 - min_v) / range).clamp(0.0, 1.0) as f32)
                .collect()
        } else {
            vec![0.0; self.data.len()]
        };
        Field { data, width: self.width, height: self.height }
    }
}
