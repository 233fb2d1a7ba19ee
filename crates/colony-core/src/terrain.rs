//! Coherent-noise height field generator.
//!
//! fBm over Perlin noise: sum of octaves with amplitude = persistence^i and
//! frequency = 2^i. The base frequency places `scale` cycles across the
//! longer grid axis, so the surface has no discontinuities at any resolution.
//! Output is min-max normalized to [0, 1].
use noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::field::Field;

const LACUNARITY: f64 = 2.0;

/// Shape parameters for the generated surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainParams {
    /// Noise cycles across the longer grid axis. Larger = more, smaller hills.
    pub scale: f64,
    /// Number of fBm octaves (≥ 1).
    pub octaves: u32,
    /// Per-octave amplitude decay in (0, 1].
    pub persistence: f64,
}

impl Default for TerrainParams {
    fn default() -> Self {
        Self { scale: 4.0, octaves: 5, persistence: 0.5 }
    }
}

impl TerrainParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ConfigError::InvalidTerrain { field: "scale", value: self.scale });
        }
        if self.octaves == 0 {
            return Err(ConfigError::InvalidTerrain { field: "octaves", value: 0.0 });
        }
        if !self.persistence.is_finite() || self.persistence <= 0.0 || self.persistence > 1.0 {
            return Err(ConfigError::InvalidTerrain {
                field: "persistence",
                value: self.persistence,
            });
        }
        Ok(())
    }
}

struct Fbm {
    octaves: u32,
    persistence: f64,
    noise: Perlin,
}

impl Fbm {
    fn new(seed: u32, params: &TerrainParams) -> Self {
        Self {
            octaves: params.octaves,
            persistence: params.persistence,
            noise: Perlin::new(seed),
        }
    }

    fn sample(&self, x: f64, y: f64) -> f64 {
        let mut value = 0.0f64;
        let mut amp = 1.0f64;
        let mut freq = 1.0f64;
        for _ in 0..self.octaves {
            value += amp * self.noise.get([x * freq, y * freq]);
            amp *= self.persistence;
            freq *= LACUNARITY;
        }
        value
    }
}

/// Generate a `rows × cols` height field normalized to [0, 1].
///
/// Returns an empty field when either dimension is zero.
pub fn generate_height_field(rows: usize, cols: usize, params: &TerrainParams, seed: u32) -> Field {
    if rows == 0 || cols == 0 {
        return Field::zeros(cols, rows);
    }
    let fbm = Fbm::new(seed, params);
    let base_freq = params.scale / rows.max(cols) as f64;
    // Offset keeps samples off Perlin's integer lattice, where it is exactly 0.
    let raw = Field::from_fn(cols, rows, |r, c| {
        fbm.sample(c as f64 * base_freq + 0.5, r as f64 * base_freq + 0.5) as f32
    });
    raw.normalized()
}

/// Normalize a caller-supplied height surface into [0, 1].
///
/// A surface already inside [0, 1] is returned unchanged. Anything else is
/// min-max rescaled, and a constant out-of-range surface becomes all-zero.
pub fn normalize_height(height: &Field) -> Field {
    if height.data.iter().all(|v| (0.0..=1.0).contains(v)) {
        return height.clone();
    }
    height.normalized()
}
