//! Per-cell colonization probability.
//!
//!   P = base_growth · (1 − H)^alpha_elev · (1 − S)^alpha_slope, clamped to [0, 1]
//!
//! Low, flat cells colonize most readily. An exponent of 0 removes that
//! factor entirely (`x^0 = 1`, including `0^0`).
use crate::error::ConfigError;
use crate::field::Field;

/// Terrain-weighted growth probability from normalized height and slope.
///
/// Fails with `ShapeMismatch` when `slope` does not match `height`.
pub fn compute_growth_probability(
    height: &Field,
    slope: &Field,
    base_growth: f64,
    alpha_elev: f64,
    alpha_slope: f64,
) -> Result<Field, ConfigError> {
    if (slope.width, slope.height) != (height.width, height.height) || slope.len() != height.len() {
        return Err(ConfigError::ShapeMismatch {
            rows: height.height,
            cols: height.width,
            actual_rows: slope.height,
            actual_cols: slope.width,
        });
    }

    let data = height
        .data
        .iter()
        .zip(&slope.data)
        .map(|(&h, &s)| {
            let low = (1.0 - h as f64).clamp(0.0, 1.0);
            let flat = (1.0 - s as f64).clamp(0.0, 1.0);
            let p = base_growth * low.powf(alpha_elev) * flat.powf(alpha_slope);
            p.clamp(0.0, 1.0) as f32
        })
        .collect();

    Ok(Field { data, width: height.width, height: height.height })
}

/// Spatially-neutral probability field: `base_growth` everywhere.
pub fn uniform_growth_probability(width: usize, height: usize, base_growth: f64) -> Field {
    Field::new(width, height, base_growth.clamp(0.0, 1.0) as f32)
}
