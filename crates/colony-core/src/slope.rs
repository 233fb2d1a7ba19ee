//! Roughness (slope) field from a height field.
//!
//! Central differences at every interior cell:
//!   dz/dx = (E − W) / 2
//!   dz/dy = (S − N) / 2
//!   slope = √(dz_dx² + dz_dy²)
//! Border rows and columns have no central difference and stay 0. The raw
//! magnitudes are then rescaled to [0, 1] by their own min/max.
use crate::field::Field;

/// Central-difference gradient at interior cell `(r, c)`.
///
/// Caller must ensure `1 ≤ r ≤ height−2` and `1 ≤ c ≤ width−2`.
#[inline]
fn central_gradient(hf: &Field, r: usize, c: usize) -> (f64, f64) {
    let w = hf.get(r, c - 1) as f64;
    let e = hf.get(r, c + 1) as f64;
    let n = hf.get(r - 1, c) as f64;
    let s = hf.get(r + 1, c) as f64;
    ((e - w) / 2.0, (s - n) / 2.0)
}

/// Compute the normalized slope field of `height`.
///
/// Fields narrower than 3 cells on either axis have no interior and return all-0.
/// A surface with no interior gradient also returns all-0.
pub fn compute_slope(height: &Field) -> Field {
    let mut slope = Field::zeros(height.width, height.height);
    if height.width < 3 || height.height < 3 {
        return slope;
    }

    for r in 1..height.height - 1 {
        for c in 1..height.width - 1 {
            let (dz_dx, dz_dy) = central_gradient(height, r, c);
            slope.set(r, c, (dz_dx * dz_dx + dz_dy * dz_dy).sqrt() as f32);
        }
    }

    // Border zeros take part in the min, so a uniform non-zero interior
    // still rescales to 1 with a 0 rim.
    slope.normalized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::{generate_height_field, TerrainParams};
    use approx::assert_abs_diff_eq;

    fn border_is_zero(s: &Field) -> bool {
        let (h, w) = (s.height, s.width);
        (0..w).all(|c| s.get(0, c) == 0.0 && s.get(h - 1, c) == 0.0)
            && (0..h).all(|r| s.get(r, 0) == 0.0 && s.get(r, w - 1) == 0.0)
    }

    #[test]
    fn flat_field_has_zero_slope() {
        let s = compute_slope(&Field::new(10, 10, 0.5));
        assert!(s.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn border_cells_are_zero_on_noise() {
        let hf = generate_height_field(40, 30, &TerrainParams::default(), 3);
        let s = compute_slope(&hf);
        assert!(border_is_zero(&s));
        assert!(s.data.iter().all(|&v| (0.0..=1.0).contains(&v)));
        assert_abs_diff_eq!(s.max_value(), 1.0);
    }

    #[test]
    fn border_cells_ignore_steep_edges() {
        // Steep cliff along the outer ring only.
        let hf = Field::from_fn(6, 6, |r, c| if r == 0 || c == 0 { 1.0 } else { 0.0 });
        let s = compute_slope(&hf);
        assert!(border_is_zero(&s));
        assert!(s.get(1, 1) > 0.0);
    }

    #[test]
    fn ramp_interior_is_uniform() {
        // z = c / 10: every interior cell sees the same gradient.
        let hf = Field::from_fn(8, 8, |_, c| c as f32 / 10.0);
        let s = compute_slope(&hf);
        for r in 1..7 {
            for c in 1..7 {
                assert_abs_diff_eq!(s.get(r, c), 1.0, epsilon = 1e-6);
            }
        }
        assert!(border_is_zero(&s));
    }

    #[test]
    fn steeper_cells_have_higher_slope() {
        // Gradient grows with column index: z = c².
        let hf = Field::from_fn(10, 5, |_, c| (c * c) as f32);
        let s = compute_slope(&hf);
        for c in 2..9 {
            assert!(s.get(2, c) > s.get(2, c - 1));
        }
    }

    #[test]
    fn tiny_fields_have_no_interior() {
        for (w, h) in [(2, 10), (10, 2), (1, 1), (2, 2)] {
            let hf = Field::from_fn(w, h, |r, c| (r + c) as f32);
            let s = compute_slope(&hf);
            assert_eq!(s.len(), w * h);
            assert!(s.data.iter().all(|&v| v == 0.0));
        }
    }
}
