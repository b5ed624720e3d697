//! Gaussian smoothing for grids with missing cells

use crate::maybe_rayon::*;
use crate::types::{TerrainError, TerrainResult};
use ndarray::{Array2, ArrayView2};

/// Mirror an out-of-range index back into `0..n` (`d c b a | a b c d | d c b a`)
pub fn reflect_index(i: isize, n: usize) -> usize {
    let n = n as isize;
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}

/// Normalised 1D Gaussian kernel truncated at four standard deviations
pub fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5).floor() as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (-radius..=radius)
        .map(|k| (-((k * k) as f64) / two_sigma_sq).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Convolve each row with `kernel`, skipping missing samples
fn convolve_rows(input: ArrayView2<f32>, kernel: &[f64]) -> TerrainResult<Array2<f32>> {
    let (rows, cols) = input.dim();
    let radius = (kernel.len() / 2) as isize;

    let data: Vec<f32> = (0..rows)
        .into_par_iter()
        .flat_map(|i| {
            let row = input.row(i);
            (0..cols)
                .map(|j| {
                    let mut sum = 0.0f64;
                    let mut weight = 0.0f64;
                    for (k, w) in kernel.iter().enumerate() {
                        let src = reflect_index(j as isize + k as isize - radius, cols);
                        let v = row[src];
                        if v.is_finite() {
                            sum += w * v as f64;
                            weight += w;
                        }
                    }
                    if weight > 0.0 {
                        (sum / weight) as f32
                    } else {
                        f32::NAN
                    }
                })
                .collect::<Vec<f32>>()
        })
        .collect();

    Ok(Array2::from_shape_vec((rows, cols), data)?)
}

/// Separable Gaussian smoothing (`sigma` in pixels)
///
/// Weights are renormalised over the valid cells under the kernel; a missing
/// centre stays missing.
pub fn gaussian_smooth(grid: &Array2<f32>, sigma: f64) -> TerrainResult<Array2<f32>> {
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(TerrainError::Config(format!(
            "Smoothing sigma must be positive, got {}",
            sigma
        )));
    }
    if grid.is_empty() {
        return Ok(grid.clone());
    }

    let kernel = gaussian_kernel(sigma);
    log::debug!("Gaussian smoothing: sigma={}, kernel width={}", sigma, kernel.len());

    let along_rows = convolve_rows(grid.view(), &kernel)?;
    let mut smoothed = convolve_rows(along_rows.t(), &kernel)?.reversed_axes();

    ndarray::Zip::from(&mut smoothed)
        .and(grid)
        .for_each(|out, &src| {
            if !src.is_finite() {
                *out = f32::NAN;
            }
        });

    Ok(smoothed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_reflect_index() {
        assert_eq!(reflect_index(-1, 4), 0);
        assert_eq!(reflect_index(-2, 4), 1);
        assert_eq!(reflect_index(4, 4), 3);
        assert_eq!(reflect_index(5, 4), 2);
        assert_eq!(reflect_index(2, 4), 2);
        // Kernels wider than the axis keep bouncing
        assert_eq!(reflect_index(-3, 2), 1);
        assert_eq!(reflect_index(-5, 2), 0);
        assert_eq!(reflect_index(0, 1), 0);
        assert_eq!(reflect_index(-3, 1), 0);
    }

    #[test]
    fn test_kernel_shape() {
        let kernel = gaussian_kernel(1.0);
        assert_eq!(kernel.len(), 9);
        assert_abs_diff_eq!(kernel.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(kernel[4] > kernel[3]);
        assert_abs_diff_eq!(kernel[3], kernel[5], epsilon = 1e-15);
    }

    #[test]
    fn test_constant_grid_unchanged() {
        let grid = Array2::from_elem((5, 7), 42.0f32);
        let smoothed = gaussian_smooth(&grid, 1.0).unwrap();
        for &v in smoothed.iter() {
            assert_abs_diff_eq!(v, 42.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_impulse_spreads_symmetrically() {
        let mut grid = Array2::zeros((9, 9));
        grid[[4, 4]] = 1.0f32;
        let smoothed = gaussian_smooth(&grid, 1.0).unwrap();

        assert!(smoothed[[4, 4]] < 1.0);
        assert_abs_diff_eq!(smoothed[[3, 4]], smoothed[[5, 4]], epsilon = 1e-7);
        assert_abs_diff_eq!(smoothed[[4, 3]], smoothed[[3, 4]], epsilon = 1e-7);
        assert_abs_diff_eq!(smoothed.sum(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_missing_cells_propagate_only_at_centre() {
        let mut grid = Array2::from_elem((5, 5), 10.0f32);
        grid[[2, 2]] = f32::NAN;
        let smoothed = gaussian_smooth(&grid, 1.0).unwrap();

        assert!(smoothed[[2, 2]].is_nan());
        assert_abs_diff_eq!(smoothed[[2, 1]], 10.0, epsilon = 1e-4);
        assert_eq!(smoothed.iter().filter(|v| v.is_nan()).count(), 1);
    }

    #[test]
    fn test_invalid_sigma() {
        let grid = Array2::from_elem((2, 2), 1.0f32);
        assert!(gaussian_smooth(&grid, 0.0).is_err());
        assert!(gaussian_smooth(&grid, f64::NAN).is_err());
    }
}
