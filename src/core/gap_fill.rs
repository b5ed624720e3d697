//! Void filling for elevation grids
//!
//! [`GapFiller`] applies the data-sufficiency guard and writes estimates back;
//! the estimates themselves come from a pluggable [`VoidInterpolator`].

use crate::config::{GapFillMethod, GapFillParams};
use crate::core::clough_tocher::CloughTocherSurface;
use crate::core::triangulation::LatticePoint;
use crate::types::{ElevationGrid, TerrainError, TerrainResult};
use ndarray::Array2;

/// Strategy estimating elevations for missing cells
pub trait VoidInterpolator: Send + Sync {
    fn name(&self) -> &'static str;

    /// One estimate per target `(row, col)`, in order. Non-finite estimates
    /// leave the cell missing.
    fn estimate(&self, dem: &ElevationGrid, targets: &[(usize, usize)]) -> TerrainResult<Vec<f32>>;
}

/// Mean of the finite cells, `None` when there are none
pub fn valid_mean(dem: &ElevationGrid) -> Option<f64> {
    let (sum, count) = dem
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0f64, 0usize), |(s, c), &v| (s + v as f64, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Triangulated piecewise-cubic estimator with mean fallback outside the hull
#[derive(Debug, Clone, Copy, Default)]
pub struct CloughTocherInterpolator;

impl VoidInterpolator for CloughTocherInterpolator {
    fn name(&self) -> &'static str {
        "clough-tocher"
    }

    fn estimate(&self, dem: &ElevationGrid, targets: &[(usize, usize)]) -> TerrainResult<Vec<f32>> {
        let mean = match valid_mean(dem) {
            Some(mean) => mean,
            None => return Ok(vec![f32::NAN; targets.len()]),
        };

        let mut points: Vec<LatticePoint> = Vec::new();
        let mut values = Vec::new();
        for ((row, col), &v) in dem.indexed_iter() {
            if v.is_finite() {
                points.push([col as i64, row as i64]);
                values.push(v as f64);
            }
        }

        let surface = CloughTocherSurface::new(&points, values);
        let queries: Vec<LatticePoint> =
            targets.iter().map(|&(r, c)| [c as i64, r as i64]).collect();
        let estimates = surface.evaluate(&queries);

        let outside = estimates.iter().filter(|e| e.is_none()).count();
        if outside > 0 {
            log::debug!(
                "{} void pixels outside the sample hull, using mean elevation {:.2}",
                outside,
                mean
            );
        }

        Ok(estimates
            .into_iter()
            .map(|e| e.unwrap_or(mean) as f32)
            .collect())
    }
}

/// Iterative neighbour averaging
///
/// Each pass fills cells with at least `min_neighbors` valid 8-neighbours
/// from the state left by the previous pass. Whatever remains after
/// `max_iterations` passes gets the mean of the original valid cells.
#[derive(Debug, Clone, Copy)]
pub struct NeighborAverageInterpolator {
    pub min_neighbors: usize,
    pub max_iterations: usize,
}

impl Default for NeighborAverageInterpolator {
    fn default() -> Self {
        Self {
            min_neighbors: 3,
            max_iterations: 10,
        }
    }
}

impl VoidInterpolator for NeighborAverageInterpolator {
    fn name(&self) -> &'static str {
        "neighbor-average"
    }

    fn estimate(&self, dem: &ElevationGrid, targets: &[(usize, usize)]) -> TerrainResult<Vec<f32>> {
        let (height, width) = dem.dim();
        let mean = valid_mean(dem).unwrap_or(f64::NAN) as f32;

        let mut work = dem.clone();
        let mut estimates = vec![f32::NAN; targets.len()];
        let mut pending: Vec<usize> = (0..targets.len()).collect();

        for iteration in 0..self.max_iterations {
            let mut filled = Vec::new();

            for &t in &pending {
                let (i, j) = targets[t];
                let mut sum = 0.0f64;
                let mut count = 0;

                for di in -1i64..=1 {
                    for dj in -1i64..=1 {
                        if di == 0 && dj == 0 {
                            continue;
                        }
                        let ni = i as i64 + di;
                        let nj = j as i64 + dj;
                        if ni < 0 || nj < 0 || ni >= height as i64 || nj >= width as i64 {
                            continue;
                        }
                        let v = work[[ni as usize, nj as usize]];
                        if v.is_finite() {
                            sum += v as f64;
                            count += 1;
                        }
                    }
                }

                if count >= self.min_neighbors {
                    filled.push((t, (sum / count as f64) as f32));
                }
            }

            if filled.is_empty() {
                break;
            }
            log::debug!(
                "Neighbour averaging pass {}: filled {} pixels",
                iteration + 1,
                filled.len()
            );

            for &(t, v) in &filled {
                work[targets[t]] = v;
                estimates[t] = v;
            }
            pending.retain(|t| estimates[*t].is_nan());
            if pending.is_empty() {
                break;
            }
        }

        if !pending.is_empty() {
            log::debug!("{} pixels left after averaging, using mean elevation", pending.len());
            for t in pending {
                estimates[t] = mean;
            }
        }

        Ok(estimates)
    }
}

/// Every void receives the mean of the valid cells
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobalMeanInterpolator;

impl VoidInterpolator for GlobalMeanInterpolator {
    fn name(&self) -> &'static str {
        "global-mean"
    }

    fn estimate(&self, dem: &ElevationGrid, targets: &[(usize, usize)]) -> TerrainResult<Vec<f32>> {
        let mean = valid_mean(dem).unwrap_or(f64::NAN) as f32;
        Ok(vec![mean; targets.len()])
    }
}

/// Build the strategy for a configured method
pub fn interpolator_for(method: GapFillMethod) -> Box<dyn VoidInterpolator> {
    match method {
        GapFillMethod::CloughTocher => Box::new(CloughTocherInterpolator),
        GapFillMethod::NeighborAverage => Box::new(NeighborAverageInterpolator::default()),
        GapFillMethod::GlobalMean => Box::new(GlobalMeanInterpolator),
    }
}

/// Replaces missing elevation cells, guarded by a data-sufficiency check
pub struct GapFiller {
    min_valid_fraction: f64,
    interpolator: Box<dyn VoidInterpolator>,
}

impl Default for GapFiller {
    fn default() -> Self {
        Self::with_interpolator(0.5, Box::new(CloughTocherInterpolator))
    }
}

impl GapFiller {
    pub fn new(params: &GapFillParams) -> TerrainResult<Self> {
        Ok(Self::with_interpolator(
            params.min_valid_fraction,
            interpolator_for(params.method()?),
        ))
    }

    pub fn with_interpolator(
        min_valid_fraction: f64,
        interpolator: Box<dyn VoidInterpolator>,
    ) -> Self {
        Self {
            min_valid_fraction,
            interpolator,
        }
    }

    pub fn interpolator_name(&self) -> &'static str {
        self.interpolator.name()
    }

    /// Fill missing cells in place and hand the grid back
    ///
    /// Below the valid-fraction threshold the grid is returned untouched and
    /// the missing cells propagate downstream.
    pub fn fill(&self, mut dem: ElevationGrid) -> TerrainResult<ElevationGrid> {
        let total = dem.len();
        let targets: Vec<(usize, usize)> = dem
            .indexed_iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(idx, _)| idx)
            .collect();

        if targets.is_empty() {
            log::debug!("No missing pixels, gap filling not needed");
            return Ok(dem);
        }

        let valid_fraction = (total - targets.len()) as f64 / total as f64;
        if valid_fraction < self.min_valid_fraction {
            log::warn!(
                "Only {:.1}% of pixels are valid (need {:.1}%), leaving {} missing pixels unfilled",
                valid_fraction * 100.0,
                self.min_valid_fraction * 100.0,
                targets.len()
            );
            return Ok(dem);
        }

        log::info!(
            "Filling {} missing pixels with {} interpolation",
            targets.len(),
            self.interpolator.name()
        );

        let estimates = self.interpolator.estimate(&dem, &targets)?;
        if estimates.len() != targets.len() {
            return Err(TerrainError::Processing(format!(
                "{} interpolation returned {} values for {} pixels",
                self.interpolator.name(),
                estimates.len(),
                targets.len()
            )));
        }

        let mut filled = 0;
        for (&idx, &value) in targets.iter().zip(&estimates) {
            if value.is_finite() {
                dem[idx] = value;
                filled += 1;
            }
        }

        if filled < targets.len() {
            log::warn!("{} pixels could not be filled", targets.len() - filled);
        }
        log::info!("Gap filling completed: {} of {} pixels filled", filled, targets.len());

        Ok(dem)
    }
}

/// Count of missing cells
pub fn missing_count(grid: &Array2<f32>) -> usize {
    grid.iter().filter(|v| !v.is_finite()).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    fn flat_with_hole() -> ElevationGrid {
        let mut dem = Array2::from_elem((4, 4), 100.0f32);
        dem[[2, 2]] = f32::NAN;
        dem
    }

    #[test]
    fn test_single_interior_gap_is_flat() {
        let filled = GapFiller::default().fill(flat_with_hole()).unwrap();
        assert_eq!(filled[[2, 2]], 100.0);
        assert_eq!(missing_count(&filled), 0);
    }

    #[test]
    fn test_guard_leaves_sparse_grid_untouched() {
        let mut dem = Array2::from_elem((4, 4), f32::NAN);
        for j in 0..4 {
            dem[[0, j]] = 10.0 + j as f32;
        }
        dem[[1, 0]] = 7.0;

        let result = GapFiller::default().fill(dem.clone()).unwrap();
        assert_eq!(missing_count(&result), 11);
        for (a, b) in result.iter().zip(dem.iter()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn test_complete_grid_is_unchanged() {
        let dem = Array2::from_shape_fn((3, 5), |(i, j)| (i * 5 + j) as f32);
        let result = GapFiller::default().fill(dem.clone()).unwrap();
        assert_eq!(result, dem);
    }

    #[test]
    fn test_fill_is_idempotent() {
        let mut dem = Array2::from_shape_fn((6, 6), |(i, j)| (i as f32) * 2.0 + (j as f32).sin());
        dem[[2, 3]] = f32::NAN;
        dem[[0, 0]] = f32::NAN;
        dem[[5, 1]] = f32::NAN;

        let filler = GapFiller::default();
        let once = filler.fill(dem).unwrap();
        let twice = filler.fill(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_corner_outside_hull_gets_mean() {
        let mut dem = Array2::from_elem((3, 3), 10.0f32);
        dem[[1, 1]] = 20.0;
        dem[[0, 0]] = f32::NAN;

        let filled = GapFiller::default().fill(dem).unwrap();
        // Mean of eight valid cells: (7 * 10 + 20) / 8
        assert_abs_diff_eq!(filled[[0, 0]], 11.25, epsilon = 1e-5);
    }

    #[test]
    fn test_linear_ramp_is_reproduced() {
        let mut dem = Array2::from_shape_fn((8, 8), |(i, j)| 5.0 * i as f32 + 2.0 * j as f32);
        dem[[3, 3]] = f32::NAN;
        dem[[3, 4]] = f32::NAN;
        dem[[4, 4]] = f32::NAN;

        let filled = GapFiller::default().fill(dem).unwrap();
        assert_abs_diff_eq!(filled[[3, 3]], 21.0, epsilon = 1e-4);
        assert_abs_diff_eq!(filled[[3, 4]], 23.0, epsilon = 1e-4);
        assert_abs_diff_eq!(filled[[4, 4]], 28.0, epsilon = 1e-4);
    }

    #[test]
    fn test_neighbor_average_strategy() {
        let params = GapFillParams {
            min_valid_fraction: 0.5,
            method: "neighbor-average".to_string(),
        };
        let filler = GapFiller::new(&params).unwrap();
        assert_eq!(filler.interpolator_name(), "neighbor-average");

        let filled = filler.fill(flat_with_hole()).unwrap();
        assert_eq!(filled[[2, 2]], 100.0);
    }

    #[test]
    fn test_neighbor_average_fills_edges_over_passes() {
        let mut dem = Array2::from_elem((5, 5), 50.0f32);
        for j in 0..5 {
            dem[[0, j]] = f32::NAN;
            dem[[1, j]] = f32::NAN;
        }

        let estimates = NeighborAverageInterpolator::default()
            .estimate(&dem, &[(0, 0), (0, 2), (1, 2)])
            .unwrap();
        assert_eq!(estimates, vec![50.0, 50.0, 50.0]);
    }

    #[test]
    fn test_global_mean_strategy() {
        let mut dem = Array2::from_shape_vec((2, 2), vec![1.0, 3.0, f32::NAN, 5.0]).unwrap();
        let filler = GapFiller::with_interpolator(0.5, Box::new(GlobalMeanInterpolator));
        dem = filler.fill(dem).unwrap();
        assert_eq!(dem[[1, 0]], 3.0);
    }

    #[test]
    fn test_no_valid_cells_stay_missing() {
        let dem = Array2::from_elem((2, 2), f32::NAN);
        let filler = GapFiller::with_interpolator(0.0, Box::new(CloughTocherInterpolator));
        let result = filler.fill(dem).unwrap();
        assert_eq!(missing_count(&result), 4);
    }

    struct ShortInterpolator;

    impl VoidInterpolator for ShortInterpolator {
        fn name(&self) -> &'static str {
            "short"
        }

        fn estimate(
            &self,
            _dem: &ElevationGrid,
            _targets: &[(usize, usize)],
        ) -> TerrainResult<Vec<f32>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_interpolator_length_is_checked() {
        let filler = GapFiller::with_interpolator(0.5, Box::new(ShortInterpolator));
        let result = filler.fill(flat_with_hole());
        assert!(matches!(result, Err(TerrainError::Processing(_))));
    }
}
