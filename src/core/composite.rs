//! Helpers for consumers that render the derived products

use crate::types::{ElevationGrid, HillshadeGrid, SlopeGrid, TerrainError, TerrainResult};
use ndarray::{s, Array2, Zip};

fn check_shape(expected: (usize, usize), found: (usize, usize)) -> TerrainResult<()> {
    if expected != found {
        return Err(TerrainError::ShapeMismatch { expected, found });
    }
    Ok(())
}

/// Blend of height, steepness and illumination in [0, 1]
///
/// `0.6 * normalised height + 0.2 * slope / 90 + 0.2 * hillshade / 255`.
/// A flat grid (zero elevation range) has normalised height 0. Missing inputs
/// give a missing (NaN) index.
pub fn color_index(
    elevation: &ElevationGrid,
    slope: &SlopeGrid,
    hillshade: &HillshadeGrid,
) -> TerrainResult<Array2<f32>> {
    check_shape(elevation.dim(), slope.dim())?;
    check_shape(elevation.dim(), hillshade.dim())?;

    let (min, max) = elevation
        .iter()
        .filter(|v| v.is_finite())
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;

    let mut index = Array2::from_elem(elevation.dim(), f32::NAN);
    Zip::from(&mut index)
        .and(elevation)
        .and(slope)
        .and(hillshade)
        .for_each(|out, &z, &s, &h| {
            if let (true, true, Some(h)) = (z.is_finite(), s.is_finite(), h) {
                let height = if range > 0.0 { (z - min) / range } else { 0.0 };
                *out = 0.6 * height + 0.2 * s / 90.0 + 0.2 * h as f32 / 255.0;
            }
        });

    Ok(index)
}

/// Keep every `step`-th row and column, starting at the first
pub fn decimate<T: Clone>(grid: &Array2<T>, step: usize) -> TerrainResult<Array2<T>> {
    if step == 0 {
        return Err(TerrainError::Config("Decimation step must be at least 1".to_string()));
    }
    let step = step as isize;
    Ok(grid.slice(s![..;step, ..;step]).to_owned())
}
