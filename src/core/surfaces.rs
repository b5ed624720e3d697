//! Slope, aspect and hillshade from a gap-filled elevation grid
//!
//! The three products use three independent gradient estimates:
//! slope comes from a Sobel operator over a Gaussian-smoothed copy, aspect
//! from central differences of the raw grid in meters, and hillshade from its
//! own per-pixel central differences. Missing elevation cells stay missing in
//! every product.

use crate::config::{IlluminationParams, TerrainConfig};
use crate::core::smoothing::{gaussian_smooth, reflect_index};
use crate::maybe_rayon::*;
use crate::types::{
    AspectGrid, CrsTag, ElevationGrid, GeoTransform, HillshadeGrid, SlopeGrid, TerrainError,
    TerrainResult,
};
use ndarray::Array2;

/// Horizontal pixel size in meters
///
/// Geographic grids are converted with a single latitude-independent
/// meters-per-degree factor.
pub fn pixel_scale(
    geo_transform: &GeoTransform,
    crs: &CrsTag,
    degrees_to_meters: f64,
) -> TerrainResult<f64> {
    let mut scale = geo_transform.pixel_width.abs();
    if crs.is_geographic() {
        scale *= degrees_to_meters;
    }

    if !(scale.is_finite() && scale > 0.0) {
        return Err(TerrainError::InvalidGeoTransform(format!(
            "Pixel scale must be finite and positive, got {} (pixel width {})",
            scale, geo_transform.pixel_width
        )));
    }
    Ok(scale)
}

/// Evaluate `cell` for every (row, col), one row per task
fn build_grid<T, F>(dim: (usize, usize), cell: F) -> TerrainResult<Array2<T>>
where
    T: Send,
    F: Fn(usize, usize) -> T + Sync + Send,
{
    let (rows, cols) = dim;
    let data: Vec<T> = (0..rows)
        .into_par_iter()
        .flat_map(|i| (0..cols).map(|j| cell(i, j)).collect::<Vec<T>>())
        .collect();
    Ok(Array2::from_shape_vec(dim, data)?)
}

/// Sobel derivatives `(d/dcol, d/drow)` at one cell, divided by `8 * scale`
///
/// Reflect boundary; missing stencil cells take the centre value.
pub fn sobel_at(grid: &Array2<f32>, i: usize, j: usize, scale: f64) -> (f64, f64) {
    let (rows, cols) = grid.dim();
    let centre = grid[[i, j]] as f64;
    let z = |di: isize, dj: isize| {
        let r = reflect_index(i as isize + di, rows);
        let c = reflect_index(j as isize + dj, cols);
        let v = grid[[r, c]] as f64;
        if v.is_finite() {
            v
        } else {
            centre
        }
    };

    let dx = (z(-1, 1) + 2.0 * z(0, 1) + z(1, 1)) - (z(-1, -1) + 2.0 * z(0, -1) + z(1, -1));
    let dy = (z(1, -1) + 2.0 * z(1, 0) + z(1, 1)) - (z(-1, -1) + 2.0 * z(-1, 0) + z(-1, 1));
    let divisor = 8.0 * scale;
    (dx / divisor, dy / divisor)
}

/// First derivative along `axis` (0 = rows, 1 = columns) at one cell
///
/// Central difference in the interior, one-sided at borders or next to a
/// missing cell, zero when neither neighbour is usable.
pub fn central_difference(
    grid: &Array2<f32>,
    i: usize,
    j: usize,
    axis: usize,
    spacing: f64,
) -> f64 {
    let (idx, len) = if axis == 0 { (i, grid.nrows()) } else { (j, grid.ncols()) };
    let at = |k: usize| {
        let v = if axis == 0 { grid[[k, j]] } else { grid[[i, k]] };
        Some(v as f64).filter(|v| v.is_finite())
    };

    let centre = grid[[i, j]] as f64;
    let prev = if idx > 0 { at(idx - 1) } else { None };
    let next = if idx + 1 < len { at(idx + 1) } else { None };

    match (prev, next) {
        (Some(p), Some(n)) => (n - p) / (2.0 * spacing),
        (None, Some(n)) => (n - centre) / spacing,
        (Some(p), None) => (centre - p) / spacing,
        (None, None) => 0.0,
    }
}

/// Normalise an angle in degrees into [0, 360)
fn wrap_degrees(degrees: f64) -> f32 {
    let wrapped = ((degrees + 360.0) % 360.0) as f32;
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Products of one derived-surface pass
#[derive(Debug, Clone)]
pub struct DerivedSurfaces {
    pub slope: SlopeGrid,
    pub aspect: AspectGrid,
    pub hillshade: HillshadeGrid,
}

/// Derived surface computation for one grid geometry
#[derive(Debug, Clone)]
pub struct DerivedSurfaceEngine {
    pixel_scale: f64,
    smoothing_sigma: f64,
    illumination: IlluminationParams,
}

impl DerivedSurfaceEngine {
    pub fn new(
        pixel_scale: f64,
        smoothing_sigma: f64,
        illumination: IlluminationParams,
    ) -> TerrainResult<Self> {
        if !(pixel_scale.is_finite() && pixel_scale > 0.0) {
            return Err(TerrainError::InvalidGeoTransform(format!(
                "Pixel scale must be finite and positive, got {}",
                pixel_scale
            )));
        }
        Ok(Self {
            pixel_scale,
            smoothing_sigma,
            illumination,
        })
    }

    pub fn from_config(
        config: &TerrainConfig,
        geo_transform: &GeoTransform,
        crs: &CrsTag,
    ) -> TerrainResult<Self> {
        let scale = pixel_scale(geo_transform, crs, config.degrees_to_meters)?;
        Self::new(scale, config.smoothing_sigma, config.illumination)
    }

    pub fn pixel_scale(&self) -> f64 {
        self.pixel_scale
    }

    pub fn illumination(&self) -> IlluminationParams {
        self.illumination
    }

    /// Slope in degrees, [0, 90], from Sobel derivatives of the smoothed grid
    pub fn slope(&self, dem: &ElevationGrid) -> TerrainResult<SlopeGrid> {
        let smoothed = gaussian_smooth(dem, self.smoothing_sigma)?;
        let scale = self.pixel_scale;

        build_grid(dem.dim(), |i, j| {
            if !dem[[i, j]].is_finite() {
                return f32::NAN;
            }
            let (dx, dy) = sobel_at(&smoothed, i, j, scale);
            (dx.hypot(dy).atan().to_degrees().clamp(0.0, 90.0)) as f32
        })
    }

    /// Aspect in degrees, [0, 360), as atan2(-d/drow, d/dcol) of the raw grid
    pub fn aspect(&self, dem: &ElevationGrid) -> TerrainResult<AspectGrid> {
        let scale = self.pixel_scale;

        build_grid(dem.dim(), |i, j| {
            if !dem[[i, j]].is_finite() {
                return f32::NAN;
            }
            let gx = central_difference(dem, i, j, 1, scale);
            let gy = central_difference(dem, i, j, 0, scale);
            wrap_degrees((-gy).atan2(gx).to_degrees())
        })
    }

    /// Hillshade intensity in [0, 255] for the configured sun position
    ///
    /// Slope and aspect are recomputed here from per-pixel differences, first
    /// component along rows, second along columns.
    pub fn hillshade(&self, dem: &ElevationGrid) -> TerrainResult<HillshadeGrid> {
        let azimuth = self.illumination.azimuth.to_radians();
        let altitude = self.illumination.altitude.to_radians();
        let (sin_alt, cos_alt) = altitude.sin_cos();

        build_grid(dem.dim(), |i, j| {
            if !dem[[i, j]].is_finite() {
                return None;
            }
            let grad_x = central_difference(dem, i, j, 0, 1.0);
            let grad_y = central_difference(dem, i, j, 1, 1.0);

            let slope = grad_x.hypot(grad_y).atan();
            let aspect = (-grad_y).atan2(grad_x);
            let shade = sin_alt * slope.cos() + cos_alt * slope.sin() * (azimuth - aspect).cos();

            Some((255.0 * shade).clamp(0.0, 255.0) as u8)
        })
    }

    /// Compute all three products
    pub fn compute(&self, dem: &ElevationGrid) -> TerrainResult<DerivedSurfaces> {
        log::info!("Computing derived surfaces");
        log::debug!(
            "Pixel scale: {:.3} m, sun azimuth {}°, altitude {}°",
            self.pixel_scale,
            self.illumination.azimuth,
            self.illumination.altitude
        );

        log::debug!("Computing slope");
        let slope = self.slope(dem)?;
        log::debug!("Computing aspect");
        let aspect = self.aspect(dem)?;
        log::debug!("Computing hillshade");
        let hillshade = self.hillshade(dem)?;

        log::info!("Derived surfaces completed");
        Ok(DerivedSurfaces {
            slope,
            aspect,
            hillshade,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn engine(scale: f64) -> DerivedSurfaceEngine {
        DerivedSurfaceEngine::new(scale, 1.0, IlluminationParams::default()).unwrap()
    }

    #[test]
    fn test_pixel_scale() {
        let gt = GeoTransform::from_coefficients([0.0, 0.001, 0.0, 0.0, 0.0, -0.001]);
        let geographic = CrsTag::from_definition("EPSG:4326");
        let scale = pixel_scale(&gt, &geographic, 111_000.0).unwrap();
        assert_abs_diff_eq!(scale, 111.0, epsilon = 1e-9);

        let gt = GeoTransform::from_coefficients([0.0, -30.0, 0.0, 0.0, 0.0, -30.0]);
        assert_eq!(pixel_scale(&gt, &CrsTag::Unknown, 111_000.0).unwrap(), 30.0);

        let gt = GeoTransform::from_coefficients([0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
        assert!(matches!(
            pixel_scale(&gt, &CrsTag::Unknown, 111_000.0),
            Err(TerrainError::InvalidGeoTransform(_))
        ));
    }

    #[test]
    fn test_flat_plane() {
        let dem = Array2::from_elem((5, 5), 100.0f32);
        let surfaces = engine(30.0).compute(&dem).unwrap();

        assert!(surfaces.slope.iter().all(|&s| s == 0.0));
        assert!(surfaces.hillshade.iter().all(|&h| h == Some(180)));
        assert!(surfaces.aspect.iter().all(|&a| (0.0..360.0).contains(&a)));
    }

    #[test]
    fn test_inclined_plane_slope() {
        // Rises 10 m per 10 m pixel eastwards
        let dem = Array2::from_shape_fn((20, 20), |(_, j)| 10.0 * j as f32);
        let slope = engine(10.0).slope(&dem).unwrap();
        assert_abs_diff_eq!(slope[[10, 10]], 45.0, epsilon = 1e-3);
    }

    #[test]
    fn test_aspect_directions() {
        let eastward = Array2::from_shape_fn((5, 5), |(_, j)| 3.0 * j as f32);
        let aspect = engine(1.0).aspect(&eastward).unwrap();
        assert!(aspect.iter().all(|&a| a == 0.0));

        let by_row = Array2::from_shape_fn((5, 5), |(i, _)| 3.0 * i as f32);
        let aspect = engine(1.0).aspect(&by_row).unwrap();
        assert!(aspect.iter().all(|&a| (a - 270.0).abs() < 1e-4));
    }

    #[test]
    fn test_hillshade_facing_the_sun() {
        let lit = Array2::from_shape_fn((5, 5), |(_, j)| 2.0 * j as f32);
        let shaded = Array2::from_shape_fn((5, 5), |(_, j)| -2.0 * j as f32);

        let e = engine(1.0);
        assert_eq!(e.hillshade(&lit).unwrap()[[2, 2]], Some(194));
        assert_eq!(e.hillshade(&shaded).unwrap()[[2, 2]], Some(0));
    }

    #[test]
    fn test_missing_cells_propagate() {
        let mut dem = Array2::from_shape_fn((6, 6), |(i, j)| (i * j) as f32);
        dem[[2, 3]] = f32::NAN;
        let surfaces = engine(5.0).compute(&dem).unwrap();

        assert!(surfaces.slope[[2, 3]].is_nan());
        assert!(surfaces.aspect[[2, 3]].is_nan());
        assert_eq!(surfaces.hillshade[[2, 3]], None);

        assert_eq!(surfaces.slope.iter().filter(|v| v.is_nan()).count(), 1);
        assert_eq!(surfaces.aspect.iter().filter(|v| v.is_nan()).count(), 1);
        assert_eq!(surfaces.hillshade.iter().filter(|v| v.is_none()).count(), 1);
    }

    #[test]
    fn test_central_difference_edges() {
        let dem = Array2::from_shape_vec((1, 4), vec![0.0f32, 1.0, 4.0, 9.0]).unwrap();
        assert_eq!(central_difference(&dem, 0, 0, 1, 1.0), 1.0);
        assert_eq!(central_difference(&dem, 0, 1, 1, 1.0), 2.0);
        assert_eq!(central_difference(&dem, 0, 3, 1, 1.0), 5.0);
        // Single-row axis
        assert_eq!(central_difference(&dem, 0, 2, 0, 1.0), 0.0);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(-90.0), 270.0);
        assert_eq!(wrap_degrees(-0.0), 0.0);
        assert_eq!(wrap_degrees(180.0), 180.0);
        assert!(wrap_degrees(-1e-13) < 360.0);
    }

    #[test]
    fn test_invalid_engine_scale() {
        let illumination = IlluminationParams::default();
        assert!(DerivedSurfaceEngine::new(0.0, 1.0, illumination).is_err());
        assert!(DerivedSurfaceEngine::new(f64::INFINITY, 1.0, illumination).is_err());
    }
}
