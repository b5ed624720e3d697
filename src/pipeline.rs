//! Load, fill, derive and report in one pass

use crate::config::TerrainConfig;
use crate::core::gap_fill::{missing_count, GapFiller, VoidInterpolator};
use crate::core::statistics::{StatisticsReporter, TerrainStatistics};
use crate::core::surfaces::{DerivedSurfaceEngine, DerivedSurfaces};
use crate::io::dem::{DemReader, DemSource};
use crate::types::{
    AspectGrid, CrsTag, ElevationGrid, GeoTransform, HillshadeGrid, RoughnessGrid, SlopeGrid,
    TerrainError, TerrainResult,
};
use std::path::Path;
use std::time::Instant;

/// Everything a run produces, handed to downstream consumers
#[derive(Debug, Clone)]
pub struct TerrainProducts {
    /// Gap-filled elevation
    pub elevation: ElevationGrid,
    pub slope: SlopeGrid,
    pub aspect: AspectGrid,
    pub hillshade: HillshadeGrid,
    /// Passed through untouched from the source
    pub roughness: Option<RoughnessGrid>,
    pub geo_transform: GeoTransform,
    pub crs: CrsTag,
    pub statistics: TerrainStatistics,
}

/// Terrain analysis pipeline
pub struct TerrainPipeline {
    config: TerrainConfig,
    gap_filler: GapFiller,
}

impl TerrainPipeline {
    pub fn new(config: TerrainConfig) -> TerrainResult<Self> {
        config.validate()?;
        let gap_filler = GapFiller::new(&config.gap_fill)?;
        Ok(Self { config, gap_filler })
    }

    /// Replace the configured void interpolation strategy
    pub fn with_interpolator(mut self, interpolator: Box<dyn VoidInterpolator>) -> Self {
        self.gap_filler =
            GapFiller::with_interpolator(self.config.gap_fill.min_valid_fraction, interpolator);
        self
    }

    pub fn config(&self) -> &TerrainConfig {
        &self.config
    }

    /// Read the sources and run the pipeline
    pub fn run_from_path<P: AsRef<Path>>(
        &self,
        dem_path: P,
        roughness_path: Option<&Path>,
    ) -> TerrainResult<TerrainProducts> {
        let source = DemReader::read_dem(dem_path, roughness_path)?;
        self.run(source)
    }

    /// Run gap filling, surface derivation and statistics on a loaded source
    pub fn run(&self, source: DemSource) -> TerrainResult<TerrainProducts> {
        let start = Instant::now();
        let DemSource {
            elevation,
            geo_transform,
            crs,
            roughness,
            ..
        } = source;

        if let Some(rough) = &roughness {
            if rough.dim() != elevation.dim() {
                return Err(TerrainError::ShapeMismatch {
                    expected: elevation.dim(),
                    found: rough.dim(),
                });
            }
        }

        let (rows, cols) = elevation.dim();
        log::info!("Starting terrain analysis for {}x{} grid", cols, rows);

        // Fails early on an unusable geotransform, before any filling work
        let engine = DerivedSurfaceEngine::from_config(&self.config, &geo_transform, &crs)?;

        let elevation = self.gap_filler.fill(elevation)?;
        let remaining = missing_count(&elevation);
        if remaining > 0 {
            log::warn!("{} pixels remain missing and will propagate to all products", remaining);
        }

        let DerivedSurfaces {
            slope,
            aspect,
            hillshade,
        } = engine.compute(&elevation)?;

        let statistics = StatisticsReporter::report(&elevation, &slope);

        log::info!("Terrain analysis completed in {:.2?}", start.elapsed());

        Ok(TerrainProducts {
            elevation,
            slope,
            aspect,
            hillshade,
            roughness,
            geo_transform,
            crs,
            statistics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::gap_fill::GlobalMeanInterpolator;
    use ndarray::Array2;

    fn source(elevation: ElevationGrid) -> DemSource {
        DemSource::from_grid(
            elevation,
            GeoTransform::from_coefficients([0.0, 30.0, 0.0, 0.0, 0.0, -30.0]),
            CrsTag::Unknown,
        )
    }

    #[test]
    fn test_run_preserves_shape() {
        let dem = Array2::from_shape_fn((7, 9), |(i, j)| (i as f32).powi(2) + j as f32);
        let products = TerrainPipeline::new(TerrainConfig::default())
            .unwrap()
            .run(source(dem))
            .unwrap();

        assert_eq!(products.elevation.dim(), (7, 9));
        assert_eq!(products.slope.dim(), (7, 9));
        assert_eq!(products.aspect.dim(), (7, 9));
        assert_eq!(products.hillshade.dim(), (7, 9));
        assert_eq!(products.statistics.histogram.total(), 63);
    }

    #[test]
    fn test_custom_interpolator() {
        let mut dem = Array2::from_elem((3, 3), 4.0f32);
        dem[[0, 0]] = f32::NAN;
        dem[[1, 1]] = 8.0;

        let pipeline = TerrainPipeline::new(TerrainConfig::default())
            .unwrap()
            .with_interpolator(Box::new(GlobalMeanInterpolator));
        let products = pipeline.run(source(dem)).unwrap();
        assert_eq!(products.elevation[[0, 0]], 4.5);
    }

    #[test]
    fn test_roughness_shape_checked() {
        let mut src = source(Array2::zeros((2, 2)));
        src.roughness = Some(Array2::zeros((3, 2)));
        let result = TerrainPipeline::new(TerrainConfig::default()).unwrap().run(src);
        assert!(matches!(result, Err(TerrainError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_invalid_geotransform() {
        let src = DemSource::from_grid(
            Array2::zeros((2, 2)),
            GeoTransform::from_coefficients([0.0; 6]),
            CrsTag::Unknown,
        );
        let result = TerrainPipeline::new(TerrainConfig::default()).unwrap().run(src);
        assert!(matches!(result, Err(TerrainError::InvalidGeoTransform(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TerrainConfig::default();
        config.gap_fill.method = "kriging".to_string();
        assert!(TerrainPipeline::new(config).is_err());
    }
}
