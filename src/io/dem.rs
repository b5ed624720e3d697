use crate::io::ascii_grid::parse_ascii_grid;
use crate::types::{
    CrsTag, ElevationGrid, GeoTransform, RoughnessGrid, TerrainError, TerrainResult,
};
use ndarray::Array2;
use std::path::Path;

/// Elevation source as handed to the processing pipeline
#[derive(Debug, Clone)]
pub struct DemSource {
    /// Elevation in meters, NaN where missing
    pub elevation: ElevationGrid,
    pub geo_transform: GeoTransform,
    pub crs: CrsTag,
    /// No-data sentinel declared by the source, if any
    pub no_data: Option<f64>,
    pub roughness: Option<RoughnessGrid>,
}

impl DemSource {
    /// Wrap an in-memory grid (already using NaN for missing cells)
    pub fn from_grid(elevation: ElevationGrid, geo_transform: GeoTransform, crs: CrsTag) -> Self {
        Self {
            elevation,
            geo_transform,
            crs,
            no_data: None,
            roughness: None,
        }
    }

    pub fn with_roughness(mut self, roughness: RoughnessGrid) -> TerrainResult<Self> {
        if roughness.dim() != self.elevation.dim() {
            return Err(TerrainError::ShapeMismatch {
                expected: self.elevation.dim(),
                found: roughness.dim(),
            });
        }
        self.roughness = Some(roughness);
        Ok(self)
    }
}

/// Single-band raster as read from storage
struct RasterBand {
    data: Array2<f32>,
    geo_transform: GeoTransform,
    crs: CrsTag,
    no_data: Option<f64>,
}

/// Digital Elevation Model reader
pub struct DemReader;

impl DemReader {
    /// Read the elevation grid and, when present, the roughness grid
    ///
    /// A roughness path that does not exist is skipped, not an error.
    pub fn read_dem<P: AsRef<Path>>(
        dem_path: P,
        roughness_path: Option<&Path>,
    ) -> TerrainResult<DemSource> {
        let dem_path = dem_path.as_ref();
        log::info!("Reading DEM from: {}", dem_path.display());

        if !dem_path.exists() {
            return Err(TerrainError::NotFound(dem_path.to_path_buf()));
        }

        let band = Self::read_band(dem_path)?;
        let (height, width) = band.data.dim();
        log::debug!("DEM size: {}x{}", width, height);
        log::debug!("DEM geotransform: {:?}", band.geo_transform);
        log::debug!("DEM CRS: {}", band.crs);

        let mut elevation = band.data;
        let missing = Self::mask_no_data(&mut elevation, band.no_data);
        log::info!(
            "Found {} missing pixels in DEM ({:.2}%)",
            missing,
            (missing as f64 / (height * width) as f64) * 100.0
        );

        let roughness = match roughness_path {
            Some(path) if path.exists() => {
                log::info!("Reading roughness from: {}", path.display());
                let mut rough = Self::read_band(path)?;
                if rough.data.dim() != elevation.dim() {
                    return Err(TerrainError::ShapeMismatch {
                        expected: elevation.dim(),
                        found: rough.data.dim(),
                    });
                }
                Self::mask_no_data(&mut rough.data, rough.no_data);
                Some(rough.data)
            }
            Some(path) => {
                log::warn!("Roughness source {} not found, continuing without it", path.display());
                None
            }
            None => None,
        };

        Ok(DemSource {
            elevation,
            geo_transform: band.geo_transform,
            crs: band.crs,
            no_data: band.no_data,
            roughness,
        })
    }

    /// Replace no-data sentinels and non-finite values with NaN, returning the
    /// missing count
    pub fn mask_no_data(grid: &mut Array2<f32>, no_data: Option<f64>) -> usize {
        let sentinel = no_data.map(|v| v as f32);
        let mut missing = 0;

        for value in grid.iter_mut() {
            let is_sentinel = sentinel.map_or(false, |s| *value == s);
            if is_sentinel || !value.is_finite() {
                *value = f32::NAN;
                missing += 1;
            }
        }

        missing
    }

    fn read_band(path: &Path) -> TerrainResult<RasterBand> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extension == "asc" {
            return Self::read_ascii_band(path);
        }

        Self::read_gdal_band(path)
    }

    fn read_ascii_band(path: &Path) -> TerrainResult<RasterBand> {
        let text = std::fs::read_to_string(path)?;
        let grid = parse_ascii_grid(&text, &path.display().to_string())?;

        // CRS lives in a sibling .prj (WKT) when present
        let prj_path = path.with_extension("prj");
        let crs = if prj_path.exists() {
            CrsTag::from_definition(&std::fs::read_to_string(&prj_path)?)
        } else {
            CrsTag::Unknown
        };

        Ok(RasterBand {
            data: grid.data,
            geo_transform: grid.geo_transform,
            crs,
            no_data: grid.no_data,
        })
    }

    #[cfg(feature = "gdal")]
    fn read_gdal_band(path: &Path) -> TerrainResult<RasterBand> {
        use gdal::Dataset;

        // Open DEM file with GDAL
        let dataset = Dataset::open(path)?;

        let geo_transform = dataset.geo_transform()?;
        let (width, height) = dataset.raster_size();
        if width == 0 || height == 0 {
            return Err(TerrainError::Decode {
                path: path.display().to_string(),
                reason: format!("Raster has invalid dimensions: {}x{}", width, height),
            });
        }

        // Read elevation data from first band
        let rasterband = dataset.rasterband(1)?;
        let no_data = rasterband.no_data_value();
        let band_data = rasterband.read_as::<f32>((0, 0), (width, height), (width, height), None)?;

        let data = Array2::from_shape_vec((height, width), band_data.data).map_err(|e| {
            TerrainError::Decode {
                path: path.display().to_string(),
                reason: format!("Failed to reshape raster data: {}", e),
            }
        })?;

        Ok(RasterBand {
            data,
            geo_transform: GeoTransform::from_coefficients(geo_transform),
            crs: CrsTag::from_definition(&dataset.projection()),
            no_data,
        })
    }

    #[cfg(not(feature = "gdal"))]
    fn read_gdal_band(path: &Path) -> TerrainResult<RasterBand> {
        Err(TerrainError::UnsupportedFormat(format!(
            "{} (only ESRI ASCII grids are read natively; \
             enable the `gdal` feature for other formats)",
            path.display()
        )))
    }
}
