use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Elevation sample type (meters). Missing cells hold NaN.
pub type Elevation = f32;

/// 2D elevation grid (rows x cols)
pub type ElevationGrid = Array2<Elevation>;

/// Slope in degrees from horizontal, [0, 90]
pub type SlopeGrid = Array2<f32>;

/// Aspect in degrees, [0, 360)
pub type AspectGrid = Array2<f32>;

/// Simulated illumination; `None` where the elevation is missing
pub type HillshadeGrid = Array2<Option<u8>>;

/// Auxiliary roughness grid, passed through untouched
pub type RoughnessGrid = Array2<f32>;

/// Coordinate reference system tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CrsTag {
    /// Geographic coordinates (latitude, longitude); pixel scale in degrees
    Geographic { definition: String },
    /// Projected coordinates (e.g., UTM); pixel scale in meters
    Projected { definition: String },
    /// No CRS declared by the source
    Unknown,
}

impl CrsTag {
    /// Classify a CRS identifier (authority code or WKT)
    pub fn from_definition(definition: &str) -> Self {
        let trimmed = definition.trim();
        if trimmed.is_empty() {
            return CrsTag::Unknown;
        }

        let upper = trimmed.to_uppercase();
        let geographic_root = upper.starts_with("GEOGCS[") || upper.starts_with("GEOGCRS[");

        if upper.contains("EPSG:4326") || geographic_root {
            CrsTag::Geographic { definition: trimmed.to_string() }
        } else {
            CrsTag::Projected { definition: trimmed.to_string() }
        }
    }

    /// Whether horizontal units are degrees
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsTag::Geographic { .. })
    }

    pub fn definition(&self) -> Option<&str> {
        match self {
            CrsTag::Geographic { definition } | CrsTag::Projected { definition } => {
                Some(definition)
            }
            CrsTag::Unknown => None,
        }
    }
}

impl std::fmt::Display for CrsTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrsTag::Geographic { definition } => write!(f, "geographic ({})", definition),
            CrsTag::Projected { definition } => write!(f, "projected ({})", definition),
            CrsTag::Unknown => write!(f, "unknown"),
        }
    }
}

/// Geospatial transformation parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the six GDAL-ordered coefficients
    pub fn from_coefficients(gt: [f64; 6]) -> Self {
        Self {
            top_left_x: gt[0],
            pixel_width: gt[1],
            rotation_x: gt[2],
            top_left_y: gt[3],
            rotation_y: gt[4],
            pixel_height: gt[5],
        }
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }

    /// Geographic coordinate of the upper-left corner of pixel (row, col)
    pub fn pixel_to_geo(&self, row: f64, col: f64) -> (f64, f64) {
        let x = self.top_left_x + col * self.pixel_width + row * self.rotation_x;
        let y = self.top_left_y + col * self.rotation_y + row * self.pixel_height;
        (x, y)
    }
}

impl Default for GeoTransform {
    fn default() -> Self {
        Self::from_coefficients([0.0, 1.0, 0.0, 0.0, 0.0, -1.0])
    }
}

/// Error types for terrain processing
#[derive(Debug, thiserror::Error)]
pub enum TerrainError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Elevation source not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to decode raster {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Unsupported raster format: {0}")]
    UnsupportedFormat(String),

    #[error("Grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Invalid geotransform: {0}")]
    InvalidGeoTransform(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("XML parsing error: {0}")]
    XmlParsing(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[cfg(feature = "gdal")]
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
}

/// Result type for terrain operations
pub type TerrainResult<T> = Result<T, TerrainError>;
