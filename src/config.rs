//! Processing configuration
//!
//! Parameters can be built in code or read from a small XML document:
//!
//! ```xml
//! <terrain smoothingSigma="1.0" degreesToMeters="111000">
//!     <illumination azimuth="315" altitude="45"/>
//!     <gapFill minValidFraction="0.5" method="clough-tocher"/>
//! </terrain>
//! ```

use crate::types::{TerrainError, TerrainResult};
use quick_xml::de::from_str;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Sun position used for hillshading (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IlluminationParams {
    /// Sun compass bearing in degrees (0 = North, clockwise)
    #[serde(rename = "@azimuth")]
    pub azimuth: f64,
    /// Sun elevation above the horizon in degrees
    #[serde(rename = "@altitude")]
    pub altitude: f64,
}

impl Default for IlluminationParams {
    fn default() -> Self {
        Self {
            azimuth: 315.0,   // NW illumination
            altitude: 45.0,
        }
    }
}

/// Available void interpolation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapFillMethod {
    /// Triangulated piecewise cubic with global-mean fallback outside the hull
    CloughTocher,
    /// Iterative 8-neighbour averaging
    NeighborAverage,
    /// Every void receives the mean of valid cells
    GlobalMean,
}

impl FromStr for GapFillMethod {
    type Err = TerrainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clough-tocher" | "cubic" => Ok(GapFillMethod::CloughTocher),
            "neighbor-average" | "neighbour-average" => Ok(GapFillMethod::NeighborAverage),
            "global-mean" | "mean" => Ok(GapFillMethod::GlobalMean),
            other => Err(TerrainError::Config(format!("Unknown gap fill method: {}", other))),
        }
    }
}

impl std::fmt::Display for GapFillMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GapFillMethod::CloughTocher => write!(f, "clough-tocher"),
            GapFillMethod::NeighborAverage => write!(f, "neighbor-average"),
            GapFillMethod::GlobalMean => write!(f, "global-mean"),
        }
    }
}

/// Void filling parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GapFillParams {
    /// Filling is skipped when the valid fraction is below this value
    #[serde(rename = "@minValidFraction")]
    pub min_valid_fraction: f64,
    /// Interpolation method name, see [`GapFillMethod`]
    #[serde(rename = "@method")]
    pub method: String,
}

impl Default for GapFillParams {
    fn default() -> Self {
        Self {
            min_valid_fraction: 0.5,
            method: GapFillMethod::CloughTocher.to_string(),
        }
    }
}

impl GapFillParams {
    pub fn method(&self) -> TerrainResult<GapFillMethod> {
        self.method.parse()
    }
}

/// Complete terrain processing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    pub illumination: IlluminationParams,
    #[serde(rename = "gapFill")]
    pub gap_fill: GapFillParams,
    /// Gaussian kernel standard deviation in pixels for the slope pass
    #[serde(rename = "@smoothingSigma")]
    pub smoothing_sigma: f64,
    /// Meters per degree for geographic grids (latitude independent)
    #[serde(rename = "@degreesToMeters")]
    pub degrees_to_meters: f64,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            illumination: IlluminationParams::default(),
            gap_fill: GapFillParams::default(),
            smoothing_sigma: 1.0,
            degrees_to_meters: 111_000.0,
        }
    }
}

impl TerrainConfig {
    /// Parse configuration from an XML document
    pub fn from_xml_str(xml: &str) -> TerrainResult<Self> {
        let config: TerrainConfig = from_str(xml).map_err(|e| {
            TerrainError::XmlParsing(format!("Failed to parse terrain config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from an XML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> TerrainResult<Self> {
        log::debug!("Reading terrain config from: {}", path.as_ref().display());
        let xml = std::fs::read_to_string(path.as_ref())?;
        Self::from_xml_str(&xml)
    }

    pub fn validate(&self) -> TerrainResult<()> {
        let altitude = self.illumination.altitude;
        if !altitude.is_finite() || !(0.0..=90.0).contains(&altitude) {
            return Err(TerrainError::Config(format!(
                "Sun altitude must be within [0, 90] degrees, got {}",
                altitude
            )));
        }
        if !self.illumination.azimuth.is_finite() {
            return Err(TerrainError::Config("Sun azimuth must be finite".to_string()));
        }
        if !(self.smoothing_sigma.is_finite() && self.smoothing_sigma > 0.0) {
            return Err(TerrainError::Config(format!(
                "Smoothing sigma must be positive, got {}",
                self.smoothing_sigma
            )));
        }
        if !(self.degrees_to_meters.is_finite() && self.degrees_to_meters > 0.0) {
            return Err(TerrainError::Config(format!(
                "Degree to meter factor must be positive, got {}",
                self.degrees_to_meters
            )));
        }
        let fraction = self.gap_fill.min_valid_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(TerrainError::Config(format!(
                "Minimum valid fraction must be within [0, 1], got {}",
                fraction
            )));
        }
        self.gap_fill.method()?;
        Ok(())
    }
}
