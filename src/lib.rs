//! terrashade: terrain analysis for digital elevation models
//!
//! Reads a single-band elevation grid, fills voids by scattered-data
//! interpolation and derives slope, aspect and hillshade surfaces together
//! with summary statistics.

pub mod config;
pub mod core;
pub mod io;
mod maybe_rayon;
pub mod pipeline;
pub mod types;

#[cfg(feature = "python")]
mod python;

// Re-export main types and functions for easier access
pub use config::{GapFillMethod, GapFillParams, IlluminationParams, TerrainConfig};
pub use crate::core::{
    color_index, decimate, DerivedSurfaceEngine, DerivedSurfaces, GapFiller, SlopeClass,
    SlopeClassHistogram, StatisticsReporter, TerrainStatistics, ValueSummary, VoidInterpolator,
};
pub use io::{DemReader, DemSource};
pub use pipeline::{TerrainPipeline, TerrainProducts};
pub use types::{
    AspectGrid, CrsTag, ElevationGrid, GeoTransform, HillshadeGrid, RoughnessGrid, SlopeGrid,
    TerrainError, TerrainResult,
};
