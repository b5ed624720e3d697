//! Core terrain processing modules

pub mod clough_tocher;
pub mod composite;
pub mod gap_fill;
pub mod smoothing;
pub mod statistics;
pub mod surfaces;
pub mod triangulation;

// Re-export main types
pub use clough_tocher::CloughTocherSurface;
pub use composite::{color_index, decimate};
pub use gap_fill::{
    CloughTocherInterpolator, GapFiller, GlobalMeanInterpolator, NeighborAverageInterpolator,
    VoidInterpolator,
};
pub use smoothing::gaussian_smooth;
pub use statistics::{
    SlopeClass, SlopeClassHistogram, StatisticsReporter, TerrainStatistics, ValueSummary,
};
pub use surfaces::{pixel_scale, DerivedSurfaceEngine, DerivedSurfaces};
pub use triangulation::Triangulation;
