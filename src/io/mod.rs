//! Raster input

pub mod ascii_grid;
pub mod dem;

pub use ascii_grid::{parse_ascii_grid, AsciiGrid};
pub use dem::{DemReader, DemSource};
