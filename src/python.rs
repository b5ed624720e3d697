//! Python bindings

use crate::config::TerrainConfig;
use crate::pipeline::TerrainPipeline;
use crate::types::TerrainError;
use numpy::IntoPyArray;
use pyo3::exceptions::{PyFileNotFoundError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;

fn to_py_err(err: TerrainError) -> PyErr {
    match err {
        TerrainError::NotFound(_) => PyFileNotFoundError::new_err(err.to_string()),
        TerrainError::Config(_) => PyValueError::new_err(err.to_string()),
        _ => PyRuntimeError::new_err(err.to_string()),
    }
}

/// Run the full terrain analysis on a DEM file
///
/// Returns a dict with `elevation`, `slope`, `aspect`, `hillshade` (float
/// arrays, NaN where missing), `roughness` (array or None) and `report`.
#[pyfunction]
#[pyo3(signature = (path, roughness_path=None, azimuth=315.0, altitude=45.0))]
fn analyze_dem(
    py: Python<'_>,
    path: &str,
    roughness_path: Option<&str>,
    azimuth: f64,
    altitude: f64,
) -> PyResult<PyObject> {
    let mut config = TerrainConfig::default();
    config.illumination.azimuth = azimuth;
    config.illumination.altitude = altitude;

    let pipeline = TerrainPipeline::new(config).map_err(to_py_err)?;
    let products = pipeline
        .run_from_path(path, roughness_path.map(Path::new))
        .map_err(to_py_err)?;

    let hillshade = products.hillshade.mapv(|h| h.map_or(f32::NAN, f32::from));

    let result = PyDict::new(py);
    result.set_item("elevation", products.elevation.into_pyarray(py))?;
    result.set_item("slope", products.slope.into_pyarray(py))?;
    result.set_item("aspect", products.aspect.into_pyarray(py))?;
    result.set_item("hillshade", hillshade.into_pyarray(py))?;
    match products.roughness {
        Some(roughness) => result.set_item("roughness", roughness.into_pyarray(py))?,
        None => result.set_item("roughness", py.None())?,
    }
    result.set_item("report", products.statistics.to_string())?;

    Ok(result.to_object(py))
}

/// Python module definition
#[pymodule]
fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(analyze_dem, m)?)?;
    Ok(())
}
