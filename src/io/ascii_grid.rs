//! Native ESRI ASCII grid decoding
//!
//! Header keys are case-insensitive; both corner and center registration are
//! accepted. Rows are stored top to bottom.

use crate::types::{ElevationGrid, GeoTransform, TerrainError, TerrainResult};
use ndarray::Array2;

/// Decoded ASCII grid
#[derive(Debug, Clone)]
pub struct AsciiGrid {
    pub data: ElevationGrid,
    pub geo_transform: GeoTransform,
    pub no_data: Option<f64>,
}

#[derive(Debug, Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xll: Option<(f64, bool)>, // (value, is_center)
    yll: Option<(f64, bool)>,
    cellsize: Option<f64>,
    dx: Option<f64>,
    dy: Option<f64>,
    no_data: Option<f64>,
}

/// Parse an ASCII grid document. `source` names the resource in error messages.
pub fn parse_ascii_grid(text: &str, source: &str) -> TerrainResult<AsciiGrid> {
    let decode_error = |reason: String| TerrainError::Decode {
        path: source.to_string(),
        reason,
    };

    let mut header = Header::default();
    let mut tokens = text.split_whitespace().peekable();

    // Header: key/value pairs until the first numeric token
    while let Some(&token) = tokens.peek() {
        if token.parse::<f64>().is_ok() {
            break;
        }
        let key = token.to_lowercase();
        tokens.next();
        let value = tokens
            .next()
            .ok_or_else(|| decode_error(format!("Missing value for header key '{}'", key)))?;

        let number = value
            .parse::<f64>()
            .map_err(|_| {
                decode_error(format!("Invalid value '{}' for header key '{}'", value, key))
            })?;

        match key.as_str() {
            "ncols" => header.ncols = Some(parse_dimension(number, &key).map_err(decode_error)?),
            "nrows" => header.nrows = Some(parse_dimension(number, &key).map_err(decode_error)?),
            "xllcorner" => header.xll = Some((number, false)),
            "xllcenter" => header.xll = Some((number, true)),
            "yllcorner" => header.yll = Some((number, false)),
            "yllcenter" => header.yll = Some((number, true)),
            "cellsize" => header.cellsize = Some(number),
            "dx" => header.dx = Some(number),
            "dy" => header.dy = Some(number),
            "nodata_value" => header.no_data = Some(number),
            _ => return Err(decode_error(format!("Unknown header key '{}'", key))),
        }
    }

    let ncols = header.ncols.ok_or_else(|| decode_error("Missing 'ncols'".to_string()))?;
    let nrows = header.nrows.ok_or_else(|| decode_error("Missing 'nrows'".to_string()))?;
    let (xll, x_center) = header
        .xll
        .ok_or_else(|| decode_error("Missing 'xllcorner'".to_string()))?;
    let (yll, y_center) = header
        .yll
        .ok_or_else(|| decode_error("Missing 'yllcorner'".to_string()))?;

    let (dx, dy) = match (header.cellsize, header.dx, header.dy) {
        (Some(size), _, _) => (size, size),
        (None, Some(dx), Some(dy)) => (dx, dy),
        _ => return Err(decode_error("Missing 'cellsize'".to_string())),
    };
    if !(dx.is_finite() && dx > 0.0 && dy.is_finite() && dy > 0.0) {
        return Err(decode_error(format!("Cell size must be positive, got {} x {}", dx, dy)));
    }

    let expected = nrows
        .checked_mul(ncols)
        .ok_or_else(|| decode_error(format!("Grid of {} x {} cells is too large", nrows, ncols)))?;

    let mut values = Vec::new();
    for token in tokens {
        let value = token
            .parse::<f32>()
            .map_err(|_| decode_error(format!("Invalid cell value '{}'", token)))?;
        values.push(value);
    }

    if values.len() != expected {
        return Err(decode_error(format!(
            "Expected {} cell values ({} x {}), found {}",
            expected,
            nrows,
            ncols,
            values.len()
        )));
    }

    let data = Array2::from_shape_vec((nrows, ncols), values)?;

    let left = if x_center { xll - dx / 2.0 } else { xll };
    let bottom = if y_center { yll - dy / 2.0 } else { yll };

    let geo_transform = GeoTransform {
        top_left_x: left,
        pixel_width: dx,
        rotation_x: 0.0,
        top_left_y: bottom + nrows as f64 * dy,
        rotation_y: 0.0,
        pixel_height: -dy,
    };

    Ok(AsciiGrid {
        data,
        geo_transform,
        no_data: header.no_data,
    })
}

fn parse_dimension(value: f64, key: &str) -> Result<usize, String> {
    if value.fract() != 0.0 || value < 1.0 {
        return Err(format!("'{}' must be a positive integer, got {}", key, value));
    }
    Ok(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_corner_registered_grid() {
        let text = "ncols 3\nnrows 2\nxllcorner 100.0\nyllcorner 200.0\ncellsize 10\n\
                    NODATA_value -9999\n1 2 3\n4 -9999 6\n";
        let grid = parse_ascii_grid(text, "test.asc").unwrap();

        assert_eq!(grid.data.dim(), (2, 3));
        assert_eq!(grid.data[[0, 2]], 3.0);
        assert_eq!(grid.data[[1, 1]], -9999.0);
        assert_eq!(grid.no_data, Some(-9999.0));
        assert_eq!(grid.geo_transform.top_left_x, 100.0);
        assert_eq!(grid.geo_transform.top_left_y, 220.0);
        assert_eq!(grid.geo_transform.pixel_width, 10.0);
        assert_eq!(grid.geo_transform.pixel_height, -10.0);
    }

    #[test]
    fn test_parse_center_registered_grid() {
        let text = "NCOLS 2\nNROWS 2\nXLLCENTER 0.5\nYLLCENTER 0.5\nCELLSIZE 1\n1 2\n3 4\n";
        let grid = parse_ascii_grid(text, "center.asc").unwrap();

        assert_eq!(grid.no_data, None);
        assert_eq!(grid.geo_transform.top_left_x, 0.0);
        assert_eq!(grid.geo_transform.top_left_y, 2.0);
    }

    #[test]
    fn test_value_count_mismatch() {
        let text = "ncols 2\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2 3\n";
        let err = parse_ascii_grid(text, "short.asc").unwrap_err();
        assert!(matches!(err, TerrainError::Decode { .. }));
        assert!(err.to_string().contains("short.asc"));
    }

    #[test]
    fn test_oversized_header_is_decode_error() {
        let text = "ncols 100000000000\nnrows 100000000000\nxllcorner 0\nyllcorner 0\n\
                    cellsize 1\n1 2 3\n";
        let err = parse_ascii_grid(text, "huge.asc").unwrap_err();
        assert!(matches!(err, TerrainError::Decode { .. }));
        assert!(err.to_string().contains("huge.asc"));
    }

    #[test]
    fn test_missing_header_key() {
        let text = "ncols 2\nxllcorner 0\nyllcorner 0\ncellsize 1\n1 2\n";
        assert!(parse_ascii_grid(text, "bad.asc").is_err());
    }

    #[test]
    fn test_garbage_cell_value() {
        let text = "ncols 1\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nabc\n";
        assert!(parse_ascii_grid(text, "bad.asc").is_err());
    }
}
