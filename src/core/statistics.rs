//! Terrain summary statistics and slope classification

use crate::types::{ElevationGrid, SlopeGrid};
use std::fmt;

/// Summary of the finite values in a grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub count: usize,
}

impl ValueSummary {
    /// `None` when the grid holds no finite value
    pub fn from_values<'a, I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a f32>,
    {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0;

        for &v in values {
            if !v.is_finite() {
                continue;
            }
            let v = v as f64;
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        if count == 0 {
            return None;
        }
        Some(Self {
            min,
            max,
            mean: sum / count as f64,
            count,
        })
    }
}

/// Fixed slope classes, half-open in degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlopeClass {
    Flat,
    Gentle,
    Moderate,
    Steep,
    VerySteep,
}

impl SlopeClass {
    pub const ALL: [SlopeClass; 5] = [
        SlopeClass::Flat,
        SlopeClass::Gentle,
        SlopeClass::Moderate,
        SlopeClass::Steep,
        SlopeClass::VerySteep,
    ];

    /// Class of a finite slope value
    pub fn classify(slope: f32) -> Self {
        match slope {
            s if s < 5.0 => SlopeClass::Flat,
            s if s < 15.0 => SlopeClass::Gentle,
            s if s < 30.0 => SlopeClass::Moderate,
            s if s < 45.0 => SlopeClass::Steep,
            _ => SlopeClass::VerySteep,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SlopeClass::Flat => "Flat (0-5°)",
            SlopeClass::Gentle => "Gentle (5-15°)",
            SlopeClass::Moderate => "Moderate (15-30°)",
            SlopeClass::Steep => "Steep (30-45°)",
            SlopeClass::VerySteep => "Very steep (>45°)",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

/// Pixel counts per slope class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlopeClassHistogram {
    counts: [usize; 5],
}

impl SlopeClassHistogram {
    pub fn from_slope(slope: &SlopeGrid) -> Self {
        let mut counts = [0usize; 5];
        for &s in slope.iter().filter(|s| s.is_finite()) {
            counts[SlopeClass::classify(s).index()] += 1;
        }
        Self { counts }
    }

    pub fn count(&self, class: SlopeClass) -> usize {
        self.counts[class.index()]
    }

    /// Number of classified (valid) pixels
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Share of valid pixels in percent; 0 when there are none
    pub fn percentage(&self, class: SlopeClass) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.count(class) as f64 / total as f64 * 100.0
    }

    /// `(class, count, percentage)` in class order
    pub fn entries(&self) -> impl Iterator<Item = (SlopeClass, usize, f64)> + '_ {
        SlopeClass::ALL
            .iter()
            .map(move |&class| (class, self.count(class), self.percentage(class)))
    }
}

/// Global statistics over a processed grid
#[derive(Debug, Clone, PartialEq)]
pub struct TerrainStatistics {
    /// (rows, cols)
    pub shape: (usize, usize),
    pub elevation: Option<ValueSummary>,
    pub slope: Option<ValueSummary>,
    pub histogram: SlopeClassHistogram,
}

impl fmt::Display for TerrainStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terrain statistics")?;
        writeln!(f, "  Data size: {} x {}", self.shape.0, self.shape.1)?;

        match &self.elevation {
            Some(e) => {
                writeln!(f, "  Elevation range: {:.2} m to {:.2} m", e.min, e.max)?;
                writeln!(f, "  Mean elevation: {:.2} m", e.mean)?;
            }
            None => writeln!(f, "  Elevation: no data")?,
        }

        match &self.slope {
            Some(s) => {
                writeln!(f, "  Mean slope: {:.2}°", s.mean)?;
                writeln!(f, "  Max slope: {:.2}°", s.max)?;
            }
            None => writeln!(f, "  Slope: no data")?,
        }

        writeln!(f, "Slope distribution")?;
        if self.histogram.total() == 0 {
            writeln!(f, "  no data")?;
        }
        for (class, count, percentage) in self.histogram.entries() {
            writeln!(f, "  {}: {} pixels ({:.2}%)", class.label(), count, percentage)?;
        }
        Ok(())
    }
}

/// Builds and emits [`TerrainStatistics`]
pub struct StatisticsReporter;

impl StatisticsReporter {
    pub fn compute(elevation: &ElevationGrid, slope: &SlopeGrid) -> TerrainStatistics {
        TerrainStatistics {
            shape: elevation.dim(),
            elevation: ValueSummary::from_values(elevation.iter()),
            slope: ValueSummary::from_values(slope.iter()),
            histogram: SlopeClassHistogram::from_slope(slope),
        }
    }

    /// Write the report to the log at info level, one line per entry
    pub fn emit(stats: &TerrainStatistics) {
        for line in stats.to_string().lines() {
            log::info!("{}", line);
        }
    }

    /// Compute, emit and return the statistics
    pub fn report(elevation: &ElevationGrid, slope: &SlopeGrid) -> TerrainStatistics {
        let stats = Self::compute(elevation, slope);
        Self::emit(&stats);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(SlopeClass::classify(0.0), SlopeClass::Flat);
        assert_eq!(SlopeClass::classify(4.999), SlopeClass::Flat);
        assert_eq!(SlopeClass::classify(5.0), SlopeClass::Gentle);
        assert_eq!(SlopeClass::classify(15.0), SlopeClass::Moderate);
        assert_eq!(SlopeClass::classify(30.0), SlopeClass::Steep);
        assert_eq!(SlopeClass::classify(45.0), SlopeClass::VerySteep);
        assert_eq!(SlopeClass::classify(90.0), SlopeClass::VerySteep);
    }

    #[test]
    fn test_histogram_counts_and_percentages() {
        let values = vec![1.0, 6.0, 20.0, 35.0, 60.0, 2.0, f32::NAN, 3.0];
        let slope = Array2::from_shape_vec((2, 4), values).unwrap();
        let histogram = SlopeClassHistogram::from_slope(&slope);

        assert_eq!(histogram.total(), 7);
        assert_eq!(histogram.count(SlopeClass::Flat), 3);
        assert_eq!(histogram.count(SlopeClass::VerySteep), 1);

        let sum: f64 = histogram.entries().map(|(_, _, p)| p).sum();
        assert_abs_diff_eq!(sum, 100.0, epsilon = 1e-6);
        assert_abs_diff_eq!(histogram.percentage(SlopeClass::Flat), 300.0 / 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_summary_ignores_missing() {
        let elevation = Array2::from_shape_vec((1, 4), vec![10.0, f32::NAN, 30.0, 20.0]).unwrap();
        let summary = ValueSummary::from_values(elevation.iter()).unwrap();
        assert_eq!(summary.min, 10.0);
        assert_eq!(summary.max, 30.0);
        assert_eq!(summary.mean, 20.0);
        assert_eq!(summary.count, 3);
    }

    #[test]
    fn test_no_valid_pixels() {
        let empty = Array2::from_elem((2, 2), f32::NAN);
        let stats = StatisticsReporter::compute(&empty, &empty);

        assert!(stats.elevation.is_none());
        assert!(stats.slope.is_none());
        assert_eq!(stats.histogram.total(), 0);
        for (_, count, percentage) in stats.histogram.entries() {
            assert_eq!(count, 0);
            assert_eq!(percentage, 0.0);
        }
        assert!(stats.to_string().contains("no data"));
    }

    #[test]
    fn test_report_text() {
        let elevation = Array2::from_shape_vec((1, 2), vec![100.0, 200.0]).unwrap();
        let slope = Array2::from_shape_vec((1, 2), vec![2.0, 50.0]).unwrap();
        let stats = StatisticsReporter::report(&elevation, &slope);
        let text = stats.to_string();

        assert!(text.contains("Data size: 1 x 2"));
        assert!(text.contains("Elevation range: 100.00 m to 200.00 m"));
        assert!(text.contains("Mean slope: 26.00°"));
        assert!(text.contains("Flat (0-5°): 1 pixels (50.00%)"));
        assert!(text.contains("Very steep (>45°): 1 pixels (50.00%)"));
    }
}
