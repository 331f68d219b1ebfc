//! Parameter-space geometry
//!
//! Distances are plain Euclidean over the raw (exaggeration, cfg, temp)
//! values. No per-axis normalization is applied.

use serde::Serialize;

use crate::catalog::Sample;

/// Min/max of one parameter axis across the catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

impl AxisRange {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Per-axis ranges of the whole catalog
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRanges {
    pub exaggeration: AxisRange,
    pub cfg: AxisRange,
    pub temp: AxisRange,
}

/// Euclidean distance between two samples in parameter space
pub fn distance(a: &Sample, b: &Sample) -> f64 {
    a.params()
        .iter()
        .zip(b.params().iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Per-axis min/max, or `None` for an empty catalog
pub fn parameter_ranges(samples: &[Sample]) -> Option<ParameterRanges> {
    let first = samples.first()?;
    let seed = |v: f64| AxisRange { min: v, max: v };
    let widen = |r: AxisRange, v: f64| AxisRange {
        min: r.min.min(v),
        max: r.max.max(v),
    };

    let mut ranges = ParameterRanges {
        exaggeration: seed(first.exaggeration),
        cfg: seed(first.cfg),
        temp: seed(first.temp),
    };
    for s in &samples[1..] {
        ranges.exaggeration = widen(ranges.exaggeration, s.exaggeration);
        ranges.cfg = widen(ranges.cfg, s.cfg);
        ranges.temp = widen(ranges.temp, s.temp);
    }
    Some(ranges)
}

/// Diameter of the parameter space: norm of the per-axis spans
///
/// Returns 0.0 for an empty catalog or one where every sample shares the
/// same parameters.
pub fn parameter_space_diameter(samples: &[Sample]) -> f64 {
    match parameter_ranges(samples) {
        Some(r) => {
            let (e, c, t) = (r.exaggeration.span(), r.cfg.span(), r.temp.span());
            (e * e + c * c + t * t).sqrt()
        }
        None => 0.0,
    }
}
