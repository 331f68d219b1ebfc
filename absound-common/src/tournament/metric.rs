//! Advisory confidence metric
//!
//! Weighted sum of three components, clamped to [0, 1]:
//!
//! | Component | Definition | Default weight |
//! |---|---|---|
//! | coverage | distinct samples in resolved matches / catalog size | 0.6 |
//! | depth | min(1, resolved matches / (target per sample * catalog size)) | 0.3 |
//! | showdown progress | resolved / queued showdown matches, showdown phase only | 0.1 |
//!
//! The engine never acts on this value; it is surfaced so the operator can
//! decide when to stop.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::TournamentSettings;

use super::state::{Phase, TournamentState};

/// Metric components and their weighted, clamped total
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricBreakdown {
    /// Fraction of the catalog seen in at least one resolved match
    pub coverage: f64,
    /// Resolved matches relative to the depth target, capped at 1
    pub depth: f64,
    /// Fraction of the showdown bracket resolved (0 outside showdown)
    pub showdown_progress: f64,
    /// Weighted sum in [0, 1]
    pub total: f64,
}

impl MetricBreakdown {
    fn zero() -> Self {
        Self {
            coverage: 0.0,
            depth: 0.0,
            showdown_progress: 0.0,
            total: 0.0,
        }
    }
}

/// Compute the metric for `state` over a catalog of `catalog_size` samples
pub(crate) fn compute(
    state: &TournamentState,
    catalog_size: usize,
    settings: &TournamentSettings,
) -> MetricBreakdown {
    if catalog_size == 0 {
        return MetricBreakdown::zero();
    }
    let n = catalog_size as f64;

    let touched: HashSet<&str> = state
        .history
        .iter()
        .flat_map(|m| [m.a.as_str(), m.b.as_str()])
        .collect();
    let coverage = (touched.len() as f64 / n).min(1.0);

    let depth = (state.history.len() as f64 / (settings.depth_target_per_sample * n)).min(1.0);

    let showdown_progress = if state.phase == Phase::Showdown && !state.showdown_queue.is_empty() {
        state.showdown_resolved() as f64 / state.showdown_queue.len() as f64
    } else {
        0.0
    };

    let total = (settings.coverage_weight * coverage
        + settings.depth_weight * depth
        + settings.phase_bonus_weight * showdown_progress)
        .clamp(0.0, 1.0);

    MetricBreakdown {
        coverage,
        depth,
        showdown_progress,
        total,
    }
}
