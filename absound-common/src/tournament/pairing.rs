//! Pair selection policies
//!
//! - **explore**: uniform random pair over the whole catalog
//! - **refine**: random pair from the neighbourhoods of the current leaders
//! - **showdown**: round-robin brackets over the finalists
//!
//! Random policies skip any pair played in the last `recent_exclusion`
//! matches, retry up to `max_pair_attempts` times, then fall back to the
//! first two entries of their pool.

use std::collections::{HashMap, HashSet};

use rand::Rng;
use tracing::debug;

use crate::catalog::{Sample, SampleId};
use crate::config::TournamentSettings;
use crate::distance::distance;
use crate::scoring::top_performers;

use super::state::Match;

/// Read-only view of everything a policy looks at
pub(crate) struct PairingContext<'a> {
    pub samples: &'a [Sample],
    pub index: &'a HashMap<SampleId, usize>,
    pub history: &'a [Match],
    pub settings: &'a TournamentSettings,
    pub diameter: f64,
}

impl PairingContext<'_> {
    /// Unordered pairs of the most recent matches
    fn recent_pairs(&self) -> HashSet<(&str, &str)> {
        let skip = self.history.len().saturating_sub(self.settings.recent_exclusion);
        self.history[skip..].iter().map(Match::pair_key).collect()
    }

    fn is_recent(&self, recent: &HashSet<(&str, &str)>, i: usize, j: usize) -> bool {
        let (a, b) = (self.samples[i].id.as_str(), self.samples[j].id.as_str());
        let key = if a <= b { (a, b) } else { (b, a) };
        recent.contains(&key)
    }

    /// Draw two distinct entries of `pool`, avoiding recent pairs
    fn pick_from<R: Rng>(&self, pool: &[usize], rng: &mut R) -> Option<(usize, usize)> {
        if pool.len() < 2 {
            return None;
        }

        let recent = self.recent_pairs();
        for _ in 0..self.settings.max_pair_attempts {
            let i = rng.gen_range(0..pool.len());
            let mut j = rng.gen_range(0..pool.len() - 1);
            if j >= i {
                j += 1;
            }
            let (si, sj) = (pool[i], pool[j]);
            if self.samples[si].id != self.samples[sj].id && !self.is_recent(&recent, si, sj) {
                return Some((si, sj));
            }
        }

        debug!(
            pool = pool.len(),
            attempts = self.settings.max_pair_attempts,
            "No fresh pair found, using fallback pair"
        );
        Some((pool[0], pool[1]))
    }
}

/// Explore: any two samples from the full catalog
pub(crate) fn explore_pair<R: Rng>(ctx: &PairingContext<'_>, rng: &mut R) -> Option<(usize, usize)> {
    let pool: Vec<usize> = (0..ctx.samples.len()).collect();
    ctx.pick_from(&pool, rng)
}

/// Samples within the refine radius of any current leader, deduplicated,
/// leaders first in rank order
pub(crate) fn refine_region(ctx: &PairingContext<'_>) -> Vec<usize> {
    let leaders = top_performers(ctx.samples, ctx.history, ctx.settings.refine_top_k);
    if leaders.len() < 2 {
        return Vec::new();
    }

    let threshold = ctx.settings.refine_radius_factor * ctx.diameter;
    let mut seen = HashSet::new();
    let mut region = Vec::new();
    for leader in &leaders {
        let Some(&li) = ctx.index.get(&leader.sample_id) else {
            continue;
        };
        for (si, sample) in ctx.samples.iter().enumerate() {
            if distance(&ctx.samples[li], sample) < threshold && seen.insert(si) {
                region.push(si);
            }
        }
    }
    region
}

/// Refine: two samples from the leaders' neighbourhoods
///
/// Falls back to explore while fewer than two samples have played, or when
/// the region holds fewer than two samples.
pub(crate) fn refine_pair<R: Rng>(ctx: &PairingContext<'_>, rng: &mut R) -> Option<(usize, usize)> {
    let region = refine_region(ctx);
    if region.len() < 2 {
        debug!(region = region.len(), "Refine region too small, exploring instead");
        return explore_pair(ctx, rng);
    }
    debug!(region = region.len(), "Refine region built");
    ctx.pick_from(&region, rng)
}

/// Showdown finalists: the top scorers, or a catalog prefix early on
pub(crate) fn select_finalists(ctx: &PairingContext<'_>) -> Vec<SampleId> {
    let leaders = top_performers(ctx.samples, ctx.history, ctx.settings.showdown_finalists);

    let mut finalists: Vec<SampleId> = if leaders.len() >= 2 {
        leaders.into_iter().map(|e| e.sample_id).collect()
    } else {
        ctx.samples
            .iter()
            .take(ctx.settings.showdown_fallback_size)
            .map(|s| s.id.clone())
            .collect()
    };

    let mut seen = HashSet::new();
    finalists.retain(|id| seen.insert(id.clone()));
    finalists
}

/// Deterministic id of a showdown match: round plus the sorted pair
pub fn showdown_match_id(round: u32, a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("sd{}:{}|{}", round, lo, hi)
}

/// Every unordered pair of `finalists` exactly once, in index order
pub fn round_robin(finalists: &[SampleId], round: u32) -> Vec<Match> {
    let mut bracket = Vec::with_capacity(finalists.len() * finalists.len().saturating_sub(1) / 2);
    for (i, a) in finalists.iter().enumerate() {
        for b in &finalists[i + 1..] {
            bracket.push(Match::new(showdown_match_id(round, a, b), a.clone(), b.clone()));
        }
    }
    bracket
}
