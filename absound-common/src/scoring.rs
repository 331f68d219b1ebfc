//! Score aggregation over match history
//!
//! Scores are never stored. They are recomputed from the resolved history
//! on every call, so they cannot drift from the source of truth.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::{Sample, SampleId};
use crate::tournament::{Match, Outcome};

/// Win/loss/tie tally for one sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreEntry {
    pub sample_id: SampleId,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    /// wins + 0.5 * ties
    pub score: f64,
}

impl ScoreEntry {
    fn zero(sample_id: &str) -> Self {
        Self {
            sample_id: sample_id.to_string(),
            wins: 0,
            losses: 0,
            ties: 0,
            score: 0.0,
        }
    }

    /// Number of resolved matches this sample took part in
    pub fn played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

/// Tally every sample in catalog order
///
/// Matches with an endpoint outside the catalog, and unresolved matches,
/// are skipped. A winner id naming neither endpoint counts as nothing.
pub fn compute_scores(samples: &[Sample], history: &[Match]) -> Vec<ScoreEntry> {
    let mut entries: Vec<ScoreEntry> = samples.iter().map(|s| ScoreEntry::zero(&s.id)).collect();
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(samples.len());
    for (i, s) in samples.iter().enumerate() {
        index.entry(s.id.as_str()).or_insert(i);
    }

    for m in history {
        let (Some(&ia), Some(&ib)) = (index.get(m.a.as_str()), index.get(m.b.as_str())) else {
            continue;
        };
        match &m.winner {
            Some(Outcome::Tie) => {
                entries[ia].ties += 1;
                entries[ib].ties += 1;
            }
            Some(Outcome::Winner(w)) if *w == m.a => {
                entries[ia].wins += 1;
                entries[ib].losses += 1;
            }
            Some(Outcome::Winner(w)) if *w == m.b => {
                entries[ib].wins += 1;
                entries[ia].losses += 1;
            }
            _ => {}
        }
    }

    for e in &mut entries {
        e.score = e.wins as f64 + 0.5 * e.ties as f64;
    }
    entries
}

/// Sort by score descending; equal scores keep their input order
pub fn rank(mut entries: Vec<ScoreEntry>) -> Vec<ScoreEntry> {
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    entries
}

/// Ranked scores of the samples that have played at least once
pub fn top_performers(samples: &[Sample], history: &[Match], limit: usize) -> Vec<ScoreEntry> {
    rank(compute_scores(samples, history))
        .into_iter()
        .filter(|e| e.played() > 0)
        .take(limit)
        .collect()
}

/// One leaderboard row: rank, tally, and the sample's parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    #[serde(flatten)]
    pub score: ScoreEntry,
    pub file: String,
    pub exaggeration: f64,
    pub cfg: f64,
    pub temp: f64,
}

/// Full ranking of the catalog, including samples that have not played yet
pub fn leaderboard(samples: &[Sample], history: &[Match]) -> Vec<LeaderboardEntry> {
    let by_id: HashMap<&str, &Sample> = samples.iter().map(|s| (s.id.as_str(), s)).collect();

    rank(compute_scores(samples, history))
        .into_iter()
        .enumerate()
        .filter_map(|(i, score)| {
            let sample = by_id.get(score.sample_id.as_str())?;
            Some(LeaderboardEntry {
                rank: i + 1,
                file: sample.file.clone(),
                exaggeration: sample.exaggeration,
                cfg: sample.cfg,
                temp: sample.temp,
                score,
            })
        })
        .collect()
}
