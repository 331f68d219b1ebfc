//! Persisted tournament state
//!
//! The whole [`TournamentState`] is serialized as one JSON blob under a
//! versioned storage key. Field names are camelCase so blobs exported from
//! earlier browser sessions load without translation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::SampleId;

/// Literal used for a tied vote in the persisted format
pub const TIE: &str = "tie";

/// Phase of the adaptive schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Explore,
    Refine,
    Showdown,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Explore => "explore",
            Phase::Refine => "refine",
            Phase::Showdown => "showdown",
            Phase::Complete => "complete",
        }
    }

    /// Parse the persisted lowercase name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "explore" => Some(Phase::Explore),
            "refine" => Some(Phase::Refine),
            "showdown" => Some(Phase::Showdown),
            "complete" => Some(Phase::Complete),
            _ => None,
        }
    }

    /// Successor phase. `Complete` is terminal.
    pub fn next(self) -> Self {
        match self {
            Phase::Explore => Phase::Refine,
            Phase::Refine => Phase::Showdown,
            Phase::Showdown | Phase::Complete => Phase::Complete,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a vote
///
/// Serialized as the winning sample id, or the literal `"tie"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Outcome {
    Winner(SampleId),
    Tie,
}

impl Outcome {
    pub fn winner(&self) -> Option<&str> {
        match self {
            Outcome::Winner(id) => Some(id),
            Outcome::Tie => None,
        }
    }
}

impl From<String> for Outcome {
    fn from(value: String) -> Self {
        if value == TIE {
            Outcome::Tie
        } else {
            Outcome::Winner(value)
        }
    }
}

impl From<&str> for Outcome {
    fn from(value: &str) -> Self {
        Outcome::from(value.to_string())
    }
}

impl From<Outcome> for String {
    fn from(value: Outcome) -> Self {
        match value {
            Outcome::Winner(id) => id,
            Outcome::Tie => TIE.to_string(),
        }
    }
}

/// A pairing of two samples, pending until a vote stamps `winner` and `timestamp`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub a: SampleId,
    pub b: SampleId,
    #[serde(default)]
    pub winner: Option<Outcome>,
    /// Vote time in Unix epoch milliseconds
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl Match {
    /// New pending match
    pub fn new(id: impl Into<String>, a: impl Into<SampleId>, b: impl Into<SampleId>) -> Self {
        Self {
            id: id.into(),
            a: a.into(),
            b: b.into(),
            winner: None,
            timestamp: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.winner.is_some()
    }

    /// True if this match pits `x` against `y` in either order
    pub fn is_pair(&self, x: &str, y: &str) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    /// Endpoints ordered lexicographically
    pub fn pair_key(&self) -> (&str, &str) {
        if self.a <= self.b {
            (&self.a, &self.b)
        } else {
            (&self.b, &self.a)
        }
    }

    fn references_only(&self, known: &HashSet<&str>) -> bool {
        known.contains(self.a.as_str()) && known.contains(self.b.as_str())
    }
}

/// Complete engine state, persisted as a single blob
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub phase: Phase,
    pub matches_played: usize,
    pub phase_matches: usize,
    #[serde(default)]
    pub history: Vec<Match>,
    #[serde(default)]
    pub current_match: Option<Match>,
    /// Showdown finalists
    #[serde(default)]
    pub candidates: Vec<SampleId>,
    /// Round-robin brackets, appended round after round
    #[serde(default)]
    pub showdown_queue: Vec<Match>,
    /// Win streak of the most recent non-tie winner
    #[serde(default)]
    pub consecutive_wins: u32,
    /// Number of showdown brackets generated so far
    #[serde(default)]
    pub showdown_round: u32,
}

impl Default for TournamentState {
    fn default() -> Self {
        Self {
            phase: Phase::Explore,
            matches_played: 0,
            phase_matches: 0,
            history: Vec::new(),
            current_match: None,
            candidates: Vec::new(),
            showdown_queue: Vec::new(),
            consecutive_wins: 0,
            showdown_round: 0,
        }
    }
}

impl TournamentState {
    /// Drop every reference to a sample outside `known`
    ///
    /// History and queue entries with an unknown endpoint are removed, a
    /// pending match with an unknown endpoint is discarded, and unknown
    /// finalists are dropped. `matchesPlayed` is re-derived from the
    /// surviving history so it always equals the history length.
    ///
    /// Returns the number of matches removed.
    pub fn retain_known(&mut self, known: &HashSet<&str>) -> usize {
        let before = self.history.len() + self.showdown_queue.len();

        self.history.retain(|m| m.is_resolved() && m.references_only(known));
        self.showdown_queue.retain(|m| m.references_only(known));
        self.candidates.retain(|id| known.contains(id.as_str()));

        let mut removed = before - self.history.len() - self.showdown_queue.len();

        if let Some(current) = &self.current_match {
            let stale = !current.references_only(known)
                || self.history.iter().any(|m| m.id == current.id);
            if stale {
                self.current_match = None;
                removed += 1;
            }
        }

        self.matches_played = self.history.len();
        self.phase_matches = self.phase_matches.min(self.matches_played);
        removed
    }

    /// Resolved entries of the showdown bracket
    pub fn showdown_resolved(&self) -> usize {
        self.showdown_queue.iter().filter(|m| m.is_resolved()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(id: &str, a: &str, b: &str, winner: &str) -> Match {
        let mut m = Match::new(id, a, b);
        m.winner = Some(Outcome::from(winner));
        m.timestamp = Some(1);
        m
    }

    #[test]
    fn test_outcome_serializes_as_plain_string() {
        let tie = serde_json::to_string(&Outcome::Tie).unwrap();
        assert_eq!(tie, "\"tie\"");
        let win: Outcome = serde_json::from_str("\"sample_e1_cfg1_t1\"").unwrap();
        assert_eq!(win, Outcome::Winner("sample_e1_cfg1_t1".to_string()));
    }

    #[test]
    fn test_state_uses_camel_case_fields() {
        let mut state = TournamentState::default();
        state.current_match = Some(Match::new("m1", "x", "y"));
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["phase"], "explore");
        assert_eq!(json["matchesPlayed"], 0);
        assert_eq!(json["phaseMatches"], 0);
        assert_eq!(json["currentMatch"]["winner"], serde_json::Value::Null);
        assert!(json["showdownQueue"].is_array());
    }

    #[test]
    fn test_phase_progression_is_linear() {
        assert_eq!(Phase::Explore.next(), Phase::Refine);
        assert_eq!(Phase::Refine.next(), Phase::Showdown);
        assert_eq!(Phase::Showdown.next(), Phase::Complete);
        assert_eq!(Phase::Complete.next(), Phase::Complete);
        assert_eq!(Phase::from_name("refine"), Some(Phase::Refine));
        assert_eq!(Phase::from_name("Refine"), None);
    }

    #[test]
    fn test_pair_helpers() {
        let m = Match::new("m", "b", "a");
        assert!(m.is_pair("a", "b"));
        assert!(m.is_pair("b", "a"));
        assert!(!m.is_pair("a", "c"));
        assert_eq!(m.pair_key(), ("a", "b"));
    }

    #[test]
    fn test_retain_known_filters_and_rederives_count() {
        let mut state = TournamentState {
            matches_played: 3,
            phase_matches: 3,
            history: vec![
                resolved("1", "a", "b", "a"),
                resolved("2", "a", "gone", "tie"),
                resolved("3", "b", "c", "c"),
            ],
            current_match: Some(Match::new("4", "gone", "c")),
            candidates: vec!["a".into(), "gone".into()],
            ..TournamentState::default()
        };

        let known: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let removed = state.retain_known(&known);

        assert_eq!(removed, 2);
        assert_eq!(state.history.len(), 2);
        assert_eq!(state.matches_played, 2);
        assert_eq!(state.phase_matches, 2);
        assert!(state.current_match.is_none());
        assert_eq!(state.candidates, vec!["a".to_string()]);
    }
}
