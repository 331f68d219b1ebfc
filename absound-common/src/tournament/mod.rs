//! Adaptive A/B/tie tournament engine
//!
//! # Phases
//!
//! ```text
//! explore ──> refine ──> showdown ──> complete
//!    ^                                   │
//!    └──────── continue_from_complete ───┘
//! ```
//!
//! Transitions are operator-driven via [`Tournament::next_phase`]. Showdown
//! never ends on its own: when a bracket is exhausted a fresh one is built
//! from the current leaders.
//!
//! # Persistence
//!
//! Every mutating operation writes the whole [`TournamentState`] back to the
//! [`StateStore`] immediately. Storage failures are logged and the in-memory
//! state stays authoritative.

use std::collections::{HashMap, HashSet};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::{Sample, SampleId};
use crate::config::TournamentSettings;
use crate::distance::{parameter_ranges, parameter_space_diameter, ParameterRanges};
use crate::migrations::{self, infer_schema_version, storage_key, CURRENT_SCHEMA_VERSION};
use crate::scoring::{leaderboard, LeaderboardEntry};
use crate::storage::StateStore;
use crate::{time, Error, Result};

mod metric;
mod pairing;
mod state;

pub use metric::MetricBreakdown;
pub use pairing::{round_robin, showdown_match_id};
pub use state::{Match, Outcome, Phase, TournamentState, TIE};

use pairing::PairingContext;

/// Snapshot of engine progress for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct TournamentStatus {
    pub phase: Phase,
    pub matches_played: usize,
    pub phase_matches: usize,
    pub consecutive_wins: u32,
    pub metric: MetricBreakdown,
    pub current_match: Option<Match>,
    pub candidates: Vec<SampleId>,
    pub showdown_round: u32,
    pub showdown_resolved: usize,
    pub showdown_total: usize,
}

/// The tournament engine
///
/// Owns the catalog, the persisted state, and the storage backend. All
/// operations run to completion on the calling thread.
pub struct Tournament<S: StateStore> {
    samples: Vec<Sample>,
    index: HashMap<SampleId, usize>,
    diameter: f64,
    settings: TournamentSettings,
    rng: StdRng,
    store: S,
    state: TournamentState,
}

impl<S: StateStore> Tournament<S> {
    /// Build the engine, restoring persisted state when available
    ///
    /// **Algorithm:**
    /// 1. Probe storage keys from the current schema version downwards
    /// 2. Migrate the first blob found to the current schema
    /// 3. Drop references to samples no longer in the catalog
    /// 4. Start fresh if nothing usable was found
    ///
    /// Settings that fail [`TournamentSettings::validate`] are replaced by the
    /// defaults, keeping only the seed.
    pub fn new(samples: Vec<Sample>, store: S, settings: TournamentSettings) -> Self {
        let settings = match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Invalid tournament settings, using defaults: {}", e);
                TournamentSettings {
                    seed: settings.seed,
                    ..TournamentSettings::default()
                }
            }
        };

        let mut index = HashMap::with_capacity(samples.len());
        for (i, s) in samples.iter().enumerate() {
            if index.contains_key(&s.id) {
                warn!(sample_id = %s.id, "Duplicate sample id in catalog");
                continue;
            }
            index.insert(s.id.clone(), i);
        }

        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut tournament = Self {
            diameter: parameter_space_diameter(&samples),
            samples,
            index,
            settings,
            rng,
            store,
            state: TournamentState::default(),
        };

        if let Some(state) = tournament.restore() {
            tournament.state = state;
            tournament.persist();
        }

        info!(
            samples = tournament.samples.len(),
            phase = %tournament.state.phase,
            matches_played = tournament.state.matches_played,
            "Tournament initialized"
        );
        tournament
    }

    fn known_ids(&self) -> HashSet<&str> {
        self.samples.iter().map(|s| s.id.as_str()).collect()
    }

    fn restore(&self) -> Option<TournamentState> {
        for version in (1..=CURRENT_SCHEMA_VERSION).rev() {
            let key = storage_key(version);
            let raw = match self.store.load(&key) {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    warn!(key = %key, "Failed to read saved state: {}", e);
                    continue;
                }
            };

            let value: Value = match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, "Saved state is not valid JSON: {}", e);
                    continue;
                }
            };

            let from_version = match infer_schema_version(&value) {
                0 => version,
                inferred => inferred,
            };

            match migrations::migrate(value, from_version) {
                Ok(mut state) => {
                    let removed = state.retain_known(&self.known_ids());
                    if removed > 0 {
                        info!(removed, "Dropped matches referencing unknown samples");
                    }
                    info!(key = %key, "Restored tournament state");
                    return Some(state);
                }
                Err(e) => warn!(key = %key, "Saved state could not be migrated: {}", e),
            }
        }
        None
    }

    /// Write the whole state under the current key
    fn persist(&mut self) {
        let key = storage_key(CURRENT_SCHEMA_VERSION);
        let result = serde_json::to_string(&self.state)
            .map_err(Error::from)
            .and_then(|json| self.store.save(&key, &json));
        if let Err(e) = result {
            warn!(key = %key, "Failed to persist tournament state: {}", e);
        }
    }

    fn context(&self) -> PairingContext<'_> {
        PairingContext {
            samples: &self.samples,
            index: &self.index,
            history: &self.state.history,
            settings: &self.settings,
            diameter: self.diameter,
        }
    }

    fn random_match(&self, pair: Option<(usize, usize)>) -> Option<Match> {
        let (i, j) = pair?;
        Some(Match::new(
            Uuid::new_v4().to_string(),
            self.samples[i].id.clone(),
            self.samples[j].id.clone(),
        ))
    }

    /// Append a fresh round-robin bracket over the current finalists
    fn start_showdown_round(&mut self) {
        let finalists = pairing::select_finalists(&self.context());
        self.state.showdown_round += 1;
        let bracket = round_robin(&finalists, self.state.showdown_round);
        info!(
            round = self.state.showdown_round,
            finalists = finalists.len(),
            matches = bracket.len(),
            "Showdown bracket generated"
        );
        self.state.candidates = finalists;
        self.state.showdown_queue.extend(bracket);
    }

    fn next_showdown_match(&mut self) -> Option<Match> {
        let pending = |state: &TournamentState| {
            state
                .showdown_queue
                .iter()
                .find(|m| !m.is_resolved())
                .cloned()
        };
        if let Some(m) = pending(&self.state) {
            return Some(m);
        }
        self.start_showdown_round();
        pending(&self.state)
    }

    /// The match awaiting a vote, generating one if none is pending
    ///
    /// Returns `None` in the complete phase or when the catalog has fewer
    /// than two samples.
    pub fn get_next_match(&mut self) -> Option<Match> {
        if let Some(current) = &self.state.current_match {
            return Some(current.clone());
        }
        if self.samples.len() < 2 {
            return None;
        }

        let next = match self.state.phase {
            phase @ (Phase::Explore | Phase::Refine) => {
                // Field-level borrows so the RNG can be borrowed mutably alongside
                let ctx = PairingContext {
                    samples: &self.samples,
                    index: &self.index,
                    history: &self.state.history,
                    settings: &self.settings,
                    diameter: self.diameter,
                };
                let pair = if phase == Phase::Explore {
                    pairing::explore_pair(&ctx, &mut self.rng)
                } else {
                    pairing::refine_pair(&ctx, &mut self.rng)
                };
                self.random_match(pair)
            }
            Phase::Showdown => self.next_showdown_match(),
            Phase::Complete => None,
        }?;

        debug!(match_id = %next.id, a = %next.a, b = %next.b, phase = %self.state.phase, "Next match");
        self.state.current_match = Some(next.clone());
        self.persist();
        Some(next)
    }

    /// Record a vote for the pending match
    ///
    /// Ignored (returns `false`) when `match_id` is not the pending match or
    /// the winner is neither endpoint. Stale callbacks are expected, so this
    /// is not an error.
    pub fn record_result(&mut self, match_id: &str, outcome: impl Into<Outcome>) -> bool {
        let outcome = outcome.into();

        let Some(current) = self.state.current_match.as_ref() else {
            debug!(match_id, "Vote ignored: no pending match");
            return false;
        };
        if current.id != match_id {
            debug!(match_id, pending = %current.id, "Vote ignored: stale match id");
            return false;
        }
        if let Outcome::Winner(w) = &outcome {
            if *w != current.a && *w != current.b {
                warn!(match_id, winner = %w, "Vote ignored: winner is not in this match");
                return false;
            }
        }

        let Some(mut resolved) = self.state.current_match.take() else {
            return false;
        };
        resolved.winner = Some(outcome.clone());
        resolved.timestamp = Some(time::now_millis());

        if self.state.phase == Phase::Showdown {
            // Imported or migrated queues may carry ids unlike the pending match
            let queue = &mut self.state.showdown_queue;
            let position = queue.iter().position(|m| m.id == resolved.id).or_else(|| {
                queue
                    .iter()
                    .position(|m| !m.is_resolved() && m.is_pair(&resolved.a, &resolved.b))
            });
            match position {
                Some(i) => {
                    queue[i].winner = resolved.winner.clone();
                    queue[i].timestamp = resolved.timestamp;
                }
                None => debug!(match_id, "Showdown vote has no queue entry"),
            }
        }

        self.state.consecutive_wins = match &outcome {
            Outcome::Tie => 0,
            Outcome::Winner(w) => {
                let previous = self
                    .state
                    .history
                    .last()
                    .and_then(|m| m.winner.as_ref())
                    .and_then(Outcome::winner);
                if previous == Some(w.as_str()) {
                    self.state.consecutive_wins + 1
                } else {
                    1
                }
            }
        };

        info!(match_id, winner = %String::from(outcome), "Match recorded");
        self.state.history.push(resolved);
        self.state.matches_played += 1;
        self.state.phase_matches += 1;
        self.persist();
        true
    }

    /// Advance to the next phase and return it
    ///
    /// Discards the pending match. Entering showdown builds the first
    /// bracket. Calling this in `Complete` leaves the phase unchanged.
    pub fn next_phase(&mut self) -> Phase {
        let from = self.state.phase;
        let to = from.next();
        if from == to {
            return to;
        }

        self.state.phase = to;
        self.state.phase_matches = 0;
        self.state.current_match = None;

        if to == Phase::Showdown {
            self.state.showdown_queue.clear();
            self.start_showdown_round();
        }

        info!(from = %from, to = %to, "Phase transition");
        self.persist();
        to
    }

    /// Re-enter explore after completion, keeping history and match count
    ///
    /// Returns `false` (no change) unless the phase is `Complete`.
    pub fn continue_from_complete(&mut self) -> bool {
        if self.state.phase != Phase::Complete {
            return false;
        }
        self.state.phase = Phase::Explore;
        self.state.phase_matches = 0;
        self.state.current_match = None;
        self.state.candidates.clear();
        self.state.showdown_queue.clear();
        info!(matches_played = self.state.matches_played, "Continuing from complete");
        self.persist();
        true
    }

    /// Discard all progress
    pub fn reset(&mut self) {
        let key = storage_key(CURRENT_SCHEMA_VERSION);
        if let Err(e) = self.store.remove(&key) {
            warn!(key = %key, "Failed to clear saved state: {}", e);
        }
        self.state = TournamentState::default();
        self.persist();
        info!("Tournament reset");
    }

    /// Advisory progress score in [0, 1]
    pub fn get_metric(&self) -> f64 {
        self.get_metric_breakdown().total
    }

    pub fn get_metric_breakdown(&self) -> MetricBreakdown {
        metric::compute(&self.state, self.samples.len(), &self.settings)
    }

    /// Full-fidelity JSON of the current state
    pub fn export_state(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.state)?)
    }

    /// Replace the state with an exported blob
    ///
    /// The blob must be an object with a string `phase` naming a known phase,
    /// numeric `matchesPlayed` and `phaseMatches`, and an array `history`.
    /// Entries referencing unknown samples are dropped. On any failure the
    /// current state is left untouched.
    pub fn import_state(&mut self, json: &str) -> Result<()> {
        let raw: Value = serde_json::from_str(json)
            .map_err(|e| Error::Import(format!("Invalid JSON: {}", e)))?;
        validate_import(&raw)?;

        let mut state = migrations::migrate(raw, CURRENT_SCHEMA_VERSION)
            .map_err(|e| Error::Import(e.to_string()))?;
        let removed = state.retain_known(&self.known_ids());

        self.state = state;
        self.persist();
        info!(
            matches_played = self.state.matches_played,
            removed,
            "Tournament state imported"
        );
        Ok(())
    }

    pub fn status(&self) -> TournamentStatus {
        TournamentStatus {
            phase: self.state.phase,
            matches_played: self.state.matches_played,
            phase_matches: self.state.phase_matches,
            consecutive_wins: self.state.consecutive_wins,
            metric: self.get_metric_breakdown(),
            current_match: self.state.current_match.clone(),
            candidates: self.state.candidates.clone(),
            showdown_round: self.state.showdown_round,
            showdown_resolved: self.state.showdown_resolved(),
            showdown_total: self.state.showdown_queue.len(),
        }
    }

    /// Ranked scores joined with sample parameters
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        leaderboard(&self.samples, &self.state.history)
    }

    pub fn parameter_ranges(&self) -> Option<ParameterRanges> {
        parameter_ranges(&self.samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn sample(&self, id: &str) -> Option<&Sample> {
        self.index.get(id).map(|&i| &self.samples[i])
    }

    pub fn state(&self) -> &TournamentState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn settings(&self) -> &TournamentSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Give the storage backend back, e.g. to reopen the engine over it
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Structural checks an imported blob must pass before migration
fn validate_import(raw: &Value) -> Result<()> {
    let obj = raw
        .as_object()
        .ok_or_else(|| Error::Import("State must be a JSON object".to_string()))?;

    let phase = obj
        .get("phase")
        .ok_or_else(|| Error::Import("Missing field: phase".to_string()))?
        .as_str()
        .ok_or_else(|| Error::Import("Field phase must be a string".to_string()))?;
    if Phase::from_name(phase).is_none() {
        return Err(Error::Import(format!("Unknown phase: {}", phase)));
    }

    for field in ["matchesPlayed", "phaseMatches"] {
        let value = obj
            .get(field)
            .ok_or_else(|| Error::Import(format!("Missing field: {}", field)))?;
        if !value.is_number() {
            return Err(Error::Import(format!("Field {} must be a number", field)));
        }
    }

    match obj.get("history") {
        Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(Error::Import("Field history must be an array".to_string())),
        None => Err(Error::Import("Missing field: history".to_string())),
    }
}
