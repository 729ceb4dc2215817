use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::board::{Board, Difficulty, QuestionKind, TileKind};
use crate::constants::{DEFAULT_TURNS, HOTEL_LEVEL};
use crate::events::EventSeverity;
use crate::questions::QuestionPayload;
use crate::turn::TurnPhase;

/// An interactive question awaiting the player's answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    /// Board index of the tile the challenge was issued for.
    pub tile_index: usize,
    pub payload: QuestionPayload,
}

/// Speculatively generated challenge, tagged with the landing it was built for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefetchEntry {
    pub target: usize,
    /// Roll counter of the turn that started the prefetch.
    pub turn: u32,
    pub challenge: Challenge,
}

/// Last user-facing result, overwritten every turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastOutcome {
    pub severity: EventSeverity,
    pub title: String,
    #[serde(default)]
    pub feedback: String,
}

impl LastOutcome {
    #[must_use]
    pub fn new(
        severity: EventSeverity,
        title: impl Into<String>,
        feedback: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            title: title.into(),
            feedback: feedback.into(),
        }
    }
}

/// Broken state-machine invariants. These indicate engine bugs, not player error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("position {position} outside board of {len} tiles")]
    PositionOutOfRange { position: usize, len: usize },
    #[error("owned entry {name:?} is not a purchasable tile")]
    UnknownOwnership { name: String },
    #[error("improvement level {level} on {name:?} exceeds hotel")]
    LevelOutOfRange { name: String, level: u8 },
    #[error("{name:?} carries improvements without being an owned property")]
    ImprovementWithoutOwnership { name: String },
    #[error("prefetch slot targets {target} outside board of {len} tiles")]
    PrefetchOutOfRange { target: usize, len: usize },
    #[error("challenge pending while phase is {phase:?}")]
    PendingOutsidePhase { phase: TurnPhase },
}

/// The single mutable record of one game session.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub phase: TurnPhase,
    pub position: usize,
    pub previous_position: usize,
    pub turns_remaining: i32,
    /// Offer points; event cards may push this below zero.
    pub points: i32,
    #[serde(default)]
    pub owned: BTreeSet<String>,
    #[serde(default)]
    pub improvement_level: BTreeMap<String, u8>,
    #[serde(default)]
    pub pending_challenge: Option<Challenge>,
    #[serde(default)]
    pub prefetch_slot: Option<PrefetchEntry>,
    #[serde(default)]
    pub skip_next_turn: bool,
    #[serde(default)]
    pub grant_extra_roll: bool,
    #[serde(default)]
    pub just_crossed_start: bool,
    #[serde(default)]
    pub last_outcome: Option<LastOutcome>,
    /// Number of rolls taken so far; tags prefetches to a single turn.
    #[serde(default)]
    pub turn_seq: u32,
    #[serde(default)]
    pub challenges_answered: u32,
    #[serde(default)]
    pub challenges_passed: u32,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(0, DEFAULT_TURNS)
    }
}

impl GameState {
    #[must_use]
    pub fn new(seed: u64, turns: i32) -> Self {
        Self {
            seed,
            phase: TurnPhase::Idle,
            position: 0,
            previous_position: 0,
            turns_remaining: turns,
            points: 0,
            owned: BTreeSet::new(),
            improvement_level: BTreeMap::new(),
            pending_challenge: None,
            prefetch_slot: None,
            skip_next_turn: false,
            grant_extra_roll: false,
            just_crossed_start: false,
            last_outcome: None,
            turn_seq: 0,
            challenges_answered: 0,
            challenges_passed: 0,
        }
    }

    #[must_use]
    pub const fn is_game_over(&self) -> bool {
        self.turns_remaining <= 0
    }

    #[must_use]
    pub fn owns(&self, name: &str) -> bool {
        self.owned.contains(name)
    }

    #[must_use]
    pub fn improvement(&self, name: &str) -> u8 {
        self.improvement_level.get(name).copied().unwrap_or(0)
    }

    /// Record first acquisition of a tile.
    ///
    /// # Panics
    ///
    /// Panics if the tile is already owned.
    pub fn grant_ownership(&mut self, name: &str) {
        let inserted = self.owned.insert(name.to_string());
        assert!(inserted, "duplicate ownership of {name}");
    }

    /// Raise the improvement level of an owned property by one.
    ///
    /// # Panics
    ///
    /// Panics if the property is not owned or is already a hotel.
    pub fn build_improvement(&mut self, name: &str) -> u8 {
        assert!(self.owns(name), "cannot improve unowned {name}");
        let level = self.improvement_level.entry(name.to_string()).or_insert(0);
        assert!(*level < HOTEL_LEVEL, "{name} already has a hotel");
        *level += 1;
        *level
    }

    /// Install the turn's challenge.
    ///
    /// # Panics
    ///
    /// Panics if another challenge is still pending.
    pub fn issue_challenge(&mut self, challenge: Challenge) {
        assert!(
            self.pending_challenge.is_none(),
            "a challenge is already pending"
        );
        self.pending_challenge = Some(challenge);
    }

    pub fn set_outcome(
        &mut self,
        severity: EventSeverity,
        title: impl Into<String>,
        feedback: impl Into<String>,
    ) {
        self.last_outcome = Some(LastOutcome::new(severity, title, feedback));
    }

    /// End-of-turn accounting: an extra roll is consumed in place of a turn.
    ///
    /// Returns `true` when the turn budget was decremented.
    pub fn end_turn(&mut self) -> bool {
        if self.grant_extra_roll {
            self.grant_extra_roll = false;
            false
        } else {
            self.turns_remaining -= 1;
            true
        }
    }

    /// Check internal consistency against the board this state plays on.
    ///
    /// # Errors
    ///
    /// Returns the first invariant found broken.
    pub fn check_invariants(&self, board: &Board) -> Result<(), InvariantViolation> {
        let len = board.len();
        for position in [self.position, self.previous_position] {
            if position >= len {
                return Err(InvariantViolation::PositionOutOfRange { position, len });
            }
        }
        for name in &self.owned {
            let purchasable = board
                .index_of(name)
                .is_some_and(|idx| board.tile(idx).kind.is_purchasable());
            if !purchasable {
                return Err(InvariantViolation::UnknownOwnership { name: name.clone() });
            }
        }
        for (name, &level) in &self.improvement_level {
            if level > HOTEL_LEVEL {
                return Err(InvariantViolation::LevelOutOfRange {
                    name: name.clone(),
                    level,
                });
            }
            let is_property = board
                .index_of(name)
                .is_some_and(|idx| board.tile(idx).kind == TileKind::Property);
            if level > 0 && (!self.owns(name) || !is_property) {
                return Err(InvariantViolation::ImprovementWithoutOwnership {
                    name: name.clone(),
                });
            }
        }
        if let Some(entry) = &self.prefetch_slot
            && entry.target >= len
        {
            return Err(InvariantViolation::PrefetchOutOfRange {
                target: entry.target,
                len,
            });
        }
        if self.pending_challenge.is_some() && self.phase != TurnPhase::PendingChallenge {
            return Err(InvariantViolation::PendingOutsidePhase { phase: self.phase });
        }
        Ok(())
    }
}
