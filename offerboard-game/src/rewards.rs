//! Reward lookup for correct answers.
use crate::board::{Difficulty, TileKind};
use crate::config::RewardTables;
use crate::constants::HOTEL_LEVEL;

/// Everything the reward lookup needs to know about one correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardQuery {
    pub kind: TileKind,
    pub difficulty: Difficulty,
    /// Whether the tile was already owned before this answer.
    pub before_owned: bool,
    /// Whether this answer built an improvement.
    pub built_improvement: bool,
    /// Improvement level after the build.
    pub new_level: u8,
    /// Railroads held once this answer's acquisition (if any) is applied.
    pub railroads_owned_after: usize,
}

impl RewardQuery {
    #[must_use]
    pub const fn new(kind: TileKind, difficulty: Difficulty) -> Self {
        Self {
            kind,
            difficulty,
            before_owned: false,
            built_improvement: false,
            new_level: 0,
            railroads_owned_after: 0,
        }
    }
}

/// Offer points earned for a correct answer.
#[must_use]
pub fn reward_for(tables: &RewardTables, query: RewardQuery) -> i32 {
    match query.kind {
        TileKind::Property => {
            let schedule = tables.schedule(query.difficulty);
            match (query.before_owned, query.built_improvement) {
                (false, _) => schedule[0],
                (true, true) => schedule[usize::from(query.new_level.clamp(1, HOTEL_LEVEL))],
                // Unreachable behind the monopoly gate.
                (true, false) => 0,
            }
        }
        TileKind::Railroad if !query.before_owned => query
            .railroads_owned_after
            .checked_sub(1)
            .and_then(|slot| tables.railroad.get(slot))
            .copied()
            .unwrap_or(0),
        _ => 0,
    }
}
