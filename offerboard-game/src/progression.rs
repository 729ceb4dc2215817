//! Ownership, monopoly, and improvement transitions.
//!
//! Everything here is a pure function of the board and a borrowed state,
//! except [`apply_correct_answer`], which performs the single ownership or
//! improvement mutation a correct answer earns.

use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::board::{Board, Difficulty, MonopolyGroup, QuestionKind, Tile, TileKind};
use crate::config::RewardTables;
use crate::constants::{HOTEL_LEVEL, LOG_TARGET_TURN};
use crate::rewards::{RewardQuery, reward_for};
use crate::state::GameState;

/// True iff every property in `group` is in `owned`.
#[must_use]
pub fn is_full_monopoly(board: &Board, owned: &BTreeSet<String>, group: MonopolyGroup) -> bool {
    board
        .group_members(group)
        .all(|tile| owned.contains(&tile.name))
}

/// Names of `group` members not yet owned, in track order.
#[must_use]
pub fn missing_group_members(
    board: &Board,
    owned: &BTreeSet<String>,
    group: MonopolyGroup,
) -> Vec<String> {
    board
        .group_members(group)
        .filter(|tile| !owned.contains(&tile.name))
        .map(|tile| tile.name.clone())
        .collect()
}

#[must_use]
pub fn railroads_owned(board: &Board, owned: &BTreeSet<String>) -> usize {
    board
        .railroads()
        .filter(|tile| owned.contains(&tile.name))
        .count()
}

/// What the ownership/monopoly gate decides for a property landing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyGate {
    /// Not owned yet: a correct answer buys it.
    Acquire,
    /// Full monopoly held: a correct answer builds on it.
    Build { current_level: u8 },
    /// Owned but the group is incomplete; no challenge this visit.
    Incomplete { missing: Vec<String> },
    /// Already a hotel; nothing left to build.
    FullyDeveloped,
}

/// Apply the ownership/monopoly gate to a property tile.
#[must_use]
pub fn property_gate(board: &Board, state: &GameState, tile: &Tile) -> PropertyGate {
    if !state.owns(&tile.name) {
        return PropertyGate::Acquire;
    }
    let Some(group) = tile.group else {
        return PropertyGate::Incomplete {
            missing: Vec::new(),
        };
    };
    if !is_full_monopoly(board, &state.owned, group) {
        return PropertyGate::Incomplete {
            missing: missing_group_members(board, &state.owned, group),
        };
    }
    let current_level = state.improvement(&tile.name);
    if current_level >= HOTEL_LEVEL {
        PropertyGate::FullyDeveloped
    } else {
        PropertyGate::Build { current_level }
    }
}

/// Why a challenge is being asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeIntent {
    AcquireProperty,
    BuildImprovement,
    AcquireRailroad,
    RailroadRevisit,
}

/// Parameters for generating the challenge a landing requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeRequest {
    pub tile_index: usize,
    pub kind: QuestionKind,
    pub difficulty: Difficulty,
    pub intent: ChallengeIntent,
}

/// The challenge landing on `index` would issue, if any.
///
/// Shared by the prefetch coordinator and tile resolution so both agree on
/// whether a question is needed and which one.
#[must_use]
pub fn challenge_request(
    board: &Board,
    state: &GameState,
    index: usize,
) -> Option<ChallengeRequest> {
    let tile_index = index % board.len();
    let tile = board.tile(tile_index);
    match tile.kind {
        TileKind::Railroad => Some(ChallengeRequest {
            tile_index,
            kind: QuestionKind::Coding,
            difficulty: Difficulty::Medium,
            intent: if state.owns(&tile.name) {
                ChallengeIntent::RailroadRevisit
            } else {
                ChallengeIntent::AcquireRailroad
            },
        }),
        TileKind::Property => {
            let intent = match property_gate(board, state, tile) {
                PropertyGate::Acquire => ChallengeIntent::AcquireProperty,
                PropertyGate::Build { .. } => ChallengeIntent::BuildImprovement,
                PropertyGate::Incomplete { .. } | PropertyGate::FullyDeveloped => return None,
            };
            Some(ChallengeRequest {
                tile_index,
                kind: tile.question_kind?,
                difficulty: board.difficulty_for_index(tile_index),
                intent,
            })
        }
        _ => None,
    }
}

/// Progress earned by a correct answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Award {
    PropertyAcquired { reward: i32 },
    ImprovementBuilt { level: u8, reward: i32 },
    RailroadAcquired { railroads_owned: usize, reward: i32 },
    Nothing,
}

impl Award {
    #[must_use]
    pub const fn reward(self) -> i32 {
        match self {
            Self::PropertyAcquired { reward }
            | Self::ImprovementBuilt { reward, .. }
            | Self::RailroadAcquired { reward, .. } => reward,
            Self::Nothing => 0,
        }
    }
}

/// Apply the ownership/improvement transition a correct answer on
/// `tile_index` earns and credit its reward.
pub fn apply_correct_answer(
    board: &Board,
    state: &mut GameState,
    tables: &RewardTables,
    tile_index: usize,
    difficulty: Difficulty,
) -> Award {
    let tile = board.tile(tile_index);
    let before_owned = state.owns(&tile.name);
    let mut query = RewardQuery::new(tile.kind, difficulty);
    query.before_owned = before_owned;

    let award = match tile.kind {
        TileKind::Property if !before_owned => {
            state.grant_ownership(&tile.name);
            info!(target: LOG_TARGET_TURN, "acquired {}", tile.name);
            Award::PropertyAcquired {
                reward: reward_for(tables, query),
            }
        }
        TileKind::Property => {
            let full = tile
                .group
                .is_some_and(|group| is_full_monopoly(board, &state.owned, group));
            if full && state.improvement(&tile.name) < HOTEL_LEVEL {
                let level = state.build_improvement(&tile.name);
                info!(target: LOG_TARGET_TURN, "built level {level} on {}", tile.name);
                query.built_improvement = true;
                query.new_level = level;
                Award::ImprovementBuilt {
                    level,
                    reward: reward_for(tables, query),
                }
            } else {
                Award::Nothing
            }
        }
        TileKind::Railroad if !before_owned => {
            state.grant_ownership(&tile.name);
            let railroads_owned = railroads_owned(board, &state.owned);
            info!(
                target: LOG_TARGET_TURN,
                "acquired railroad {} ({railroads_owned} held)",
                tile.name
            );
            query.railroads_owned_after = railroads_owned;
            Award::RailroadAcquired {
                railroads_owned,
                reward: reward_for(tables, query),
            }
        }
        _ => Award::Nothing,
    };
    state.points += award.reward();
    award
}
