//! Session tuning: turn budget, dice, bonuses, and reward schedules.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, Difficulty};
use crate::constants::{
    DEFAULT_DICE_COUNT, DEFAULT_DICE_SIDES, DEFAULT_QUESTION_TIMEOUT_MS, DEFAULT_START_BONUS,
    DEFAULT_TURNS, EASY_SCHEDULE, HARD_SCHEDULE, MEDIUM_SCHEDULE, RAILROAD_SCHEDULE, SCHEDULE_LEN,
};

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameConfigError {
    #[error("turn budget must be positive (got {turns})")]
    NonPositiveTurns { turns: i32 },
    #[error("dice need at least one die with two sides (got {count}d{sides})")]
    InvalidDice { sides: u8, count: u8 },
    #[error("{tier} schedule must strictly increase (index {index}: {prev} then {next})")]
    ScheduleNotIncreasing {
        tier: Difficulty,
        index: usize,
        prev: i32,
        next: i32,
    },
    #[error("{higher} schedule falls below {lower} at index {index}")]
    TierOrder {
        lower: Difficulty,
        higher: Difficulty,
        index: usize,
    },
    #[error("railroad schedule must not decrease (index {index}: {prev} then {next})")]
    RailroadNotMonotonic { index: usize, prev: i32, next: i32 },
    #[error("railroad schedule must cover at least one railroad")]
    RailroadEmpty,
    #[error("a {max_move}-step roll can lap a {board_len}-cell board")]
    MoveLapsBoard { max_move: usize, board_len: usize },
}

/// Difficulty-indexed reward schedules plus the railroad ladder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTables {
    #[serde(default = "RewardTables::default_easy")]
    pub easy: [i32; SCHEDULE_LEN],
    #[serde(default = "RewardTables::default_medium")]
    pub medium: [i32; SCHEDULE_LEN],
    #[serde(default = "RewardTables::default_hard")]
    pub hard: [i32; SCHEDULE_LEN],
    /// Entry `k` rewards owning `k + 1` railroads after an acquisition.
    #[serde(default = "RewardTables::default_railroad")]
    pub railroad: Vec<i32>,
}

impl RewardTables {
    const fn default_easy() -> [i32; SCHEDULE_LEN] {
        EASY_SCHEDULE
    }

    const fn default_medium() -> [i32; SCHEDULE_LEN] {
        MEDIUM_SCHEDULE
    }

    const fn default_hard() -> [i32; SCHEDULE_LEN] {
        HARD_SCHEDULE
    }

    fn default_railroad() -> Vec<i32> {
        RAILROAD_SCHEDULE.to_vec()
    }

    #[must_use]
    pub const fn schedule(&self, difficulty: Difficulty) -> &[i32; SCHEDULE_LEN] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    /// Check monotonicity within and across tiers.
    ///
    /// # Errors
    ///
    /// Returns the first violated ordering rule.
    pub fn validate(&self) -> Result<(), GameConfigError> {
        for tier in Difficulty::ALL {
            let schedule = self.schedule(tier);
            for (index, pair) in schedule.windows(2).enumerate() {
                if pair[1] <= pair[0] {
                    return Err(GameConfigError::ScheduleNotIncreasing {
                        tier,
                        index: index + 1,
                        prev: pair[0],
                        next: pair[1],
                    });
                }
            }
        }
        for pair in Difficulty::ALL.windows(2) {
            let (lower, higher) = (pair[0], pair[1]);
            let below = self.schedule(lower);
            let above = self.schedule(higher);
            if let Some(index) = (0..SCHEDULE_LEN).find(|&i| above[i] < below[i]) {
                return Err(GameConfigError::TierOrder {
                    lower,
                    higher,
                    index,
                });
            }
        }
        if self.railroad.is_empty() {
            return Err(GameConfigError::RailroadEmpty);
        }
        for (index, pair) in self.railroad.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(GameConfigError::RailroadNotMonotonic {
                    index: index + 1,
                    prev: pair[0],
                    next: pair[1],
                });
            }
        }
        Ok(())
    }
}

impl Default for RewardTables {
    fn default() -> Self {
        Self {
            easy: Self::default_easy(),
            medium: Self::default_medium(),
            hard: Self::default_hard(),
            railroad: Self::default_railroad(),
        }
    }
}

/// Per-session game configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default = "GameConfig::default_turns")]
    pub turns: i32,
    #[serde(default = "GameConfig::default_dice_sides")]
    pub dice_sides: u8,
    #[serde(default = "GameConfig::default_dice_count")]
    pub dice_count: u8,
    /// Offer points awarded for passing GO.
    #[serde(default = "GameConfig::default_start_bonus")]
    pub start_bonus: i32,
    /// Landing on GO TO JAIL burns a pending extra roll.
    #[serde(default = "GameConfig::default_jail_forfeits_extra_roll")]
    pub jail_forfeits_extra_roll: bool,
    /// Upper bound on a single remote question or scoring call.
    #[serde(default = "GameConfig::default_question_timeout_ms")]
    pub question_timeout_ms: u64,
    #[serde(default)]
    pub rewards: RewardTables,
}

impl GameConfig {
    const fn default_turns() -> i32 {
        DEFAULT_TURNS
    }

    const fn default_dice_sides() -> u8 {
        DEFAULT_DICE_SIDES
    }

    const fn default_dice_count() -> u8 {
        DEFAULT_DICE_COUNT
    }

    const fn default_start_bonus() -> i32 {
        DEFAULT_START_BONUS
    }

    const fn default_jail_forfeits_extra_roll() -> bool {
        true
    }

    const fn default_question_timeout_ms() -> u64 {
        DEFAULT_QUESTION_TIMEOUT_MS
    }

    /// Parse a configuration overlay; omitted fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate the configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), GameConfigError> {
        if self.turns <= 0 {
            return Err(GameConfigError::NonPositiveTurns { turns: self.turns });
        }
        if self.dice_count == 0 || self.dice_sides < 2 {
            return Err(GameConfigError::InvalidDice {
                sides: self.dice_sides,
                count: self.dice_count,
            });
        }
        self.rewards.validate()
    }

    /// [`Self::validate`], plus the largest roll must stay shorter than
    /// `board` so start crossing is detected by index wrap.
    ///
    /// # Errors
    ///
    /// Returns the first invariant that does not hold.
    pub fn validate_for_board(&self, board: &Board) -> Result<(), GameConfigError> {
        self.validate()?;
        let max_move = usize::from(self.dice_count) * usize::from(self.dice_sides);
        if max_move >= board.len() {
            return Err(GameConfigError::MoveLapsBoard {
                max_move,
                board_len: board.len(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn question_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.question_timeout_ms)
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turns: Self::default_turns(),
            dice_sides: Self::default_dice_sides(),
            dice_count: Self::default_dice_count(),
            start_bonus: Self::default_start_bonus(),
            jail_forfeits_extra_roll: Self::default_jail_forfeits_extra_roll(),
            question_timeout_ms: Self::default_question_timeout_ms(),
            rewards: RewardTables::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(GameConfig::default().validate(), Ok(()));
    }

    #[test]
    fn schedules_increase_within_and_across_tiers() {
        let tables = RewardTables::default();
        for index in 0..SCHEDULE_LEN {
            assert!(tables.hard[index] >= tables.medium[index]);
            assert!(tables.medium[index] >= tables.easy[index]);
        }
        for tier in Difficulty::ALL {
            assert!(tables.schedule(tier).windows(2).all(|w| w[0] < w[1]));
        }
        assert!(tables.railroad.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = GameConfig::from_json(r#"{"turns": 5, "jail_forfeits_extra_roll": false}"#)
            .unwrap();
        assert_eq!(cfg.turns, 5);
        assert!(!cfg.jail_forfeits_extra_roll);
        assert_eq!(cfg.dice_count, DEFAULT_DICE_COUNT);
        assert_eq!(cfg.rewards, RewardTables::default());
    }

    #[test]
    fn broken_tables_are_reported() {
        let mut tables = RewardTables::default();
        tables.easy[3] = tables.easy[2];
        assert!(matches!(
            tables.validate(),
            Err(GameConfigError::ScheduleNotIncreasing {
                tier: Difficulty::Easy,
                index: 3,
                ..
            })
        ));

        let mut tables = RewardTables::default();
        tables.medium = [1, 2, 3, 4, 5, 6];
        assert!(matches!(
            tables.validate(),
            Err(GameConfigError::TierOrder {
                lower: Difficulty::Easy,
                higher: Difficulty::Medium,
                index: 0,
            })
        ));

        let mut tables = RewardTables::default();
        tables.railroad = vec![4, 3];
        assert!(matches!(
            tables.validate(),
            Err(GameConfigError::RailroadNotMonotonic { index: 1, .. })
        ));
    }

    #[test]
    fn dice_and_turns_are_checked() {
        let cfg = GameConfig {
            dice_count: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(GameConfigError::InvalidDice { .. })
        ));
        let cfg = GameConfig {
            turns: 0,
            ..GameConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(GameConfigError::NonPositiveTurns { turns: 0 })
        );
    }

    #[test]
    fn rolls_longer_than_the_board_are_rejected() {
        let board = Board::standard();
        assert_eq!(GameConfig::default().validate_for_board(&board), Ok(()));

        let cfg = GameConfig::from_json(r#"{"dice_count": 10}"#).unwrap();
        assert_eq!(cfg.validate(), Ok(()));
        assert_eq!(
            cfg.validate_for_board(&board),
            Err(GameConfigError::MoveLapsBoard {
                max_move: 60,
                board_len: 40,
            })
        );
    }
}
