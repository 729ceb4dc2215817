//! Centralized balance and tuning constants for Offerboard game logic.
//!
//! These values define the default deterministic math for the turn engine.
//! `GameConfig` starts from them and may override any of them at session
//! construction time.

// Logging targets ----------------------------------------------------------
pub(crate) const LOG_TARGET_TURN: &str = "offerboard::turn";
pub(crate) const LOG_TARGET_PREFETCH: &str = "offerboard::prefetch";
pub(crate) const LOG_TARGET_QUESTIONS: &str = "offerboard::questions";

// Session defaults ---------------------------------------------------------
pub const DEFAULT_TURNS: i32 = 20;
pub const DEFAULT_DICE_SIDES: u8 = 6;
pub const DEFAULT_DICE_COUNT: u8 = 2;
pub const DEFAULT_START_BONUS: i32 = 1;
pub const DEFAULT_QUESTION_TIMEOUT_MS: u64 = 8_000;

// Progression --------------------------------------------------------------
/// Improvement level reached when a hotel is built.
pub const HOTEL_LEVEL: u8 = 5;
/// Number of entries in a difficulty reward schedule (acquisition + 5 levels).
pub const SCHEDULE_LEN: usize = 6;

pub const EASY_SCHEDULE: [i32; SCHEDULE_LEN] = [2, 3, 4, 5, 6, 8];
pub const MEDIUM_SCHEDULE: [i32; SCHEDULE_LEN] = [3, 4, 5, 6, 8, 10];
pub const HARD_SCHEDULE: [i32; SCHEDULE_LEN] = [4, 5, 7, 9, 11, 14];
/// Railroad reward for owning 1, 2, 3, 4 railroads after an acquisition.
pub const RAILROAD_SCHEDULE: [i32; 4] = [2, 3, 4, 6];

// Standard board -----------------------------------------------------------
pub const STANDARD_BOARD_SIZE: usize = 40;

// Local question heuristics ------------------------------------------------
pub(crate) const CODING_MIN_WORDS: usize = 20;
pub(crate) const BEHAVIORAL_MIN_STAR_PARTS: usize = 3;
pub(crate) const TITLE_MAX_CHARS: usize = 45;
pub(crate) const PROMPT_MAX_CHARS: usize = 240;
pub(crate) const BEHAVIORAL_PROMPT_MAX_CHARS: usize = 140;
pub(crate) const TIP_MAX_CHARS: usize = 90;
pub(crate) const RUBRIC_ITEM_MAX_CHARS: usize = 80;
pub(crate) const MAX_EXAMPLES: usize = 2;
pub(crate) const MAX_HINTS: usize = 3;
pub(crate) const MAX_RUBRIC_ITEMS: usize = 7;
