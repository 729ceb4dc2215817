//! Offerboard Game Engine
//!
//! Platform-agnostic turn engine for Offerboard, a Monopoly-style board game
//! where landing on companies earns interview challenges instead of rent.
//! This crate provides all game mechanics without UI or transport concerns.

pub mod board;
pub mod cards;
pub mod config;
pub mod constants;
pub mod events;
pub mod movement;
pub mod prefetch;
pub mod progression;
pub mod questions;
pub mod resolve;
pub mod rewards;
pub mod rng;
pub mod state;
pub mod turn;

// Re-export commonly used types
pub use board::{
    Board, BoardError, Difficulty, DifficultyGate, MonopolyGroup, QuestionKind, Tile, TileKind,
};
pub use cards::{Card, CardDeck, CardEffect, ScriptedDeck, StandardDeck};
pub use config::{GameConfig, GameConfigError, RewardTables};
pub use events::{Event, EventId, EventKind, EventLog, EventSeverity};
pub use movement::{DiceFaces, Move, MovePath, move_token, move_with_dice, roll_dice, walk};
pub use prefetch::{PrefetchCoordinator, Settled, consume_prefetch};
pub use progression::{
    Award, ChallengeIntent, ChallengeRequest, PropertyGate, apply_correct_answer,
    challenge_request, is_full_monopoly, missing_group_members, property_gate, railroads_owned,
};
pub use questions::{
    BackendError, DisabledBackend, JudgeSource, LocalQuestionBank, QuestionBackend,
    QuestionPayload, QuestionService, ResilientQuestionService, Verdict, score_locally,
};
pub use resolve::{Landing, Resolution, apply_card, resolve_landing};
pub use rewards::{RewardQuery, reward_for};
pub use rng::{CountingRng, derive_stream_seed};
pub use state::{Challenge, GameState, InvariantViolation, LastOutcome, PrefetchEntry};
pub use turn::{
    AnswerOutcome, GameSummary, ResolveOutcome, RollOutcome, TurnController, TurnError, TurnPhase,
};
