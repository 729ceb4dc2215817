//! The turn state machine.
//!
//! [`TurnController`] is the only mutator of [`GameState`]. A turn runs
//! `Idle -> Rolling -> Moving -> Resolving`, then either ends (back to
//! `Idle`), waits in `PendingChallenge` for an answer, or passes through
//! `Teleporting` for GO_TO_JAIL. `GameOver` is terminal.

use log::{debug, info};
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::board::{Board, MonopolyGroup};
use crate::cards::{CardDeck, StandardDeck};
use crate::config::{GameConfig, GameConfigError};
use crate::constants::LOG_TARGET_TURN;
use crate::events::{Event, EventKind, EventLog, EventSeverity};
use crate::movement::{DiceFaces, Move, move_token, move_with_dice};
use crate::prefetch::{PrefetchCoordinator, Settled, consume_prefetch};
use crate::progression::{
    Award, ChallengeRequest, apply_correct_answer, is_full_monopoly, railroads_owned,
};
use crate::questions::{QuestionService, Verdict};
use crate::resolve::{Landing, Resolution, resolve_landing};
use crate::rng::CountingRng;
use crate::state::{Challenge, GameState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnPhase {
    #[default]
    Idle,
    Rolling,
    Moving,
    Resolving,
    PendingChallenge,
    Teleporting,
    GameOver,
}

/// Rejected transitions. The state is left untouched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TurnError {
    #[error("the game is over")]
    GameOver,
    #[error("a challenge is pending")]
    ChallengePending,
    #[error("no challenge is pending")]
    NoPendingChallenge,
    #[error("expected phase {expected:?}, found {actual:?}")]
    WrongPhase {
        expected: TurnPhase,
        actual: TurnPhase,
    },
}

/// Result of a roll request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollOutcome {
    Moved(Move),
    /// A pending skip consumed this turn; the token stayed put.
    Skipped { turns_remaining: i32 },
}

/// What resolution left the turn waiting on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The turn is over.
    Ended(Resolution),
    /// A question must be answered via [`TurnController::submit_answer`].
    Challenge(Resolution, Challenge),
    /// The token must be animated to `to`, then [`TurnController::finish_teleport`].
    Teleport(Resolution, usize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub verdict: Verdict,
    pub award: Award,
    /// Whether the turn budget was spent (false when an extra roll was used).
    pub turn_spent: bool,
}

/// Read-only end-of-game (or mid-game) summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    pub seed: u64,
    pub points: i32,
    pub turns_remaining: i32,
    pub rolls: u32,
    pub owned: Vec<String>,
    pub improvements: BTreeMap<String, u8>,
    pub monopolies: Vec<MonopolyGroup>,
    pub railroads: usize,
    pub challenges_answered: u32,
    pub challenges_passed: u32,
    pub game_over: bool,
}

/// A challenge landing whose question is not in hand yet. Survives a dropped
/// [`TurnController::resolve`] so the retry neither re-runs the tile nor
/// generates a second question.
#[derive(Debug, Clone)]
struct Unsettled {
    resolution: Resolution,
    /// The prefetch missed and a replacement generation is in flight.
    generating: bool,
}

/// Single authoritative driver of one game session.
pub struct TurnController {
    state: GameState,
    board: Arc<Board>,
    config: GameConfig,
    dice_draws: u64,
    deck: Box<dyn CardDeck>,
    service: Arc<dyn QuestionService>,
    prefetch: PrefetchCoordinator,
    unsettled: Option<Unsettled>,
    events: EventLog,
}

impl std::fmt::Debug for TurnController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnController")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("prefetch", &self.prefetch)
            .finish_non_exhaustive()
    }
}

impl TurnController {
    /// Build a controller with the standard card deck.
    ///
    /// # Errors
    ///
    /// Returns the first configuration invariant that does not hold.
    pub fn new(
        board: Arc<Board>,
        config: GameConfig,
        service: Arc<dyn QuestionService>,
        seed: u64,
    ) -> Result<Self, GameConfigError> {
        let state = GameState::new(seed, config.turns);
        Self::from_state(board, config, service, state)
    }

    /// Resume a session from a saved state.
    ///
    /// Dice are drawn from a per-roll stream keyed by seed and roll counter,
    /// so a resumed game rolls exactly what the uninterrupted game would have.
    ///
    /// # Errors
    ///
    /// Returns the first configuration invariant that does not hold.
    pub fn from_state(
        board: Arc<Board>,
        config: GameConfig,
        service: Arc<dyn QuestionService>,
        state: GameState,
    ) -> Result<Self, GameConfigError> {
        config.validate_for_board(&board)?;
        Ok(Self {
            deck: Box::new(StandardDeck::new(state.seed)),
            state,
            dice_draws: 0,
            prefetch: PrefetchCoordinator::new(Arc::clone(&service)),
            unsettled: None,
            events: EventLog::default(),
            board,
            config,
            service,
        })
    }

    /// Replace the card deck.
    #[must_use]
    pub fn with_deck(mut self, deck: Box<dyn CardDeck>) -> Self {
        self.deck = deck;
        self
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access for harnesses and scripted setups.
    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    #[must_use]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    #[must_use]
    pub const fn phase(&self) -> TurnPhase {
        self.state.phase
    }

    #[must_use]
    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    /// `(target, turn)` of the prefetch currently in flight.
    #[must_use]
    pub fn prefetch_in_flight(&self) -> Option<(usize, u32)> {
        self.prefetch.in_flight_target()
    }

    /// Number of dice draws made this game.
    #[must_use]
    pub const fn dice_draws(&self) -> u64 {
        self.dice_draws
    }

    /// Reset to a fresh game on the same seed.
    pub fn new_game(&mut self) {
        let seed = self.state.seed;
        self.prefetch.abandon();
        self.unsettled = None;
        self.state = GameState::new(seed, self.config.turns);
        self.dice_draws = 0;
        self.deck.reseed(seed);
        self.events = EventLog::default();
        info!(target: LOG_TARGET_TURN, "new game (seed {seed}, {} turns)", self.config.turns);
    }

    /// Roll the dice and start moving.
    ///
    /// # Errors
    ///
    /// Fails without touching the state when the game is over, a challenge is
    /// pending, or the previous turn has not finished.
    pub fn roll(&mut self) -> Result<RollOutcome, TurnError> {
        self.check_can_roll()?;
        if self.state.skip_next_turn {
            return Ok(self.skip_turn());
        }
        let mut dice = dice_stream(self.state.seed, self.state.turn_seq.saturating_add(1));
        let mv = move_token(
            &mut dice,
            self.state.position,
            self.board.len(),
            self.config.dice_sides,
            self.config.dice_count,
        );
        self.dice_draws += dice.draws();
        Ok(self.apply_move(mv))
    }

    /// Roll with preset faces instead of drawing from the dice stream.
    ///
    /// # Errors
    ///
    /// Same as [`Self::roll`].
    pub fn roll_with_dice(&mut self, dice: DiceFaces) -> Result<RollOutcome, TurnError> {
        self.check_can_roll()?;
        if self.state.skip_next_turn {
            return Ok(self.skip_turn());
        }
        let mv = move_with_dice(self.state.position, self.board.len(), dice);
        Ok(self.apply_move(mv))
    }

    /// Movement animation finished.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::WrongPhase`] unless the token is moving.
    pub fn finish_movement(&mut self) -> Result<(), TurnError> {
        self.expect_phase(TurnPhase::Moving)?;
        self.set_phase(TurnPhase::Resolving);
        Ok(())
    }

    /// Resolve the landing tile.
    ///
    /// Cancel-safe: if the returned future is dropped while a challenge is
    /// being fetched, calling `resolve` again resumes the same landing.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::WrongPhase`] unless movement has finished.
    pub async fn resolve(&mut self) -> Result<ResolveOutcome, TurnError> {
        self.expect_phase(TurnPhase::Resolving)?;
        let unsettled = match self.unsettled.take() {
            Some(unsettled) => unsettled,
            None => Unsettled {
                resolution: self.resolve_tile(),
                generating: false,
            },
        };
        let resolution = unsettled.resolution.clone();

        match resolution.landing.clone() {
            Landing::Challenge { request, .. } => {
                let generating = unsettled.generating;
                self.unsettled = Some(unsettled);
                let challenge = self.settle_challenge(request, generating).await;
                self.unsettled = None;
                self.events.push(
                    EventKind::ChallengeIssued,
                    EventSeverity::Info,
                    serde_json::json!({
                        "tile": request.tile_index,
                        "kind": request.kind,
                        "difficulty": request.difficulty,
                        "intent": request.intent,
                    }),
                );
                self.state.issue_challenge(challenge.clone());
                self.set_phase(TurnPhase::PendingChallenge);
                Ok(ResolveOutcome::Challenge(resolution, challenge))
            }
            Landing::Teleport { to } => {
                self.prefetch.abandon();
                self.state.previous_position = self.state.position;
                self.state.position = to;
                self.events.push(
                    EventKind::Teleported,
                    EventSeverity::Warning,
                    serde_json::json!({ "from": self.state.previous_position, "to": to }),
                );
                self.state
                    .set_outcome(EventSeverity::Warning, "Go To Jail", "Straight to jail.");
                self.set_phase(TurnPhase::Teleporting);
                Ok(ResolveOutcome::Teleport(resolution, to))
            }
            landing => {
                self.prefetch.abandon();
                self.state.prefetch_slot = None;
                match landing {
                    Landing::Card { card } => self.events.push(
                        EventKind::CardDrawn,
                        EventSeverity::Info,
                        serde_json::json!({ "title": card.title, "effect": card.effect }),
                    ),
                    Landing::MonopolyIncomplete { missing, .. } => self.events.push(
                        EventKind::MonopolyIncomplete,
                        EventSeverity::Info,
                        serde_json::json!({ "missing": missing }),
                    ),
                    _ => {}
                }
                self.finish_turn();
                Ok(ResolveOutcome::Ended(resolution))
            }
        }
    }

    /// Teleport animation finished; close out the turn.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::WrongPhase`] unless a teleport is in progress.
    pub fn finish_teleport(&mut self) -> Result<bool, TurnError> {
        self.expect_phase(TurnPhase::Teleporting)?;
        if self.config.jail_forfeits_extra_roll {
            self.state.grant_extra_roll = false;
        }
        Ok(self.finish_turn())
    }

    /// Score the answer to the pending challenge and end the turn.
    ///
    /// The challenge stays pending until scoring completes, so dropping the
    /// returned future leaves the state unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::NoPendingChallenge`] when there is nothing to answer.
    pub async fn submit_answer(&mut self, answer: &str) -> Result<AnswerOutcome, TurnError> {
        if self.state.phase == TurnPhase::GameOver {
            return Err(TurnError::GameOver);
        }
        let Some(challenge) = self.state.pending_challenge.clone() else {
            return Err(TurnError::NoPendingChallenge);
        };
        let verdict = self
            .service
            .score_answer(challenge.kind, &challenge.payload, answer)
            .await;

        self.state.pending_challenge = None;
        self.state.challenges_answered += 1;
        let award = if verdict.passed {
            self.state.challenges_passed += 1;
            let award = apply_correct_answer(
                &self.board,
                &mut self.state,
                &self.config.rewards,
                challenge.tile_index,
                challenge.difficulty,
            );
            self.record_award(&challenge, award);
            award
        } else {
            Award::Nothing
        };

        let (severity, title) = match (verdict.passed, award.reward()) {
            (true, reward) if reward > 0 => (EventSeverity::Success, format!("+{reward} offers")),
            (true, _) => (EventSeverity::Success, "Correct".to_string()),
            (false, _) => (EventSeverity::Warning, "Not this time".to_string()),
        };
        self.state
            .set_outcome(severity, title, verdict.feedback.clone());
        self.events.push(
            EventKind::AnswerScored,
            severity,
            serde_json::json!({
                "passed": verdict.passed,
                "reward": award.reward(),
                "judge": verdict.judge_source,
            }),
        );
        let turn_spent = self.finish_turn();
        Ok(AnswerOutcome {
            verdict,
            award,
            turn_spent,
        })
    }

    #[must_use]
    pub fn summary(&self) -> GameSummary {
        let monopolies = MonopolyGroup::ALL
            .into_iter()
            .filter(|&group| self.board.group_members(group).next().is_some())
            .filter(|&group| is_full_monopoly(&self.board, &self.state.owned, group))
            .collect();
        GameSummary {
            seed: self.state.seed,
            points: self.state.points,
            turns_remaining: self.state.turns_remaining,
            rolls: self.state.turn_seq,
            owned: self.state.owned.iter().cloned().collect(),
            improvements: self
                .state
                .improvement_level
                .iter()
                .filter(|&(_, &level)| level > 0)
                .map(|(name, &level)| (name.clone(), level))
                .collect(),
            monopolies,
            railroads: railroads_owned(&self.board, &self.state.owned),
            challenges_answered: self.state.challenges_answered,
            challenges_passed: self.state.challenges_passed,
            game_over: self.state.is_game_over(),
        }
    }

    fn resolve_tile(&mut self) -> Resolution {
        let resolution = resolve_landing(
            &self.board,
            &mut self.state,
            &self.config,
            self.deck.as_mut(),
        );
        if resolution.start_bonus != 0 {
            self.events.push(
                EventKind::StartBonus,
                EventSeverity::Success,
                serde_json::json!({ "bonus": resolution.start_bonus }),
            );
        }
        resolution
    }

    /// Question for a challenge landing: the prefetched one when it matches,
    /// otherwise a fresh generation.
    async fn settle_challenge(&mut self, request: ChallengeRequest, generating: bool) -> Challenge {
        let landing = request.tile_index;
        let settled = self.prefetch.settle(&mut self.state, landing).await;
        let had_slot = self.state.prefetch_slot.is_some();
        if let Some(challenge) = consume_prefetch(&mut self.state, landing) {
            if !generating {
                self.events.push(
                    EventKind::PrefetchConsumed,
                    EventSeverity::Info,
                    serde_json::json!({ "target": landing }),
                );
            }
            return challenge;
        }
        if had_slot || settled == Settled::Discarded {
            self.events.push(
                EventKind::PrefetchDiscarded,
                EventSeverity::Info,
                serde_json::json!({ "landing": landing }),
            );
        }
        self.generate_now(request).await
    }

    /// Generate through the prefetch mailbox when a runtime is available, so
    /// a dropped call leaves the task running for the retry.
    async fn generate_now(&mut self, request: ChallengeRequest) -> Challenge {
        let landing = request.tile_index;
        if let Some(unsettled) = self.unsettled.as_mut() {
            unsettled.generating = true;
        }
        if self
            .prefetch
            .start(&self.board, &mut self.state, landing)
            .is_some()
            && self.prefetch.settle(&mut self.state, landing).await == Settled::Ready
            && let Some(challenge) = consume_prefetch(&mut self.state, landing)
        {
            return challenge;
        }
        let payload = self
            .service
            .generate_question(request.kind, request.difficulty)
            .await;
        Challenge {
            kind: request.kind,
            difficulty: request.difficulty,
            tile_index: request.tile_index,
            payload,
        }
    }

    fn check_can_roll(&self) -> Result<(), TurnError> {
        if self.state.is_game_over() || self.state.phase == TurnPhase::GameOver {
            return Err(TurnError::GameOver);
        }
        if self.state.pending_challenge.is_some() {
            return Err(TurnError::ChallengePending);
        }
        self.expect_phase(TurnPhase::Idle)
    }

    fn expect_phase(&self, expected: TurnPhase) -> Result<(), TurnError> {
        let actual = self.state.phase;
        if actual == expected {
            Ok(())
        } else {
            Err(TurnError::WrongPhase { expected, actual })
        }
    }

    fn begin_turn(&mut self) {
        self.state.turn_seq = self.state.turn_seq.saturating_add(1);
        self.events.begin_turn(self.state.turn_seq);
    }

    fn skip_turn(&mut self) -> RollOutcome {
        self.begin_turn();
        self.state.skip_next_turn = false;
        self.state.turns_remaining -= 1;
        self.state
            .set_outcome(EventSeverity::Warning, "Rest Day", "Turn skipped.");
        self.events.push(
            EventKind::TurnSkipped,
            EventSeverity::Warning,
            serde_json::json!({ "turns_remaining": self.state.turns_remaining }),
        );
        debug!(target: LOG_TARGET_TURN, "turn {} skipped", self.state.turn_seq);
        if self.state.is_game_over() {
            self.enter_game_over();
        }
        RollOutcome::Skipped {
            turns_remaining: self.state.turns_remaining,
        }
    }

    fn apply_move(&mut self, mv: Move) -> RollOutcome {
        self.begin_turn();
        self.set_phase(TurnPhase::Rolling);
        self.events.push(
            EventKind::DiceRolled,
            EventSeverity::Info,
            serde_json::json!({ "dice": mv.dice, "total": mv.total, "landing": mv.landing }),
        );
        self.state.previous_position = self.state.position;
        self.state.position = mv.landing;
        self.state.just_crossed_start = mv.crossed_start;
        if let Some(request) = self.prefetch.start(&self.board, &mut self.state, mv.landing) {
            self.events.push(
                EventKind::PrefetchStarted,
                EventSeverity::Info,
                serde_json::json!({ "target": request.tile_index, "kind": request.kind }),
            );
        }
        self.set_phase(TurnPhase::Moving);
        RollOutcome::Moved(mv)
    }

    fn record_award(&mut self, challenge: &Challenge, award: Award) {
        let tile = self.board.tile(challenge.tile_index).name.clone();
        match award {
            Award::PropertyAcquired { reward } | Award::RailroadAcquired { reward, .. } => {
                self.events.push(
                    EventKind::OwnershipGranted,
                    EventSeverity::Success,
                    serde_json::json!({ "tile": tile, "reward": reward }),
                );
            }
            Award::ImprovementBuilt { level, reward } => {
                self.events.push(
                    EventKind::ImprovementBuilt,
                    EventSeverity::Success,
                    serde_json::json!({ "tile": tile, "level": level, "reward": reward }),
                );
            }
            Award::Nothing => {}
        }
    }

    /// End-of-turn accounting. Returns whether a turn was spent.
    fn finish_turn(&mut self) -> bool {
        let spent = self.state.end_turn();
        self.events.push(
            EventKind::TurnEnded,
            EventSeverity::Info,
            serde_json::json!({
                "turn_spent": spent,
                "turns_remaining": self.state.turns_remaining,
                "points": self.state.points,
            }),
        );
        if self.state.is_game_over() {
            self.enter_game_over();
        } else {
            self.set_phase(TurnPhase::Idle);
        }
        spent
    }

    fn enter_game_over(&mut self) {
        self.prefetch.abandon();
        self.state.prefetch_slot = None;
        self.set_phase(TurnPhase::GameOver);
        self.events.push(
            EventKind::GameOver,
            EventSeverity::Info,
            serde_json::json!({ "points": self.state.points }),
        );
        info!(
            target: LOG_TARGET_TURN,
            "game over with {} offers after {} rolls",
            self.state.points,
            self.state.turn_seq
        );
    }

    fn set_phase(&mut self, to: TurnPhase) {
        let from = self.state.phase;
        if from == to {
            return;
        }
        self.state.phase = to;
        debug!(target: LOG_TARGET_TURN, "phase {from:?} -> {to:?}");
        self.events.push(
            EventKind::PhaseChanged { from, to },
            EventSeverity::Info,
            serde_json::Value::Null,
        );
    }
}

fn dice_stream(seed: u64, roll: u32) -> CountingRng<SmallRng> {
    let mut tag = b"dice:".to_vec();
    tag.extend_from_slice(&roll.to_le_bytes());
    CountingRng::for_stream(seed, &tag)
}
