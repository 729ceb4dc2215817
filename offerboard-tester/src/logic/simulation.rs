use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use offerboard_game::{
    Award, Board, EventKind, GameConfig, GameState, GameSummary, Landing, ResolveOutcome,
    RollOutcome, TurnController, TurnPhase,
};

use super::backend::simulated_service;
use super::policy::{AnswerPolicy, AnswerStrategy};

/// Hard stop for runaway games; far above any configured turn budget.
const MAX_STEPS: usize = 1_000;

/// Everything needed to drive one simulated game.
#[derive(Debug, Clone)]
pub struct PlayPlan {
    pub strategy: Option<AnswerStrategy>,
    pub turns: Option<i32>,
    pub latency: Option<Duration>,
    pub outage_every: Option<u64>,
    pub setup: Option<fn(&mut GameState)>,
    pub replay_check: bool,
    pub expectations: Vec<PlayExpectation>,
}

impl Default for PlayPlan {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayPlan {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            strategy: None,
            turns: None,
            latency: None,
            outage_every: None,
            setup: None,
            replay_check: false,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_strategy(mut self, strategy: AnswerStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    #[must_use]
    pub const fn with_turns(mut self, turns: i32) -> Self {
        self.turns = Some(turns);
        self
    }

    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    #[must_use]
    pub const fn with_outage_every(mut self, every: u64) -> Self {
        self.outage_every = Some(every);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut GameState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub const fn with_replay_check(mut self) -> Self {
        self.replay_check = true;
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<PlayExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulated game completes.
type PlayExpectationFn = Arc<dyn Fn(&PlaySummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct PlayExpectation(PlayExpectationFn);

impl std::fmt::Debug for PlayExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayExpectation").finish()
    }
}

impl PlayExpectation {
    #[must_use]
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&PlaySummary) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// # Errors
    ///
    /// Returns the expectation's failure.
    pub fn check(&self, summary: &PlaySummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for PlayExpectation
where
    F: Fn(&PlaySummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self::new(f)
    }
}

/// One roll and everything it led to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub roll: u32,
    pub dice_total: usize,
    pub landing: usize,
    pub tile: String,
    pub outcome: String,
    pub passed: Option<bool>,
    pub award: Option<Award>,
    pub points: i32,
    pub turns_remaining: i32,
}

/// Outcome of a full simulated game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaySummary {
    pub seed: u64,
    pub strategy: AnswerStrategy,
    pub turns: Vec<TurnRecord>,
    pub summary: GameSummary,
    /// Challenges served from a background prefetch.
    pub prefetch_hits: usize,
    /// Challenges generated on demand after a prefetch miss.
    pub prefetch_misses: usize,
    pub invariant_failures: Vec<String>,
    pub game_ended: bool,
}

/// Headless driver that plays whole games through the turn controller.
#[derive(Debug, Clone)]
pub struct GameRunner {
    config: GameConfig,
    default_strategy: AnswerStrategy,
    default_latency: Duration,
    verbose: bool,
}

impl GameRunner {
    #[must_use]
    pub const fn new(
        config: GameConfig,
        default_strategy: AnswerStrategy,
        default_latency: Duration,
        verbose: bool,
    ) -> Self {
        Self {
            config,
            default_strategy,
            default_latency,
            verbose,
        }
    }

    /// Play one game to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the controller rejects configuration or a transition.
    pub async fn run_plan(&self, plan: &PlayPlan, seed: u64) -> Result<PlaySummary> {
        let mut summary = self.play(plan, seed).await?;
        if plan.replay_check {
            let replay = self.play(plan, seed).await?;
            if replay.summary != summary.summary || replay.turns != summary.turns {
                summary
                    .invariant_failures
                    .push(format!("seed {seed} did not replay identically"));
            }
        }
        Ok(summary)
    }

    async fn play(&self, plan: &PlayPlan, seed: u64) -> Result<PlaySummary> {
        let mut config = self.config.clone();
        if let Some(turns) = plan.turns {
            config.turns = turns;
        }
        let strategy = plan.strategy.unwrap_or(self.default_strategy);
        let service = simulated_service(
            plan.latency.unwrap_or(self.default_latency),
            config.question_timeout(),
            plan.outage_every,
            seed,
        );
        let mut game = TurnController::new(Arc::new(Board::standard()), config, service, seed)
            .context("building turn controller")?;
        if let Some(setup) = plan.setup {
            setup(game.state_mut());
        }
        let mut policy = strategy.create_policy(seed);
        debug!("seed {seed}: playing with {} policy", policy.name());

        let mut turns = Vec::new();
        let mut invariant_failures = Vec::new();
        let mut prefetch_hits = 0;
        let mut prefetch_misses = 0;

        for _ in 0..MAX_STEPS {
            if game.phase() == TurnPhase::GameOver {
                break;
            }
            let record = play_turn(&mut game, policy.as_mut()).await?;
            for event in game.drain_events() {
                match event.kind {
                    EventKind::PrefetchConsumed => prefetch_hits += 1,
                    EventKind::PrefetchDiscarded => prefetch_misses += 1,
                    _ => {}
                }
            }
            invariant_failures.extend(check_turn_invariants(&game, record.roll));
            if self.verbose {
                println!(
                    "    {} roll {} → {} ({}) points {} turns {}",
                    "•".dimmed(),
                    record.roll,
                    record.tile,
                    record.outcome,
                    record.points,
                    record.turns_remaining
                );
            }
            turns.push(record);
        }

        let game_ended = game.phase() == TurnPhase::GameOver;
        if !game_ended {
            invariant_failures.push(format!("game still running after {MAX_STEPS} steps"));
        }
        Ok(PlaySummary {
            seed,
            strategy,
            turns,
            summary: game.summary(),
            prefetch_hits,
            prefetch_misses,
            invariant_failures,
            game_ended,
        })
    }
}

async fn play_turn(
    game: &mut TurnController,
    policy: &mut dyn AnswerPolicy,
) -> Result<TurnRecord> {
    let mv = match game.roll().context("rolling")? {
        RollOutcome::Moved(mv) => mv,
        RollOutcome::Skipped { turns_remaining } => {
            let position = game.state().position;
            return Ok(TurnRecord {
                roll: game.state().turn_seq,
                dice_total: 0,
                landing: position,
                tile: game.board().tile(position).name.clone(),
                outcome: "skipped".to_string(),
                passed: None,
                award: None,
                points: game.state().points,
                turns_remaining,
            });
        }
    };
    game.finish_movement().context("finishing movement")?;

    let (outcome, passed, award) = match game.resolve().await.context("resolving landing")? {
        ResolveOutcome::Ended(resolution) => (landing_label(&resolution.landing), None, None),
        ResolveOutcome::Challenge(_, challenge) => {
            let answer = policy.answer(&challenge);
            let scored = game
                .submit_answer(&answer)
                .await
                .context("submitting answer")?;
            ("challenge", Some(scored.verdict.passed), Some(scored.award))
        }
        ResolveOutcome::Teleport(..) => {
            game.finish_teleport().context("finishing teleport")?;
            ("teleport", None, None)
        }
    };

    Ok(TurnRecord {
        roll: game.state().turn_seq,
        dice_total: mv.total,
        landing: mv.landing,
        tile: game.board().tile(mv.landing).name.clone(),
        outcome: outcome.to_string(),
        passed,
        award,
        points: game.state().points,
        turns_remaining: game.state().turns_remaining,
    })
}

const fn landing_label(landing: &Landing) -> &'static str {
    match landing {
        Landing::Quiet { .. } => "quiet",
        Landing::Card { .. } => "card",
        Landing::MonopolyIncomplete { .. } => "monopoly-incomplete",
        Landing::FullyDeveloped { .. } => "fully-developed",
        Landing::Teleport { .. } => "teleport",
        Landing::Challenge { .. } => "challenge",
    }
}

/// Checks that must hold between turns.
fn check_turn_invariants(game: &TurnController, roll: u32) -> Vec<String> {
    let state = game.state();
    let mut failures = Vec::new();
    if let Err(err) = state.check_invariants(game.board()) {
        failures.push(format!("roll {roll}: {err}"));
    }
    if !matches!(game.phase(), TurnPhase::Idle | TurnPhase::GameOver) {
        failures.push(format!("roll {roll}: turn ended in phase {:?}", game.phase()));
    }
    if state.pending_challenge.is_some() {
        failures.push(format!("roll {roll}: challenge left pending"));
    }
    if state.prefetch_slot.is_some() || game.prefetch_in_flight().is_some() {
        failures.push(format!("roll {roll}: prefetch outlived its turn"));
    }
    failures
}
