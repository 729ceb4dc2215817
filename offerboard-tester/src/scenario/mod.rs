use anyhow::Result;
use std::time::Duration;

use crate::logic::{AnswerStrategy, PlayPlan, PlaySummary};
use offerboard_game::{Award, Board, GameState, MonopolyGroup};

const SMOKE_TURNS: i32 = 3;
const MONOPOLY_TURNS: i32 = 60;
const PREFETCH_LATENCY: Duration = Duration::from_millis(5);
const OUTAGE_EVERY: u64 = 3;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: PlayPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, plan: PlayPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

fn ensure_finished(summary: &PlaySummary) -> Result<()> {
    anyhow::ensure!(summary.game_ended, "Game should reach game over");
    anyhow::ensure!(
        summary.summary.turns_remaining == 0,
        "Turn budget should end exactly at zero, observed {}",
        summary.summary.turns_remaining
    );
    Ok(())
}

fn smoke_expectation(summary: &PlaySummary) -> Result<()> {
    ensure_finished(summary)?;
    let rolls = usize::try_from(summary.summary.rolls)?;
    anyhow::ensure!(
        rolls == summary.turns.len(),
        "Every roll should be recorded: {rolls} rolls, {} records",
        summary.turns.len()
    );
    Ok(())
}

fn full_game_expectation(summary: &PlaySummary) -> Result<()> {
    ensure_finished(summary)?;
    anyhow::ensure!(
        summary.summary.challenges_answered > 0,
        "A full game should land on at least one challenge"
    );
    anyhow::ensure!(summary.summary.points >= 0, "Offers went negative");
    Ok(())
}

fn grant_brown(state: &mut GameState) {
    for tile in Board::standard().group_members(MonopolyGroup::Brown) {
        state.grant_ownership(&tile.name);
    }
}

fn monopoly_build_expectation(summary: &PlaySummary) -> Result<()> {
    ensure_finished(summary)?;
    anyhow::ensure!(
        summary.summary.monopolies.contains(&MonopolyGroup::Brown),
        "Brown monopoly should survive the game"
    );
    let board = Board::standard();
    let brown: Vec<&str> = board
        .group_members(MonopolyGroup::Brown)
        .map(|tile| tile.name.as_str())
        .collect();
    for turn in &summary.turns {
        if brown.contains(&turn.tile.as_str()) && turn.passed == Some(true) {
            anyhow::ensure!(
                matches!(turn.award, Some(Award::ImprovementBuilt { .. })),
                "Correct answer on monopoly tile {} did not build (roll {})",
                turn.tile,
                turn.roll
            );
        }
    }
    Ok(())
}

fn prefetch_expectation(summary: &PlaySummary) -> Result<()> {
    ensure_finished(summary)?;
    anyhow::ensure!(
        summary.prefetch_misses == 0,
        "{} challenges bypassed the prefetch",
        summary.prefetch_misses
    );
    let answered = usize::try_from(summary.summary.challenges_answered)?;
    anyhow::ensure!(
        summary.prefetch_hits == answered,
        "Expected {answered} prefetched challenges, observed {}",
        summary.prefetch_hits
    );
    Ok(())
}

fn failing_answers_expectation(summary: &PlaySummary) -> Result<()> {
    ensure_finished(summary)?;
    anyhow::ensure!(
        summary.summary.owned.is_empty(),
        "Wrong answers acquired {:?}",
        summary.summary.owned
    );
    anyhow::ensure!(summary.summary.challenges_passed == 0);
    Ok(())
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let scenario = match name.to_lowercase().as_str() {
        "smoke" => TestScenario::new(
            "Smoke Test",
            PlayPlan::new()
                .with_turns(SMOKE_TURNS)
                .with_expectation(smoke_expectation),
        ),
        "full-game" | "full" => TestScenario::new(
            "Full Game",
            PlayPlan::new().with_expectation(full_game_expectation),
        ),
        "monopoly-build" | "monopoly" => TestScenario::new(
            "Monopoly Build",
            PlayPlan::new()
                .with_strategy(AnswerStrategy::AlwaysPass)
                .with_turns(MONOPOLY_TURNS)
                .with_setup(grant_brown)
                .with_expectation(monopoly_build_expectation),
        ),
        "prefetch-latency" | "prefetch" => TestScenario::new(
            "Prefetch Under Latency",
            PlayPlan::new()
                .with_latency(PREFETCH_LATENCY)
                .with_expectation(prefetch_expectation),
        ),
        "backend-outage" | "outage" => TestScenario::new(
            "Backend Outage Fallback",
            PlayPlan::new()
                .with_outage_every(OUTAGE_EVERY)
                .with_expectation(full_game_expectation),
        ),
        "failing-answers" | "failing" => TestScenario::new(
            "Failing Answers",
            PlayPlan::new()
                .with_strategy(AnswerStrategy::AlwaysFail)
                .with_expectation(failing_answers_expectation),
        ),
        "deterministic" | "replay" => TestScenario::new(
            "Deterministic Replay",
            PlayPlan::new()
                .with_strategy(AnswerStrategy::CoinFlip)
                .with_replay_check()
                .with_expectation(ensure_finished),
        ),
        _ => return None,
    };
    Some(scenario)
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("full-game", "Full Game"),
        ("monopoly-build", "Monopoly Build"),
        ("prefetch-latency", "Prefetch Under Latency"),
        ("backend-outage", "Backend Outage Fallback"),
        ("failing-answers", "Failing Answers"),
        ("deterministic", "Deterministic Replay"),
    ]
}
