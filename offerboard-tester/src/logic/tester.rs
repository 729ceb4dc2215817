use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::logic::simulation::{GameRunner, PlayPlan, PlaySummary};
use crate::scenario::TestScenario;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    /// Mean final offer points over completed iterations.
    pub average_points: f64,
    pub prefetch_hits: usize,
    pub prefetch_misses: usize,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    runner: GameRunner,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(runner: GameRunner, verbose: bool) -> Self {
        Self { runner, verbose }
    }

    pub async fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::new();

        for &seed in seeds {
            if self.verbose {
                println!(
                    "🧪 Testing scenario: {} (seed: {})",
                    scenario.name.bright_white(),
                    seed
                );
            }
            results.push(self.run_single_scenario(scenario, seed, iterations).await);
        }

        results
    }

    async fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut points = Vec::new();
        let mut prefetch_hits = 0;
        let mut prefetch_misses = 0;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));

            let summary = match self.runner.run_plan(&scenario.plan, iteration_seed).await {
                Ok(summary) => summary,
                Err(err) => {
                    failures.push(format!("Iteration {} (seed {iteration_seed}): {err:#}", i + 1));
                    continue;
                }
            };
            prefetch_hits += summary.prefetch_hits;
            prefetch_misses += summary.prefetch_misses;
            points.push(summary.summary.points);

            if let Some(err) = evaluate_expectations(&scenario.plan, &summary) {
                failures.push(format!(
                    "Iteration {} (strategy {}, seed {}, rolls {}, points {}): {} | {}",
                    i + 1,
                    summary.strategy,
                    summary.seed,
                    summary.summary.rolls,
                    summary.summary.points,
                    err,
                    summarize_last_turns(&summary)
                ));
                if self.verbose {
                    println!("  ❌ Iteration {}/{} failed: {}", i + 1, iterations, err.red());
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) points:{} owned:{} policy:{}",
                        i + 1,
                        iterations,
                        summary.summary.points,
                        summary.summary.owned.len(),
                        summary.strategy
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };
        #[allow(clippy::cast_precision_loss)]
        let average_points = if points.is_empty() {
            0.0
        } else {
            f64::from(points.iter().sum::<i32>()) / points.len() as f64
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            average_points,
            prefetch_hits,
            prefetch_misses,
            average_duration,
            performance_data,
        }
    }
}

/// Invariant failures first, then scenario expectations.
fn evaluate_expectations(plan: &PlayPlan, summary: &PlaySummary) -> Option<String> {
    if let Some(first) = summary.invariant_failures.first() {
        return Some(format!(
            "{} invariant failure(s), first: {first}",
            summary.invariant_failures.len()
        ));
    }
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.check(summary).err())
        .map(|err| err.to_string())
}

fn summarize_last_turns(summary: &PlaySummary) -> String {
    if summary.turns.is_empty() {
        return "no turns recorded".to_string();
    }
    summary
        .turns
        .iter()
        .rev()
        .take(3)
        .map(|turn| format!("roll {} {} ({})", turn.roll, turn.tile, turn.outcome))
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u64>::deserialize(deserializer)?;
        Ok(millis.into_iter().map(Duration::from_millis).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::AnswerStrategy;
    use offerboard_game::GameConfig;

    fn tester() -> LogicTester {
        let runner = GameRunner::new(
            GameConfig::default(),
            AnswerStrategy::AlwaysPass,
            Duration::ZERO,
            false,
        );
        LogicTester::new(runner, false)
    }

    #[tokio::test]
    async fn failed_expectations_are_reported_per_iteration() {
        let scenario = TestScenario {
            name: "Impossible".to_string(),
            plan: PlayPlan::new()
                .with_turns(2)
                .with_expectation(|_: &PlaySummary| -> anyhow::Result<()> {
                    anyhow::bail!("never satisfied")
                }),
        };
        let results = tester().run_scenario(&scenario, &[1, 2], 3).await;
        assert_eq!(results.len(), 2);
        for result in results {
            assert!(!result.passed);
            assert_eq!(result.successful_iterations, 0);
            assert_eq!(result.failures.len(), 3);
            assert!(result.failures[0].contains("never satisfied"));
        }
    }

    #[test]
    fn durations_serialize_as_millis() {
        let result = ScenarioResult {
            scenario_name: "x".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_points: 2.5,
            prefetch_hits: 0,
            prefetch_misses: 0,
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data, result.performance_data);
    }
}
