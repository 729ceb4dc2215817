use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use offerboard_game::{
    BackendError, Difficulty, LocalQuestionBank, QuestionBackend, QuestionKind, QuestionPayload,
    QuestionService, ResilientQuestionService, score_locally,
};

/// Stand-in for a remote generator/judge with fixed latency.
///
/// Every `outage_every`-th call fails so the fallback path stays exercised.
pub struct SimulatedBackend {
    latency: Duration,
    bank: LocalQuestionBank,
    outage_every: Option<u64>,
    calls: AtomicU64,
}

impl SimulatedBackend {
    #[must_use]
    pub fn new(latency: Duration, seed: u64) -> Self {
        Self {
            latency,
            bank: LocalQuestionBank::new(seed ^ 0x5eed),
            outage_every: None,
            calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub const fn with_outage_every(mut self, every: u64) -> Self {
        self.outage_every = Some(every);
        self
    }

    async fn call(&self) -> Result<(), BackendError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.outage_every {
            Some(every) if every > 0 && n % every == 0 => {
                Err(BackendError::Unavailable(format!("simulated outage on call {n}")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl QuestionBackend for SimulatedBackend {
    async fn generate(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> Result<QuestionPayload, BackendError> {
        self.call().await?;
        Ok(self.bank.pick(kind, difficulty))
    }

    async fn score(
        &self,
        kind: QuestionKind,
        payload: &QuestionPayload,
        answer: &str,
    ) -> Result<(bool, String), BackendError> {
        self.call().await?;
        let verdict = score_locally(kind, payload, answer);
        Ok((verdict.passed, verdict.feedback))
    }
}

/// Question service used by simulated games.
#[must_use]
pub fn simulated_service(
    latency: Duration,
    timeout: Duration,
    outage_every: Option<u64>,
    seed: u64,
) -> Arc<dyn QuestionService> {
    let mut backend = SimulatedBackend::new(latency, seed);
    if let Some(every) = outage_every {
        backend = backend.with_outage_every(every);
    }
    Arc::new(ResilientQuestionService::new(
        backend,
        LocalQuestionBank::new(seed),
        timeout,
    ))
}
