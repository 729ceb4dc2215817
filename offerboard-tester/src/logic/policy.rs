use std::fmt;

use clap::ValueEnum;
use offerboard_game::{Challenge, QuestionPayload};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

/// Answering interface for automated play.
pub trait AnswerPolicy: Send {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Produce an answer for the pending challenge.
    fn answer(&mut self, challenge: &Challenge) -> String;
}

/// Built-in answering strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnswerStrategy {
    /// Answers shaped to satisfy the local judge.
    AlwaysPass,
    /// Empty answers.
    AlwaysFail,
    /// Seeded coin flip between the two.
    CoinFlip,
}

impl AnswerStrategy {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AlwaysPass => "Always Pass",
            Self::AlwaysFail => "Always Fail",
            Self::CoinFlip => "Coin Flip",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn AnswerPolicy> {
        match self {
            Self::AlwaysPass => Box::new(PreparedPolicy),
            Self::AlwaysFail => Box::new(SilentPolicy),
            Self::CoinFlip => Box::new(CoinFlipPolicy::new(seed)),
        }
    }
}

impl fmt::Display for AnswerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct PreparedPolicy;
struct SilentPolicy;

struct CoinFlipPolicy {
    rng: ChaCha20Rng,
}

impl CoinFlipPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl AnswerPolicy for PreparedPolicy {
    fn name(&self) -> &'static str {
        "Prepared"
    }

    fn answer(&mut self, challenge: &Challenge) -> String {
        prepared_answer(&challenge.payload)
    }
}

impl AnswerPolicy for SilentPolicy {
    fn name(&self) -> &'static str {
        "Silent"
    }

    fn answer(&mut self, _challenge: &Challenge) -> String {
        String::new()
    }
}

impl AnswerPolicy for CoinFlipPolicy {
    fn name(&self) -> &'static str {
        "Coin Flip"
    }

    fn answer(&mut self, challenge: &Challenge) -> String {
        if self.rng.gen_bool(0.5) {
            prepared_answer(&challenge.payload)
        } else {
            String::new()
        }
    }
}

const CODING_ANSWER: &str = "First build a hash map from each value to its index, then walk \
    the input once and look up the complement in the map before inserting the current value, \
    which keeps the pass linear in time and space.";

const BEHAVIORAL_ANSWER: &str = "Situation: our release slipped a week. Task: I owned the \
    recovery plan. Action: I split the scope and paired with QA daily. Result: we shipped in \
    four days with zero rollbacks.";

/// An answer the keyword judge accepts for `payload`.
#[must_use]
pub fn prepared_answer(payload: &QuestionPayload) -> String {
    match payload {
        QuestionPayload::Coding { .. } => CODING_ANSWER.to_string(),
        QuestionPayload::Design { rubric, .. } => {
            format!("My design covers {}.", rubric.join("; "))
        }
        QuestionPayload::Behavioral { .. } => BEHAVIORAL_ANSWER.to_string(),
    }
}
