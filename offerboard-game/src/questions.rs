//! Interview question generation and scoring.
//!
//! The turn engine only sees [`QuestionService`]. Production sessions wrap a
//! fallible [`QuestionBackend`] in a [`ResilientQuestionService`], which
//! bounds every call with a timeout and falls back to the deterministic
//! [`LocalQuestionBank`].

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use rand::Rng;
use rand::rngs::SmallRng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use crate::board::{Difficulty, QuestionKind};
use crate::constants::{
    BEHAVIORAL_MIN_STAR_PARTS, BEHAVIORAL_PROMPT_MAX_CHARS, CODING_MIN_WORDS,
    LOG_TARGET_QUESTIONS, MAX_EXAMPLES, MAX_HINTS, MAX_RUBRIC_ITEMS, PROMPT_MAX_CHARS,
    RUBRIC_ITEM_MAX_CHARS, TIP_MAX_CHARS, TITLE_MAX_CHARS,
};
use crate::rng::CountingRng;

/// Question content shown to the player. Opaque to the turn engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionPayload {
    Coding {
        title: String,
        question: String,
        #[serde(default)]
        examples: Vec<String>,
        #[serde(default)]
        hints: Vec<String>,
    },
    Design {
        title: String,
        prompt: String,
        #[serde(default)]
        rubric: Vec<String>,
    },
    Behavioral {
        title: String,
        prompt: String,
        #[serde(default)]
        tip: String,
    },
}

impl QuestionPayload {
    #[must_use]
    pub const fn kind(&self) -> QuestionKind {
        match self {
            Self::Coding { .. } => QuestionKind::Coding,
            Self::Design { .. } => QuestionKind::Design,
            Self::Behavioral { .. } => QuestionKind::Behavioral,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Coding { title, .. }
            | Self::Design { title, .. }
            | Self::Behavioral { title, .. } => title,
        }
    }

    /// Clip every field to its display limit.
    #[must_use]
    pub fn sanitized(self) -> Self {
        match self {
            Self::Coding {
                title,
                question,
                examples,
                hints,
            } => Self::Coding {
                title: clip(&title, TITLE_MAX_CHARS),
                question: clip(&question, PROMPT_MAX_CHARS),
                examples: examples.into_iter().take(MAX_EXAMPLES).collect(),
                hints: hints.into_iter().take(MAX_HINTS).collect(),
            },
            Self::Design {
                title,
                prompt,
                rubric,
            } => Self::Design {
                title: clip(&title, TITLE_MAX_CHARS),
                prompt: clip(&prompt, PROMPT_MAX_CHARS),
                rubric: rubric
                    .iter()
                    .take(MAX_RUBRIC_ITEMS)
                    .map(|item| clip(item, RUBRIC_ITEM_MAX_CHARS))
                    .collect(),
            },
            Self::Behavioral { title, prompt, tip } => Self::Behavioral {
                title: clip(&title, TITLE_MAX_CHARS),
                prompt: clip(&prompt, BEHAVIORAL_PROMPT_MAX_CHARS),
                tip: clip(&tip, TIP_MAX_CHARS),
            },
        }
    }
}

fn clip(text: &str, max_chars: usize) -> String {
    text.trim().replace('\r', "").chars().take(max_chars).collect()
}

/// Which judge produced a verdict. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JudgeSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(default)]
    pub feedback: String,
    pub judge_source: JudgeSource,
}

impl Verdict {
    #[must_use]
    pub fn local(passed: bool, feedback: impl Into<String>) -> Self {
        Self {
            passed,
            feedback: feedback.into(),
            judge_source: JudgeSource::Local,
        }
    }
}

/// Question generation and grading as seen by the turn engine. Never fails.
#[async_trait]
pub trait QuestionService: Send + Sync {
    async fn generate_question(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> QuestionPayload;

    async fn score_answer(
        &self,
        kind: QuestionKind,
        payload: &QuestionPayload,
        answer: &str,
    ) -> Verdict;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("question backend disabled")]
    Disabled,
    #[error("question backend unavailable: {0}")]
    Unavailable(String),
    #[error("question backend returned malformed output: {0}")]
    Malformed(String),
    #[error("question backend returned a {got} question for a {wanted} request")]
    KindMismatch {
        wanted: QuestionKind,
        got: QuestionKind,
    },
}

/// Remote generator/judge that may fail or stall.
#[async_trait]
pub trait QuestionBackend: Send + Sync {
    async fn generate(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> Result<QuestionPayload, BackendError>;

    /// Returns `(passed, feedback)`.
    async fn score(
        &self,
        kind: QuestionKind,
        payload: &QuestionPayload,
        answer: &str,
    ) -> Result<(bool, String), BackendError>;
}

/// Backend used when no remote judge is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledBackend;

#[async_trait]
impl QuestionBackend for DisabledBackend {
    async fn generate(
        &self,
        _kind: QuestionKind,
        _difficulty: Difficulty,
    ) -> Result<QuestionPayload, BackendError> {
        Err(BackendError::Disabled)
    }

    async fn score(
        &self,
        _kind: QuestionKind,
        _payload: &QuestionPayload,
        _answer: &str,
    ) -> Result<(bool, String), BackendError> {
        Err(BackendError::Disabled)
    }
}

struct CodingEntry {
    title: &'static str,
    question: &'static str,
    examples: &'static [&'static str],
    hints: &'static [&'static str],
}

impl CodingEntry {
    fn payload(&self) -> QuestionPayload {
        QuestionPayload::Coding {
            title: self.title.to_string(),
            question: self.question.to_string(),
            examples: self.examples.iter().map(ToString::to_string).collect(),
            hints: self.hints.iter().map(ToString::to_string).collect(),
        }
    }
}

const CODING_EASY: &[CodingEntry] = &[
    CodingEntry {
        title: "First Duplicate Index",
        question: "Scan left to right. Return the index of the first duplicate value, or -1.",
        examples: &["[2,1,3,2] -> 3", "[1,2,3] -> -1"],
        hints: &["Track seen in a set", "Return when you first hit seen value"],
    },
    CodingEntry {
        title: "Anagram of 'interview'?",
        question: "Return true if s is an anagram of 'interview' ignoring case/spaces.",
        examples: &["'Weir t i n v e r' -> true"],
        hints: &["Lowercase + strip spaces", "Count letters and compare"],
    },
];

const CODING_MEDIUM: &[CodingEntry] = &[
    CodingEntry {
        title: "Longest Substr ≤2 Distinct",
        question: "Return length of the longest substring with at most two distinct chars.",
        examples: &["'eceba' -> 3 ('ece')"],
        hints: &["Sliding window", "Count per char; shrink when >2"],
    },
    CodingEntry {
        title: "Subarrays Sum to K (count)",
        question: "Return how many subarrays sum to K.",
        examples: &["[1,-1,2] K=2 -> 2"],
        hints: &["Prefix sums", "Map of prefix->freq"],
    },
];

const CODING_HARD: &[CodingEntry] = &[
    CodingEntry {
        title: "LRU Cache",
        question: "Design get/put in O(1) with capacity.",
        examples: &[],
        hints: &["Hash map + doubly linked list", "Move node to head on access"],
    },
    CodingEntry {
        title: "Course Schedule Order",
        question: "Return a valid ordering or empty if impossible.",
        examples: &[],
        hints: &["Toposort", "Kahn or DFS cycle check"],
    },
];

fn design_prompt(difficulty: Difficulty) -> QuestionPayload {
    let (title, prompt, rubric): (&str, &str, [&str; 7]) = match difficulty {
        Difficulty::Easy => (
            "URL Shortener",
            "Create and resolve short links. Support ~1M keys and 1k rps. Keep it simple.",
            [
                "API endpoints",
                "Key gen & collisions",
                "Data model",
                "Caching hot keys",
                "Consistency on create",
                "Scaling strategy",
                "Tradeoffs",
            ],
        ),
        Difficulty::Medium => (
            "Image Sharing Feed",
            "Users post images and follow others. Build a feed and trending list.",
            [
                "Post/follow/feed APIs",
                "Blob + metadata storage",
                "Fanout vs fanin",
                "Caching hot feeds",
                "Consistency/backfills",
                "Sharding strategy",
                "Bottlenecks/tradeoffs",
            ],
        ),
        Difficulty::Hard => (
            "Global Chat (E2EE)",
            "Groups, presence, and E2EE across regions. Low latency and reliable delivery.",
            [
                "Protocol/API",
                "Key mgmt basics",
                "Fanout & retries",
                "Ordering/idempotency",
                "Multi-region replicas",
                "Indexes/storage",
                "Observability/tradeoffs",
            ],
        ),
    };
    QuestionPayload::Design {
        title: title.to_string(),
        prompt: prompt.to_string(),
        rubric: rubric.iter().map(ToString::to_string).collect(),
    }
}

fn behavioral_prompt(difficulty: Difficulty) -> QuestionPayload {
    let (title, prompt, tip) = match difficulty {
        Difficulty::Easy => (
            "Small Conflict",
            "Tell me about a time you resolved a minor teammate conflict.",
            "STAR: Situation, Task, Action, Result.",
        ),
        Difficulty::Medium => (
            "Changing Requirements",
            "Describe delivering under changing requirements while keeping stakeholders aligned.",
            "Clarify scope, act, quantify the result.",
        ),
        Difficulty::Hard => (
            "Lead Through Ambiguity",
            "Tell me about leading across teams to deliver a high-impact result amid ambiguity.",
            "Own the outcome; quantify impact.",
        ),
    };
    QuestionPayload::Behavioral {
        title: title.to_string(),
        prompt: prompt.to_string(),
        tip: tip.to_string(),
    }
}

static CODING_KEYWORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"set|map|hash|window|prefix|queue|stack").expect("keyword pattern compiles")
});

const STAR_PARTS: [&str; 4] = ["situation", "task", "action", "result"];

/// Keyword heuristics used when no remote judge answers.
#[must_use]
pub fn score_locally(kind: QuestionKind, payload: &QuestionPayload, answer: &str) -> Verdict {
    let lower = answer.to_lowercase();
    match kind {
        QuestionKind::Coding => {
            let words = answer.split_whitespace().count();
            if words >= CODING_MIN_WORDS && CODING_KEYWORDS.is_match(&lower) {
                Verdict::local(true, "Good. Clear steps and appropriate data structures.")
            } else {
                Verdict::local(
                    false,
                    "Evaluated locally. Outline clear steps and name the structures.",
                )
            }
        }
        QuestionKind::Design => {
            let rubric: &[String] = match payload {
                QuestionPayload::Design { rubric, .. } => rubric,
                _ => &[],
            };
            let hits = rubric
                .iter()
                .filter_map(|item| item.split_whitespace().next())
                .filter(|head| lower.contains(&head.to_lowercase()))
                .count();
            if hits >= (rubric.len() / 3).max(1) {
                Verdict::local(true, "Solid coverage of key items.")
            } else {
                Verdict::local(
                    false,
                    "Cover API, storage, scaling, consistency, and one tradeoff.",
                )
            }
        }
        QuestionKind::Behavioral => {
            let present = STAR_PARTS
                .iter()
                .filter(|part| lower.contains(*part))
                .count();
            if present >= BEHAVIORAL_MIN_STAR_PARTS {
                Verdict::local(true, "Clear STAR structure with a concrete outcome.")
            } else {
                Verdict::local(
                    false,
                    "Use STAR with specific actions and a measurable result.",
                )
            }
        }
    }
}

/// Compact built-in question banks with local keyword judging.
#[derive(Debug)]
pub struct LocalQuestionBank {
    rng: Mutex<CountingRng<SmallRng>>,
}

impl Default for LocalQuestionBank {
    fn default() -> Self {
        Self::new(0)
    }
}

impl LocalQuestionBank {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(CountingRng::for_stream(seed, b"questions")),
        }
    }

    /// Pick a question from the bank for `kind` at `difficulty`.
    #[must_use]
    pub fn pick(&self, kind: QuestionKind, difficulty: Difficulty) -> QuestionPayload {
        match kind {
            QuestionKind::Coding => {
                let bank = match difficulty {
                    Difficulty::Easy => CODING_EASY,
                    Difficulty::Medium => CODING_MEDIUM,
                    Difficulty::Hard => CODING_HARD,
                };
                let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
                bank[rng.gen_range(0..bank.len())].payload()
            }
            QuestionKind::Design => design_prompt(difficulty),
            QuestionKind::Behavioral => behavioral_prompt(difficulty),
        }
    }
}

#[async_trait]
impl QuestionService for LocalQuestionBank {
    async fn generate_question(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> QuestionPayload {
        self.pick(kind, difficulty)
    }

    async fn score_answer(
        &self,
        kind: QuestionKind,
        payload: &QuestionPayload,
        answer: &str,
    ) -> Verdict {
        score_locally(kind, payload, answer)
    }
}

/// Time-bounded backend calls with a local fallback.
pub struct ResilientQuestionService<B> {
    backend: B,
    local: LocalQuestionBank,
    timeout: Duration,
}

impl<B: QuestionBackend> ResilientQuestionService<B> {
    #[must_use]
    pub fn new(backend: B, local: LocalQuestionBank, timeout: Duration) -> Self {
        Self {
            backend,
            local,
            timeout,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn try_generate(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> Result<QuestionPayload, String> {
        let call = self.backend.generate(kind, difficulty);
        let payload = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| format!("timed out after {}ms", self.timeout.as_millis()))?
            .map_err(|err| err.to_string())?;
        if payload.kind() != kind {
            return Err(BackendError::KindMismatch {
                wanted: kind,
                got: payload.kind(),
            }
            .to_string());
        }
        Ok(payload.sanitized())
    }
}

#[async_trait]
impl<B: QuestionBackend> QuestionService for ResilientQuestionService<B> {
    async fn generate_question(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> QuestionPayload {
        match self.try_generate(kind, difficulty).await {
            Ok(payload) => {
                debug!(target: LOG_TARGET_QUESTIONS, "remote {kind} question at {difficulty}");
                payload
            }
            Err(reason) => {
                warn!(
                    target: LOG_TARGET_QUESTIONS,
                    "question generation fell back to local bank: {reason}"
                );
                self.local.pick(kind, difficulty)
            }
        }
    }

    async fn score_answer(
        &self,
        kind: QuestionKind,
        payload: &QuestionPayload,
        answer: &str,
    ) -> Verdict {
        let call = self.backend.score(kind, payload, answer);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok((passed, feedback))) => Verdict {
                passed,
                feedback: clip(&feedback, PROMPT_MAX_CHARS),
                judge_source: JudgeSource::Remote,
            },
            Ok(Err(err)) => {
                warn!(target: LOG_TARGET_QUESTIONS, "scoring fell back to local judge: {err}");
                score_locally(kind, payload, answer)
            }
            Err(_) => {
                warn!(
                    target: LOG_TARGET_QUESTIONS,
                    "scoring timed out after {}ms; using local judge",
                    self.timeout.as_millis()
                );
                score_locally(kind, payload, answer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD_CODING: &str = "I would walk the array once and keep every value I have seen in a \
        hash set, returning the current index as soon as a value is already present, otherwise \
        minus one at the end.";

    struct SlowBackend;

    #[async_trait]
    impl QuestionBackend for SlowBackend {
        async fn generate(
            &self,
            _kind: QuestionKind,
            _difficulty: Difficulty,
        ) -> Result<QuestionPayload, BackendError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(BackendError::Unavailable("never".into()))
        }

        async fn score(
            &self,
            _kind: QuestionKind,
            _payload: &QuestionPayload,
            _answer: &str,
        ) -> Result<(bool, String), BackendError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok((true, String::new()))
        }
    }

    struct WrongKindBackend;

    #[async_trait]
    impl QuestionBackend for WrongKindBackend {
        async fn generate(
            &self,
            _kind: QuestionKind,
            difficulty: Difficulty,
        ) -> Result<QuestionPayload, BackendError> {
            Ok(design_prompt(difficulty))
        }

        async fn score(
            &self,
            _kind: QuestionKind,
            _payload: &QuestionPayload,
            _answer: &str,
        ) -> Result<(bool, String), BackendError> {
            Ok((true, "  remote says yes\r".into()))
        }
    }

    #[test]
    fn coding_needs_length_and_a_structure() {
        let payload = CODING_EASY[0].payload();
        assert!(score_locally(QuestionKind::Coding, &payload, GOOD_CODING).passed);
        assert!(!score_locally(QuestionKind::Coding, &payload, "use a hash set").passed);
        let long_vague = "word ".repeat(30);
        assert!(!score_locally(QuestionKind::Coding, &payload, &long_vague).passed);
    }

    #[test]
    fn design_counts_rubric_heads() {
        let payload = design_prompt(Difficulty::Easy);
        // 7 rubric items need 2 hits.
        assert!(!score_locally(QuestionKind::Design, &payload, "a data model").passed);
        let verdict = score_locally(
            QuestionKind::Design,
            &payload,
            "An API in front of a cache, with a sharded data model.",
        );
        assert!(verdict.passed);
        assert_eq!(verdict.judge_source, JudgeSource::Local);
    }

    #[test]
    fn behavioral_needs_three_star_parts() {
        let payload = behavioral_prompt(Difficulty::Medium);
        let three = "The situation was tense, my task was clear, the action was a sync.";
        assert!(score_locally(QuestionKind::Behavioral, &payload, three).passed);
        let two = "Situation and result only.";
        assert!(!score_locally(QuestionKind::Behavioral, &payload, two).passed);
    }

    #[test]
    fn sanitize_clips_fields() {
        let payload = QuestionPayload::Coding {
            title: format!("  {}\r", "t".repeat(80)),
            question: "q".repeat(500),
            examples: vec!["a".into(), "b".into(), "c".into()],
            hints: vec!["h".into(); 5],
        }
        .sanitized();
        let QuestionPayload::Coding {
            title,
            question,
            examples,
            hints,
        } = payload
        else {
            panic!("kind changed");
        };
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS);
        assert_eq!(question.chars().count(), PROMPT_MAX_CHARS);
        assert_eq!(examples.len(), MAX_EXAMPLES);
        assert_eq!(hints.len(), MAX_HINTS);
    }

    #[test]
    fn bank_serves_requested_kind() {
        let bank = LocalQuestionBank::new(3);
        for kind in [QuestionKind::Coding, QuestionKind::Design, QuestionKind::Behavioral] {
            for difficulty in Difficulty::ALL {
                assert_eq!(bank.pick(kind, difficulty).kind(), kind);
            }
        }
    }

    #[test]
    fn payload_tags_by_kind() {
        let json = serde_json::to_value(behavioral_prompt(Difficulty::Easy)).unwrap();
        assert_eq!(json["kind"], "behavioral");
        assert_eq!(json["title"], "Small Conflict");
    }

    #[tokio::test]
    async fn stalled_backend_falls_back_to_local() {
        let service = ResilientQuestionService::new(
            SlowBackend,
            LocalQuestionBank::new(1),
            Duration::from_millis(50),
        );
        let payload = service
            .generate_question(QuestionKind::Coding, Difficulty::Hard)
            .await;
        assert_eq!(payload.kind(), QuestionKind::Coding);
        let verdict = service
            .score_answer(QuestionKind::Coding, &payload, GOOD_CODING)
            .await;
        assert_eq!(verdict.judge_source, JudgeSource::Local);
        assert!(verdict.passed);
    }

    #[tokio::test]
    async fn mismatched_kind_is_rejected_but_remote_verdicts_pass_through() {
        let service = ResilientQuestionService::new(
            WrongKindBackend,
            LocalQuestionBank::new(1),
            Duration::from_secs(1),
        );
        let payload = service
            .generate_question(QuestionKind::Behavioral, Difficulty::Easy)
            .await;
        assert_eq!(payload, behavioral_prompt(Difficulty::Easy));

        let verdict = service
            .score_answer(QuestionKind::Behavioral, &payload, "anything")
            .await;
        assert!(verdict.passed);
        assert_eq!(verdict.feedback, "remote says yes");
        assert_eq!(verdict.judge_source, JudgeSource::Remote);
    }

    #[tokio::test]
    async fn disabled_backend_always_uses_local() {
        let service = ResilientQuestionService::new(
            DisabledBackend,
            LocalQuestionBank::default(),
            Duration::from_secs(1),
        );
        let verdict = service
            .score_answer(QuestionKind::Behavioral, &behavioral_prompt(Difficulty::Hard), "")
            .await;
        assert!(!verdict.passed);
        assert_eq!(verdict.judge_source, JudgeSource::Local);
    }
}
