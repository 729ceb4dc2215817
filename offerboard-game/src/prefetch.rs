//! Speculative question generation while the token animates.
//!
//! At most one task is in flight. Its result travels through a oneshot
//! mailbox owned by the coordinator, so the task never touches game state.
//! Starting a new prefetch drops the previous receiver; a stale task that
//! finishes late sends into a closed channel and its result is discarded.

use log::debug;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::board::Board;
use crate::constants::LOG_TARGET_PREFETCH;
use crate::progression::{ChallengeRequest, challenge_request};
use crate::questions::QuestionService;
use crate::state::{Challenge, GameState, PrefetchEntry};

struct InFlight {
    target: usize,
    turn: u32,
    mailbox: oneshot::Receiver<Challenge>,
}

/// How [`PrefetchCoordinator::settle`] left the in-flight task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settled {
    /// Nothing was in flight.
    Idle,
    /// The task for this landing delivered into the prefetch slot.
    Ready,
    /// A task was in flight but its result cannot serve this landing.
    Discarded,
}

/// Owner of the single in-flight prefetch task.
pub struct PrefetchCoordinator {
    service: Arc<dyn QuestionService>,
    in_flight: Option<InFlight>,
}

impl std::fmt::Debug for PrefetchCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrefetchCoordinator")
            .field("in_flight", &self.in_flight_target())
            .finish_non_exhaustive()
    }
}

impl PrefetchCoordinator {
    #[must_use]
    pub fn new(service: Arc<dyn QuestionService>) -> Self {
        Self {
            service,
            in_flight: None,
        }
    }

    /// `(target, turn)` of the task currently being awaited, if any.
    #[must_use]
    pub fn in_flight_target(&self) -> Option<(usize, u32)> {
        self.in_flight.as_ref().map(|task| (task.target, task.turn))
    }

    /// Begin generating the challenge `landing` will need, if any.
    ///
    /// Always clears the stored slot and abandons any previous task. Returns
    /// the request that was spawned. Outside a Tokio runtime nothing is
    /// spawned and resolution generates synchronously instead.
    pub fn start(
        &mut self,
        board: &Board,
        state: &mut GameState,
        landing: usize,
    ) -> Option<ChallengeRequest> {
        state.prefetch_slot = None;
        self.abandon();

        let request = challenge_request(board, state, landing)?;
        let Ok(runtime) = Handle::try_current() else {
            debug!(target: LOG_TARGET_PREFETCH, "no runtime; skipping prefetch for {landing}");
            return None;
        };

        let (tx, rx) = oneshot::channel();
        let service = Arc::clone(&self.service);
        runtime.spawn(async move {
            let payload = service
                .generate_question(request.kind, request.difficulty)
                .await;
            let challenge = Challenge {
                kind: request.kind,
                difficulty: request.difficulty,
                tile_index: request.tile_index,
                payload,
            };
            // A closed mailbox means a newer prefetch replaced this one.
            let _ = tx.send(challenge);
        });

        debug!(
            target: LOG_TARGET_PREFETCH,
            "prefetching {} {} for tile {} (turn {})",
            request.difficulty,
            request.kind,
            request.tile_index,
            state.turn_seq
        );
        self.in_flight = Some(InFlight {
            target: request.tile_index,
            turn: state.turn_seq,
            mailbox: rx,
        });
        Some(request)
    }

    /// Wait for the task targeting `landing` in the current turn and park its
    /// result in the state's prefetch slot. A task for any other landing is
    /// abandoned.
    ///
    /// Cancel-safe: the task stays in flight until its result arrives, so a
    /// dropped call can simply be repeated.
    pub async fn settle(&mut self, state: &mut GameState, landing: usize) -> Settled {
        let Some(task) = self.in_flight.as_mut() else {
            return Settled::Idle;
        };
        if task.target != landing || task.turn != state.turn_seq {
            debug!(target: LOG_TARGET_PREFETCH, "landed on {landing}; prefetch no longer needed");
            self.abandon();
            return Settled::Discarded;
        }
        let delivered = (&mut task.mailbox).await;
        let (target, turn) = (task.target, task.turn);
        self.in_flight = None;
        match delivered {
            Ok(challenge) => {
                state.prefetch_slot = Some(PrefetchEntry {
                    target,
                    turn,
                    challenge,
                });
                Settled::Ready
            }
            Err(_) => {
                debug!(target: LOG_TARGET_PREFETCH, "prefetch task for {landing} vanished");
                Settled::Discarded
            }
        }
    }

    /// Drop the pending task without cancelling it.
    pub fn abandon(&mut self) {
        if let Some(task) = self.in_flight.take() {
            debug!(
                target: LOG_TARGET_PREFETCH,
                "discarding prefetch for {} (turn {})",
                task.target,
                task.turn
            );
        }
    }
}

/// Take the prefetched challenge if it was built for `landing` this turn.
///
/// The slot is cleared regardless, so a second call returns `None`.
pub fn consume_prefetch(state: &mut GameState, landing: usize) -> Option<Challenge> {
    let entry = state.prefetch_slot.take()?;
    if entry.target == landing && entry.turn == state.turn_seq {
        Some(entry.challenge)
    } else {
        debug!(
            target: LOG_TARGET_PREFETCH,
            "prefetch for {} (turn {}) does not match landing {landing} (turn {})",
            entry.target,
            entry.turn,
            state.turn_seq
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Difficulty, QuestionKind};
    use crate::questions::LocalQuestionBank;

    fn coordinator() -> PrefetchCoordinator {
        PrefetchCoordinator::new(Arc::new(LocalQuestionBank::new(5)))
    }

    fn entry(target: usize, turn: u32) -> PrefetchEntry {
        PrefetchEntry {
            target,
            turn,
            challenge: Challenge {
                kind: QuestionKind::Behavioral,
                difficulty: Difficulty::Easy,
                tile_index: target,
                payload: LocalQuestionBank::new(0)
                    .pick(QuestionKind::Behavioral, Difficulty::Easy),
            },
        }
    }

    #[test]
    fn consume_is_idempotent() {
        let mut state = GameState::default();
        state.turn_seq = 2;
        state.prefetch_slot = Some(entry(3, 2));
        assert!(consume_prefetch(&mut state, 3).is_some());
        assert!(consume_prefetch(&mut state, 3).is_none());
    }

    #[test]
    fn mismatched_target_or_turn_is_discarded() {
        let mut state = GameState::default();
        state.turn_seq = 4;
        state.prefetch_slot = Some(entry(7, 4));
        assert!(consume_prefetch(&mut state, 12).is_none());
        assert!(state.prefetch_slot.is_none());

        state.prefetch_slot = Some(entry(7, 3));
        assert!(consume_prefetch(&mut state, 7).is_none());
    }

    #[test]
    fn no_runtime_means_no_prefetch() {
        let board = Board::standard();
        let mut state = GameState::default();
        let mut prefetch = coordinator();
        assert!(prefetch.start(&board, &mut state, 1).is_none());
        assert!(prefetch.in_flight_target().is_none());
    }

    #[tokio::test]
    async fn settled_prefetch_fills_slot_for_landing() {
        let board = Board::standard();
        let mut state = GameState::default();
        state.turn_seq = 1;
        let mut prefetch = coordinator();

        let request = prefetch.start(&board, &mut state, 3).unwrap();
        assert_eq!(request.kind, QuestionKind::Behavioral);
        assert_eq!(prefetch.in_flight_target(), Some((3, 1)));

        assert_eq!(prefetch.settle(&mut state, 3).await, Settled::Ready);
        let challenge = consume_prefetch(&mut state, 3).unwrap();
        assert_eq!(challenge.tile_index, 3);
        assert_eq!(challenge.payload.kind(), QuestionKind::Behavioral);
    }

    #[tokio::test]
    async fn inert_landing_clears_slot_and_task() {
        let board = Board::standard();
        let mut state = GameState::default();
        state.prefetch_slot = Some(entry(3, 0));
        let mut prefetch = coordinator();
        prefetch.start(&board, &mut state, 1);
        assert!(prefetch.start(&board, &mut state, 2).is_none());
        assert!(prefetch.in_flight_target().is_none());
        assert!(state.prefetch_slot.is_none());
    }

    #[tokio::test]
    async fn settle_for_other_landing_abandons_task() {
        let board = Board::standard();
        let mut state = GameState::default();
        let mut prefetch = coordinator();
        prefetch.start(&board, &mut state, 3);
        assert_eq!(prefetch.settle(&mut state, 4).await, Settled::Discarded);
        assert!(prefetch.in_flight_target().is_none());
        assert!(state.prefetch_slot.is_none());
        assert_eq!(prefetch.settle(&mut state, 4).await, Settled::Idle);
    }
}
