use async_trait::async_trait;
use offerboard_game::{
    Board, Difficulty, DifficultyGate, EventKind, GameConfig, LocalQuestionBank, MonopolyGroup,
    PrefetchCoordinator, QuestionKind, QuestionPayload, QuestionService, ResolveOutcome,
    RollOutcome, Settled, Tile, TurnController, TurnPhase, Verdict, consume_prefetch,
};
use smallvec::smallvec;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every generation request and optionally stalls before answering.
struct RecordingService {
    bank: LocalQuestionBank,
    calls: Mutex<Vec<(QuestionKind, Difficulty)>>,
    delay: Duration,
}

impl RecordingService {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            bank: LocalQuestionBank::new(8),
            calls: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl QuestionService for RecordingService {
    async fn generate_question(
        &self,
        kind: QuestionKind,
        difficulty: Difficulty,
    ) -> QuestionPayload {
        self.calls.lock().unwrap().push((kind, difficulty));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.bank.pick(kind, difficulty)
    }

    async fn score_answer(
        &self,
        _kind: QuestionKind,
        _payload: &QuestionPayload,
        answer: &str,
    ) -> Verdict {
        Verdict::local(!answer.is_empty(), "scored")
    }
}

fn compact_board() -> Board {
    let tiles = (0..20)
        .map(|i| match i {
            0 => Tile::start("GO"),
            5 => Tile::jail("Jail"),
            10 => Tile::free_parking("Free Parking"),
            15 => Tile::go_to_jail("Go To Jail"),
            _ => Tile::property(
                &format!("Co{i}"),
                100,
                DifficultyGate::CodingMedium,
                MonopolyGroup::Green,
                QuestionKind::Coding,
            ),
        })
        .collect();
    Board::new(tiles).unwrap()
}

fn controller(service: Arc<RecordingService>) -> TurnController {
    TurnController::new(Arc::new(compact_board()), GameConfig::default(), service, 5).unwrap()
}

async fn wait_for_calls(service: &RecordingService, expected: usize) {
    for _ in 0..50 {
        if service.calls() >= expected {
            return;
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn stale_prefetch_is_never_issued() {
    let service = RecordingService::new(Duration::ZERO);
    let mut game = controller(Arc::clone(&service));

    let outcome = game.roll_with_dice(smallvec![3, 4]).unwrap();
    assert!(matches!(outcome, RollOutcome::Moved(ref mv) if mv.landing == 7));
    assert_eq!(game.prefetch_in_flight(), Some((7, 1)));

    // Something moved the token after the prefetch was started.
    game.state_mut().position = 12;
    game.finish_movement().unwrap();
    let ResolveOutcome::Challenge(_, challenge) = game.resolve().await.unwrap() else {
        panic!("expected a challenge on Co12");
    };

    assert_eq!(challenge.tile_index, 12);
    assert_eq!(game.state().pending_challenge.as_ref().unwrap().tile_index, 12);
    assert!(game.prefetch_in_flight().is_none());
    assert!(game.state().prefetch_slot.is_none());
    assert!(
        game.events()
            .iter()
            .any(|event| event.kind == EventKind::PrefetchDiscarded)
    );

    wait_for_calls(&service, 2).await;
    assert_eq!(service.calls(), 2, "abandoned prefetch plus synchronous generation");
    assert_eq!(game.state().pending_challenge.as_ref().unwrap().tile_index, 12);
}

#[tokio::test]
async fn slow_prefetch_is_awaited_for_matching_landing() {
    let service = RecordingService::new(Duration::from_millis(20));
    let mut game = controller(Arc::clone(&service));

    game.roll_with_dice(smallvec![2, 2]).unwrap();
    game.finish_movement().unwrap();
    let ResolveOutcome::Challenge(_, challenge) = game.resolve().await.unwrap() else {
        panic!("expected a challenge on Co4");
    };

    assert_eq!(challenge.tile_index, 4);
    assert_eq!(service.calls(), 1);
    assert_eq!(game.phase(), TurnPhase::PendingChallenge);
}

#[tokio::test]
async fn inert_landing_leaves_nothing_in_flight() {
    let service = RecordingService::new(Duration::ZERO);
    let mut game = controller(Arc::clone(&service));

    game.roll_with_dice(smallvec![2, 3]).unwrap();
    assert!(game.prefetch_in_flight().is_none());
    game.finish_movement().unwrap();
    assert!(matches!(game.resolve().await.unwrap(), ResolveOutcome::Ended(_)));
    assert_eq!(service.calls(), 0);
}

#[tokio::test]
async fn replaced_prefetch_never_reaches_the_slot() {
    let service = RecordingService::new(Duration::from_millis(5));
    let board = compact_board();
    let mut state = offerboard_game::GameState::new(1, 20);
    state.turn_seq = 1;
    let mut prefetch = PrefetchCoordinator::new(Arc::clone(&service) as Arc<dyn QuestionService>);

    prefetch.start(&board, &mut state, 3).unwrap();
    prefetch.start(&board, &mut state, 4).unwrap();
    assert_eq!(prefetch.in_flight_target(), Some((4, 1)));

    assert_eq!(prefetch.settle(&mut state, 4).await, Settled::Ready);
    tokio::time::sleep(Duration::from_millis(20)).await;

    let challenge = consume_prefetch(&mut state, 4).unwrap();
    assert_eq!(challenge.tile_index, 4);
    assert!(consume_prefetch(&mut state, 4).is_none());
    assert!(consume_prefetch(&mut state, 3).is_none());
}

#[tokio::test]
async fn every_challenge_landing_generates_once() {
    let service = RecordingService::new(Duration::ZERO);
    let mut game = controller(Arc::clone(&service));
    let mut issued = 0;

    // Walk round the board one property jump at a time.
    for dice in [[1, 1], [1, 1], [2, 2], [1, 2], [2, 1]] {
        if game.phase() == TurnPhase::GameOver {
            break;
        }
        game.roll_with_dice(smallvec![dice[0], dice[1]]).unwrap();
        game.finish_movement().unwrap();
        match game.resolve().await.unwrap() {
            ResolveOutcome::Challenge(..) => {
                issued += 1;
                game.submit_answer("x").await.unwrap();
            }
            ResolveOutcome::Teleport(..) => {
                game.finish_teleport().unwrap();
            }
            ResolveOutcome::Ended(_) => {}
        }
    }

    wait_for_calls(&service, issued).await;
    assert!(issued > 0);
    assert_eq!(service.calls(), issued);
}

fn count_events(game: &TurnController, kind: EventKind) -> usize {
    game.events().iter().filter(|event| event.kind == kind).count()
}

#[tokio::test]
async fn dropped_resolve_resumes_the_same_generation() {
    let service = RecordingService::new(Duration::from_millis(50));
    let mut game = controller(Arc::clone(&service));

    game.roll_with_dice(smallvec![2, 2]).unwrap();
    game.finish_movement().unwrap();
    let timed_out = tokio::time::timeout(Duration::from_millis(5), game.resolve()).await;
    assert!(timed_out.is_err());
    assert_eq!(game.phase(), TurnPhase::Resolving);
    assert_eq!(game.prefetch_in_flight(), Some((4, 1)));

    let ResolveOutcome::Challenge(_, challenge) = game.resolve().await.unwrap() else {
        panic!("expected a challenge on Co4");
    };
    assert_eq!(challenge.tile_index, 4);
    assert_eq!(service.calls(), 1);
    assert_eq!(count_events(&game, EventKind::PrefetchConsumed), 1);
    assert_eq!(count_events(&game, EventKind::ChallengeIssued), 1);
    assert_eq!(game.phase(), TurnPhase::PendingChallenge);
}

#[tokio::test]
async fn dropped_fallback_generation_is_not_repeated() {
    let service = RecordingService::new(Duration::from_millis(50));
    let mut game = controller(Arc::clone(&service));

    game.roll_with_dice(smallvec![3, 4]).unwrap();
    game.state_mut().position = 12;
    game.finish_movement().unwrap();
    let timed_out = tokio::time::timeout(Duration::from_millis(5), game.resolve()).await;
    assert!(timed_out.is_err());
    assert_eq!(game.prefetch_in_flight(), Some((12, 1)));

    let ResolveOutcome::Challenge(_, challenge) = game.resolve().await.unwrap() else {
        panic!("expected a challenge on Co12");
    };
    assert_eq!(challenge.tile_index, 12);
    assert_eq!(service.calls(), 2, "abandoned prefetch plus one replacement");
    assert_eq!(count_events(&game, EventKind::PrefetchDiscarded), 1);
    assert_eq!(count_events(&game, EventKind::PrefetchConsumed), 0);
}

#[test]
fn generation_without_a_prefetch_is_not_a_discard() {
    let service = RecordingService::new(Duration::ZERO);
    let mut game = controller(Arc::clone(&service));

    // No runtime while rolling, so nothing is prefetched.
    game.roll_with_dice(smallvec![2, 2]).unwrap();
    assert!(game.prefetch_in_flight().is_none());
    game.finish_movement().unwrap();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let outcome = runtime.block_on(game.resolve()).unwrap();
    assert!(matches!(outcome, ResolveOutcome::Challenge(_, ref c) if c.tile_index == 4));
    assert_eq!(service.calls(), 1);
    assert_eq!(count_events(&game, EventKind::PrefetchDiscarded), 0);
    assert_eq!(count_events(&game, EventKind::PrefetchConsumed), 0);
}
