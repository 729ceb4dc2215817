//! Landing-tile resolution.
//!
//! Everything that resolves immediately happens here. A landing that needs a
//! question comes back as a [`ChallengeRequest`] for the controller to fill
//! from the prefetch slot or a fresh generation call.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::board::{Board, MonopolyGroup, TileKind};
use crate::cards::{Card, CardDeck, CardEffect};
use crate::config::GameConfig;
use crate::constants::LOG_TARGET_TURN;
use crate::events::EventSeverity;
use crate::progression::{ChallengeRequest, PropertyGate, challenge_request, property_gate};
use crate::state::GameState;

/// What the landing tile did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Landing {
    /// Corner or utility with no effect.
    Quiet { tile: String },
    /// A card was drawn and its effect applied.
    Card { card: Card },
    /// Owned property whose group is not complete yet.
    MonopolyIncomplete {
        tile: String,
        group: Option<MonopolyGroup>,
        missing: Vec<String>,
    },
    /// Owned property already at hotel.
    FullyDeveloped { tile: String },
    /// Token must be sent to jail.
    Teleport { to: usize },
    /// A question is needed before the turn can end.
    Challenge {
        tile: String,
        request: ChallengeRequest,
    },
}

impl Landing {
    /// The challenge this landing requires, if any.
    #[must_use]
    pub fn challenge(&self) -> Option<ChallengeRequest> {
        match self {
            Self::Challenge { request, .. } => Some(*request),
            _ => None,
        }
    }

    /// Whether the turn ends without further input.
    #[must_use]
    pub const fn ends_turn(&self) -> bool {
        !matches!(self, Self::Challenge { .. } | Self::Teleport { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Start bonus credited before dispatch (0 when start was not crossed).
    pub start_bonus: i32,
    pub landing: Landing,
}

/// Resolve the tile at `state.position`.
///
/// Credits the start bonus first, then dispatches on the tile kind. Card
/// effects are applied here; the caller handles turn accounting.
pub fn resolve_landing(
    board: &Board,
    state: &mut GameState,
    config: &GameConfig,
    deck: &mut dyn CardDeck,
) -> Resolution {
    let start_bonus = if state.just_crossed_start {
        state.just_crossed_start = false;
        state.points += config.start_bonus;
        config.start_bonus
    } else {
        0
    };

    let index = state.position;
    let tile = board.tile(index);
    let name = tile.name.clone();
    let landing = match tile.kind {
        TileKind::Start | TileKind::Jail | TileKind::FreeParking | TileKind::Utility => {
            state.set_outcome(EventSeverity::Info, name.clone(), "Nothing happens here.");
            Landing::Quiet { tile: name }
        }
        TileKind::GoToJail => Landing::Teleport {
            to: board.jail_index(),
        },
        TileKind::Chance | TileKind::Community => {
            let card = deck.draw_card();
            apply_card(state, &card);
            Landing::Card { card }
        }
        TileKind::Property => match property_gate(board, state, tile) {
            PropertyGate::Incomplete { missing } => {
                state.set_outcome(
                    EventSeverity::Info,
                    name.clone(),
                    format!("Complete the group first. Missing: {}", missing.join(", ")),
                );
                Landing::MonopolyIncomplete {
                    tile: name,
                    group: tile.group,
                    missing,
                }
            }
            PropertyGate::FullyDeveloped => {
                state.set_outcome(EventSeverity::Info, name.clone(), "Fully developed.");
                Landing::FullyDeveloped { tile: name }
            }
            PropertyGate::Acquire | PropertyGate::Build { .. } => {
                challenge_landing(board, state, index, name)
            }
        },
        TileKind::Railroad => challenge_landing(board, state, index, name),
    };
    debug!(target: LOG_TARGET_TURN, "resolved tile {index}: {landing:?}");
    Resolution {
        start_bonus,
        landing,
    }
}

fn challenge_landing(board: &Board, state: &GameState, index: usize, tile: String) -> Landing {
    match challenge_request(board, state, index) {
        Some(request) => Landing::Challenge { tile, request },
        None => Landing::Quiet { tile },
    }
}

/// Apply a drawn card's effect to the state.
pub fn apply_card(state: &mut GameState, card: &Card) {
    match card.effect {
        CardEffect::Points(delta) => state.points += delta,
        CardEffect::SkipTurn => state.skip_next_turn = true,
        CardEffect::ExtraRoll => state.grant_extra_roll = true,
        CardEffect::Nothing => {}
    }
    let severity = match card.effect {
        CardEffect::Points(delta) if delta > 0 => EventSeverity::Success,
        CardEffect::Points(delta) if delta < 0 => EventSeverity::Warning,
        CardEffect::SkipTurn => EventSeverity::Warning,
        _ => EventSeverity::Info,
    };
    state.set_outcome(severity, card.title.clone(), card.text.clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::QuestionKind;
    use crate::cards::ScriptedDeck;
    use crate::progression::ChallengeIntent;

    fn deck(effect: CardEffect) -> ScriptedDeck {
        ScriptedDeck::new(vec![Card::new("Test", "card", effect)])
    }

    fn at(position: usize) -> GameState {
        let mut state = GameState::default();
        state.position = position;
        state
    }

    #[test]
    fn start_bonus_is_credited_once() {
        let board = Board::standard();
        let config = GameConfig::default();
        let mut state = at(0);
        state.just_crossed_start = true;
        let resolution =
            resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::Nothing));
        assert_eq!(resolution.start_bonus, 1);
        assert_eq!(state.points, 1);
        assert!(!state.just_crossed_start);

        let again = resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::Nothing));
        assert_eq!(again.start_bonus, 0);
        assert_eq!(state.points, 1);
    }

    #[test]
    fn cards_set_flags_and_points() {
        let board = Board::standard();
        let config = GameConfig::default();

        let mut state = at(7);
        resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::ExtraRoll));
        assert!(state.grant_extra_roll);

        let mut state = at(2);
        resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::SkipTurn));
        assert!(state.skip_next_turn);

        let mut state = at(36);
        let resolution =
            resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::Points(-3)));
        assert_eq!(state.points, -3);
        assert!(resolution.landing.ends_turn());
    }

    #[test]
    fn go_to_jail_requests_teleport() {
        let board = Board::standard();
        let mut state = at(30);
        let resolution = resolve_landing(
            &board,
            &mut state,
            &GameConfig::default(),
            &mut deck(CardEffect::Nothing),
        );
        assert_eq!(resolution.landing, Landing::Teleport { to: 10 });
        assert!(!resolution.landing.ends_turn());
        assert_eq!(state.position, 30, "the controller moves the token");
    }

    #[test]
    fn incomplete_group_lists_missing_members() {
        let board = Board::standard();
        let mut state = at(1);
        state.grant_ownership("FedEx");
        let resolution = resolve_landing(
            &board,
            &mut state,
            &GameConfig::default(),
            &mut deck(CardEffect::Nothing),
        );
        assert_eq!(
            resolution.landing,
            Landing::MonopolyIncomplete {
                tile: "FedEx".into(),
                group: Some(MonopolyGroup::Brown),
                missing: vec!["Starbucks".into(), "Target".into()],
            }
        );
        assert!(state.pending_challenge.is_none());
    }

    #[test]
    fn railroads_and_open_properties_need_challenges() {
        let board = Board::standard();
        let config = GameConfig::default();

        let mut state = at(15);
        let rail = resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::Nothing));
        let request = rail.landing.challenge().unwrap();
        assert_eq!(request.kind, QuestionKind::Coding);
        assert_eq!(request.intent, ChallengeIntent::AcquireRailroad);

        let mut state = at(39);
        let prop = resolve_landing(&board, &mut state, &config, &mut deck(CardEffect::Nothing));
        let request = prop.landing.challenge().unwrap();
        assert_eq!(request.tile_index, 39);
        assert_eq!(request.intent, ChallengeIntent::AcquireProperty);
    }

    #[test]
    fn corners_and_utilities_are_quiet() {
        let board = Board::standard();
        for index in [0, 10, 12, 20, 28] {
            let mut state = at(index);
            let resolution = resolve_landing(
                &board,
                &mut state,
                &GameConfig::default(),
                &mut deck(CardEffect::Points(5)),
            );
            assert!(matches!(resolution.landing, Landing::Quiet { .. }));
            assert_eq!(state.points, 0);
        }
    }
}
