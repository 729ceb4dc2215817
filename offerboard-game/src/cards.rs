//! Chance and community cards.
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::rng::derive_stream_seed;

/// Mechanical effect of a drawn card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CardEffect {
    /// Offer point delta; may be negative.
    Points(i32),
    SkipTurn,
    ExtraRoll,
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub title: String,
    pub text: String,
    pub effect: CardEffect,
}

impl Card {
    #[must_use]
    pub fn new(title: &str, text: &str, effect: CardEffect) -> Self {
        Self {
            title: title.to_string(),
            text: text.to_string(),
            effect,
        }
    }
}

/// Source of chance and community cards.
pub trait CardDeck: Send {
    fn draw_card(&mut self) -> Card;

    /// Restart the draw sequence for a new game.
    fn reseed(&mut self, _seed: u64) {}
}

/// The six-card career deck, drawn uniformly with replacement.
#[derive(Debug, Clone)]
pub struct StandardDeck {
    cards: Vec<Card>,
    rng: ChaCha20Rng,
}

impl StandardDeck {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            cards: standard_cards(),
            rng: ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"cards")),
        }
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl CardDeck for StandardDeck {
    fn draw_card(&mut self) -> Card {
        let idx = self.rng.gen_range(0..self.cards.len());
        self.cards[idx].clone()
    }

    fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha20Rng::seed_from_u64(derive_stream_seed(seed, b"cards"));
    }
}

/// Deck that replays a fixed sequence, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct ScriptedDeck {
    cards: Vec<Card>,
    next: usize,
}

impl ScriptedDeck {
    /// # Panics
    ///
    /// Panics if `cards` is empty.
    #[must_use]
    pub fn new(cards: Vec<Card>) -> Self {
        assert!(!cards.is_empty(), "scripted deck needs at least one card");
        Self { cards, next: 0 }
    }
}

impl CardDeck for ScriptedDeck {
    fn draw_card(&mut self) -> Card {
        let card = self.cards[self.next % self.cards.len()].clone();
        self.next += 1;
        card
    }

    fn reseed(&mut self, _seed: u64) {
        self.next = 0;
    }
}

fn standard_cards() -> Vec<Card> {
    vec![
        Card::new(
            "Recruiter Referral",
            "A friend forwards your resume to a hiring manager.",
            CardEffect::Points(1),
        ),
        Card::new(
            "Resume Revamp",
            "You improve your resume. Interview hit rate goes up.",
            CardEffect::Points(1),
        ),
        Card::new(
            "Mock Interview",
            "Great feedback boosts your confidence.",
            CardEffect::Points(1),
        ),
        Card::new(
            "Tough Panel",
            "It was rough. Learn and move on.",
            CardEffect::Nothing,
        ),
        Card::new(
            "Extra Practice",
            "Daily leetcoding streak.",
            CardEffect::ExtraRoll,
        ),
        Card::new("Rest Day", "Take a breath.", CardEffect::SkipTurn),
    ]
}
