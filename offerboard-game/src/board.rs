//! Static board model: tiles, monopoly groups, and the track layout.
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::constants::STANDARD_BOARD_SIZE;

/// Behaviour class of a board cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TileKind {
    Start,
    Property,
    Railroad,
    Utility,
    Chance,
    Community,
    Jail,
    FreeParking,
    GoToJail,
}

impl TileKind {
    /// Whether landing here may involve ownership (and therefore a challenge).
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::Property | Self::Railroad | Self::Utility)
    }
}

/// Interview discipline a challenge is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    Coding,
    Design,
    Behavioral,
}

impl QuestionKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Coding => "coding",
            Self::Design => "system design",
            Self::Behavioral => "behavioral",
        }
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Difficulty tier used for question generation and reward lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Self; 3] = [Self::Easy, Self::Medium, Self::Hard];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry requirement printed on a property deed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DifficultyGate {
    #[serde(rename = "LC_EASY")]
    CodingEasy,
    #[serde(rename = "LC_MED")]
    CodingMedium,
    #[serde(rename = "LC_HARD")]
    CodingHard,
    #[serde(rename = "SYS_DESIGN")]
    SystemDesign,
    #[serde(rename = "BEHAVIORAL")]
    Behavioral,
}

/// Classic colour sets; every property belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonopolyGroup {
    Brown,
    LightBlue,
    Pink,
    Orange,
    Red,
    Yellow,
    Green,
    DarkBlue,
}

impl MonopolyGroup {
    pub const ALL: [Self; 8] = [
        Self::Brown,
        Self::LightBlue,
        Self::Pink,
        Self::Orange,
        Self::Red,
        Self::Yellow,
        Self::Green,
        Self::DarkBlue,
    ];
}

/// A single immutable cell of the track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub name: String,
    pub kind: TileKind,
    #[serde(default)]
    pub price: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<DifficultyGate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<MonopolyGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_kind: Option<QuestionKind>,
}

impl Tile {
    fn plain(name: &str, kind: TileKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            price: 0,
            gate: None,
            group: None,
            question_kind: None,
        }
    }

    #[must_use]
    pub fn start(name: &str) -> Self {
        Self::plain(name, TileKind::Start)
    }

    #[must_use]
    pub fn jail(name: &str) -> Self {
        Self::plain(name, TileKind::Jail)
    }

    #[must_use]
    pub fn free_parking(name: &str) -> Self {
        Self::plain(name, TileKind::FreeParking)
    }

    #[must_use]
    pub fn go_to_jail(name: &str) -> Self {
        Self::plain(name, TileKind::GoToJail)
    }

    #[must_use]
    pub fn chance(name: &str) -> Self {
        Self::plain(name, TileKind::Chance)
    }

    #[must_use]
    pub fn community(name: &str) -> Self {
        Self::plain(name, TileKind::Community)
    }

    #[must_use]
    pub fn property(
        name: &str,
        price: u32,
        gate: DifficultyGate,
        group: MonopolyGroup,
        question_kind: QuestionKind,
    ) -> Self {
        Self {
            price,
            gate: Some(gate),
            group: Some(group),
            question_kind: Some(question_kind),
            ..Self::plain(name, TileKind::Property)
        }
    }

    /// Railroads always quiz coding questions.
    #[must_use]
    pub fn railroad(name: &str, price: u32) -> Self {
        Self {
            price,
            gate: Some(DifficultyGate::CodingMedium),
            question_kind: Some(QuestionKind::Coding),
            ..Self::plain(name, TileKind::Railroad)
        }
    }

    #[must_use]
    pub fn utility(name: &str, price: u32) -> Self {
        Self {
            price,
            gate: Some(DifficultyGate::CodingMedium),
            ..Self::plain(name, TileKind::Utility)
        }
    }
}

/// Errors raised when a board layout violates structural invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    #[error("board has no tiles")]
    Empty,
    #[error("index 0 must be START (found {found:?})")]
    StartNotFirst { found: TileKind },
    #[error("board must contain exactly one JAIL tile (found {count})")]
    JailCount { count: usize },
    #[error("purchasable tile name {name:?} appears more than once")]
    DuplicateName { name: String },
    #[error("property {name:?} has no monopoly group")]
    PropertyWithoutGroup { name: String },
    #[error("{name:?} issues challenges but has no question kind")]
    MissingQuestionKind { name: String },
}

/// Ordered, validated, immutable track of tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    tiles: Vec<Tile>,
    #[serde(skip)]
    jail_index: usize,
}

impl Board {
    /// Validate and build a board from an ordered tile list.
    ///
    /// # Errors
    ///
    /// Returns a [`BoardError`] when the layout breaks a board invariant.
    pub fn new(tiles: Vec<Tile>) -> Result<Self, BoardError> {
        let first = tiles.first().ok_or(BoardError::Empty)?;
        if first.kind != TileKind::Start {
            return Err(BoardError::StartNotFirst { found: first.kind });
        }

        let jails: Vec<usize> = tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.kind == TileKind::Jail)
            .map(|(idx, _)| idx)
            .collect();
        let &[jail_index] = jails.as_slice() else {
            return Err(BoardError::JailCount { count: jails.len() });
        };

        let mut names = HashSet::new();
        for tile in tiles.iter().filter(|tile| tile.kind.is_purchasable()) {
            if !names.insert(tile.name.as_str()) {
                return Err(BoardError::DuplicateName {
                    name: tile.name.clone(),
                });
            }
            if tile.kind == TileKind::Property && tile.group.is_none() {
                return Err(BoardError::PropertyWithoutGroup {
                    name: tile.name.clone(),
                });
            }
            if matches!(tile.kind, TileKind::Property | TileKind::Railroad)
                && tile.question_kind.is_none()
            {
                return Err(BoardError::MissingQuestionKind {
                    name: tile.name.clone(),
                });
            }
        }

        Ok(Self { tiles, jail_index })
    }

    /// The 40-cell interview board.
    ///
    /// # Panics
    ///
    /// Panics only if the built-in layout is edited into an invalid shape.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(standard_tiles()).expect("standard board layout is valid")
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[must_use]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at `index`, wrapping modulo the board length.
    #[must_use]
    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index % self.tiles.len()]
    }

    #[must_use]
    pub const fn jail_index(&self) -> usize {
        self.jail_index
    }

    /// Index of the tile called `name`, if any.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tiles.iter().position(|tile| tile.name == name)
    }

    /// All property tiles sharing `group`, in track order.
    pub fn group_members(&self, group: MonopolyGroup) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(move |tile| tile.kind == TileKind::Property && tile.group == Some(group))
    }

    /// Railroad tiles in track order.
    pub fn railroads(&self) -> impl Iterator<Item = &Tile> {
        self.tiles
            .iter()
            .filter(|tile| tile.kind == TileKind::Railroad)
    }

    /// Spatial difficulty gradient: the track is split into four quadrants,
    /// the first EASY, the middle two MEDIUM, the last HARD.
    #[must_use]
    pub fn difficulty_for_index(&self, index: usize) -> Difficulty {
        let len = self.tiles.len();
        let quadrant = (index % len) * 4 / len;
        match quadrant {
            0 => Difficulty::Easy,
            1 | 2 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct RawBoard {
            tiles: Vec<Tile>,
        }
        let raw = RawBoard::deserialize(deserializer)?;
        Self::new(raw.tiles).map_err(serde::de::Error::custom)
    }
}

fn standard_tiles() -> Vec<Tile> {
    use DifficultyGate::{Behavioral, CodingEasy, CodingHard, CodingMedium, SystemDesign};
    use MonopolyGroup::{Brown, DarkBlue, Green, LightBlue, Orange, Pink, Red, Yellow};
    use QuestionKind::{Behavioral as Bh, Coding as Lc, Design as Sd};

    let tiles = vec![
        // Bottom row
        Tile::start("GO"),
        Tile::property("FedEx", 60, CodingEasy, Brown, Sd),
        Tile::community("Community Chest"),
        Tile::property("Starbucks", 60, CodingEasy, Brown, Bh),
        Tile::property("Target", 70, CodingEasy, Brown, Lc),
        Tile::railroad("NYC", 200),
        Tile::property("Enterprise", 100, CodingEasy, LightBlue, Bh),
        Tile::chance("Chance"),
        Tile::property("Nokia", 100, CodingMedium, LightBlue, Sd),
        Tile::property("Hertz", 120, CodingMedium, LightBlue, Lc),
        // Left column
        Tile::jail("Jail"),
        Tile::property("Odoo", 140, CodingMedium, Pink, Lc),
        Tile::utility("Utility 1", 150),
        Tile::property("Adobe", 140, CodingMedium, Pink, Bh),
        Tile::property("eBay", 160, CodingHard, Pink, Sd),
        Tile::railroad("SF", 200),
        Tile::property("Moog", 180, CodingMedium, Orange, Sd),
        Tile::community("Community Chest"),
        Tile::property("Valmar", 180, CodingMedium, Orange, Lc),
        Tile::property("M&T", 200, CodingHard, Orange, Bh),
        // Top row
        Tile::free_parking("Free Parking"),
        Tile::property("IBM", 220, CodingMedium, Red, Lc),
        Tile::chance("Chance"),
        Tile::property("AMD", 220, CodingHard, Red, Sd),
        Tile::property("Palantir", 240, CodingHard, Red, Bh),
        Tile::railroad("Austin", 200),
        Tile::property("Tesla", 260, CodingHard, Yellow, Lc),
        Tile::property("Netflix", 260, CodingHard, Yellow, Bh),
        Tile::utility("Utility 2", 150),
        Tile::property("Samsung", 280, CodingHard, Yellow, Sd),
        // Right column
        Tile::go_to_jail("Go To Jail"),
        Tile::property("Meta", 300, SystemDesign, Green, Bh),
        Tile::property("Amazon", 300, SystemDesign, Green, Lc),
        Tile::community("Community Chest"),
        Tile::property("Google", 320, SystemDesign, Green, Sd),
        Tile::railroad("Boston", 200),
        Tile::chance("Chance"),
        Tile::property("Nvidia", 350, SystemDesign, DarkBlue, Bh),
        Tile::property("Microsoft", 380, SystemDesign, DarkBlue, Sd),
        Tile::property("Apple", 400, Behavioral, DarkBlue, Lc),
    ];
    debug_assert_eq!(tiles.len(), STANDARD_BOARD_SIZE);
    tiles
}
