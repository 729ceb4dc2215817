//! Dice rolls and token movement around the wrapping track.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Individual die faces of one roll.
pub type DiceFaces = SmallVec<[u8; 4]>;
/// Indices traversed by one move, landing last.
pub type MovePath = SmallVec<[usize; 12]>;

/// Result of a single move: what was rolled and where the token went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub dice: DiceFaces,
    pub total: usize,
    pub path: MovePath,
    pub landing: usize,
    pub crossed_start: bool,
}

/// Draw `count` independent uniform faces in `[1, sides]`.
pub fn roll_dice<R: Rng + ?Sized>(rng: &mut R, sides: u8, count: u8) -> DiceFaces {
    (0..count).map(|_| rng.gen_range(1..=sides)).collect()
}

/// Walk `total` steps from `position` on a track of `board_len` cells.
///
/// Start crossing is detected by index wrap, which is exact for any move
/// shorter than the board. [`crate::GameConfig::validate_for_board`] holds
/// controller rolls to that bound.
#[must_use]
pub fn walk(position: usize, total: usize, board_len: usize) -> (MovePath, usize, bool) {
    let path: MovePath = (1..=total).map(|step| (position + step) % board_len).collect();
    let landing = path.last().copied().unwrap_or(position);
    (path, landing, landing < position)
}

/// Roll the dice and move the token from `position`.
pub fn move_token<R: Rng + ?Sized>(
    rng: &mut R,
    position: usize,
    board_len: usize,
    sides: u8,
    count: u8,
) -> Move {
    let dice = roll_dice(rng, sides, count);
    move_with_dice(position, board_len, dice)
}

/// Move by pre-rolled dice faces.
#[must_use]
pub fn move_with_dice(position: usize, board_len: usize, dice: DiceFaces) -> Move {
    let total = dice.iter().map(|&face| usize::from(face)).sum();
    let (path, landing, crossed_start) = walk(position, total, board_len);
    Move {
        dice,
        total,
        path,
        landing,
        crossed_start,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::CountingRng;
    use smallvec::smallvec;

    #[test]
    fn landing_and_path_follow_modular_walk() {
        for position in 0..40 {
            for total in 1..=12 {
                let (path, landing, crossed) = walk(position, total, 40);
                assert_eq!(path.len(), total);
                assert_eq!(landing, (position + total) % 40);
                assert_eq!(crossed, landing < position);
                assert_eq!(path[0], (position + 1) % 40);
            }
        }
    }

    #[test]
    fn crossing_start_is_flagged_on_wrap() {
        let mv = move_with_dice(36, 40, smallvec![3, 4]);
        assert_eq!(mv.total, 7);
        assert_eq!(mv.landing, 3);
        assert!(mv.crossed_start);
        assert_eq!(mv.path.as_slice(), &[37, 38, 39, 0, 1, 2, 3]);

        let exact = move_with_dice(35, 40, smallvec![2, 3]);
        assert_eq!(exact.landing, 0);
        assert!(exact.crossed_start);
    }

    #[test]
    fn dice_stay_within_faces() {
        let mut rng = CountingRng::for_stream(1337, b"dice");
        for _ in 0..500 {
            let faces = roll_dice(&mut rng, 6, 2);
            assert_eq!(faces.len(), 2);
            assert!(faces.iter().all(|&f| (1..=6).contains(&f)));
        }
    }

    #[test]
    fn same_seed_replays_same_moves() {
        let mut a = CountingRng::for_stream(5, b"dice");
        let mut b = CountingRng::for_stream(5, b"dice");
        for position in [0, 10, 33] {
            assert_eq!(
                move_token(&mut a, position, 40, 6, 2),
                move_token(&mut b, position, 40, 6, 2)
            );
        }
    }
}
