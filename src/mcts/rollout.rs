use rand::Rng;

use crate::engine::{GameState, Move};

use super::DEFAULT_ROLLOUT_DEPTH;

/// Estimates the value of a state by simulation.
///
/// Implementations receive the RNG explicitly so a search is reproducible
/// from its seed.
pub trait RolloutPolicy<S: GameState> {
    /// Play out from (a copy of) `state` and return the reward.
    fn rollout<R: Rng + ?Sized>(&self, state: &S, rng: &mut R) -> f64;
}

/// Uniformly random playout with a cap on attempted moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomRollout {
    /// Every attempt counts toward the cap, legal or not.
    pub max_depth: u32,
}

impl RandomRollout {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }
}

impl Default for RandomRollout {
    fn default() -> Self {
        Self::new(DEFAULT_ROLLOUT_DEPTH)
    }
}

impl<S: GameState> RolloutPolicy<S> for RandomRollout {
    fn rollout<R: Rng + ?Sized>(&self, state: &S, rng: &mut R) -> f64 {
        let mut game = state.clone();
        let mut turns = 0;
        while turns < self.max_depth && !game.is_terminal() {
            let dir = Move::ALL[rng.gen_range(0..Move::ALL.len())];
            if game.apply_move(dir) {
                game.spawn_tile(rng);
            }
            turns += 1;
        }
        reward_from_score(game.score())
    }
}

/// Compress a final score into roughly unit scale: `log2(max(score, 1)) / 2 − 3`.
///
/// A score of 0 maps to −3 rather than −∞.
///
/// ```
/// use mcts_2048::mcts::reward_from_score;
/// assert_eq!(reward_from_score(0), -3.0);
/// assert_eq!(reward_from_score(64), 0.0);
/// assert!(reward_from_score(1024) > reward_from_score(512));
/// ```
#[inline]
pub fn reward_from_score(score: u64) -> f64 {
    (score.max(1) as f64).log2() / 2.0 - 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Grid;
    use rand::{rngs::StdRng, SeedableRng};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Never terminal; counts calls through a counter shared by every clone.
    #[derive(Clone, Default)]
    struct Counting {
        legal: bool,
        moves: Rc<Cell<u32>>,
        spawns: Rc<Cell<u32>>,
    }

    impl GameState for Counting {
        fn apply_move(&mut self, _dir: Move) -> bool {
            self.moves.set(self.moves.get() + 1);
            self.legal
        }

        fn spawn_tile<R: Rng + ?Sized>(&mut self, _rng: &mut R) {
            self.spawns.set(self.spawns.get() + 1);
        }

        fn is_terminal(&self) -> bool {
            false
        }

        fn score(&self) -> u64 {
            0
        }
    }

    #[test]
    fn reward_is_monotonic() {
        let scores = [0u64, 1, 2, 3, 4, 100, 101, 2048, 20_000, 1_000_000];
        for pair in scores.windows(2) {
            assert!(reward_from_score(pair[0]) <= reward_from_score(pair[1]), "{pair:?}");
        }
        assert_eq!(reward_from_score(1), -3.0);
        assert_eq!(reward_from_score(4096), 3.0);
    }

    #[test]
    fn rollout_from_terminal_state_scores_immediately() {
        let blocked = Grid::from_rows(&[[2, 4], [4, 2]]).unwrap().with_score(256);
        let mut rng = StdRng::seed_from_u64(1);
        let r = RandomRollout::default().rollout(&blocked, &mut rng);
        assert_eq!(r, reward_from_score(256));
    }

    #[test]
    fn zero_depth_rollout_does_not_move() {
        let grid = Grid::from_rows(&[[2, 2], [0, 0]]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(RandomRollout::new(0).rollout(&grid, &mut rng), -3.0);
    }

    #[test]
    fn rollout_leaves_input_untouched_and_is_seeded() {
        let grid = Grid::from_rows(&[[2, 2, 0, 0], [0, 4, 0, 0], [0; 4], [0; 4]]).unwrap();
        let before = grid.clone();
        let policy = RandomRollout::default();
        let a = policy.rollout(&grid, &mut StdRng::seed_from_u64(42));
        let b = policy.rollout(&grid, &mut StdRng::seed_from_u64(42));
        assert_eq!(grid, before);
        assert_eq!(a, b);
        assert!(a >= reward_from_score(0));
    }

    #[test]
    fn toy_board_rollout_gains_score() {
        // Every direction merges on a full 2x2 of twos, so the first turn scores 8.
        let grid = Grid::from_rows(&[[2, 2], [2, 2]]).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let r = RandomRollout::new(1).rollout(&grid, &mut rng);
        assert_eq!(r, reward_from_score(8));
    }

    #[test]
    fn illegal_attempts_consume_the_depth_cap() {
        for depth in [0, 7, 50] {
            let state = Counting::default();
            let mut rng = StdRng::seed_from_u64(5);
            RandomRollout::new(depth).rollout(&state, &mut rng);
            assert_eq!(state.moves.get(), depth);
            assert_eq!(state.spawns.get(), 0);
        }
    }

    #[test]
    fn legal_moves_spawn_once_per_turn() {
        let state = Counting { legal: true, ..Default::default() };
        let mut rng = StdRng::seed_from_u64(5);
        RandomRollout::new(12).rollout(&state, &mut rng);
        assert_eq!(state.moves.get(), 12);
        assert_eq!(state.spawns.get(), 12);
    }
}
