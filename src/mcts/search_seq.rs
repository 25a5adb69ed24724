use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::engine::{GameState, Move};

use super::rollout::{RandomRollout, RolloutPolicy};
use super::tree::SearchTree;
use super::{best_branch, BranchStats, MctsConfig, SearchStats};

/// Single-threaded MCTS.
///
/// Owns a seedable RNG that drives both expansion spawns and rollouts, so a
/// searcher built with `seed: Some(_)` is fully reproducible.
pub struct Mcts<P = RandomRollout> {
    cfg: MctsConfig,
    rollout: P,
    rng: StdRng,
    stats: SearchStats,
}

impl Mcts<RandomRollout> {
    pub fn new() -> Self {
        Self::with_config(MctsConfig::default())
    }

    /// Random rollouts capped at `cfg.rollout_depth`.
    pub fn with_config(cfg: MctsConfig) -> Self {
        let rollout = RandomRollout::new(cfg.rollout_depth);
        Self::with_rollout(cfg, rollout)
    }
}

impl<P> Mcts<P> {
    /// Use a custom rollout policy.
    pub fn with_rollout(cfg: MctsConfig, rollout: P) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, rollout, rng, stats: SearchStats::default() }
    }

    #[inline]
    pub fn config(&self) -> &MctsConfig {
        &self.cfg
    }

    /// Statistics collected from the last call to [`Self::best_move`],
    /// [`Self::choose_move`] or [`Self::branch_stats`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    /// Choose a move with the configured iteration budget.
    ///
    /// Always returns a direction. When no move is legal the result is
    /// [`Move::Up`], which is a no-op; check [`GameState::is_terminal`] first.
    ///
    /// ```
    /// use mcts_2048::engine::{Grid, Move};
    /// use mcts_2048::mcts::{Mcts, MctsConfig};
    /// use rand::{SeedableRng, rngs::StdRng};
    ///
    /// let mut rng = StdRng::seed_from_u64(7);
    /// let grid = Grid::new(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// let mut mcts = Mcts::with_config(MctsConfig { iterations: 100, seed: Some(1), ..Default::default() });
    /// let mv = mcts.best_move(&grid);
    /// assert!(grid.clone().shift(mv));
    /// ```
    pub fn best_move<S: GameState>(&mut self, state: &S) -> Move
    where
        P: RolloutPolicy<S>,
    {
        let iterations = self.cfg.iterations;
        self.choose_move(state, iterations)
    }

    /// Back-compat shim, equivalent to [`Self::best_move`] but `None` when the game is over.
    #[inline]
    pub fn get_next_move<S: GameState>(&mut self, state: &S) -> Option<Move>
    where
        P: RolloutPolicy<S>,
    {
        if state.is_terminal() {
            None
        } else {
            Some(self.best_move(state))
        }
    }

    /// Choose a move with an explicit iteration budget.
    pub fn choose_move<S: GameState>(&mut self, state: &S, iterations: u32) -> Move
    where
        P: RolloutPolicy<S>,
    {
        let branches = self.search(state, iterations);
        let mv = best_branch(&branches);
        debug!(
            chosen = %mv,
            iterations,
            nodes = self.stats.nodes,
            depth = self.stats.max_depth,
            "mcts move chosen"
        );
        mv
    }

    /// Root visit/reward statistics for each direction, in `Move::ALL` order.
    ///
    /// ```
    /// use mcts_2048::engine::Grid;
    /// use mcts_2048::mcts::{Mcts, MctsConfig};
    /// let grid = Grid::from_rows(&[[2, 2], [0, 0]]).unwrap();
    /// let mut mcts = Mcts::with_config(MctsConfig { iterations: 40, seed: Some(2), ..Default::default() });
    /// let branches = mcts.branch_stats(&grid);
    /// assert_eq!(branches.len(), 4);
    /// assert_eq!(branches.iter().map(|b| b.visits).sum::<u32>(), 40);
    /// ```
    pub fn branch_stats<S: GameState>(&mut self, state: &S) -> [BranchStats; 4]
    where
        P: RolloutPolicy<S>,
    {
        let iterations = self.cfg.iterations;
        self.search(state, iterations)
    }

    fn search<S: GameState>(&mut self, state: &S, iterations: u32) -> [BranchStats; 4]
    where
        P: RolloutPolicy<S>,
    {
        let cfg = MctsConfig { iterations, ..self.cfg.clone() };
        let tree = grow_tree(state, &cfg, &self.rollout, &mut self.rng);
        self.stats.iterations = iterations;
        self.stats.nodes = tree.len();
        self.stats.max_depth = tree.max_depth();
        self.stats.peak_nodes = self.stats.peak_nodes.max(tree.len());
        tree.root_branches()
    }
}

/// Build a fresh tree from a copy of `state` and run the configured iterations on it.
pub(crate) fn grow_tree<S, P, R>(state: &S, cfg: &MctsConfig, rollout: &P, rng: &mut R) -> SearchTree<S>
where
    S: GameState,
    P: RolloutPolicy<S>,
    R: Rng + ?Sized,
{
    let mut tree = SearchTree::new(state.clone());
    tree.grow(cfg, rollout, rng);
    tree
}

impl Default for Mcts<RandomRollout> {
    fn default() -> Self {
        Self::new()
    }
}
