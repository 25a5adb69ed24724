use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::engine::{GameState, Move};

use super::rollout::{RandomRollout, RolloutPolicy};
use super::search_seq::grow_tree;
use super::{best_branch, BranchStats, MctsConfig, SearchStats};

/// Root-parallel MCTS using rayon.
///
/// Grows `cfg.workers` independent trees from the same state, each with the
/// full iteration budget and its own RNG seeded from the searcher's RNG, then
/// sums the root children's `(visits, total_reward)` per direction before
/// choosing. Nothing is shared between workers while they search.
pub struct MctsParallel<P = RandomRollout> {
    cfg: MctsConfig,
    rollout: P,
    rng: StdRng,
    stats: SearchStats,
}

impl MctsParallel<RandomRollout> {
    pub fn new() -> Self {
        Self::with_config(MctsConfig::default())
    }

    pub fn with_config(cfg: MctsConfig) -> Self {
        let rollout = RandomRollout::new(cfg.rollout_depth);
        Self::with_rollout(cfg, rollout)
    }
}

impl<P: Sync> MctsParallel<P> {
    pub fn with_rollout(cfg: MctsConfig, rollout: P) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { cfg, rollout, rng, stats: SearchStats::default() }
    }

    /// Compute the best move from the pooled root statistics.
    ///
    /// ```
    /// use mcts_2048::engine::{Grid, Move};
    /// use mcts_2048::mcts::{MctsConfig, MctsParallel};
    /// let grid = Grid::from_rows(&[[0, 0, 0, 0], [0; 4], [0; 4], [0, 0, 0, 4]]).unwrap();
    /// let cfg = MctsConfig { iterations: 50, workers: 3, seed: Some(5), ..Default::default() };
    /// let mv = MctsParallel::with_config(cfg).best_move(&grid);
    /// assert!(mv == Move::Up || mv == Move::Left);
    /// ```
    pub fn best_move<S>(&mut self, state: &S) -> Move
    where
        S: GameState + Send + Sync,
        P: RolloutPolicy<S>,
    {
        let (mv, _) = self.best_move_with_branches(state);
        mv
    }

    /// Back-compat shim: `None` when the game is over.
    #[inline]
    pub fn get_next_move<S>(&mut self, state: &S) -> Option<Move>
    where
        S: GameState + Send + Sync,
        P: RolloutPolicy<S>,
    {
        if state.is_terminal() {
            None
        } else {
            Some(self.best_move(state))
        }
    }

    /// Convenience for runners that log both the move and the evidence behind it.
    pub fn best_move_with_branches<S>(&mut self, state: &S) -> (Move, [BranchStats; 4])
    where
        S: GameState + Send + Sync,
        P: RolloutPolicy<S>,
    {
        let branches = self.branch_stats(state);
        let mv = best_branch(&branches);
        debug!(chosen = %mv, workers = self.cfg.workers, nodes = self.stats.nodes, "parallel mcts move chosen");
        (mv, branches)
    }

    /// Pooled root statistics, in `Move::ALL` order.
    ///
    /// This is the single source of truth for all parallel decisions.
    pub fn branch_stats<S>(&mut self, state: &S) -> [BranchStats; 4]
    where
        S: GameState + Send + Sync,
        P: RolloutPolicy<S>,
    {
        let seeds: Vec<u64> = (0..self.cfg.workers.max(1)).map(|_| self.rng.gen()).collect();
        let cfg = &self.cfg;
        let rollout = &self.rollout;
        let per_worker: Vec<([BranchStats; 4], usize, u32)> = seeds
            .par_iter()
            .map(|&seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let tree = grow_tree(state, cfg, rollout, &mut rng);
                (tree.root_branches(), tree.len(), tree.max_depth())
            })
            .collect();

        let mut pooled = Move::ALL.map(|dir| BranchStats { dir, visits: 0, total_reward: 0.0, legal: false });
        let mut nodes = 0;
        let mut max_depth = 0;
        // Summed in worker order so results do not depend on scheduling.
        for (branches, len, depth) in per_worker {
            for (acc, b) in pooled.iter_mut().zip(branches) {
                acc.visits += b.visits;
                acc.total_reward += b.total_reward;
                acc.legal |= b.legal;
            }
            nodes += len;
            max_depth = max_depth.max(depth);
        }
        self.stats.iterations = self.cfg.iterations.saturating_mul(seeds.len() as u32);
        self.stats.nodes = nodes;
        self.stats.max_depth = max_depth;
        self.stats.peak_nodes = self.stats.peak_nodes.max(nodes);
        pooled
    }

    /// Statistics collected from the last call to [`Self::best_move`] or [`Self::branch_stats`].
    #[inline]
    pub fn last_stats(&self) -> SearchStats {
        self.stats
    }

    /// Reset accumulated stats to zero.
    #[inline]
    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }
}

impl Default for MctsParallel<RandomRollout> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Grid;

    fn seeded(iterations: u32, workers: usize, seed: u64) -> MctsParallel {
        MctsParallel::with_config(MctsConfig { iterations, workers, seed: Some(seed), ..Default::default() })
    }

    #[test]
    fn pooled_visits_cover_every_worker() {
        let grid = Grid::from_rows(&[[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        let mut mcts = seeded(80, 4, 12);
        let branches = mcts.branch_stats(&grid);
        assert_eq!(branches.iter().map(|b| b.visits).sum::<u32>(), 320);
        assert_eq!(branches.map(|b| b.legal), [false, true, false, true]);
        assert_eq!(mcts.last_stats().iterations, 320);
    }

    #[test]
    fn parallel_is_reproducible_from_seed() {
        let grid = Grid::from_rows(&[[2, 4, 0, 0], [0, 2, 0, 0], [0; 4], [0, 0, 0, 2]]).unwrap();
        let a = seeded(100, 3, 44).branch_stats(&grid);
        let b = seeded(100, 3, 44).branch_stats(&grid);
        assert_eq!(a, b);
    }

    #[test]
    fn blocked_grid_parallel() {
        let grid = Grid::from_rows(&[[2, 4], [4, 2]]).unwrap();
        let mut mcts = seeded(10, 2, 1);
        assert_eq!(mcts.best_move(&grid), Move::Up);
        assert_eq!(mcts.get_next_move(&grid), None);
    }
}
