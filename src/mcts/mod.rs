//! Monte-Carlo Tree Search policy (single-threaded and root-parallel) for 2048.
//!
//! This module provides two policy implementations:
//! - [`Mcts`]: one tree per decision, grown sequentially.
//! - [`MctsParallel`]: rayon-based root parallelization; independent trees
//!   whose root statistics are pooled before choosing.
//!
//! Each iteration runs select → expand → rollout → backpropagate:
//! - selection descends by UCB1 (`C·sqrt(ln(N/n)) + w/n`) to a frontier node,
//! - expansion adds exactly four children, one per [`Move::ALL`] entry,
//! - the rollout plays uniformly random moves from the selected node,
//! - the reward `log2(score)/2 − 3` is added to every ancestor.
//!
//! The tree is rebuilt from scratch on every call and the caller's state is
//! never mutated.
//!
//! Quick start
//! ```
//! use mcts_2048::engine::{Grid, Move};
//! use mcts_2048::mcts::{Mcts, MctsConfig};
//!
//! let grid = Grid::from_rows(&[[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
//! let cfg = MctsConfig { iterations: 200, seed: Some(7), ..Default::default() };
//! let mut mcts = Mcts::with_config(cfg);
//! let mv = mcts.best_move(&grid);
//! assert!(mv == Move::Down || mv == Move::Right);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::Move;

mod node;
mod rollout;
mod search_par;
mod search_seq;
mod tree;

pub use node::{NodeId, SearchNode};
pub use rollout::{reward_from_score, RandomRollout, RolloutPolicy};
pub use search_par::MctsParallel;
pub use search_seq::Mcts;
pub use tree::SearchTree;

/// Iterations per decision when nothing else is configured.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Rollout turn cap when nothing else is configured.
pub const DEFAULT_ROLLOUT_DEPTH: u32 = 50;

/// How selection treats a dead-end child (an illegal move, expanded with no children).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadEndPolicy {
    /// Unvisited dead ends get −∞ priority and are only reached when every
    /// sibling is a dead end too.
    #[default]
    Avoid,
    /// Dead ends are treated like any other unvisited child (+∞ priority).
    Explore,
}

/// Configurable knobs for MCTS.
///
/// - `iterations`: select/expand/rollout/backpropagate rounds per decision.
/// - `exploration`: UCB1 exploration constant `C`.
/// - `rollout_depth`: maximum attempted moves per rollout.
/// - `dead_end`: selection priority of illegal-move children.
/// - `seed`: seed for the searcher's RNG (`None` draws from OS entropy).
/// - `workers`: independent trees grown by [`MctsParallel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    pub iterations: u32,
    pub exploration: f64,
    pub rollout_depth: u32,
    pub dead_end: DeadEndPolicy,
    pub seed: Option<u64>,
    pub workers: usize,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            exploration: std::f64::consts::SQRT_2,
            rollout_depth: DEFAULT_ROLLOUT_DEPTH,
            dead_end: DeadEndPolicy::Avoid,
            seed: None,
            workers: 4,
        }
    }
}

impl MctsConfig {
    /// Reject settings that would make UCB scores meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.exploration.is_finite() || self.exploration < 0.0 {
            return Err(ConfigError::Exploration(self.exploration));
        }
        if self.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("exploration constant must be finite and non-negative, got {0}")]
    Exploration(f64),
    #[error("parallel search needs at least one worker")]
    NoWorkers,
}

/// Root statistics for one direction after a search.
///
/// - `visits` and `total_reward` are the raw `(n, w)` of the root child.
/// - `legal` is false when the move is a no-op for the searched state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BranchStats {
    pub dir: Move,
    pub visits: u32,
    pub total_reward: f64,
    pub legal: bool,
}

impl BranchStats {
    /// `w / n`, or −∞ when the branch was never visited.
    #[inline]
    pub fn mean_reward(&self) -> f64 {
        if self.visits == 0 {
            f64::NEG_INFINITY
        } else {
            self.total_reward / self.visits as f64
        }
    }
}

/// Basic search stats for a single decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub iterations: u32,
    pub nodes: usize,
    pub max_depth: u32,
    pub peak_nodes: usize,
}

/// Pick the direction with the highest mean reward; ties go to the lowest index.
///
/// With no visited branch at all this returns [`Move::Up`].
pub fn best_branch(branches: &[BranchStats; 4]) -> Move {
    let mut best = 0;
    for i in 1..branches.len() {
        if branches[i].mean_reward() > branches[best].mean_reward() {
            best = i;
        }
    }
    branches[best].dir
}
