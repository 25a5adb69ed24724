//! mcts-2048: a 2048 game engine + Monte-Carlo Tree Search policy
//!
//! This crate provides:
//! - A square `Grid` of any size with ergonomic methods (`shift`, `make_move`, `score`, ...)
//!   implementing the `GameState` contract the search consumes
//! - An MCTS AI (`mcts` module) with single-threaded and root-parallel variants
//! - A self-play harness (`harness` module) for batch score statistics
//!
//! Quick start:
//! ```
//! use mcts_2048::engine::{Grid, Move};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! // Deterministic board initialization with a seeded RNG
//! let mut rng = StdRng::seed_from_u64(42);
//! let mut g = Grid::new(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
//! let _moved = g.shift(Move::Left);
//! assert!(g.count_empty() >= 14);
//! assert!(g.score() <= 8);
//! ```
//!
//! Full loop (simplest possible)
//! ```
//! use mcts_2048::engine::Grid;
//! use mcts_2048::mcts::{Mcts, MctsConfig};
//! use rand::{rngs::StdRng, SeedableRng};
//!
//! let mut rng = StdRng::seed_from_u64(123);
//! let mut policy = Mcts::with_config(MctsConfig { iterations: 50, seed: Some(1), ..Default::default() });
//! let mut g = Grid::new(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
//! let mut moves = 0u32;
//!
//! // Keep doctests fast: a handful of moves only.
//! while moves < 4 {
//!     match policy.get_next_move(&g) {
//!         Some(dir) => {
//!             assert!(g.make_move(dir, &mut rng));
//!             moves += 1;
//!         }
//!         None => break,
//!     }
//! }
//! assert_eq!(moves, 4);
//! ```
//!
pub mod engine;
pub mod harness;
pub mod mcts;
