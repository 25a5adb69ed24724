//! Whole-game self-play and score summaries.
//!
//! Used by the `batch` binary to collect score statistics over many games,
//! either with the MCTS policy or with a uniform-random baseline.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Grid, Move};
use crate::mcts::{Mcts, MctsConfig};

/// How moves are chosen during self-play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Policy {
    /// Pick one of the four directions uniformly; a no-op pick still costs a move.
    Random,
    /// Fresh MCTS tree per turn.
    Mcts(MctsConfig),
}

/// Outcome of one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub seed: u64,
    pub score: u64,
    pub highest_tile: u32,
    pub moves: u64,
}

/// Aggregate statistics over a batch of games.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub games: usize,
    pub mean_score: f64,
    pub median_score: f64,
    pub min_score: u64,
    pub max_score: u64,
    /// Number of games whose highest tile was exactly this value.
    pub highest_tiles: BTreeMap<u32, usize>,
}

#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Play one game on a `size`×`size` grid until it is over or `max_moves` is reached.
///
/// The game RNG is seeded from `seed`; an MCTS policy without its own seed is
/// seeded from the same value so the whole game is reproducible.
///
/// ```
/// use mcts_2048::harness::{play_game, Policy};
/// let rec = play_game(&Policy::Random, 4, 3, None);
/// assert!(rec.moves > 0);
/// assert_eq!(rec, play_game(&Policy::Random, 4, 3, None));
/// ```
pub fn play_game(policy: &Policy, size: usize, seed: u64, max_moves: Option<u64>) -> GameRecord {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = Grid::new(size).with_random_tile(&mut rng).with_random_tile(&mut rng);
    let mut mcts = match policy {
        Policy::Random => None,
        Policy::Mcts(cfg) => {
            let cfg = MctsConfig { seed: cfg.seed.or(Some(seed)), ..cfg.clone() };
            Some(Mcts::with_config(cfg))
        }
    };

    let mut moves = 0u64;
    while !grid.is_game_over() {
        if max_moves.is_some_and(|limit| moves >= limit) {
            break;
        }
        let dir = match mcts.as_mut() {
            Some(search) => search.best_move(&grid),
            None => Move::ALL[rng.gen_range(0..Move::ALL.len())],
        };
        grid.make_move(dir, &mut rng);
        moves += 1;
    }
    debug!(seed, score = grid.score(), moves, "game finished");
    GameRecord { seed, score: grid.score(), highest_tile: grid.highest_tile(), moves }
}

impl BatchSummary {
    /// Summarize a batch; an empty batch yields zeros.
    pub fn from_records(records: &[GameRecord]) -> Self {
        let mut scores: Vec<u64> = records.iter().map(|r| r.score).collect();
        scores.sort_unstable();
        let games = scores.len();
        let mean_score = if games == 0 { 0.0 } else { scores.iter().sum::<u64>() as f64 / games as f64 };
        let median_score = match games {
            0 => 0.0,
            n if n % 2 == 1 => scores[n / 2] as f64,
            n => (scores[n / 2 - 1] + scores[n / 2]) as f64 / 2.0,
        };
        let mut highest_tiles = BTreeMap::new();
        for r in records {
            *highest_tiles.entry(r.highest_tile).or_insert(0) += 1;
        }
        BatchSummary {
            games,
            mean_score,
            median_score,
            min_score: scores.first().copied().unwrap_or(0),
            max_score: scores.last().copied().unwrap_or(0),
            highest_tiles,
        }
    }
}

#[derive(Serialize)]
struct ResultsFile<'a> {
    policy: &'a Policy,
    summary: &'a BatchSummary,
    games: &'a [GameRecord],
}

/// Write the policy, summary and per-game records as pretty JSON.
pub fn write_results_json<P: AsRef<Path>>(
    path: P,
    policy: &Policy,
    summary: &BatchSummary,
    records: &[GameRecord],
) -> Result<(), HarnessError> {
    let body = serde_json::to_vec_pretty(&ResultsFile { policy, summary, games: records })?;
    fs::write(path, body)?;
    Ok(())
}
