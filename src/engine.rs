use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A direction to move/merge tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Move {
    Up,
    Down,
    Left,
    Right,
}

impl Move {
    /// Every direction, in search order. Child `i` of an expanded search node
    /// always corresponds to `Move::ALL[i]`.
    pub const ALL: [Move; 4] = [Move::Up, Move::Down, Move::Left, Move::Right];

    /// Position of this direction in [`Move::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Move::Up => "up",
            Move::Down => "down",
            Move::Left => "left",
            Move::Right => "right",
        };
        f.write_str(name)
    }
}

/// Board edge length used when none is given.
pub const DEFAULT_SIZE: usize = 4;

/// Largest tile a grid can hold. Two of these never merge.
pub const MAX_TILE: Tile = 1 << 31;

type Tile = u32;
type Score = u64;

/// What the search needs from a puzzle state.
///
/// `Clone` must produce an independent deep copy: search nodes own their
/// snapshots and never alias a sibling's or parent's state.
pub trait GameState: Clone {
    /// Slide/merge in `dir`. Returns true iff any cell changed.
    fn apply_move(&mut self, dir: Move) -> bool;

    /// Place a 2 (90%) or 4 (10%) on a uniformly chosen empty cell. No-op when full.
    fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R);

    /// True iff no direction would change the state.
    fn is_terminal(&self) -> bool;

    /// Cumulative score; never decreases.
    fn score(&self) -> Score;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("grid must have at least one row")]
    Empty,
    #[error("row {row} has {len} cells, expected {size}")]
    NotSquare { row: usize, len: usize, size: usize },
    #[error("cell ({row}, {col}) holds {value}, which is not a tile value")]
    InvalidTile { row: usize, col: usize, value: Tile },
}

/// Square 2048 grid of tile values plus the score accumulated from merges.
///
/// Cells are stored row-major; `0` marks an empty cell, every other value is a
/// power of two no smaller than 2.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grid {
    size: usize,
    cells: Vec<Tile>,
    score: Score,
}

impl Grid {
    /// An empty `size`×`size` grid with zero score.
    ///
    /// # Panics
    /// If `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "grid size must be positive");
        Grid { size, cells: vec![0; size * size], score: 0 }
    }

    /// Build a grid from explicit rows (score starts at zero).
    ///
    /// ```
    /// use mcts_2048::engine::Grid;
    /// let g = Grid::from_rows(&[[2, 0], [0, 4]]).unwrap();
    /// assert_eq!(g.size(), 2);
    /// assert_eq!(g.cell(1, 1), 4);
    /// assert!(Grid::from_rows(&[[3, 0], [0, 0]]).is_err());
    /// ```
    pub fn from_rows<R: AsRef<[Tile]>>(rows: &[R]) -> Result<Self, GridError> {
        let size = rows.len();
        if size == 0 {
            return Err(GridError::Empty);
        }
        let mut cells = Vec::with_capacity(size * size);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != size {
                return Err(GridError::NotSquare { row, len: values.len(), size });
            }
            for (col, &value) in values.iter().enumerate() {
                // Accepted tiles stay mergeable: the largest loadable value is MAX_TILE / 2.
                if value != 0 && (value < 2 || !value.is_power_of_two() || value >= MAX_TILE) {
                    return Err(GridError::InvalidTile { row, col, value });
                }
                cells.push(value);
            }
        }
        Ok(Grid { size, cells, score: 0 })
    }

    /// Replace the accumulated score, e.g. when resuming a game mid-way.
    pub fn with_score(mut self, score: Score) -> Self {
        self.score = score;
        self
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Value at (`row`, `col`); 0 if empty.
    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> Tile {
        self.cells[row * self.size + col]
    }

    /// Iterate the grid row by row.
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.cells.chunks(self.size)
    }

    #[inline]
    pub fn score(&self) -> Score {
        self.score
    }

    /// Count the number of empty cells on the grid.
    pub fn count_empty(&self) -> usize {
        self.cells.iter().filter(|&&v| v == 0).count()
    }

    /// Return the highest tile value present (0 on an empty grid).
    pub fn highest_tile(&self) -> Tile {
        self.cells.iter().copied().max().unwrap_or(0)
    }

    /// Slide/merge tiles in `dir`, adding merged values to the score. No randomness.
    ///
    /// Returns whether any cell changed.
    ///
    /// ```
    /// use mcts_2048::engine::{Grid, Move};
    /// let mut g = Grid::from_rows(&[[2, 2, 4, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
    /// assert!(g.shift(Move::Left));
    /// assert_eq!(g.rows().next().unwrap(), &[4, 4, 0, 0]);
    /// assert_eq!(g.score(), 4);
    /// assert!(!g.shift(Move::Up));
    /// ```
    pub fn shift(&mut self, dir: Move) -> bool {
        let size = self.size;
        let mut moved = false;
        let mut line = Vec::with_capacity(size);
        for lane in 0..size {
            line.clear();
            line.extend(lane_indices(size, dir, lane).map(|idx| self.cells[idx]));
            self.score += slide_line(&mut line);
            for (slot, idx) in lane_indices(size, dir, lane).enumerate() {
                if self.cells[idx] != line[slot] {
                    self.cells[idx] = line[slot];
                    moved = true;
                }
            }
        }
        moved
    }

    /// Insert a random 2 (90%) or 4 (10%) tile into a random empty slot, using the provided RNG.
    pub fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let empty: Vec<usize> = (0..self.cells.len()).filter(|&i| self.cells[i] == 0).collect();
        if empty.is_empty() {
            return;
        }
        let idx = empty[rng.gen_range(0..empty.len())];
        self.cells[idx] = generate_random_tile(rng);
    }

    /// Builder form of [`Grid::spawn_tile`].
    ///
    /// ```
    /// use mcts_2048::engine::Grid;
    /// use rand::{SeedableRng, rngs::StdRng};
    /// let mut rng = StdRng::seed_from_u64(123);
    /// let g = Grid::new(4).with_random_tile(&mut rng).with_random_tile(&mut rng);
    /// assert_eq!(g.count_empty(), 14);
    /// ```
    pub fn with_random_tile<R: Rng + ?Sized>(mut self, rng: &mut R) -> Self {
        self.spawn_tile(rng);
        self
    }

    /// Perform a move then insert a random tile if the move changed the grid.
    pub fn make_move<R: Rng + ?Sized>(&mut self, dir: Move, rng: &mut R) -> bool {
        let moved = self.shift(dir);
        if moved {
            self.spawn_tile(rng);
        }
        moved
    }

    /// Return true if no legal moves remain.
    ///
    /// A grid with an empty cell or two equal orthogonal neighbours can always move.
    pub fn is_game_over(&self) -> bool {
        let n = self.size;
        for row in 0..n {
            for col in 0..n {
                let v = self.cell(row, col);
                if v == 0 {
                    return false;
                }
                if col + 1 < n && mergeable(v, self.cell(row, col + 1)) {
                    return false;
                }
                if row + 1 < n && mergeable(v, self.cell(row + 1, col)) {
                    return false;
                }
            }
        }
        true
    }
}

impl Default for Grid {
    fn default() -> Self {
        Grid::new(DEFAULT_SIZE)
    }
}

impl GameState for Grid {
    #[inline]
    fn apply_move(&mut self, dir: Move) -> bool {
        self.shift(dir)
    }

    #[inline]
    fn spawn_tile<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        Grid::spawn_tile(self, rng)
    }

    #[inline]
    fn is_terminal(&self) -> bool {
        self.is_game_over()
    }

    #[inline]
    fn score(&self) -> Score {
        self.score
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "-".repeat(self.size * 8);
        writeln!(f, "score: {}", self.score)?;
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                writeln!(f, "{}", rule)?;
            }
            let cells: Vec<String> = row.iter().map(format_val).collect();
            writeln!(f, "{}", cells.join("|"))?;
        }
        Ok(())
    }
}

/// Cell indices of one row or column, starting at the edge tiles slide toward.
fn lane_indices(size: usize, dir: Move, lane: usize) -> impl Iterator<Item = usize> {
    (0..size).map(move |k| match dir {
        Move::Left => lane * size + k,
        Move::Right => lane * size + (size - 1 - k),
        Move::Up => k * size + lane,
        Move::Down => (size - 1 - k) * size + lane,
    })
}

/// Compress, merge each equal pair once, compress again. Returns the merge score.
fn slide_line(line: &mut [Tile]) -> Score {
    compress(line);
    let mut gained = 0;
    for i in 1..line.len() {
        if mergeable(line[i - 1], line[i]) {
            line[i - 1] *= 2;
            gained += line[i - 1] as Score;
            line[i] = 0;
        }
    }
    compress(line);
    gained
}

fn mergeable(a: Tile, b: Tile) -> bool {
    a != 0 && a == b && a < MAX_TILE
}

fn compress(line: &mut [Tile]) {
    let mut write = 0;
    for read in 0..line.len() {
        if line[read] != 0 {
            line.swap(write, read);
            write += 1;
        }
    }
}

fn generate_random_tile<R: Rng + ?Sized>(rng: &mut R) -> Tile {
    if rng.gen_range(0..10) < 9 { 2 } else { 4 }
}

fn format_val(val: &Tile) -> String {
    match val {
        0 => " ".repeat(7),
        x => format!("{:^7}", x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn slid(mut line: Vec<Tile>) -> (Vec<Tile>, Score) {
        let gained = slide_line(&mut line);
        (line, gained)
    }

    fn grid(rows: &[[Tile; 4]]) -> Grid {
        Grid::from_rows(rows).unwrap()
    }

    #[test]
    fn it_slide_line() {
        assert_eq!(slid(vec![0, 0, 0, 0]), (vec![0, 0, 0, 0], 0));
        assert_eq!(slid(vec![2, 4, 2, 4]), (vec![2, 4, 2, 4], 0));
        assert_eq!(slid(vec![2, 2, 4, 4]), (vec![4, 8, 0, 0], 12));
        assert_eq!(slid(vec![2, 0, 0, 2]), (vec![4, 0, 0, 0], 4));
        assert_eq!(slid(vec![2, 2, 2, 2]), (vec![4, 4, 0, 0], 8));
        assert_eq!(slid(vec![0, 2, 2, 2]), (vec![4, 2, 0, 0], 4));
        assert_eq!(slid(vec![4, 4, 8, 0]), (vec![8, 8, 0, 0], 8));
    }

    #[test]
    fn test_move_left() {
        let mut g = grid(&[[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        assert!(g.shift(Move::Left));
        assert_eq!(g, grid(&[[2, 4, 8, 16], [2, 16, 4, 0], [8, 0, 0, 0], [2, 4, 0, 0]]).with_score(24));
    }

    #[test]
    fn test_move_right() {
        let mut g = grid(&[[2, 4, 8, 16], [2, 8, 8, 4], [4, 0, 0, 4], [2, 0, 0, 4]]);
        assert!(g.shift(Move::Right));
        assert_eq!(g, grid(&[[2, 4, 8, 16], [0, 2, 16, 4], [0, 0, 0, 8], [0, 0, 2, 4]]).with_score(24));
    }

    #[test]
    fn test_move_up() {
        let mut g = grid(&[[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        assert!(g.shift(Move::Up));
        assert_eq!(g, grid(&[[2, 2, 8, 2], [4, 16, 0, 4], [8, 4, 0, 0], [16, 0, 0, 0]]).with_score(24));
    }

    #[test]
    fn test_move_down() {
        let mut g = grid(&[[2, 2, 4, 2], [4, 8, 0, 0], [8, 8, 0, 0], [16, 4, 4, 4]]);
        assert!(g.shift(Move::Down));
        assert_eq!(g, grid(&[[2, 0, 0, 0], [4, 2, 0, 0], [8, 16, 0, 2], [16, 4, 8, 4]]).with_score(24));
    }

    #[test]
    fn no_op_shift_reports_unchanged() {
        let mut g = grid(&[[2, 0, 0, 0], [0; 4], [0; 4], [0; 4]]);
        let before = g.clone();
        assert!(!g.shift(Move::Up));
        assert!(!g.shift(Move::Left));
        assert_eq!(g, before);
        assert!(g.shift(Move::Right));
    }

    #[test]
    fn it_spawn_fills_grid() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut g = Grid::new(4);
        for _ in 0..16 {
            g.spawn_tile(&mut rng);
        }
        assert_eq!(g.count_empty(), 0);
        assert!(g.rows().flatten().all(|&v| v == 2 || v == 4));
        // Full grid: spawning is a no-op.
        let before = g.clone();
        g.spawn_tile(&mut rng);
        assert_eq!(g, before);
    }

    #[test]
    fn spawn_favours_twos() {
        let mut rng = StdRng::seed_from_u64(77);
        let fours = (0..2000)
            .filter(|_| Grid::new(2).with_random_tile(&mut rng).highest_tile() == 4)
            .count();
        assert!(fours > 100 && fours < 320, "fours = {fours}");
    }

    #[test]
    fn it_count_empty_and_highest() {
        let g = grid(&[[2, 2, 2, 2], [0; 4], [2, 64, 2, 2], [0; 4]]);
        assert_eq!(g.count_empty(), 8);
        assert_eq!(g.highest_tile(), 64);
        assert_eq!(Grid::default().highest_tile(), 0);
    }

    #[test]
    fn game_over_detection() {
        let blocked = grid(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 2]]);
        assert!(blocked.is_game_over());
        for dir in Move::ALL {
            assert!(!blocked.clone().shift(dir));
        }
        let mergeable = grid(&[[2, 4, 2, 4], [4, 2, 4, 2], [2, 4, 2, 4], [4, 2, 4, 4]]);
        assert!(!mergeable.is_game_over());
        assert!(!Grid::new(4).is_game_over());
    }

    #[test]
    fn toy_grid_merges_every_direction() {
        let full = Grid::from_rows(&[[2, 2], [2, 2]]).unwrap();
        for dir in Move::ALL {
            let mut g = full.clone();
            assert!(g.shift(dir));
            assert_eq!(g.score(), 8);
            assert_eq!(g.count_empty(), 2);
        }
    }

    #[test]
    fn from_rows_rejects_bad_input() {
        let empty: [[Tile; 0]; 0] = [];
        assert_eq!(Grid::from_rows(&empty), Err(GridError::Empty));
        assert_eq!(
            Grid::from_rows(&[vec![2, 0], vec![0]]),
            Err(GridError::NotSquare { row: 1, len: 1, size: 2 })
        );
        assert_eq!(
            Grid::from_rows(&[[2, 6], [0, 0]]),
            Err(GridError::InvalidTile { row: 0, col: 1, value: 6 })
        );
        assert_eq!(
            Grid::from_rows(&[[1, 0], [0, 0]]),
            Err(GridError::InvalidTile { row: 0, col: 0, value: 1 })
        );
    }

    #[test]
    fn from_rows_rejects_tiles_that_cannot_merge() {
        assert_eq!(
            Grid::from_rows(&[[1 << 31, 1 << 31], [0, 0]]),
            Err(GridError::InvalidTile { row: 0, col: 0, value: 1 << 31 })
        );
    }

    #[test]
    fn largest_tiles_merge_once_then_stay_put() {
        let half = MAX_TILE / 2;
        let mut g = Grid::from_rows(&[[half, half], [half, half]]).unwrap();
        assert!(g.shift(Move::Left));
        assert_eq!((g.cell(0, 0), g.cell(1, 0)), (MAX_TILE, MAX_TILE));
        assert_eq!(g.count_empty(), 2);
        assert_eq!(g.score(), 2 * MAX_TILE as Score);
        assert!(!g.shift(Move::Up));
        assert!(!g.shift(Move::Left));
        assert_eq!(g.highest_tile(), MAX_TILE);
    }

    #[test]
    fn equal_max_tiles_do_not_keep_the_game_alive() {
        let mut g = Grid { size: 2, cells: vec![MAX_TILE, 2, MAX_TILE, 4], score: 0 };
        assert!(g.is_game_over());
        for dir in Move::ALL {
            assert!(!g.shift(dir));
        }
        assert_eq!(g.score(), 0);
    }

    #[test]
    fn move_index_matches_order() {
        for (i, dir) in Move::ALL.iter().enumerate() {
            assert_eq!(dir.index(), i);
        }
    }
}
