use anyhow::Context;
use clap::Parser;
use mcts_2048::engine::Grid;
use mcts_2048::mcts::{DeadEndPolicy, Mcts, MctsConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "mcts-2048", about = "Play one game of 2048 with the MCTS policy, printing every board")]
struct Args {
    /// MCTS iterations per move
    #[arg(long, default_value_t = mcts_2048::mcts::DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Maximum attempted moves per rollout
    #[arg(long, default_value_t = mcts_2048::mcts::DEFAULT_ROLLOUT_DEPTH)]
    rollout_depth: u32,

    /// Board edge length
    #[arg(long, default_value_t = mcts_2048::engine::DEFAULT_SIZE)]
    size: usize,

    /// Seed for tile spawns and search (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Let selection explore illegal-move children like unvisited ones
    #[arg(long)]
    explore_dead_ends: bool,

    /// Stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Only print the final board
    #[arg(long)]
    quiet: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn init_tracing(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);
    anyhow::ensure!(args.size > 0, "board size must be positive");

    let seed = args.seed.unwrap_or_else(rand::random);
    let cfg = MctsConfig {
        iterations: args.iterations,
        rollout_depth: args.rollout_depth,
        dead_end: if args.explore_dead_ends { DeadEndPolicy::Explore } else { DeadEndPolicy::Avoid },
        seed: Some(seed),
        ..Default::default()
    };
    cfg.validate().context("invalid search configuration")?;
    info!(seed, iterations = cfg.iterations, size = args.size, "starting game");

    let mut mcts = Mcts::with_config(cfg);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut grid = Grid::new(args.size).with_random_tile(&mut rng).with_random_tile(&mut rng);
    if !args.quiet {
        println!("{}", grid);
    }

    let mut move_count: u64 = 0;
    let mut total_nodes: u64 = 0;
    while let Some(dir) = mcts.get_next_move(&grid) {
        grid.make_move(dir, &mut rng);
        move_count += 1;
        total_nodes += mcts.last_stats().nodes as u64;
        if !args.quiet {
            println!("move {}: {}\n{}", move_count, dir, grid);
        }
        if args.steps.is_some_and(|limit| move_count >= limit) {
            break;
        }
    }

    if args.quiet {
        println!("{}", grid);
    }
    println!(
        "Moves made: {}, Score: {}, Highest tile: {}, Nodes built: {}, Peak nodes for a move: {}",
        move_count,
        grid.score(),
        grid.highest_tile(),
        total_nodes,
        mcts.last_stats().peak_nodes
    );
    Ok(())
}
