use anyhow::Context;
use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use mcts_2048::harness::{self, BatchSummary, GameRecord, Policy};
use mcts_2048::mcts::{DeadEndPolicy, MctsConfig};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PolicyKind {
    /// Uniformly random directions
    Random,
    /// Fresh MCTS tree every turn
    Mcts,
}

#[derive(Debug, Parser)]
#[command(name = "batch", about = "Play many independent 2048 games in parallel and summarize the scores")]
struct Args {
    /// Number of games to play
    #[arg(long, default_value_t = 100)]
    games: u64,

    /// Move policy
    #[arg(long, value_enum, default_value_t = PolicyKind::Mcts)]
    policy: PolicyKind,

    /// MCTS iterations per move
    #[arg(long, default_value_t = mcts_2048::mcts::DEFAULT_ITERATIONS)]
    iterations: u32,

    /// Maximum attempted moves per rollout
    #[arg(long, default_value_t = mcts_2048::mcts::DEFAULT_ROLLOUT_DEPTH)]
    rollout_depth: u32,

    /// Let selection explore illegal-move children like unvisited ones
    #[arg(long)]
    explore_dead_ends: bool,

    /// Board edge length
    #[arg(long, default_value_t = mcts_2048::engine::DEFAULT_SIZE)]
    size: usize,

    /// Game `i` is seeded with `seed + i`
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Per-game: stop after this many moves
    #[arg(long)]
    steps: Option<u64>,

    /// Worker threads (defaults to rayon's choice)
    #[arg(long)]
    threads: Option<usize>,

    /// Write summary and per-game records as JSON to this path
    #[arg(long)]
    out: Option<PathBuf>,

    /// Suppress the progress bar
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

    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()
            .context("failed to configure the rayon pool")?;
    }

    let policy = match args.policy {
        PolicyKind::Random => Policy::Random,
        PolicyKind::Mcts => {
            let cfg = MctsConfig {
                iterations: args.iterations,
                rollout_depth: args.rollout_depth,
                dead_end: if args.explore_dead_ends { DeadEndPolicy::Explore } else { DeadEndPolicy::Avoid },
                ..Default::default()
            };
            cfg.validate().context("invalid search configuration")?;
            Policy::Mcts(cfg)
        }
    };
    info!(games = args.games, policy = ?args.policy, "starting batch");

    let pb = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(args.games);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} games ({eta})")?
                .progress_chars("=>-"),
        );
        pb
    };

    let start = Instant::now();
    let records: Vec<GameRecord> = (0..args.games)
        .into_par_iter()
        .map(|i| {
            let rec = harness::play_game(&policy, args.size, args.seed.wrapping_add(i), args.steps);
            pb.inc(1);
            rec
        })
        .collect();
    pb.finish_and_clear();
    let elapsed = start.elapsed().as_secs_f64().max(1e-6);

    let summary = BatchSummary::from_records(&records);
    println!(
        "Games: {} | mean: {:.1} | median: {:.1} | min: {} | max: {} | games/sec: {:.2}",
        summary.games,
        summary.mean_score,
        summary.median_score,
        summary.min_score,
        summary.max_score,
        summary.games as f64 / elapsed
    );
    for (tile, count) in &summary.highest_tiles {
        println!("  highest tile {:>6}: {:>6} games", tile, count);
    }

    if let Some(path) = args.out {
        harness::write_results_json(&path, &policy, &summary, &records)
            .with_context(|| format!("failed to write results to {}", path.display()))?;
        info!(path = %path.display(), "results written");
    }
    Ok(())
}
