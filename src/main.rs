use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use timetable_solver::{solve, PenaltyWeights, SolveResult, SolverInput, SolverSettings};

#[derive(Debug, clap::Parser)]
struct Args {
    /// Path to the solver input JSON (lessons, classes, config).
    input: PathBuf,
    /// Optional TOML file overriding individual penalty weights.
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Base PRNG seed; additional runs use consecutive seeds.
    #[arg(long, default_value_t = 4)]
    seed: u64,
    #[arg(long)]
    max_iterations: Option<u64>,
    /// How many seeds to race; the result with fewest conflicts wins.
    #[arg(long, default_value_t = 1)]
    runs: u64,
    /// Worker threads for multi-seed runs.
    #[arg(long, default_value_t = 4)]
    threads: u32,
    /// Where to write the winning result JSON; stdout if omitted.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn read_input(path: &PathBuf) -> Result<SolverInput> {
    let contents = fs::read_to_string(path)
        .with_context(|| anyhow!("failed to read input at {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| anyhow!("could not parse {} as solver input", path.display()))
}

fn main_impl() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let input = read_input(&args.input)?;
    info!(
        lessons = input.lessons.len(),
        classes = input.classes.len(),
        "loaded solver input"
    );

    let mut base_settings = SolverSettings::default();
    if let Some(weights_path) = &args.weights {
        base_settings.weights = PenaltyWeights::read_from_toml(weights_path)?;
    }
    if let Some(max_iterations) = args.max_iterations {
        base_settings.max_iterations = max_iterations;
    }

    let mut settings = base_settings.clone();
    settings.seed = args.seed;
    let mut best = solve(&input, &settings)?;
    let mut best_seed = args.seed;

    let runs = args.runs.max(1);
    if runs > 1 {
        let results: Mutex<Vec<(u64, SolveResult)>> = Mutex::new(Vec::new());
        let mut pool = scoped_threadpool::Pool::new(args.threads.max(1));
        pool.scoped(|scope| {
            for run in 1..runs {
                let seed = args.seed + run;
                let input = &input;
                let results = &results;
                let mut settings = base_settings.clone();
                settings.seed = seed;
                scope.execute(move || {
                    // The input already validated on the first run.
                    if let Ok(result) = solve(input, &settings) {
                        results.lock().unwrap().push((seed, result));
                    }
                });
            }
        });

        let mut results = results.into_inner().unwrap();
        // Seed order keeps the winner deterministic across thread schedules.
        results.sort_by_key(|(seed, _)| *seed);
        for (seed, result) in results {
            if result.better_than(&best) {
                best = result;
                best_seed = seed;
            } else {
                info!(
                    seed,
                    conflicts_remaining = result.stats.conflicts_remaining,
                    "seed did not improve on the current best"
                );
            }
        }
    }
    info!(
        seed = best_seed,
        success = best.success,
        conflicts_remaining = best.stats.conflicts_remaining,
        "selected best result"
    );

    let rendered = serde_json::to_string_pretty(&best)?;
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| anyhow!("failed to write result to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    Ok(())
}

fn main() {
    match main_impl() {
        Ok(_) => {}
        Err(err) => {
            eprintln!("\nError: {:?}", err);
            std::process::exit(1);
        }
    }
}
