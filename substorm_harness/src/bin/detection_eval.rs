//! Detection performance evaluation over synthetic scenes.
//!
//! Trains and scores the substorm detector across repeated randomized
//! trials and prints aggregate precision/recall/F1. Optionally saves the
//! model from the first trial for use with the flight binary.
//!
//! Usage:
//! ```
//! cargo run --release --bin detection_eval -- [OPTIONS]
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use substorm_harness::{run_evaluation, EvalConfig};

#[derive(Parser, Debug)]
#[command(about = "Evaluate the substorm detector on synthetic scenes")]
struct Args {
    /// Number of independent trials
    #[arg(short, long, default_value_t = 10)]
    trials: usize,

    /// Training scenes per class per trial
    #[arg(long, default_value_t = 25)]
    train_scenes: usize,

    /// Held-out test scenes per class per trial
    #[arg(long, default_value_t = 25)]
    test_scenes: usize,

    /// Base RNG seed
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Save the first trial's model to this JSON file
    #[arg(long)]
    save_model: Option<PathBuf>,

    /// Number of threads for parallel execution (0 = use all available)
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .build_global()
            .context("configuring thread pool")?;
    }

    let config = EvalConfig {
        trials: args.trials,
        train_scenes: args.train_scenes,
        test_scenes: args.test_scenes,
        seed: args.seed,
        ..EvalConfig::default()
    };

    println!(
        "Running {} trials ({} train + {} test scenes per class each)",
        config.trials, config.train_scenes, config.test_scenes
    );
    let (results, summary) = run_evaluation(&config);

    println!("precision: {:.3} +/- {:.3}", summary.precision.mean, summary.precision.std_dev);
    println!("recall:    {:.3} +/- {:.3}", summary.recall.mean, summary.recall.std_dev);
    println!("f1:        {:.3} +/- {:.3}", summary.f1.mean, summary.f1.std_dev);

    if let Some(path) = &args.save_model {
        let first = results.first().context("no trials were run")?;
        first
            .model
            .save(path)
            .with_context(|| format!("saving model {}", path.display()))?;
        println!("Saved model to {}", path.display());
    }

    Ok(())
}
