//! `trajopt`: optimize trajectories with MPPI and render stored results.
//!
//! - `optimize`  -- Run a job from a JSON config and store its records
//! - `visualize` -- Replay stored records into Y4M videos

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trajopt::config::JobConfig;
use trajopt::train::{render_store, run_job};

#[derive(Parser)]
#[command(name = "trajopt", version, about)]
struct Cli {
    /// Path to a JSON job configuration (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Optimize `num_traj` trajectories and store them.
    Optimize {
        /// Overrides the config's output file.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Render each trajectory once it is finished.
        #[arg(long)]
        visualize: bool,
    },

    /// Render every trajectory in one or more record files.
    Visualize {
        /// Record files written by `optimize` (shell globs expand here).
        #[arg(long, num_args = 1.., required = true)]
        file: Vec<PathBuf>,

        /// How many times to render each trajectory.
        #[arg(long, default_value_t = 1)]
        repeat: usize,

        /// Directory for the videos (defaults to the config's `video_dir`).
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => JobConfig::load(path).with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => JobConfig::default(),
    };

    match cli.command {
        Commands::Optimize { output, visualize } => {
            if let Some(output) = output {
                config.output = output;
            }
            config.visualize |= visualize;
            cmd_optimize(&config).await
        }
        Commands::Visualize { file, repeat, out } => cmd_visualize(&config, &file, repeat, out),
    }
}

async fn cmd_optimize(config: &JobConfig) -> Result<()> {
    tracing::info!(env = %config.env_name, trajectories = config.num_traj, "Starting optimization job");
    let stats = run_job(config).await.context("Optimization job failed")?;
    for (i, t) in stats.trajectories.iter().enumerate() {
        println!(
            "traj {i}: seed {} steps {} reward {:.3} solved {}",
            t.seed, t.steps, t.total_reward, t.solved
        );
    }
    tracing::info!(
        path = %config.output.display(),
        solved = stats.solved(),
        total_steps = stats.total_steps,
        "Saved trajectories"
    );
    Ok(())
}

fn cmd_visualize(config: &JobConfig, files: &[PathBuf], repeat: usize, out: Option<PathBuf>) -> Result<()> {
    let out_dir = out.unwrap_or_else(|| config.video_dir.clone());
    let written = render_store(files, repeat, &out_dir, &config.env_name, config.env_max_steps, config.fps)
        .with_context(|| format!("Failed to render {} record file(s)", files.len()))?;
    tracing::info!(videos = written.len(), dir = %out_dir.display(), "Rendering finished");
    Ok(())
}
