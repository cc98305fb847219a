use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use dots_and_boxes::ai::{Exploration, QLearningAgent};
use dots_and_boxes::checkpoint::CheckpointManager;
use dots_and_boxes::config::AppConfig;
use dots_and_boxes::error::CheckpointError;
use dots_and_boxes::game::Player;
use dots_and_boxes::training::{Trainer, TrainingProgress};

/// Train two Dots and Boxes Q-learning agents via self-play.
#[derive(Parser)]
#[command(name = "train", about = "Train two Dots and Boxes agents via self-play")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Resume training from the latest checkpoint
    #[arg(long)]
    resume: bool,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override initial exploration rate
    #[arg(long)]
    epsilon: Option<f64>,

    /// Override learning rate
    #[arg(long)]
    alpha: Option<f64>,

    /// Override discount factor
    #[arg(long)]
    gamma: Option<f64>,

    /// Override grid size (boxes per side)
    #[arg(long)]
    grid_size: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Sample against epsilon before falling back to greedy choice
    #[arg(long)]
    epsilon_greedy: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", AppConfig::default_toml()?);
        return Ok(());
    }

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    // Apply CLI overrides
    if let Some(episodes) = cli.episodes {
        config.training.num_episodes = episodes;
    }
    if let Some(epsilon) = cli.epsilon {
        config.agent.epsilon = epsilon;
    }
    if let Some(alpha) = cli.alpha {
        config.agent.alpha = alpha;
    }
    if let Some(gamma) = cli.gamma {
        config.agent.gamma = gamma;
    }
    if let Some(grid_size) = cli.grid_size {
        config.game.grid_size = grid_size;
    }
    if cli.seed.is_some() {
        config.training.seed = cli.seed;
    }
    if cli.epsilon_greedy {
        config.agent.exploration = Exploration::EpsilonGreedy;
    }
    config.validate().context("validating configuration")?;

    let mut agents = match config.training.seed {
        Some(seed) => Player::ALL.map(|p| {
            QLearningAgent::seeded(p, config.agent.clone(), seed.wrapping_add(p.index() as u64))
        }),
        None => Player::ALL.map(|p| QLearningAgent::new(p, config.agent.clone())),
    };

    let mut progress = TrainingProgress::new(config.agent.epsilon);
    if cli.resume {
        progress = resume(&config, &mut agents, progress)?;
    }

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        log::warn!("interrupt received, finishing current ply and saving models...");
        handler_stop.store(true, Ordering::Relaxed);
    })
    .context("installing Ctrl-C handler")?;

    let trainer = Trainer::new(
        config.game.grid_size,
        config.training.clone(),
        config.checkpoint.clone(),
    );
    let progress = trainer.train(&mut agents, progress, &stop)?;

    log::info!(
        "Totals after {} episodes | p0 wins: {} | p1 wins: {} | draws: {} | eps: {:.4}",
        progress.episodes_completed,
        progress.tally.wins(Player::Zero),
        progress.tally.wins(Player::One),
        progress.tally.draws,
        progress.epsilon,
    );
    for agent in agents.iter_mut() {
        let eval = trainer.evaluate(agent);
        log::info!(
            "Final eval {} vs Random: {:.1}% win, {:.1}% draw",
            agent.player(),
            eval.win_rate * 100.0,
            eval.draw_rate * 100.0
        );
    }
    Ok(())
}

/// Restore both tables, epsilon and the episode count from the latest
/// checkpoint. A missing checkpoint starts a fresh run; a broken one is an error.
fn resume(
    config: &AppConfig,
    agents: &mut [QLearningAgent; 2],
    fresh: TrainingProgress,
) -> Result<TrainingProgress> {
    let manager = CheckpointManager::new(config.checkpoint.clone());
    let data = match manager.load_latest() {
        Ok(data) => data,
        Err(CheckpointError::NoLatestSymlink(dir)) => {
            log::info!("No checkpoint found in {}, starting fresh", dir.display());
            return Ok(fresh);
        }
        Err(e) => return Err(e).context("loading latest checkpoint"),
    };
    if data.metadata.grid_size != config.game.grid_size {
        anyhow::bail!(
            "checkpoint {} was trained on a {}x{} grid, config asks for {}",
            data.path.display(),
            data.metadata.grid_size,
            data.metadata.grid_size,
            config.game.grid_size
        );
    }
    data.restore_agents(agents)
        .with_context(|| format!("restoring agents from {}", data.path.display()))?;
    log::info!("Resumed from episode {}", data.metadata.episode);
    Ok(data.metadata.progress)
}
