use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use dots_and_boxes::ai::{Agent, QLearningAgent};
use dots_and_boxes::checkpoint::model_file_name;
use dots_and_boxes::config::AppConfig;
use dots_and_boxes::error::CheckpointError;
use dots_and_boxes::game::{Action, GameOutcome, GameState, Player};

/// Play Dots and Boxes in the terminal against a trained agent.
#[derive(Parser)]
#[command(name = "dots_and_boxes", about = "Play Dots and Boxes against a trained agent")]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Seat the agent plays (0 or 1); the human takes the other
    #[arg(long, default_value_t = 1)]
    agent_player: usize,

    /// Value table to load (defaults to <model_dir>/agent<seat>_q_table.json)
    #[arg(long)]
    model: Option<PathBuf>,

    /// Let the agent make the first move
    #[arg(long)]
    agent_first: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;

    let Some(agent_player) = Player::from_index(cli.agent_player) else {
        bail!("agent player must be 0 or 1, got {}", cli.agent_player);
    };
    let human = agent_player.other();

    let model = cli
        .model
        .unwrap_or_else(|| config.training.model_dir.join(model_file_name(agent_player)));
    let mut agent = QLearningAgent::new(agent_player, config.agent.clone());
    match agent.load_for_grid(&model, config.game.grid_size) {
        Ok(()) => log::info!("loaded {} entries from {}", agent.table().len(), model.display()),
        Err(e @ CheckpointError::ModelNotFound(_)) => {
            bail!("{e}; run `train` first or pass --model")
        }
        Err(e) => return Err(e).context("loading agent model"),
    }

    let mut env = GameState::new(config.game.grid_size);
    env.set_current_player(if cli.agent_first { agent_player } else { human });

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    println!("You are {human}. Enter moves as '<h|v> <row> <col>', 'q' to quit.");

    while !env.is_game_over() {
        println!("\n{env}");
        let actions = env.available_actions();

        if env.current_player() == agent_player {
            let Some(action) = agent.select_action(&env, &actions) else {
                bail!("agent found no move in a non-terminal position");
            };
            let boxes = env.apply_action(action);
            println!("Agent plays {action} ({boxes} box(es))");
            continue;
        }

        print!("{human}> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            return Ok(());
        };
        let line = line?;
        let line = line.trim();
        if line.eq_ignore_ascii_case("q") {
            return Ok(());
        }
        match line.parse::<Action>() {
            Ok(action) if actions.contains(&action) => {
                env.apply_action(action);
            }
            Ok(action) => println!("{action} is not available"),
            Err(e) => println!("{e}"),
        }
    }

    println!("\n{env}");
    match env.outcome() {
        Some(GameOutcome::Winner(p)) if p == human => println!("You win!"),
        Some(GameOutcome::Winner(_)) => println!("Agent wins!"),
        _ => println!("Draw!"),
    }
    Ok(())
}
