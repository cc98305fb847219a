use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::ai::{Agent, Learner, RandomAgent};
use crate::checkpoint::{
    model_file_name, CheckpointManager, CheckpointManagerConfig, CheckpointMetadata,
};
use crate::error::TrainingError;
use crate::game::{GameOutcome, GameState, Player};
use crate::training::episode::{EpisodePhase, SelfPlayEpisode};
use crate::training::metrics::{EpisodeResult, OutcomeTally, TrainingMetrics};

/// Trainer configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub epsilon_decay: f64,
    pub min_epsilon: f64,
    pub log_interval: usize,
    /// Episodes between greedy evaluations against a random player; 0 disables.
    pub eval_interval: usize,
    pub eval_games: usize,
    /// Episodes between checkpoints; 0 disables.
    pub checkpoint_interval: usize,
    pub model_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 20_000,
            epsilon_decay: 0.9995,
            min_epsilon: 0.01,
            log_interval: 1000,
            eval_interval: 5000,
            eval_games: 200,
            checkpoint_interval: 5000,
            model_dir: PathBuf::from("agents"),
            seed: None,
        }
    }
}

/// Where a run stands; carried across resumes through checkpoint metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingProgress {
    pub episodes_completed: usize,
    pub epsilon: f64,
    pub tally: OutcomeTally,
}

impl TrainingProgress {
    pub fn new(epsilon: f64) -> Self {
        TrainingProgress {
            episodes_completed: 0,
            epsilon,
            tally: OutcomeTally::default(),
        }
    }
}

/// Win and draw rates of one agent over an evaluation match.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult {
    pub win_rate: f32,
    pub draw_rate: f32,
}

/// Self-play trainer for a pair of Q-learning agents.
pub struct Trainer {
    grid_size: usize,
    config: TrainerConfig,
    checkpoint_manager: CheckpointManager,
}

impl Trainer {
    pub fn new(
        grid_size: usize,
        config: TrainerConfig,
        checkpoint_config: CheckpointManagerConfig,
    ) -> Self {
        Trainer {
            grid_size,
            config,
            checkpoint_manager: CheckpointManager::new(checkpoint_config),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Path of the final value table for `player`.
    pub fn model_path(&self, player: Player) -> PathBuf {
        self.config.model_dir.join(model_file_name(player))
    }

    /// Run `num_episodes` more episodes starting from `progress`.
    ///
    /// Whatever happens inside the loop (normal completion, `stop` being
    /// raised, an error or a panic) the environment is reset and both value
    /// tables are written to `model_dir` before this returns or unwinds.
    pub fn train<L: Learner>(
        &self,
        agents: &mut [L; 2],
        progress: TrainingProgress,
        stop: &AtomicBool,
    ) -> Result<TrainingProgress, TrainingError> {
        let mut env = GameState::new(self.grid_size);
        let mut progress = progress;

        log::info!(
            "starting self-play on a {n}x{n} grid for {} episodes (episodes {}..{})",
            self.config.num_episodes,
            progress.episodes_completed + 1,
            progress.episodes_completed + self.config.num_episodes,
            n = self.grid_size,
        );

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.run_episodes(&mut env, &mut *agents, &mut progress, stop)
        }));

        env.reset();
        let saved = self.save_models(agents);
        log::info!(
            "training finished after {} episodes",
            progress.episodes_completed
        );

        match outcome {
            Ok(result) => {
                result?;
                saved?;
                Ok(progress)
            }
            Err(payload) => {
                if let Err(e) = saved {
                    log::error!("failed to save models while unwinding: {e}");
                }
                panic::resume_unwind(payload)
            }
        }
    }

    fn run_episodes<L: Learner>(
        &self,
        env: &mut GameState,
        agents: &mut [L; 2],
        progress: &mut TrainingProgress,
        stop: &AtomicBool,
    ) -> Result<(), TrainingError> {
        let mut metrics = TrainingMetrics::with_capacity(self.config.log_interval.max(1));
        let first = progress.episodes_completed;
        let end = first + self.config.num_episodes;

        for episode in first..end {
            if stop.load(Ordering::Relaxed) {
                log::warn!("interrupted after {} episodes", episode);
                break;
            }

            // even episodes open with player 0
            let starting_player = if episode % 2 == 0 {
                Player::Zero
            } else {
                Player::One
            };
            for agent in agents.iter_mut() {
                agent.set_epsilon(progress.epsilon);
            }

            let Some(result) = self.play_episode(env, agents, starting_player, stop)? else {
                log::warn!("interrupted during episode {}", episode + 1);
                break;
            };
            log::debug!(
                "episode {} | start: {} | score {}-{} | {} plies",
                episode + 1,
                result.starting_player,
                result.scores[0],
                result.scores[1],
                result.plies
            );

            progress.tally.record(&result);
            metrics.record_episode(result);
            progress.episodes_completed = episode + 1;
            progress.epsilon =
                (progress.epsilon * self.config.epsilon_decay).max(self.config.min_epsilon);

            let done = progress.episodes_completed;
            if self.config.log_interval > 0 && done % self.config.log_interval == 0 {
                let window = self.config.log_interval;
                log::info!(
                    "Episode {}/{} | p0 wins: {} | p1 wins: {} | draws: {} | eps: {:.4} | last {}: p0 win {:.1}%, draw {:.1}%, p0 margin {:+.2}, first-mover win {:.1}%",
                    done,
                    end,
                    progress.tally.wins(Player::Zero),
                    progress.tally.wins(Player::One),
                    progress.tally.draws,
                    progress.epsilon,
                    window,
                    metrics.win_rate(Player::Zero, window) * 100.0,
                    metrics.draw_rate(window) * 100.0,
                    metrics.average_margin(Player::Zero, window),
                    metrics.first_mover_win_rate(window) * 100.0,
                );
            }

            if self.config.eval_interval > 0 && done % self.config.eval_interval == 0 {
                for agent in agents.iter_mut() {
                    let eval = self.evaluate(agent);
                    log::info!(
                        "  >> Eval {} vs Random ({} games): {:.1}% win, {:.1}% draw",
                        agent.player(),
                        self.config.eval_games,
                        eval.win_rate * 100.0,
                        eval.draw_rate * 100.0
                    );
                }
            }

            if self.config.checkpoint_interval > 0 && done % self.config.checkpoint_interval == 0 {
                let metadata = CheckpointMetadata::capture(self.grid_size, progress, agents);
                match self.checkpoint_manager.save_checkpoint(agents, &metadata) {
                    Ok(path) => log::info!("  >> Checkpoint saved: {}", path.display()),
                    Err(e) => log::warn!("  >> Checkpoint failed: {}", e),
                }
            }
        }
        Ok(())
    }

    /// Play one full episode. Returns `None` if `stop` was raised mid-game.
    fn play_episode<L: Learner>(
        &self,
        env: &mut GameState,
        agents: &mut [L; 2],
        starting_player: Player,
        stop: &AtomicBool,
    ) -> Result<Option<EpisodeResult>, TrainingError> {
        let mut episode = SelfPlayEpisode::new();
        episode.start(env, starting_player);
        while episode.step(env, agents)? == EpisodePhase::Running {
            if stop.load(Ordering::Relaxed) {
                return Ok(None);
            }
        }
        Ok(episode.result(env))
    }

    /// Play `eval_games` against a random opponent without learning,
    /// alternating who opens. The agent keeps its own seat.
    pub fn evaluate<L: Learner>(&self, agent: &mut L) -> EvalResult {
        let mut random = match self.config.seed {
            Some(seed) => RandomAgent::seeded(seed ^ 0x5eed),
            None => RandomAgent::new(),
        };
        let seat = agent.player();
        let saved_epsilon = agent.epsilon();
        agent.set_epsilon(0.0); // greedy for evaluation

        let mut env = GameState::new(self.grid_size);
        let mut wins = 0;
        let mut draws = 0;
        for game_idx in 0..self.config.eval_games {
            env.reset();
            env.set_current_player(if game_idx % 2 == 0 { seat } else { seat.other() });

            while !env.is_game_over() {
                let actions = env.available_actions();
                let action = if env.current_player() == seat {
                    agent.select_action(&env, &actions)
                } else {
                    random.select_action(&env, &actions)
                };
                let Some(action) = action else { break };
                env.apply_action(action);
            }

            match env.outcome() {
                Some(GameOutcome::Winner(winner)) if winner == seat => wins += 1,
                Some(GameOutcome::Draw) => draws += 1,
                _ => {}
            }
        }

        agent.set_epsilon(saved_epsilon); // restore
        let total = self.config.eval_games.max(1) as f32;
        EvalResult {
            win_rate: wins as f32 / total,
            draw_rate: draws as f32 / total,
        }
    }

    /// Write both value tables to `model_dir`.
    pub fn save_models<L: Learner>(&self, agents: &[L; 2]) -> Result<(), TrainingError> {
        for agent in agents {
            let path = self.model_path(agent.player());
            agent.save(&path)?;
            log::info!(
                "saved {} entries for {} to {}",
                agent.table().len(),
                agent.player(),
                path.display()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::ai::{AgentConfig, QLearningAgent, QTable, StateKey};
    use crate::checkpoint::CheckpointManager;
    use crate::game::Action;

    struct Fixture {
        _dir: tempfile::TempDir,
        trainer: Trainer,
        checkpoint_config: CheckpointManagerConfig,
    }

    fn fixture(grid_size: usize, config: TrainerConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainerConfig {
            model_dir: dir.path().join("agents"),
            ..config
        };
        let checkpoint_config = CheckpointManagerConfig {
            checkpoint_dir: dir.path().join("checkpoints"),
            keep_last_n: 2,
        };
        Fixture {
            trainer: Trainer::new(grid_size, config, checkpoint_config.clone()),
            checkpoint_config,
            _dir: dir,
        }
    }

    fn small_config(num_episodes: usize) -> TrainerConfig {
        TrainerConfig {
            num_episodes,
            log_interval: 50,
            eval_interval: 0,
            eval_games: 20,
            checkpoint_interval: 0,
            seed: Some(7),
            ..Default::default()
        }
    }

    /// What a [`FaultyAgent`] does on its second opening move.
    enum Fault {
        Healthy,
        RaiseStop(Arc<AtomicBool>),
        NoMove,
        Panic,
    }

    /// Q-learner that misbehaves the second time it moves on an empty board.
    /// Player 0 opens even episodes, so that is the first ply of episode 2.
    struct FaultyAgent {
        inner: QLearningAgent,
        fault: Fault,
        openings: usize,
    }

    impl Agent for FaultyAgent {
        fn select_action(&mut self, state: &GameState, actions: &[Action]) -> Option<Action> {
            if actions.len() == state.board().edge_count() {
                self.openings += 1;
                if self.openings == 2 {
                    match &self.fault {
                        Fault::Healthy => {}
                        Fault::RaiseStop(stop) => stop.store(true, Ordering::Relaxed),
                        Fault::NoMove => return None,
                        Fault::Panic => panic!("agent failed mid-episode"),
                    }
                }
            }
            self.inner.select_action(state, actions)
        }

        fn name(&self) -> &str {
            self.inner.name()
        }
    }

    impl Learner for FaultyAgent {
        fn player(&self) -> Player {
            self.inner.player()
        }

        fn config(&self) -> &AgentConfig {
            self.inner.config()
        }

        fn epsilon(&self) -> f64 {
            self.inner.epsilon()
        }

        fn set_epsilon(&mut self, eps: f64) {
            self.inner.set_epsilon(eps);
        }

        fn table(&self) -> &QTable {
            self.inner.table()
        }

        fn update_value(
            &mut self,
            state: &StateKey,
            action: Action,
            reward: f64,
            next_state: &StateKey,
            next_actions: &[Action],
        ) -> f64 {
            self.inner
                .update_value(state, action, reward, next_state, next_actions)
        }
    }

    fn faulty_agents(fault: Fault) -> [FaultyAgent; 2] {
        let [a, b] = seeded_agents(9);
        [
            FaultyAgent {
                inner: a,
                fault,
                openings: 0,
            },
            FaultyAgent {
                inner: b,
                fault: Fault::Healthy,
                openings: 0,
            },
        ]
    }

    fn assert_models_match<L: Learner>(trainer: &Trainer, agents: &[L; 2]) {
        for agent in agents {
            let loaded = QTable::load(&trainer.model_path(agent.player())).unwrap();
            assert_eq!(&loaded, agent.table());
        }
    }

    fn seeded_agents(seed: u64) -> [QLearningAgent; 2] {
        [
            QLearningAgent::seeded(Player::Zero, AgentConfig::default(), seed),
            QLearningAgent::seeded(Player::One, AgentConfig::default(), seed + 1),
        ]
    }

    #[test]
    fn test_train_runs_all_episodes() {
        let f = fixture(2, small_config(100));
        let mut agents = seeded_agents(1);
        let stop = AtomicBool::new(false);

        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();
        assert_eq!(progress.episodes_completed, 100);
        assert_eq!(progress.tally.total(), 100);
        assert!(agents[0].table().len() > 0);
        assert!(agents[1].table().len() > 0);
    }

    #[test]
    fn test_epsilon_decays_to_floor() {
        let config = TrainerConfig {
            epsilon_decay: 0.5,
            min_epsilon: 0.1,
            ..small_config(3)
        };
        let f = fixture(1, config);
        let mut agents = seeded_agents(1);
        let stop = AtomicBool::new(false);

        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.8), &stop)
            .unwrap();
        // 0.8 -> 0.4 -> 0.2 -> 0.1
        assert!((progress.epsilon - 0.1).abs() < 1e-12);
        // agents carry the value of the last episode played
        assert!((agents[0].epsilon() - 0.2).abs() < 1e-12);

        let config = TrainerConfig {
            epsilon_decay: 0.5,
            min_epsilon: 0.3,
            ..small_config(5)
        };
        let f = fixture(1, config);
        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.8), &stop)
            .unwrap();
        assert!((progress.epsilon - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_starting_player_alternates() {
        // On 1x1 the second mover always closes the box.
        let f = fixture(1, small_config(10));
        let mut agents = seeded_agents(1);
        let stop = AtomicBool::new(false);
        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();
        assert_eq!(progress.tally.wins, [5, 5]);
        assert_eq!(progress.tally.draws, 0);
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let stop = AtomicBool::new(false);
        let run = |seed| {
            let f = fixture(2, small_config(300));
            let mut agents = seeded_agents(seed);
            let progress = f
                .trainer
                .train(&mut agents, TrainingProgress::new(0.25), &stop)
                .unwrap();
            let [a, b] = agents;
            (progress.tally, a.table().clone(), b.table().clone())
        };

        let first = run(99);
        let second = run(99);
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
        assert_eq!(first.2, second.2);
    }

    #[test]
    fn test_models_persisted_on_completion() {
        let f = fixture(2, small_config(20));
        let mut agents = seeded_agents(3);
        let stop = AtomicBool::new(false);
        f.trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();

        for agent in &agents {
            let loaded = QTable::load(&f.trainer.model_path(agent.player())).unwrap();
            assert_eq!(&loaded, agent.table());
        }
    }

    #[test]
    fn test_stop_flag_still_persists() {
        let f = fixture(2, small_config(1000));
        let mut agents = seeded_agents(3);
        let stop = AtomicBool::new(true);
        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();

        assert_eq!(progress.episodes_completed, 0);
        assert!(f.trainer.model_path(Player::Zero).exists());
        assert!(f.trainer.model_path(Player::One).exists());
    }

    #[test]
    fn test_stop_mid_episode_discards_partial_game() {
        let f = fixture(2, small_config(50));
        let stop = Arc::new(AtomicBool::new(false));
        let mut agents = faulty_agents(Fault::RaiseStop(stop.clone()));

        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();

        assert_eq!(progress.episodes_completed, 2);
        assert_eq!(progress.tally.total(), 2);
        assert_models_match(&f.trainer, &agents);
    }

    #[test]
    fn test_agent_error_still_persists() {
        let f = fixture(2, small_config(50));
        let mut agents = faulty_agents(Fault::NoMove);
        let stop = AtomicBool::new(false);

        let err = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap_err();

        assert!(matches!(
            err,
            TrainingError::NoAction {
                player: Player::Zero
            }
        ));
        assert!(agents[0].table().len() > 0);
        assert_models_match(&f.trainer, &agents);
    }

    #[test]
    fn test_agent_panic_still_persists() {
        let f = fixture(2, small_config(50));
        let mut agents = faulty_agents(Fault::Panic);
        let stop = AtomicBool::new(false);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            f.trainer
                .train(&mut agents, TrainingProgress::new(0.25), &stop)
        }));

        assert!(outcome.is_err());
        assert!(agents[0].table().len() > 0);
        assert_models_match(&f.trainer, &agents);
    }

    #[test]
    fn test_resume_continues_episode_count() {
        let f = fixture(2, small_config(10));
        let mut agents = seeded_agents(5);
        let stop = AtomicBool::new(false);
        let progress = f
            .trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();
        let progress = f.trainer.train(&mut agents, progress, &stop).unwrap();
        assert_eq!(progress.episodes_completed, 20);
        assert_eq!(progress.tally.total(), 20);
    }

    #[test]
    fn test_checkpoints_written_and_pruned() {
        let config = TrainerConfig {
            checkpoint_interval: 5,
            ..small_config(20)
        };
        let f = fixture(2, config);
        let mut agents = seeded_agents(5);
        let stop = AtomicBool::new(false);
        f.trainer
            .train(&mut agents, TrainingProgress::new(0.25), &stop)
            .unwrap();

        let manager = CheckpointManager::new(f.checkpoint_config.clone());
        let checkpoints = manager.list_checkpoints().unwrap();
        let episodes: Vec<usize> = checkpoints.iter().map(|(_, m)| m.episode).collect();
        assert_eq!(episodes, vec![15, 20]);

        let latest = manager.load_latest().unwrap();
        assert_eq!(latest.metadata.progress.episodes_completed, 20);
        assert_eq!(latest.metadata.grid_size, 2);
    }

    #[test]
    fn test_evaluate_restores_epsilon() {
        let f = fixture(2, small_config(0));
        let mut agent = QLearningAgent::seeded(Player::One, AgentConfig::default(), 1);
        agent.set_epsilon(0.42);
        let eval = f.trainer.evaluate(&mut agent);
        assert!((agent.epsilon() - 0.42).abs() < 1e-12);
        assert!(eval.win_rate + eval.draw_rate <= 1.0);
        assert!(agent.table().is_empty());
    }
}
