use crate::ai::{Learner, StateKey};
use crate::error::TrainingError;
use crate::game::{GameOutcome, GameState, Player};
use crate::training::metrics::EpisodeResult;

/// Lifecycle of one self-play game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodePhase {
    Idle,
    Running,
    Terminal,
}

/// Drives one episode between two learners sharing one environment, one
/// ply at a time, issuing the TD update for whoever moved.
pub struct SelfPlayEpisode {
    phase: EpisodePhase,
    starting_player: Player,
    plies: usize,
}

impl SelfPlayEpisode {
    pub fn new() -> Self {
        SelfPlayEpisode {
            phase: EpisodePhase::Idle,
            starting_player: Player::Zero,
            plies: 0,
        }
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    pub fn plies(&self) -> usize {
        self.plies
    }

    /// Reset the environment and hand the first move to `starting_player`.
    pub fn start(&mut self, env: &mut GameState, starting_player: Player) {
        env.reset();
        env.set_current_player(starting_player);
        self.starting_player = starting_player;
        self.plies = 0;
        self.phase = if env.is_game_over() {
            EpisodePhase::Terminal
        } else {
            EpisodePhase::Running
        };
    }

    /// Play a single ply for the agent whose turn it is.
    ///
    /// The mover's value for `(s, a)` is updated with the boxes it closed as
    /// reward, `s` and `s'` both keyed from the mover's perspective. When the
    /// move ends the game with the mover ahead, the other agent also gets
    /// one update penalising that final move under its own view of `s`.
    pub fn step<L: Learner>(
        &mut self,
        env: &mut GameState,
        agents: &mut [L; 2],
    ) -> Result<EpisodePhase, TrainingError> {
        if self.phase != EpisodePhase::Running {
            return Ok(self.phase);
        }

        let player = env.current_player();
        let opponent = player.other();
        let actions = env.available_actions();

        let agent = &mut agents[player.index()];
        let state_key = StateKey::encode(env, player);
        let opponent_key = StateKey::encode(env, opponent);
        let action = agent
            .select_action(env, &actions)
            .ok_or(TrainingError::NoAction { player })?;
        if !actions.contains(&action) {
            return Err(TrainingError::IllegalAction { player, action });
        }

        let reward = env.apply_action(action) as f64;
        let next_key = StateKey::encode(env, player);
        let next_actions = env.available_actions();
        agent.update_value(&state_key, action, reward, &next_key, &next_actions);
        self.plies += 1;

        if env.is_game_over() {
            if env.score(player) > env.score(opponent) {
                agents[opponent.index()].update_value(
                    &opponent_key,
                    action,
                    -reward,
                    &next_key,
                    &next_actions,
                );
            }
            self.phase = EpisodePhase::Terminal;
        }
        Ok(self.phase)
    }

    /// Outcome once the episode is terminal.
    pub fn result(&self, env: &GameState) -> Option<EpisodeResult> {
        if self.phase != EpisodePhase::Terminal {
            return None;
        }
        let winner = match env.outcome()? {
            GameOutcome::Winner(p) => Some(p),
            GameOutcome::Draw => None,
        };
        Some(EpisodeResult {
            winner,
            scores: env.scores(),
            starting_player: self.starting_player,
            plies: self.plies,
        })
    }
}

impl Default for SelfPlayEpisode {
    fn default() -> Self {
        Self::new()
    }
}
