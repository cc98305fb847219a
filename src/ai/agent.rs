use std::path::Path;

use super::{AgentConfig, QTable, StateKey};
use crate::error::CheckpointError;
use crate::game::{Action, GameState, Player};

/// Anything that can pick a move for the side it plays.
pub trait Agent {
    /// Choose one of `actions` (the undrawn edges of `state`).
    /// Returns `None` only when `actions` is empty.
    fn select_action(&mut self, state: &GameState, actions: &[Action]) -> Option<Action>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

/// An agent that owns a seat and learns a tabular value function from its
/// own moves. Self-play, evaluation and checkpointing work through this.
pub trait Learner: Agent {
    fn player(&self) -> Player;

    fn config(&self) -> &AgentConfig;

    fn epsilon(&self) -> f64;

    fn set_epsilon(&mut self, eps: f64);

    fn table(&self) -> &QTable;

    /// Apply one TD update for `(state, action)` and return the TD error.
    fn update_value(
        &mut self,
        state: &StateKey,
        action: Action,
        reward: f64,
        next_state: &StateKey,
        next_actions: &[Action],
    ) -> f64;

    /// Persist the value table to `path`.
    fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        self.table().save(path)
    }
}
