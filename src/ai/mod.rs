//! Agents and their value storage: perspective-aware state keys, the tabular
//! Q store, the Q-learning agent and a random baseline.

mod agent;
mod q_learning;
mod q_table;
mod random;
mod state_key;

pub use agent::{Agent, Learner};
pub use q_learning::{box_closing_action, AgentConfig, Exploration, QLearningAgent};
pub use q_table::QTable;
pub use random::RandomAgent;
pub use state_key::StateKey;
