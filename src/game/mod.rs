//! Core Dots and Boxes game logic: edge lattices, box ownership, scoring and
//! the turn-keeping state machine.

mod action;
mod board;
mod player;
mod state;

pub use action::{Action, Orientation, ParseActionError};
pub use board::{Board, DEFAULT_GRID_SIZE};
pub use player::Player;
pub use state::{GameOutcome, GameState};
