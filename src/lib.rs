//! # Dots and Boxes
//!
//! Dots and Boxes on an N×N grid with two independent tabular Q-learning
//! agents trained against each other through self-play.
//!
//! ## Modules
//!
//! - [`game`] — Core game logic: edges, box ownership, scoring, turn keeping
//! - [`ai`] — Agent trait, state keys, Q table, Q-learning and random agents
//! - [`training`] — Episode state machine, self-play trainer, outcome statistics
//! - [`checkpoint`] — Value table persistence and checkpoint directories
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
