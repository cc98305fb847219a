use std::path::PathBuf;

use crate::game::{Action, Player};

/// Errors that can occur while persisting or restoring value tables and
/// checkpoints.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("untrained model: no value table at {0}")]
    ModelNotFound(PathBuf),

    #[error("failed to read model from {path}: {source}")]
    ModelRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse model from {path}: {source}")]
    ModelParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("value table at {path} was trained on a {found}x{found} grid, expected {expected}x{expected}")]
    GridMismatch {
        path: PathBuf,
        expected: usize,
        found: usize,
    },

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("{player} had no action to play in a non-terminal position")]
    NoAction { player: Player },

    #[error("{player} selected illegal action {action}")]
    IllegalAction { player: Player, action: Action },

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
