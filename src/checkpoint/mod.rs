//! Persistence of training runs: periodic checkpoint directories holding both
//! agents' value tables plus JSON metadata, a `latest` symlink and pruning.

mod manager;
mod metadata;

pub use manager::{model_file_name, CheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::CheckpointMetadata;
