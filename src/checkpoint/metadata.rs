use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::ai::{AgentConfig, Learner};
use crate::training::TrainingProgress;

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub grid_size: usize,
    pub progress: TrainingProgress,
    pub hyperparameters: AgentConfig,
    pub table_sizes: [usize; 2],
}

impl CheckpointMetadata {
    /// Snapshot the run as it stands after `progress.episodes_completed` episodes.
    pub fn capture<L: Learner>(
        grid_size: usize,
        progress: &TrainingProgress,
        agents: &[L; 2],
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        CheckpointMetadata {
            episode: progress.episodes_completed,
            timestamp,
            grid_size,
            progress: *progress,
            hyperparameters: agents[0].config().clone(),
            table_sizes: [agents[0].table().len(), agents[1].table().len()],
        }
    }
}
