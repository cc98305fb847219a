//! Training infrastructure: the per-episode state machine, the self-play
//! trainer and outcome statistics.

pub mod episode;
pub mod metrics;
pub mod trainer;

pub use episode::{EpisodePhase, SelfPlayEpisode};
pub use metrics::{EpisodeResult, OutcomeTally, TrainingMetrics};
pub use trainer::{EvalResult, Trainer, TrainerConfig, TrainingProgress};
