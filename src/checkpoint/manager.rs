use std::fs;
use std::path::{Path, PathBuf};

use crate::ai::{Learner, QLearningAgent, QTable};
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::error::CheckpointError;
use crate::game::Player;

/// File name of a persisted value table for `player`.
pub fn model_file_name(player: Player) -> String {
    format!("agent{}_q_table.json", player.index())
}

/// Configuration for the checkpoint manager.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CheckpointManagerConfig {
    pub checkpoint_dir: PathBuf,
    pub keep_last_n: usize,
}

impl Default for CheckpointManagerConfig {
    fn default() -> Self {
        CheckpointManagerConfig {
            checkpoint_dir: PathBuf::from("checkpoints"),
            keep_last_n: 5,
        }
    }
}

/// A checkpoint directory and its parsed metadata.
#[derive(Debug)]
pub struct CheckpointData {
    pub path: PathBuf,
    pub metadata: CheckpointMetadata,
}

impl CheckpointData {
    /// Load both value tables of this checkpoint into `agents`.
    pub fn restore_agents(&self, agents: &mut [QLearningAgent; 2]) -> Result<(), CheckpointError> {
        // read both before touching either agent
        let tables = [
            QTable::load(&self.path.join(model_file_name(agents[0].player())))?,
            QTable::load(&self.path.join(model_file_name(agents[1].player())))?,
        ];
        for (agent, table) in agents.iter_mut().zip(tables) {
            agent.set_table(table);
            agent.set_epsilon(self.metadata.progress.epsilon);
        }
        Ok(())
    }
}

/// Manages saving, loading, listing, and pruning checkpoints.
pub struct CheckpointManager {
    config: CheckpointManagerConfig,
}

impl CheckpointManager {
    pub fn new(config: CheckpointManagerConfig) -> Self {
        CheckpointManager { config }
    }

    /// Save both agents' tables and `metadata` as `checkpoint_<episode>`.
    ///
    /// Everything is written into a `.tmp` sibling first and renamed into
    /// place, then `latest` is repointed and old checkpoints are pruned.
    pub fn save_checkpoint<L: Learner>(
        &self,
        agents: &[L; 2],
        metadata: &CheckpointMetadata,
    ) -> Result<PathBuf, CheckpointError> {
        let dir_name = format!("checkpoint_{:07}", metadata.episode);
        let tmp_dir = self.config.checkpoint_dir.join(format!("{}.tmp", dir_name));
        let final_dir = self.config.checkpoint_dir.join(&dir_name);

        fs::create_dir_all(&tmp_dir)?;

        for agent in agents {
            agent.save(&tmp_dir.join(model_file_name(agent.player())))?;
        }

        let meta_json = serde_json::to_string_pretty(metadata)?;
        fs::write(tmp_dir.join("metadata.json"), meta_json)?;

        // Atomic rename
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir)?;
        }
        fs::rename(&tmp_dir, &final_dir)?;

        self.update_latest_symlink(&dir_name)?;
        self.prune_old_checkpoints(&final_dir)?;

        Ok(final_dir)
    }

    /// Load the metadata of the checkpoint in `dir`.
    pub fn load_checkpoint(&self, dir: &Path) -> Result<CheckpointData, CheckpointError> {
        let meta_path = dir.join("metadata.json");
        let metadata = read_metadata(&meta_path)?;
        Ok(CheckpointData {
            path: dir.to_path_buf(),
            metadata,
        })
    }

    /// Load the checkpoint `latest` points at.
    pub fn load_latest(&self) -> Result<CheckpointData, CheckpointError> {
        let latest_link = self.config.checkpoint_dir.join("latest");
        // a dangling link is a broken checkpoint, not a missing one
        if latest_link.symlink_metadata().is_err() {
            return Err(CheckpointError::NoLatestSymlink(
                self.config.checkpoint_dir.clone(),
            ));
        }
        let resolved = fs::read_link(&latest_link)?;
        let target = if resolved.is_relative() {
            self.config.checkpoint_dir.join(resolved)
        } else {
            resolved
        };
        self.load_checkpoint(&target)
    }

    /// List all checkpoints sorted by episode (ascending).
    pub fn list_checkpoints(&self) -> Result<Vec<(PathBuf, CheckpointMetadata)>, CheckpointError> {
        let mut results = Vec::new();
        if !self.config.checkpoint_dir.exists() {
            return Ok(results);
        }
        for entry in fs::read_dir(&self.config.checkpoint_dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || path.is_symlink() {
                continue;
            }
            let name = entry.file_name();
            let name_str = name.to_string_lossy();
            if !name_str.starts_with("checkpoint_") || name_str.ends_with(".tmp") {
                continue;
            }
            let meta_path = path.join("metadata.json");
            if meta_path.exists() {
                let metadata = read_metadata(&meta_path)?;
                results.push((path, metadata));
            }
        }
        results.sort_by_key(|(_, m)| m.episode);
        Ok(results)
    }

    /// Delete checkpoints until `keep_last_n` remain: `current` plus the
    /// highest-episode others. `current` is never removed, even when an
    /// earlier run left checkpoints with higher episode numbers.
    fn prune_old_checkpoints(&self, current: &Path) -> Result<(), CheckpointError> {
        let others: Vec<PathBuf> = self
            .list_checkpoints()?
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| path.as_path() != current)
            .collect();
        let keep_others = self.config.keep_last_n.max(1) - 1;
        let excess = others.len().saturating_sub(keep_others);
        for path in others.iter().take(excess) {
            fs::remove_dir_all(path)?;
        }
        Ok(())
    }

    /// Update the `latest` symlink to point to the given checkpoint directory name.
    fn update_latest_symlink(&self, dir_name: &str) -> Result<(), CheckpointError> {
        let link_path = self.config.checkpoint_dir.join("latest");
        // Remove old symlink if it exists
        if link_path.exists() || link_path.symlink_metadata().is_ok() {
            fs::remove_file(&link_path)?;
        }
        std::os::unix::fs::symlink(dir_name, &link_path)?;
        Ok(())
    }
}

fn read_metadata(meta_path: &Path) -> Result<CheckpointMetadata, CheckpointError> {
    let meta_json = fs::read_to_string(meta_path).map_err(|e| CheckpointError::MetadataRead {
        path: meta_path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&meta_json).map_err(|e| CheckpointError::MetadataParse {
        path: meta_path.to_path_buf(),
        source: e,
    })
}
