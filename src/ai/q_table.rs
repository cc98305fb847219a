use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StateKey;
use crate::error::CheckpointError;
use crate::game::Action;

/// Tabular action-value store. Unseen pairs read as 0.0; entries are only
/// ever added or overwritten.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QTable {
    values: HashMap<StateKey, HashMap<Action, f64>>,
    len: usize,
}

/// One row of a persisted table.
#[derive(Debug, Serialize, Deserialize)]
struct QEntry {
    state: StateKey,
    action: Action,
    value: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct QTableFile {
    entries: Vec<QEntry>,
}

impl QTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored (state, action) pairs.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn value(&self, state: &StateKey, action: Action) -> f64 {
        self.values
            .get(state)
            .and_then(|row| row.get(&action))
            .copied()
            .unwrap_or(0.0)
    }

    /// Overwrite the estimate for `(state, action)`.
    pub fn update(&mut self, state: &StateKey, action: Action, value: f64) {
        let inserted = match self.values.get_mut(state) {
            Some(row) => row.insert(action, value).is_none(),
            None => {
                self.values
                    .insert(state.clone(), HashMap::from([(action, value)]));
                true
            }
        };
        if inserted {
            self.len += 1;
        }
    }

    /// Highest estimate among `actions`, or 0.0 when there are none.
    pub fn max_value(&self, state: &StateKey, actions: &[Action]) -> f64 {
        actions
            .iter()
            .map(|&a| self.value(state, a))
            .reduce(f64::max)
            .unwrap_or(0.0)
    }

    /// A grid size other than `size` that some stored key was encoded on.
    pub fn mismatched_grid(&self, size: usize) -> Option<usize> {
        self.values
            .keys()
            .map(StateKey::grid_size)
            .find(|&n| n != size)
    }

    /// Write the whole table to `path` as JSON. The file is written beside
    /// its destination and renamed into place.
    pub fn save(&self, path: &Path) -> Result<(), CheckpointError> {
        let mut entries: Vec<QEntry> = self
            .values
            .iter()
            .flat_map(|(state, row)| {
                row.iter().map(move |(&action, &value)| QEntry {
                    state: state.clone(),
                    action,
                    value,
                })
            })
            .collect();
        entries.sort_by(|a, b| (&a.state, a.action).cmp(&(&b.state, b.action)));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&QTableFile { entries })?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a table written by [`QTable::save`].
    ///
    /// A missing file is reported as [`CheckpointError::ModelNotFound`] so the
    /// caller can decide whether an untrained agent is acceptable.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let bytes = fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CheckpointError::ModelNotFound(path.to_path_buf()),
            _ => CheckpointError::ModelRead {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        let file: QTableFile =
            serde_json::from_slice(&bytes).map_err(|e| CheckpointError::ModelParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        let mut table = QTable::new();
        for QEntry {
            state,
            action,
            value,
        } in file.entries
        {
            table.update(&state, action, value);
        }
        Ok(table)
    }
}
