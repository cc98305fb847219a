use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::game::Player;

/// Result of a single episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeResult {
    pub winner: Option<Player>,
    pub scores: [u32; 2],
    pub starting_player: Player,
    pub plies: usize,
}

/// Cumulative wins per player and draws across a training run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub wins: [u64; 2],
    pub draws: u64,
}

impl OutcomeTally {
    pub fn record(&mut self, result: &EpisodeResult) {
        match result.winner {
            Some(player) => self.wins[player.index()] += 1,
            None => self.draws += 1,
        }
    }

    pub fn wins(&self, player: Player) -> u64 {
        self.wins[player.index()]
    }

    pub fn total(&self) -> u64 {
        self.wins[0] + self.wins[1] + self.draws
    }
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    episode_results: VecDeque<EpisodeResult>,
    capacity: usize,
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            episode_results: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn record_episode(&mut self, result: EpisodeResult) {
        self.episode_results.push_back(result);
        if self.episode_results.len() > self.capacity {
            self.episode_results.pop_front();
        }
    }

    fn recent(&self, last_n: usize) -> impl Iterator<Item = &EpisodeResult> {
        self.episode_results.iter().rev().take(last_n)
    }

    fn window(&self, last_n: usize) -> usize {
        self.episode_results.len().min(last_n)
    }

    /// Win rate for `player` in the last N episodes.
    pub fn win_rate(&self, player: Player, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self.recent(n).filter(|r| r.winner == Some(player)).count();
        wins as f32 / n as f32
    }

    /// Draw rate in the last N episodes.
    pub fn draw_rate(&self, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let draws = self.recent(n).filter(|r| r.winner.is_none()).count();
        draws as f32 / n as f32
    }

    /// Win rate of whoever moved first in the last N episodes.
    pub fn first_mover_win_rate(&self, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let wins = self
            .recent(n)
            .filter(|r| r.winner == Some(r.starting_player))
            .count();
        wins as f32 / n as f32
    }

    /// Average box margin `score(player) - score(other)` over the last N episodes.
    pub fn average_margin(&self, player: Player, last_n: usize) -> f32 {
        let n = self.window(last_n);
        if n == 0 {
            return 0.0;
        }
        let total: i64 = self
            .recent(n)
            .map(|r| r.scores[player.index()] as i64 - r.scores[player.other().index()] as i64)
            .sum();
        total as f32 / n as f32
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
