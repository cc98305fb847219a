use serde::{Deserialize, Serialize};

use crate::game::{GameState, Player};

/// Hashable, order-sensitive encoding of a position as seen by one player.
///
/// Edges are bit-packed: horizontal lattice first, then vertical, each
/// row-major, alongside the grid size so keys from different boards never
/// collide. The perspective is always passed in explicitly, never read
/// from the state's current player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    size: usize,
    edges: Vec<u64>,
    scores: [u32; 2],
    perspective: Player,
}

impl StateKey {
    pub fn encode(state: &GameState, perspective: Player) -> Self {
        let board = state.board();
        let n = board.size();
        let horizontal = (0..=n).flat_map(|row| (0..n).map(move |col| board.horizontal(row, col)));
        let vertical = (0..n).flat_map(|row| (0..=n).map(move |col| board.vertical(row, col)));

        let mut edges = vec![0u64; board.edge_count().div_ceil(64)];
        for (bit, drawn) in horizontal.chain(vertical).enumerate() {
            if drawn {
                edges[bit / 64] |= 1 << (bit % 64);
            }
        }

        StateKey {
            size: n,
            edges,
            scores: state.scores(),
            perspective,
        }
    }

    /// Boxes per side of the board this key was encoded from.
    pub fn grid_size(&self) -> usize {
        self.size
    }

    pub fn perspective(&self) -> Player {
        self.perspective
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }
}
