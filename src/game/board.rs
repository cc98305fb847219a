use super::{Action, Orientation, Player};

/// Default grid dimension (boxes per side).
pub const DEFAULT_GRID_SIZE: usize = 4;

/// Edge lattices and box ownership for an `N x N` grid of boxes.
///
/// Horizontal edges are stored row-major in an `(N+1) x N` matrix, vertical
/// edges row-major in an `N x (N+1)` matrix. A box is owned iff its four
/// bounding edges are drawn, and ownership never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Board {
    size: usize,
    edges_h: Vec<bool>,
    edges_v: Vec<bool>,
    owners: Vec<Option<Player>>,
}

impl Board {
    /// Create a new empty board with `size` boxes per side
    pub fn new(size: usize) -> Self {
        Board {
            size,
            edges_h: vec![false; (size + 1) * size],
            edges_v: vec![false; size * (size + 1)],
            owners: vec![None; size * size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Total number of edges, i.e. the length of a full game in plies.
    pub fn edge_count(&self) -> usize {
        self.edges_h.len() + self.edges_v.len()
    }

    pub fn clear(&mut self) {
        self.edges_h.fill(false);
        self.edges_v.fill(false);
        self.owners.fill(None);
    }

    /// Is the horizontal edge at `(row, col)` drawn? Out of range reads as undrawn.
    pub fn horizontal(&self, row: usize, col: usize) -> bool {
        self.edge_slot(Action::horizontal(row, col))
            .is_some_and(|idx| self.edges_h[idx])
    }

    /// Is the vertical edge at `(row, col)` drawn? Out of range reads as undrawn.
    pub fn vertical(&self, row: usize, col: usize) -> bool {
        self.edge_slot(Action::vertical(row, col))
            .is_some_and(|idx| self.edges_v[idx])
    }

    pub fn has_edge(&self, action: Action) -> bool {
        match action.orientation {
            Orientation::Horizontal => self.horizontal(action.row, action.col),
            Orientation::Vertical => self.vertical(action.row, action.col),
        }
    }

    /// True when `action` names an edge that exists on this grid.
    pub fn contains(&self, action: Action) -> bool {
        self.edge_slot(action).is_some()
    }

    pub fn owner(&self, row: usize, col: usize) -> Option<Player> {
        if row >= self.size || col >= self.size {
            return None;
        }
        self.owners[row * self.size + col]
    }

    pub fn owned_count(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }

    /// Every box has an owner.
    pub fn is_full(&self) -> bool {
        self.owners.iter().all(Option::is_some)
    }

    /// Undrawn edges, horizontal lattice first, each lattice row-major.
    pub fn available_actions(&self) -> Vec<Action> {
        let n = self.size;
        let mut actions = Vec::with_capacity(self.edge_count());
        for row in 0..=n {
            for col in 0..n {
                if !self.edges_h[row * n + col] {
                    actions.push(Action::horizontal(row, col));
                }
            }
        }
        for row in 0..n {
            for col in 0..=n {
                if !self.edges_v[row * (n + 1) + col] {
                    actions.push(Action::vertical(row, col));
                }
            }
        }
        actions
    }

    /// Number of boxes that drawing `action` would close. Drawn or
    /// out-of-range edges close nothing.
    pub fn boxes_completed_by(&self, action: Action) -> usize {
        if !self.contains(action) || self.has_edge(action) {
            return 0;
        }
        self.adjacent_boxes(action)
            .filter(|&(row, col)| self.owner(row, col).is_none() && self.sides_drawn(row, col) == 3)
            .count()
    }

    /// Draw an edge. Returns false (and changes nothing) if the edge is
    /// already drawn or lies outside the grid.
    pub(crate) fn set_edge(&mut self, action: Action) -> bool {
        let Some(idx) = self.edge_slot(action) else {
            return false;
        };
        let slot = match action.orientation {
            Orientation::Horizontal => &mut self.edges_h[idx],
            Orientation::Vertical => &mut self.edges_v[idx],
        };
        if *slot {
            return false;
        }
        *slot = true;
        true
    }

    /// Assign every newly closed box next to `action` to `player`.
    /// Returns how many boxes were claimed.
    pub(crate) fn claim_closed_boxes(&mut self, action: Action, player: Player) -> usize {
        let closed: Vec<(usize, usize)> = self
            .adjacent_boxes(action)
            .filter(|&(row, col)| self.owner(row, col).is_none() && self.sides_drawn(row, col) == 4)
            .collect();
        for &(row, col) in &closed {
            self.owners[row * self.size + col] = Some(player);
        }
        closed.len()
    }

    /// The one or two boxes an edge borders.
    fn adjacent_boxes(&self, action: Action) -> impl Iterator<Item = (usize, usize)> {
        let n = self.size;
        let Action { row, col, .. } = action;
        let (before, after) = match action.orientation {
            // above and below
            Orientation::Horizontal => (
                (row > 0 && row <= n && col < n).then(|| (row - 1, col)),
                (row < n && col < n).then_some((row, col)),
            ),
            // left and right
            Orientation::Vertical => (
                (col > 0 && col <= n && row < n).then(|| (row, col - 1)),
                (col < n && row < n).then_some((row, col)),
            ),
        };
        before.into_iter().chain(after)
    }

    fn sides_drawn(&self, row: usize, col: usize) -> usize {
        [
            self.horizontal(row, col),
            self.horizontal(row + 1, col),
            self.vertical(row, col),
            self.vertical(row, col + 1),
        ]
        .into_iter()
        .filter(|&drawn| drawn)
        .count()
    }

    fn edge_slot(&self, action: Action) -> Option<usize> {
        let n = self.size;
        let Action { row, col, .. } = action;
        match action.orientation {
            Orientation::Horizontal if row <= n && col < n => Some(row * n + col),
            Orientation::Vertical if row < n && col <= n => Some(row * (n + 1) + col),
            _ => None,
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_SIZE)
    }
}
