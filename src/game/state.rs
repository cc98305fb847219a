use std::fmt;

use super::{Action, Board, Player};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Winner(Player),
    Draw,
}

/// The Dots and Boxes state machine.
///
/// All mutation goes through [`GameState::apply_action`]. Drawing an edge that
/// closes no box passes the turn; closing one or more boxes keeps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    board: Board,
    scores: [u32; 2],
    current_player: Player,
    last_scorer: Option<Player>,
}

impl GameState {
    /// Create a fresh game on a `size x size` grid of boxes
    pub fn new(size: usize) -> Self {
        GameState {
            board: Board::new(size),
            scores: [0, 0],
            current_player: Player::Zero,
            last_scorer: None,
        }
    }

    /// Clear every edge, box and score; player 0 moves first.
    pub fn reset(&mut self) {
        self.board.clear();
        self.scores = [0, 0];
        self.current_player = Player::Zero;
        self.last_scorer = None;
    }

    pub fn size(&self) -> usize {
        self.board.size()
    }

    /// Get reference to board
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn scores(&self) -> [u32; 2] {
        self.scores
    }

    pub fn score(&self, player: Player) -> u32 {
        self.scores[player.index()]
    }

    /// Get current player
    pub fn current_player(&self) -> Player {
        self.current_player
    }

    /// Hand the move to `player`. Used to pick who opens an episode.
    pub fn set_current_player(&mut self, player: Player) {
        self.current_player = player;
    }

    pub fn last_scorer(&self) -> Option<Player> {
        self.last_scorer
    }

    pub fn available_actions(&self) -> Vec<Action> {
        self.board.available_actions()
    }

    /// Boxes `action` would close if drawn now, whoever draws it.
    pub fn boxes_completed_by(&self, action: Action) -> usize {
        self.board.boxes_completed_by(action)
    }

    /// Draw one edge for the current player and return the number of boxes
    /// it closed, which doubles as the reward.
    ///
    /// A drawn or out-of-range edge is a silent no-op returning 0.
    pub fn apply_action(&mut self, action: Action) -> usize {
        if !self.board.set_edge(action) {
            return 0;
        }

        let mover = self.current_player;
        let completed = self.board.claim_closed_boxes(action, mover);
        if completed == 0 {
            self.current_player = mover.other();
        } else {
            self.scores[mover.index()] += completed as u32;
            self.last_scorer = Some(mover);
        }
        completed
    }

    /// Every box has been claimed.
    pub fn is_game_over(&self) -> bool {
        self.board.is_full()
    }

    /// Get game outcome if game is over
    pub fn outcome(&self) -> Option<GameOutcome> {
        if !self.is_game_over() {
            return None;
        }
        let [zero, one] = self.scores;
        Some(match zero.cmp(&one) {
            std::cmp::Ordering::Greater => GameOutcome::Winner(Player::Zero),
            std::cmp::Ordering::Less => GameOutcome::Winner(Player::One),
            std::cmp::Ordering::Equal => GameOutcome::Draw,
        })
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new(super::DEFAULT_GRID_SIZE)
    }
}

/// ASCII rendering: `+` dots, `---`/`|` drawn edges, claimed boxes marked
/// with the owner's id.
impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.size();
        let board = &self.board;
        for row in 0..=n {
            let mut line = String::from("+");
            for col in 0..n {
                line.push_str(if board.horizontal(row, col) { "---" } else { "   " });
                line.push('+');
            }
            writeln!(f, "{line}")?;

            if row == n {
                break;
            }
            let mut line = String::new();
            for col in 0..=n {
                line.push(if board.vertical(row, col) { '|' } else { ' ' });
                if col < n {
                    match board.owner(row, col) {
                        Some(owner) => line.push_str(&format!(" {} ", owner.index())),
                        None => line.push_str("   "),
                    }
                }
            }
            writeln!(f, "{line}")?;
        }
        write!(
            f,
            "score {} - {} | to move: {}",
            self.scores[0], self.scores[1], self.current_player
        )
    }
}
