use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "h")]
    Horizontal,
    #[serde(rename = "v")]
    Vertical,
}

impl Orientation {
    fn symbol(self) -> char {
        match self {
            Orientation::Horizontal => 'h',
            Orientation::Vertical => 'v',
        }
    }
}

/// One edge of the grid.
///
/// Horizontal edges live on an `(N+1) x N` lattice, vertical edges on an
/// `N x (N+1)` lattice; `row`/`col` index into the matching lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    pub orientation: Orientation,
    pub row: usize,
    pub col: usize,
}

impl Action {
    pub fn horizontal(row: usize, col: usize) -> Self {
        Action {
            orientation: Orientation::Horizontal,
            row,
            col,
        }
    }

    pub fn vertical(row: usize, col: usize) -> Self {
        Action {
            orientation: Orientation::Vertical,
            row,
            col,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.orientation.symbol(), self.row, self.col)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseActionError {
    #[error("expected '<h|v> <row> <col>', got '{0}'")]
    Format(String),

    #[error("unknown orientation '{0}' (expected 'h' or 'v')")]
    Orientation(String),

    #[error("invalid index '{0}'")]
    Index(String),
}

impl FromStr for Action {
    type Err = ParseActionError;

    /// Parses the same `"h 0 1"` form that `Display` produces.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split_whitespace().collect();
        let [kind, row, col] = parts.as_slice() else {
            return Err(ParseActionError::Format(s.trim().to_string()));
        };
        let orientation = match kind.to_ascii_lowercase().as_str() {
            "h" => Orientation::Horizontal,
            "v" => Orientation::Vertical,
            other => return Err(ParseActionError::Orientation(other.to_string())),
        };
        let row = row
            .parse()
            .map_err(|_| ParseActionError::Index(row.to_string()))?;
        let col = col
            .parse()
            .map_err(|_| ParseActionError::Index(col.to_string()))?;
        Ok(Action {
            orientation,
            row,
            col,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let action = Action::vertical(2, 3);
        assert_eq!(action.to_string(), "v 2 3");
        assert_eq!("v 2 3".parse::<Action>().unwrap(), action);
        assert_eq!("  H 0   1 ".parse::<Action>().unwrap(), Action::horizontal(0, 1));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "h 1".parse::<Action>(),
            Err(ParseActionError::Format("h 1".to_string()))
        );
        assert_eq!(
            "d 1 1".parse::<Action>(),
            Err(ParseActionError::Orientation("d".to_string()))
        );
        assert_eq!(
            "h -1 0".parse::<Action>(),
            Err(ParseActionError::Index("-1".to_string()))
        );
    }
}
