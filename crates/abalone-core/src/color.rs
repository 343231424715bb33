//! Marble colors.

use std::fmt;

/// Owner of a marble, also used for the side to move.
///
/// * `One` - rendered as `O`, starts at the bottom of the board and moves first.
/// * `Two` - rendered as `X`, starts at the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    One,
    Two,
}

impl Color {
    /// Both colors in index order.
    pub const ALL: [Color; 2] = [Color::One, Color::Two];

    /// Returns the other color.
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::One => Color::Two,
            Color::Two => Color::One,
        }
    }

    /// Index into per-color arrays (`0` for `One`, `1` for `Two`).
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Converts the color to its character representation.
    ///
    /// # Returns
    ///
    /// * `'O'` for `Color::One`
    /// * `'X'` for `Color::Two`
    pub fn to_char(self) -> char {
        match self {
            Color::One => 'O',
            Color::Two => 'X',
        }
    }

    /// Parses the character produced by [`Color::to_char`].
    pub fn from_char(c: char) -> Option<Color> {
        match c {
            'O' | 'o' => Some(Color::One),
            'X' | 'x' => Some(Color::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}
