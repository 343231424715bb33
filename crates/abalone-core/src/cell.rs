//! Hexagonal board geometry: cells and the six move directions.
//!
//! The 61 playable cells are embedded in an 11x11 grid using axial
//! coordinates `(q, r)` with `-5 <= q, r <= 5`. A cell is playable when
//! `|q| <= 4`, `|r| <= 4` and `|q + r| <= 4`; every other grid slot is part of
//! the off-board border, so stepping from any playable cell in any direction
//! stays inside the grid.
//!
//! ```text
//!         I5 I6 I7 I8 I9
//!        H4 H5 H6 H7 H8 H9
//!       G3 G4 G5 G6 G7 G8 G9
//!      F2 F3 F4 F5 F6 F7 F8 F9
//!     E1 E2 E3 E4 E5 E6 E7 E8 E9
//!      D1 D2 D3 D4 D5 D6 D7 D8
//!       C1 C2 C3 C4 C5 C6 C7
//!        B1 B2 B3 B4 B5 B6
//!         A1 A2 A3 A4 A5
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Width and height of the padded grid.
pub const GRID_SIZE: usize = 11;

/// Number of slots in the padded grid.
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

/// Number of playable cells.
pub const N_CELLS: usize = 61;

const RADIUS: i32 = 4;

/// One of the six hex directions, in clockwise order starting east.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Direction {
    #[default]
    East = 0,
    SouthEast = 1,
    SouthWest = 2,
    West = 3,
    NorthWest = 4,
    NorthEast = 5,
}

impl Direction {
    /// All directions in clockwise order.
    pub const ALL: [Direction; 6] = [
        Direction::East,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::West,
        Direction::NorthWest,
        Direction::NorthEast,
    ];

    const OFFSETS: [i16; 6] = [
        1,
        GRID_SIZE as i16,
        GRID_SIZE as i16 - 1,
        -1,
        -(GRID_SIZE as i16),
        1 - GRID_SIZE as i16,
    ];

    /// Grid index delta of one step in this direction.
    #[inline]
    pub fn offset(self) -> i16 {
        Self::OFFSETS[self as usize]
    }

    #[inline]
    pub fn opposite(self) -> Direction {
        Self::ALL[(self as usize + 3) % 6]
    }

    /// Next direction counter-clockwise.
    #[inline]
    pub fn left(self) -> Direction {
        Self::ALL[(self as usize + 5) % 6]
    }

    /// Next direction clockwise.
    #[inline]
    pub fn right(self) -> Direction {
        Self::ALL[(self as usize + 1) % 6]
    }

    /// Safely converts a `u8` into a `Direction`.
    ///
    /// # Returns
    /// `Some(Direction)` for `0..6`, `None` otherwise.
    pub fn from_u8(value: u8) -> Option<Direction> {
        Self::ALL.get(value as usize).copied()
    }

    /// Compass abbreviation used in move notation.
    pub fn abbrev(self) -> &'static str {
        match self {
            Direction::East => "E",
            Direction::SouthEast => "SE",
            Direction::SouthWest => "SW",
            Direction::West => "W",
            Direction::NorthWest => "NW",
            Direction::NorthEast => "NE",
        }
    }

    /// Parses the abbreviation produced by [`Direction::abbrev`].
    pub fn from_abbrev(s: &str) -> Option<Direction> {
        Self::ALL
            .into_iter()
            .find(|d| d.abbrev().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.abbrev())
    }
}

/// A slot of the padded grid, playable or part of the border.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Cell(u8);

impl Cell {
    /// Grid slot `(q, r) = (-5, -5)`, always off-board. Stepping off the grid
    /// lands here.
    pub const OFF: Cell = Cell(0);

    /// Creates a cell from axial coordinates.
    ///
    /// # Arguments
    ///
    /// * `q` - Column coordinate, increasing to the east
    /// * `r` - Row coordinate, increasing to the south
    ///
    /// # Returns
    ///
    /// `Some(Cell)` when the coordinates fall inside the padded grid (border
    /// slots included), `None` otherwise.
    pub fn new(q: i32, r: i32) -> Option<Cell> {
        let half = (GRID_SIZE / 2) as i32;
        if q.abs() > half || r.abs() > half {
            return None;
        }
        Some(Cell(((r + half) * GRID_SIZE as i32 + q + half) as u8))
    }

    /// Converts a grid index into a cell.
    ///
    /// # Returns
    /// `Some(Cell)` if `index < GRID_CELLS`, `None` otherwise.
    pub fn from_index(index: usize) -> Option<Cell> {
        (index < GRID_CELLS).then_some(Cell(index as u8))
    }

    /// Grid index of this cell.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn q(self) -> i32 {
        (self.0 as usize % GRID_SIZE) as i32 - (GRID_SIZE / 2) as i32
    }

    #[inline]
    pub fn r(self) -> i32 {
        (self.0 as usize / GRID_SIZE) as i32 - (GRID_SIZE / 2) as i32
    }

    /// Returns true if the cell lies on the 61-cell board.
    #[inline]
    pub fn is_playable(self) -> bool {
        let (q, r) = (self.q(), self.r());
        q.abs() <= RADIUS && r.abs() <= RADIUS && (q + r).abs() <= RADIUS
    }

    /// Distance from the center cell E5 (0 for the center, 4 for the edge).
    pub fn ring(self) -> usize {
        let (q, r) = (self.q(), self.r());
        q.abs().max(r.abs()).max((q + r).abs()) as usize
    }

    /// Returns the adjacent grid slot in direction `dir`.
    ///
    /// Steps leaving the padded grid collapse onto [`Cell::OFF`], so walking
    /// from the border never wraps onto a playable cell.
    #[inline]
    pub fn step(self, dir: Direction) -> Cell {
        let next = self.0 as i16 + dir.offset();
        if (0..GRID_CELLS as i16).contains(&next) {
            Cell(next as u8)
        } else {
            Cell::OFF
        }
    }

    /// Returns the slot `n` steps away in direction `dir`.
    #[inline]
    pub fn step_n(self, dir: Direction, n: usize) -> Cell {
        (0..n).fold(self, |cell, _| cell.step(dir))
    }

    /// Iterates over all playable cells, top row first, west to east.
    pub fn playable() -> impl Iterator<Item = Cell> {
        (0..GRID_CELLS).map(|i| Cell(i as u8)).filter(|c| c.is_playable())
    }

    /// Row letter, `A` at the bottom and `I` at the top.
    pub fn row_letter(self) -> char {
        (b'A' + (RADIUS - self.r()) as u8) as char
    }

    /// Diagonal number, `1` at the western edge.
    pub fn diagonal(self) -> u8 {
        (self.q() + RADIUS + 1) as u8
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_playable() {
            write!(f, "{}{}", self.row_letter(), self.diagonal())
        } else {
            write!(f, "--")
        }
    }
}

impl FromStr for Cell {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let (Some(row), Some(diag), None) = (chars.next(), chars.next(), chars.next()) else {
            return Err(Error::InvalidState(format!("bad cell name '{s}'")));
        };
        let row = row.to_ascii_uppercase();
        if !('A'..='I').contains(&row) || !('1'..='9').contains(&diag) {
            return Err(Error::InvalidState(format!("bad cell name '{s}'")));
        }
        let r = RADIUS - (row as u8 - b'A') as i32;
        let q = (diag as u8 - b'1') as i32 - RADIUS;
        Cell::new(q, r)
            .filter(|c| c.is_playable())
            .ok_or_else(|| Error::InvalidState(format!("cell '{s}' is off the board")))
    }
}
