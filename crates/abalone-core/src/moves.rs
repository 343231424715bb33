//! Move representation and the move list consumed by the search.

use std::fmt;
use std::slice;

use arrayvec::ArrayVec;

use crate::cell::{Cell, Direction};

/// Capacity of a [`MoveList`]. Abalone positions stay far below this.
pub const MAX_MOVES: usize = 384;

/// Kind of an Abalone move.
///
/// In-line kinds move a line of marbles along its own axis, optionally
/// pushing a shorter line of opposing marbles (a sumito). `OutXWithY` kinds
/// push the last opposing marble off the board. Broadside kinds shift a line
/// of two or three marbles sideways, to the left or right of the line axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MoveKind {
    /// Sentinel for "no move".
    #[default]
    None = 0,
    Move1,
    Move2,
    Move3,
    Push1With2,
    Push1With3,
    Push2With3,
    Out1With2,
    Out1With3,
    Out2With3,
    Left2,
    Right2,
    Left3,
    Right3,
}

impl MoveKind {
    const ALL: [MoveKind; 14] = [
        MoveKind::None,
        MoveKind::Move1,
        MoveKind::Move2,
        MoveKind::Move3,
        MoveKind::Push1With2,
        MoveKind::Push1With3,
        MoveKind::Push2With3,
        MoveKind::Out1With2,
        MoveKind::Out1With3,
        MoveKind::Out2With3,
        MoveKind::Left2,
        MoveKind::Right2,
        MoveKind::Left3,
        MoveKind::Right3,
    ];

    /// Safely converts a `u8` wire value into a `MoveKind`.
    pub fn from_u8(value: u8) -> Option<MoveKind> {
        Self::ALL.get(value as usize).copied()
    }

    /// Builds the in-line kind for `own` moving marbles pushing `pushed`
    /// opposing marbles, the last of which leaves the board when `out` is set.
    ///
    /// # Returns
    ///
    /// `None` for combinations the rules do not allow (more than three own
    /// marbles, or a push without numerical superiority).
    pub fn inline(own: usize, pushed: usize, out: bool) -> Option<MoveKind> {
        let kind = match (own, pushed, out) {
            (1, 0, false) => MoveKind::Move1,
            (2, 0, false) => MoveKind::Move2,
            (3, 0, false) => MoveKind::Move3,
            (2, 1, false) => MoveKind::Push1With2,
            (3, 1, false) => MoveKind::Push1With3,
            (3, 2, false) => MoveKind::Push2With3,
            (2, 1, true) => MoveKind::Out1With2,
            (3, 1, true) => MoveKind::Out1With3,
            (3, 2, true) => MoveKind::Out2With3,
            _ => return None,
        };
        Some(kind)
    }

    /// Builds the broadside kind for a line of `len` marbles.
    pub fn broadside(len: usize, right: bool) -> Option<MoveKind> {
        match (len, right) {
            (2, false) => Some(MoveKind::Left2),
            (2, true) => Some(MoveKind::Right2),
            (3, false) => Some(MoveKind::Left3),
            (3, true) => Some(MoveKind::Right3),
            _ => None,
        }
    }

    /// Number of own marbles moved.
    pub fn marbles(self) -> usize {
        match self {
            MoveKind::None => 0,
            MoveKind::Move1 => 1,
            MoveKind::Move2
            | MoveKind::Push1With2
            | MoveKind::Out1With2
            | MoveKind::Left2
            | MoveKind::Right2 => 2,
            _ => 3,
        }
    }

    /// Number of opposing marbles pushed.
    pub fn pushed(self) -> usize {
        match self {
            MoveKind::Push1With2
            | MoveKind::Push1With3
            | MoveKind::Out1With2
            | MoveKind::Out1With3 => 1,
            MoveKind::Push2With3 | MoveKind::Out2With3 => 2,
            _ => 0,
        }
    }

    /// Returns true if an opposing marble leaves the board.
    pub fn is_out(self) -> bool {
        matches!(
            self,
            MoveKind::Out1With2 | MoveKind::Out1With3 | MoveKind::Out2With3
        )
    }

    pub fn is_broadside(self) -> bool {
        matches!(
            self,
            MoveKind::Left2 | MoveKind::Right2 | MoveKind::Left3 | MoveKind::Right3
        )
    }

    /// Direction in which the marbles of a broadside move travel, given the
    /// line axis.
    pub fn side(self, axis: Direction) -> Option<Direction> {
        match self {
            MoveKind::Left2 | MoveKind::Left3 => Some(axis.left()),
            MoveKind::Right2 | MoveKind::Right3 => Some(axis.right()),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            MoveKind::None => "none",
            MoveKind::Move1 => "move1",
            MoveKind::Move2 => "move2",
            MoveKind::Move3 => "move3",
            MoveKind::Push1With2 => "push1with2",
            MoveKind::Push1With3 => "push1with3",
            MoveKind::Push2With3 => "push2with3",
            MoveKind::Out1With2 => "out1with2",
            MoveKind::Out1With3 => "out1with3",
            MoveKind::Out2With3 => "out2with3",
            MoveKind::Left2 => "left2",
            MoveKind::Right2 => "right2",
            MoveKind::Left3 => "left3",
            MoveKind::Right3 => "right3",
        }
    }
}

/// A single Abalone move.
///
/// For in-line kinds `origin` is the trailing marble and the line extends in
/// `direction`. For broadside kinds the line extends from `origin` along
/// `direction` and every marble steps to [`MoveKind::side`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Move {
    pub origin: Cell,
    pub direction: Direction,
    pub kind: MoveKind,
}

impl Move {
    /// Creates a new move.
    ///
    /// # Arguments
    ///
    /// * `origin` - Trailing marble of the moving line
    /// * `direction` - Line axis, which is also the travel direction for in-line kinds
    /// * `kind` - Move kind
    #[inline]
    pub fn new(origin: Cell, direction: Direction, kind: MoveKind) -> Move {
        Move {
            origin,
            direction,
            kind,
        }
    }

    /// Returns true for the "no move" sentinel.
    #[inline]
    pub fn is_none(&self) -> bool {
        self.kind == MoveKind::None
    }

    /// Direction in which the moving marbles travel.
    pub fn travel(&self) -> Direction {
        self.kind.side(self.direction).unwrap_or(self.direction)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("(none)");
        }
        write!(f, "{}-{} {}", self.origin, self.direction, self.kind.name())
    }
}

/// Ordered list of moves generated from one position.
///
/// The list is consumed through an internal cursor with
/// [`MoveList::next_move`], and can also be iterated or reordered in place
/// before consumption.
#[derive(Clone, Debug)]
pub struct MoveList<M> {
    moves: ArrayVec<M, MAX_MOVES>,
    cursor: usize,
}

impl<M: Copy> Default for MoveList<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Copy> MoveList<M> {
    /// Creates an empty move list.
    pub fn new() -> Self {
        MoveList {
            moves: ArrayVec::new(),
            cursor: 0,
        }
    }

    /// Appends a move.
    #[inline]
    pub fn push(&mut self, mv: M) {
        debug_assert!(self.moves.len() < MAX_MOVES, "move list overflow");
        let _ = self.moves.try_push(mv);
    }

    /// Returns the number of moves in the list.
    #[inline]
    pub fn count(&self) -> usize {
        self.moves.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// Returns the next unconsumed move and advances the cursor.
    ///
    /// # Returns
    ///
    /// - `Some(mv)` while moves remain
    /// - `None` once the list is exhausted
    #[inline]
    pub fn next_move(&mut self) -> Option<M> {
        let mv = self.moves.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(mv)
    }

    /// Resets the cursor to the first move.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<M> {
        self.moves.get(index).copied()
    }

    /// Returns an iterator over all moves regardless of the cursor.
    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, M> {
        self.moves.iter()
    }

    pub fn as_slice(&self) -> &[M] {
        &self.moves
    }

    /// Returns true if `mv` is in the list.
    pub fn contains(&self, mv: &M) -> bool
    where
        M: PartialEq,
    {
        self.moves.contains(mv)
    }

    /// Reorders the moves by `keys`, ascending. The sort is stable.
    ///
    /// # Arguments
    ///
    /// * `keys` - One key per move, in list order
    pub fn sort_by_keys<K: Ord + Copy>(&mut self, keys: &[K]) {
        debug_assert_eq!(keys.len(), self.moves.len());
        let mut paired: ArrayVec<(K, M), MAX_MOVES> =
            keys.iter().copied().zip(self.moves.iter().copied()).collect();
        paired.sort_by_key(|&(key, _)| key);
        self.moves = paired.into_iter().map(|(_, mv)| mv).collect();
        self.cursor = 0;
    }

    /// Keeps only the first `len` moves.
    pub fn truncate(&mut self, len: usize) {
        self.moves.truncate(len);
        self.cursor = self.cursor.min(len);
    }
}

impl<M: Copy> FromIterator<M> for MoveList<M> {
    fn from_iter<I: IntoIterator<Item = M>>(iter: I) -> Self {
        let mut list = MoveList::new();
        for mv in iter {
            list.push(mv);
        }
        list
    }
}

impl<'a, M> IntoIterator for &'a MoveList<M> {
    type Item = &'a M;
    type IntoIter = slice::Iter<'a, M>;

    fn into_iter(self) -> Self::IntoIter {
        self.moves.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_wire_values() {
        for value in 0..14u8 {
            let kind = MoveKind::from_u8(value).unwrap();
            assert_eq!(kind as u8, value);
        }
        assert_eq!(MoveKind::from_u8(14), None);
    }

    #[test]
    fn test_inline_kinds() {
        assert_eq!(MoveKind::inline(3, 2, true), Some(MoveKind::Out2With3));
        assert_eq!(MoveKind::inline(2, 2, false), None);
        assert_eq!(MoveKind::inline(4, 0, false), None);
        assert_eq!(MoveKind::Push2With3.marbles(), 3);
        assert_eq!(MoveKind::Push2With3.pushed(), 2);
        assert!(MoveKind::Out1With2.is_out());
        assert!(!MoveKind::Push1With2.is_out());
    }

    #[test]
    fn test_broadside_side() {
        assert_eq!(
            MoveKind::Left2.side(Direction::East),
            Some(Direction::NorthEast)
        );
        assert_eq!(
            MoveKind::Right3.side(Direction::East),
            Some(Direction::SouthEast)
        );
        assert_eq!(MoveKind::Move2.side(Direction::East), None);
    }

    #[test]
    fn test_cursor() {
        let mut list: MoveList<u32> = [3, 1, 2].into_iter().collect();
        assert_eq!(list.next_move(), Some(3));
        assert_eq!(list.next_move(), Some(1));
        assert_eq!(list.next_move(), Some(2));
        assert_eq!(list.next_move(), None);
        list.rewind();
        assert_eq!(list.next_move(), Some(3));
    }

    #[test]
    fn test_sort_by_keys_is_stable() {
        let mut list: MoveList<char> = ['a', 'b', 'c', 'd'].into_iter().collect();
        list.sort_by_keys(&[2, 1, 2, 1]);
        assert_eq!(list.as_slice(), &['b', 'd', 'a', 'c']);
    }

    #[test]
    fn test_default_move_is_none() {
        assert!(Move::default().is_none());
        assert_eq!(Move::default().to_string(), "(none)");
    }
}
