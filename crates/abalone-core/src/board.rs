//! Abalone position with legal-move generation and a reversible move stack.
//!
//! The board is mutated in place during search: [`Board::play_move`] pushes an
//! undo record holding every slot it overwrites, and [`Board::take_back`]
//! restores them, so a play/take-back pair leaves the board bit-for-bit
//! unchanged.

use std::fmt;
use std::str::FromStr;

use arrayvec::ArrayVec;
use log::warn;

use crate::cell::{Cell, Direction, GRID_CELLS, N_CELLS};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::moves::{Move, MoveKind, MoveList};
use crate::search::Position;

/// Marbles each side starts with.
pub const START_MARBLES: u8 = 14;

/// A side holding this many marbles or fewer has lost.
pub const LOSING_MARBLES: u8 = 8;

/// Clock each side starts with, in milliseconds.
pub const DEFAULT_CLOCK_MS: i32 = 300_000;

/// Upper bound on the length of a state string.
pub const MAX_STATE_LEN: usize = 256;

/// Content of one slot of the padded grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Out,
    Empty,
    Marble(Color),
}

impl Slot {
    fn to_char(self) -> char {
        match self {
            Slot::Out => ' ',
            Slot::Empty => '.',
            Slot::Marble(color) => color.to_char(),
        }
    }
}

/// Classification of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    /// Game in progress with the given side to move.
    Valid(Color),
    /// The given side won by pushing enough opposing marbles off the board.
    Win(Color),
    /// The given side won because the opponent's clock ran out.
    Timeout(Color),
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        !matches!(self, GameStatus::Valid(_))
    }

    /// Returns the winner of a finished game.
    pub fn winner(self) -> Option<Color> {
        match self {
            GameStatus::Valid(_) => None,
            GameStatus::Win(color) | GameStatus::Timeout(color) => Some(color),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameStatus::Valid(color) => write!(f, "{color} to move"),
            GameStatus::Win(color) => write!(f, "{color} wins"),
            GameStatus::Timeout(color) => write!(f, "{color} wins on time"),
        }
    }
}

/// Everything needed to revert one applied move.
#[derive(Clone, Debug)]
struct Undo {
    /// Overwritten slots with their previous content, in write order.
    changes: ArrayVec<(Cell, Slot), 6>,
    /// Color of a marble pushed off the board.
    captured: Option<Color>,
    mover: Color,
    /// Mover's clock before the move.
    clock_ms: i32,
    /// False for the placeholder recorded when an illegal move was ignored.
    applied: bool,
}

impl Undo {
    fn new(mover: Color, clock_ms: i32) -> Undo {
        Undo {
            changes: ArrayVec::new(),
            captured: None,
            mover,
            clock_ms,
            applied: true,
        }
    }

    fn ignored(mover: Color) -> Undo {
        Undo {
            applied: false,
            ..Undo::new(mover, 0)
        }
    }
}

/// An Abalone position: occupancy, side to move, move number, clocks and the
/// undo stack.
#[derive(Clone, Debug)]
pub struct Board {
    slots: [Slot; GRID_CELLS],
    side_to_move: Color,
    move_no: u32,
    clocks: [i32; 2],
    marbles: [u8; 2],
    history: Vec<Undo>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Board {
    /// Positions compare equal when occupancy, side to move, move number and
    /// clocks agree. The undo stack is not part of the position.
    fn eq(&self, other: &Self) -> bool {
        self.slots == other.slots
            && self.side_to_move == other.side_to_move
            && self.move_no == other.move_no
            && self.clocks == other.clocks
            && self.marbles == other.marbles
    }
}

impl Eq for Board {}

impl Board {
    /// Creates the standard starting position with `One` to move.
    ///
    /// `One` occupies the two bottom rows plus the three middle cells of
    /// row C; `Two` mirrors it at the top.
    pub fn new() -> Board {
        let mut board = Board::empty(Color::One);
        for cell in Cell::playable() {
            let (q, r) = (cell.q(), cell.r());
            let slot = if r >= 3 || (r == 2 && (-2..=0).contains(&q)) {
                Slot::Marble(Color::One)
            } else if r <= -3 || (r == -2 && (0..=2).contains(&q)) {
                Slot::Marble(Color::Two)
            } else {
                Slot::Empty
            };
            board.slots[cell.index()] = slot;
        }
        board.recount();
        board
    }

    /// Creates a board with no marbles.
    pub fn empty(side_to_move: Color) -> Board {
        let mut slots = [Slot::Out; GRID_CELLS];
        for cell in Cell::playable() {
            slots[cell.index()] = Slot::Empty;
        }
        Board {
            slots,
            side_to_move,
            move_no: 0,
            clocks: [DEFAULT_CLOCK_MS; 2],
            marbles: [0; 2],
            history: Vec::new(),
        }
    }

    /// Parses a state string produced by [`Board::to_state_string`].
    pub fn from_state_str(state: &str) -> Result<Board> {
        let mut board = Board::empty(Color::One);
        board.set_state(state)?;
        Ok(board)
    }

    /// Replaces the position with the one described by `state` and clears the
    /// undo stack.
    ///
    /// The format is `<cells> <side> [<move number> [<clock O> <clock X>]]`:
    /// 61 occupancy characters (`.`, `O`, `X`) from row I down to row A, each
    /// row west to east, then the side to move and optionally the move number
    /// and both clocks in milliseconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the string is malformed; the board is
    /// left unchanged in that case.
    pub fn set_state(&mut self, state: &str) -> Result<()> {
        if state.len() > MAX_STATE_LEN {
            return Err(Error::InvalidState(format!(
                "state longer than {MAX_STATE_LEN} bytes"
            )));
        }
        let mut fields = state.split_whitespace();
        let cells = fields
            .next()
            .ok_or_else(|| Error::InvalidState("empty state".to_string()))?;
        if cells.chars().count() != N_CELLS {
            return Err(Error::InvalidState(format!(
                "expected {N_CELLS} cells, found {}",
                cells.chars().count()
            )));
        }

        let mut next = Board::empty(Color::One);
        for (cell, c) in Cell::playable().zip(cells.chars()) {
            next.slots[cell.index()] = match c {
                '.' | '-' => Slot::Empty,
                _ => Slot::Marble(Color::from_char(c).ok_or_else(|| {
                    Error::InvalidState(format!("unexpected cell character '{c}'"))
                })?),
            };
        }
        next.recount();
        if next.marbles.iter().any(|&n| n > START_MARBLES) {
            return Err(Error::InvalidState("too many marbles".to_string()));
        }

        let side = fields
            .next()
            .ok_or_else(|| Error::InvalidState("missing side to move".to_string()))?;
        let mut side_chars = side.chars();
        next.side_to_move = match (side_chars.next(), side_chars.next()) {
            (Some(c), None) => Color::from_char(c),
            _ => None,
        }
        .ok_or_else(|| Error::InvalidState(format!("bad side to move '{side}'")))?;

        if let Some(move_no) = fields.next() {
            next.move_no = parse_field(move_no, "move number")?;
        }
        if let Some(clock) = fields.next() {
            next.clocks[0] = parse_field(clock, "clock")?;
            let clock = fields
                .next()
                .ok_or_else(|| Error::InvalidState("missing second clock".to_string()))?;
            next.clocks[1] = parse_field(clock, "clock")?;
        }
        if fields.next().is_some() {
            return Err(Error::InvalidState("trailing fields".to_string()));
        }

        *self = next;
        Ok(())
    }

    /// Serializes the position (not the undo stack) as a state string.
    pub fn to_state_string(&self) -> String {
        let cells: String = Cell::playable().map(|c| self.slot(c).to_char()).collect();
        format!(
            "{cells} {} {} {} {}",
            self.side_to_move, self.move_no, self.clocks[0], self.clocks[1]
        )
    }

    #[inline]
    pub fn slot(&self, cell: Cell) -> Slot {
        self.slots[cell.index()]
    }

    /// Places or removes a marble. Used to set up positions; clears the undo
    /// stack.
    ///
    /// # Panics
    ///
    /// Panics if `cell` is not playable.
    pub fn put(&mut self, cell: Cell, marble: Option<Color>) {
        assert!(cell.is_playable(), "cell {cell:?} is off the board");
        self.slots[cell.index()] = marble.map_or(Slot::Empty, Slot::Marble);
        self.recount();
        self.history.clear();
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    /// Number of moves applied since the game started.
    #[inline]
    pub fn move_no(&self) -> u32 {
        self.move_no
    }

    /// Remaining clock of `color` in milliseconds.
    #[inline]
    pub fn clock_ms(&self, color: Color) -> i32 {
        self.clocks[color.index()]
    }

    /// Sets both clocks.
    pub fn set_clocks(&mut self, one_ms: i32, two_ms: i32) {
        self.clocks = [one_ms, two_ms];
    }

    /// Number of marbles `color` still has on the board.
    #[inline]
    pub fn marbles(&self, color: Color) -> u8 {
        self.marbles[color.index()]
    }

    /// Number of undo records on the stack.
    #[inline]
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Generates all legal moves for the side to move.
    ///
    /// Moves are produced cell by cell in grid order; for each own marble all
    /// in-line moves with it as trailing marble come first, then the
    /// broadside moves of lines starting at it. Every broadside move is
    /// produced once: a line and its reverse travel to different sides.
    ///
    /// # Returns
    ///
    /// A new MoveList containing all legal moves.
    pub fn generate_moves(&self) -> MoveList<Move> {
        let me = self.side_to_move;
        let mut list = MoveList::new();
        for origin in Cell::playable() {
            if self.slot(origin) != Slot::Marble(me) {
                continue;
            }
            for dir in Direction::ALL {
                if let Some(kind) = self.inline_kind(origin, dir) {
                    list.push(Move::new(origin, dir, kind));
                }
            }
            for dir in Direction::ALL {
                for len in 2..=3 {
                    if self.slot(origin.step_n(dir, len - 1)) != Slot::Marble(me) {
                        break;
                    }
                    for right in [false, true] {
                        let Some(kind) = MoveKind::broadside(len, right) else {
                            continue;
                        };
                        if self.broadside_fits(origin, dir, kind) {
                            list.push(Move::new(origin, dir, kind));
                        }
                    }
                }
            }
        }
        list
    }

    /// Returns true if `mv` is legal for the side to move.
    pub fn is_legal(&self, mv: Move) -> bool {
        let me = self.side_to_move;
        if !mv.origin.is_playable() || self.slot(mv.origin) != Slot::Marble(me) {
            return false;
        }
        if mv.kind.is_broadside() {
            let len = mv.kind.marbles();
            (1..len).all(|i| self.slot(mv.origin.step_n(mv.direction, i)) == Slot::Marble(me))
                && self.broadside_fits(mv.origin, mv.direction, mv.kind)
        } else {
            mv.kind != MoveKind::None && self.inline_kind(mv.origin, mv.direction) == Some(mv.kind)
        }
    }

    /// Classifies the in-line move of the line trailing at `origin` along `dir`.
    fn inline_kind(&self, origin: Cell, dir: Direction) -> Option<MoveKind> {
        let me = self.side_to_move;
        let mut own = 1;
        let mut cell = origin.step(dir);
        while self.slot(cell) == Slot::Marble(me) {
            own += 1;
            if own > 3 {
                return None;
            }
            cell = cell.step(dir);
        }
        match self.slot(cell) {
            Slot::Empty => MoveKind::inline(own, 0, false),
            Slot::Out => None,
            Slot::Marble(_) => {
                let mut pushed = 0;
                while self.slot(cell) == Slot::Marble(me.opposite()) {
                    pushed += 1;
                    if pushed >= own {
                        return None;
                    }
                    cell = cell.step(dir);
                }
                match self.slot(cell) {
                    Slot::Empty => MoveKind::inline(own, pushed, false),
                    Slot::Out => MoveKind::inline(own, pushed, true),
                    Slot::Marble(_) => None,
                }
            }
        }
    }

    /// Returns true if every marble of the line can step sideways into an
    /// empty cell.
    fn broadside_fits(&self, origin: Cell, axis: Direction, kind: MoveKind) -> bool {
        let Some(side) = kind.side(axis) else {
            return false;
        };
        (0..kind.marbles()).all(|i| self.slot(origin.step_n(axis, i).step(side)) == Slot::Empty)
    }

    /// Applies a move without charging the clock.
    ///
    /// # Returns
    ///
    /// `true` if the move was applied, `false` if it was illegal and ignored.
    #[inline]
    pub fn play_move(&mut self, mv: Move) -> bool {
        self.play_move_timed(mv, 0)
    }

    /// Applies a move and charges `msecs` to the mover's clock.
    ///
    /// Callers are expected to pass moves from [`Board::generate_moves`]. An
    /// illegal move trips a debug assertion; in release builds it is logged
    /// and recorded as a no-op, so the matching [`Board::take_back`] still
    /// pops exactly one record.
    ///
    /// # Arguments
    ///
    /// * `mv` - Move to apply
    /// * `msecs` - Thinking time spent on the move
    ///
    /// # Returns
    ///
    /// `true` if the move was applied, `false` if it was ignored.
    pub fn play_move_timed(&mut self, mv: Move, msecs: i32) -> bool {
        let me = self.side_to_move;
        let legal = self.is_legal(mv);
        debug_assert!(legal, "illegal move {mv} for {me}");
        if !legal {
            warn!("ignoring illegal move {mv} for {me}");
            self.history.push(Undo::ignored(me));
            return false;
        }

        let mut undo = Undo::new(me, self.clocks[me.index()]);
        if let Some(side) = mv.kind.side(mv.direction) {
            let len = mv.kind.marbles();
            for i in 0..len {
                self.write(&mut undo, mv.origin.step_n(mv.direction, i), Slot::Empty);
            }
            for i in 0..len {
                let target = mv.origin.step_n(mv.direction, i).step(side);
                self.write(&mut undo, target, Slot::Marble(me));
            }
        } else {
            let head = mv.origin.step_n(mv.direction, mv.kind.marbles());
            self.write(&mut undo, mv.origin, Slot::Empty);
            self.write(&mut undo, head, Slot::Marble(me));
            if mv.kind.is_out() {
                let opp = me.opposite();
                self.marbles[opp.index()] -= 1;
                undo.captured = Some(opp);
            } else if mv.kind.pushed() > 0 {
                let tail = head.step_n(mv.direction, mv.kind.pushed());
                self.write(&mut undo, tail, Slot::Marble(me.opposite()));
            }
        }

        self.clocks[me.index()] = self.clocks[me.index()].saturating_sub(msecs);
        self.move_no += 1;
        self.side_to_move = me.opposite();
        self.history.push(undo);
        true
    }

    #[inline]
    fn write(&mut self, undo: &mut Undo, cell: Cell, slot: Slot) {
        undo.changes.push((cell, self.slots[cell.index()]));
        self.slots[cell.index()] = slot;
    }

    /// Reverts the most recent [`Board::play_move`].
    ///
    /// # Returns
    ///
    /// `false` if the undo stack is empty.
    pub fn take_back(&mut self) -> bool {
        let Some(undo) = self.history.pop() else {
            return false;
        };
        if !undo.applied {
            return true;
        }
        for &(cell, slot) in undo.changes.iter().rev() {
            self.slots[cell.index()] = slot;
        }
        if let Some(color) = undo.captured {
            self.marbles[color.index()] += 1;
        }
        self.clocks[undo.mover.index()] = undo.clock_ms;
        self.move_no -= 1;
        self.side_to_move = undo.mover;
        true
    }

    /// Classifies the position: in progress, decided on marbles or decided on
    /// time.
    pub fn valid_state(&self) -> GameStatus {
        for color in Color::ALL {
            if self.marbles(color) <= LOSING_MARBLES {
                return GameStatus::Win(color.opposite());
            }
        }
        for color in Color::ALL {
            if self.clock_ms(color) <= 0 {
                return GameStatus::Timeout(color.opposite());
            }
        }
        GameStatus::Valid(self.side_to_move)
    }

    /// Cheap in-search check: both sides still have more than
    /// [`LOSING_MARBLES`] marbles.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.marbles.iter().all(|&n| n > LOSING_MARBLES)
    }

    fn recount(&mut self) {
        self.marbles = [0; 2];
        for slot in self.slots {
            if let Slot::Marble(color) = slot {
                self.marbles[color.index()] += 1;
            }
        }
    }
}

fn parse_field<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .parse()
        .map_err(|_| Error::InvalidState(format!("bad {what} '{field}'")))
}

impl FromStr for Board {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Board::from_state_str(s)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in -4..=4i32 {
            let mut row = Cell::playable().filter(|c| c.r() == r).peekable();
            let Some(first) = row.peek().copied() else {
                continue;
            };
            write!(f, "{}{} ", " ".repeat(r.unsigned_abs() as usize), first.row_letter())?;
            for cell in row {
                write!(f, " {}", self.slot(cell).to_char())?;
            }
            writeln!(f)?;
        }
        write!(
            f,
            "O: {} marbles  X: {} marbles  move {}  {} to move",
            self.marbles(Color::One),
            self.marbles(Color::Two),
            self.move_no,
            self.side_to_move
        )
    }
}

impl Position for Board {
    type Move = Move;

    fn generate_moves(&self) -> MoveList<Move> {
        Board::generate_moves(self)
    }

    fn play_move(&mut self, mv: Move) -> bool {
        Board::play_move(self, mv)
    }

    fn take_back(&mut self) -> bool {
        Board::take_back(self)
    }

    fn is_valid(&self) -> bool {
        Board::is_valid(self)
    }
}
