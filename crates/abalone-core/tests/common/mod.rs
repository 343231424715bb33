//! Synthetic game trees for search tests.
#![allow(dead_code)]

use std::thread;
use std::time::Duration;

use abalone_core::distributed::protocol::{WireMove, WireState};
use abalone_core::error::{Error, Result};
use abalone_core::eval::Evaluator;
use abalone_core::moves::MoveList;
use abalone_core::search::search_result::SearchResult;
use abalone_core::search::{
    Cancelled, Position, SearchControl, SearchParams, SearchProgressCallback, SearchStrategy,
};
use abalone_core::types::Score;

/// Child index plus one; zero is "no move".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TreeMove(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// Every node has 1 to `branching` children and a hashed value.
    Random { seed: u8, branching: u8 },
    /// One first move whose replies score +5 and -3 for the root player.
    SingleBranch,
    /// First move B with replies {4, 6, 9}, then first move A with replies
    /// {-2, 7, 8}.
    TwoBranches,
}

const SINGLE_BRANCH: [Score; 2] = [5, -3];
const BRANCH_B: [Score; 3] = [4, 6, 9];
const BRANCH_A: [Score; 3] = [-2, 7, 8];

/// A position in an implicit tree, identified by the path from the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeGame {
    shape: Shape,
    /// Played moves; ignored moves are recorded as 0.
    path: Vec<u8>,
}

impl TreeGame {
    pub fn new(shape: Shape) -> Self {
        TreeGame {
            shape,
            path: Vec::new(),
        }
    }

    pub fn random(seed: u8, branching: u8) -> Self {
        Self::new(Shape::Random { seed, branching })
    }

    fn key(&self) -> Vec<u8> {
        self.path.iter().copied().filter(|&m| m != 0).collect()
    }

    fn children(&self) -> u8 {
        let key = self.key();
        match self.shape {
            Shape::Random { seed, branching } => {
                1 + (hash(seed, &key) % u64::from(branching)) as u8
            }
            Shape::SingleBranch => match key.len() {
                0 => 1,
                1 => SINGLE_BRANCH.len() as u8,
                _ => 0,
            },
            Shape::TwoBranches => match key.len() {
                0 => 2,
                1 => 3,
                _ => 0,
            },
        }
    }

    /// Static value for the side to move.
    pub fn value(&self) -> Score {
        let key = self.key();
        match self.shape {
            Shape::Random { seed, .. } => (hash(seed ^ 0x5a, &key) % 1001) as Score - 500,
            Shape::SingleBranch => match key.as_slice() {
                [1, reply] => SINGLE_BRANCH[usize::from(*reply) - 1],
                _ => 0,
            },
            Shape::TwoBranches => match key.as_slice() {
                [1, reply] => BRANCH_B[usize::from(*reply) - 1],
                [2, reply] => BRANCH_A[usize::from(*reply) - 1],
                _ => 0,
            },
        }
    }
}

fn hash(seed: u8, key: &[u8]) -> u64 {
    let mut h = 0x9e37_79b9_7f4a_7c15u64 ^ u64::from(seed);
    for &b in key {
        h ^= u64::from(b);
        h = h.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        h ^= h >> 31;
    }
    h ^= h >> 29;
    h.wrapping_mul(0x94d0_49bb_1331_11eb) >> 16
}

impl Position for TreeGame {
    type Move = TreeMove;

    fn generate_moves(&self) -> MoveList<TreeMove> {
        (1..=self.children()).map(TreeMove).collect()
    }

    fn play_move(&mut self, mv: TreeMove) -> bool {
        let legal = mv.0 != 0 && mv.0 <= self.children();
        self.path.push(if legal { mv.0 } else { 0 });
        legal
    }

    fn take_back(&mut self) -> bool {
        self.path.pop().is_some()
    }

    fn is_valid(&self) -> bool {
        true
    }
}

impl WireMove for TreeMove {
    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.0);
        Ok(())
    }

    fn read_from(input: &mut &[u8]) -> Result<Self> {
        let (&value, rest) = input
            .split_first()
            .ok_or_else(|| Error::Protocol("truncated move".to_string()))?;
        *input = rest;
        Ok(TreeMove(value))
    }
}

impl WireState for TreeGame {
    fn encode_state(&self) -> Vec<u8> {
        let mut out = match self.shape {
            Shape::Random { seed, branching } => vec![0, seed, branching],
            Shape::SingleBranch => vec![1, 0, 0],
            Shape::TwoBranches => vec![2, 0, 0],
        };
        out.extend(self.key());
        out
    }

    fn decode_state(bytes: &[u8]) -> Result<Self> {
        let [tag, seed, branching, path @ ..] = bytes else {
            return Err(Error::InvalidState("short tree snapshot".to_string()));
        };
        let shape = match tag {
            0 => Shape::Random {
                seed: *seed,
                branching: *branching,
            },
            1 => Shape::SingleBranch,
            2 => Shape::TwoBranches,
            other => return Err(Error::InvalidState(format!("unknown tree {other}"))),
        };
        Ok(TreeGame {
            shape,
            path: path.to_vec(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TreeEval;

impl Evaluator<TreeGame> for TreeEval {
    fn calc_evaluation(&self, pos: &TreeGame) -> Score {
        pos.value()
    }
}

/// Best one-ply move and its score, first maximum wins.
pub fn one_ply_pick(pos: &TreeGame) -> (TreeMove, Score) {
    let mut pos = pos.clone();
    let mut best = (TreeMove::default(), Score::MIN);
    for &mv in pos.generate_moves().iter() {
        pos.play_move(mv);
        let score = -pos.value();
        pos.take_back();
        if score > best.1 {
            best = (mv, score);
        }
    }
    best
}

/// Strategy that never finishes on its own; it only returns once the
/// control hook asks it to stop.
pub struct Stall;

impl SearchStrategy<TreeGame> for Stall {
    fn name(&self) -> &'static str {
        "stall"
    }

    fn search(
        &mut self,
        _pos: &mut TreeGame,
        _eval: &dyn Evaluator<TreeGame>,
        _params: &SearchParams,
        control: &mut dyn SearchControl,
    ) -> std::result::Result<SearchResult<TreeMove>, Cancelled> {
        loop {
            if control.should_stop() {
                return Err(Cancelled { n_nodes: 0 });
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn set_callback(
        &mut self,
        _callback: Option<std::sync::Arc<SearchProgressCallback<TreeMove>>>,
    ) {
    }
}
