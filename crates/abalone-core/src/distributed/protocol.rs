//! Binary message layout exchanged between the coordinator and its workers.
//!
//! A frame is one tag byte followed by a fixed little-endian payload:
//!
//! | Tag | Message      | Payload |
//! |-----|--------------|---------|
//! | 1   | RequestWork  | none |
//! | 2   | JobData      | round u32, job u32, branch u32, alpha i32, beta i32, depth u32, scheme u8, first move, second move, state len u16, state bytes |
//! | 3   | NoWorkYet    | none |
//! | 4   | Result       | round u32, job u32, branch u32, reply move, score i32, cutoff u8, nodes u64 |
//! | 5   | BoundUpdate  | round u32, alpha i32 |
//! | 6   | Terminate    | none |
//! | 7   | TimeoutAbort | round u32 |
//!
//! Moves are encoded by [`WireMove`] and board snapshots by [`WireState`].

use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::board::{Board, MAX_STATE_LEN};
use crate::cell::{Cell, Direction};
use crate::error::{Error, Result};
use crate::moves::{Move, MoveKind};
use crate::types::{Depth, Score};

/// Largest board snapshot a `JobData` frame may carry.
pub const MAX_STATE_BYTES: usize = MAX_STATE_LEN;

const TAG_REQUEST_WORK: u8 = 1;
const TAG_JOB_DATA: u8 = 2;
const TAG_NO_WORK_YET: u8 = 3;
const TAG_RESULT: u8 = 4;
const TAG_BOUND_UPDATE: u8 = 5;
const TAG_TERMINATE: u8 = 6;
const TAG_TIMEOUT_ABORT: u8 = 7;

/// Fixed-width move encoding.
pub trait WireMove: Sized {
    fn write_to(&self, out: &mut Vec<u8>) -> Result<()>;
    fn read_from(input: &mut &[u8]) -> Result<Self>;
}

/// Board snapshot encoding used to ship positions to workers.
pub trait WireState: Sized {
    fn encode_state(&self) -> Vec<u8>;
    fn decode_state(bytes: &[u8]) -> Result<Self>;
}

impl WireMove for Move {
    fn write_to(&self, out: &mut Vec<u8>) -> Result<()> {
        out.write_i16::<LittleEndian>(self.origin.index() as i16)?;
        out.write_u8(self.direction as u8)?;
        out.write_u8(self.kind as u8)?;
        Ok(())
    }

    fn read_from(input: &mut &[u8]) -> Result<Self> {
        let origin = input.read_i16::<LittleEndian>().map_err(truncated)?;
        let direction = input.read_u8().map_err(truncated)?;
        let kind = input.read_u8().map_err(truncated)?;
        let origin = usize::try_from(origin)
            .ok()
            .and_then(Cell::from_index)
            .ok_or_else(|| Error::Protocol(format!("bad move origin {origin}")))?;
        let direction = Direction::from_u8(direction)
            .ok_or_else(|| Error::Protocol(format!("bad move direction {direction}")))?;
        let kind = MoveKind::from_u8(kind)
            .ok_or_else(|| Error::Protocol(format!("bad move kind {kind}")))?;
        Ok(Move::new(origin, direction, kind))
    }
}

impl WireState for Board {
    fn encode_state(&self) -> Vec<u8> {
        self.to_state_string().into_bytes()
    }

    fn decode_state(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::InvalidState(format!("snapshot is not UTF-8: {e}")))?;
        Board::from_state_str(text)
    }
}

/// One unit of work as shipped to a worker.
#[derive(Debug, Clone, PartialEq)]
pub struct JobData<M> {
    pub round: u32,
    pub job_id: u32,
    pub branch: u32,
    /// Best score of any closed branch, from the root player's view.
    pub alpha: Score,
    /// Current bound of the job's branch.
    pub beta: Score,
    pub depth: Depth,
    pub eval_scheme: u8,
    pub first: M,
    pub second: M,
    /// Root position snapshot, before either move.
    pub state: Vec<u8>,
}

/// Outcome of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult<M> {
    pub round: u32,
    pub job_id: u32,
    pub branch: u32,
    pub reply: M,
    /// Score from the root player's view.
    pub score: Score,
    /// Set when the job was cut short by a bound update; `score` is then the
    /// job's beta.
    pub cutoff: bool,
    pub nodes: u64,
}

/// A coordinator/worker message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message<M> {
    RequestWork,
    JobData(JobData<M>),
    NoWorkYet,
    Result(JobResult<M>),
    BoundUpdate { round: u32, alpha: Score },
    Terminate,
    TimeoutAbort { round: u32 },
}

impl<M> Message<M> {
    /// Short name used in log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Message::RequestWork => "RequestWork",
            Message::JobData(_) => "JobData",
            Message::NoWorkYet => "NoWorkYet",
            Message::Result(_) => "Result",
            Message::BoundUpdate { .. } => "BoundUpdate",
            Message::Terminate => "Terminate",
            Message::TimeoutAbort { .. } => "TimeoutAbort",
        }
    }
}

impl<M: WireMove> Message<M> {
    /// Serializes the message into a frame.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(16);
        match self {
            Message::RequestWork => out.write_u8(TAG_REQUEST_WORK)?,
            Message::JobData(job) => {
                if job.state.len() > MAX_STATE_BYTES {
                    return Err(Error::Protocol(format!(
                        "snapshot of {} bytes exceeds {MAX_STATE_BYTES}",
                        job.state.len()
                    )));
                }
                out.write_u8(TAG_JOB_DATA)?;
                out.write_u32::<LittleEndian>(job.round)?;
                out.write_u32::<LittleEndian>(job.job_id)?;
                out.write_u32::<LittleEndian>(job.branch)?;
                out.write_i32::<LittleEndian>(job.alpha)?;
                out.write_i32::<LittleEndian>(job.beta)?;
                out.write_u32::<LittleEndian>(job.depth)?;
                out.write_u8(job.eval_scheme)?;
                job.first.write_to(&mut out)?;
                job.second.write_to(&mut out)?;
                out.write_u16::<LittleEndian>(job.state.len() as u16)?;
                out.extend_from_slice(&job.state);
            }
            Message::NoWorkYet => out.write_u8(TAG_NO_WORK_YET)?,
            Message::Result(result) => {
                out.write_u8(TAG_RESULT)?;
                out.write_u32::<LittleEndian>(result.round)?;
                out.write_u32::<LittleEndian>(result.job_id)?;
                out.write_u32::<LittleEndian>(result.branch)?;
                result.reply.write_to(&mut out)?;
                out.write_i32::<LittleEndian>(result.score)?;
                out.write_u8(u8::from(result.cutoff))?;
                out.write_u64::<LittleEndian>(result.nodes)?;
            }
            Message::BoundUpdate { round, alpha } => {
                out.write_u8(TAG_BOUND_UPDATE)?;
                out.write_u32::<LittleEndian>(*round)?;
                out.write_i32::<LittleEndian>(*alpha)?;
            }
            Message::Terminate => out.write_u8(TAG_TERMINATE)?,
            Message::TimeoutAbort { round } => {
                out.write_u8(TAG_TIMEOUT_ABORT)?;
                out.write_u32::<LittleEndian>(*round)?;
            }
        }
        Ok(out)
    }

    /// Parses a frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for unknown tags, truncated payloads,
    /// out-of-range fields and trailing bytes.
    pub fn decode(frame: &[u8]) -> Result<Self> {
        let mut input = frame;
        let tag = input.read_u8().map_err(truncated)?;
        let message = match tag {
            TAG_REQUEST_WORK => Message::RequestWork,
            TAG_JOB_DATA => {
                let round = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let job_id = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let branch = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let alpha = input.read_i32::<LittleEndian>().map_err(truncated)?;
                let beta = input.read_i32::<LittleEndian>().map_err(truncated)?;
                let depth = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let eval_scheme = input.read_u8().map_err(truncated)?;
                let first = M::read_from(&mut input)?;
                let second = M::read_from(&mut input)?;
                let len = input.read_u16::<LittleEndian>().map_err(truncated)? as usize;
                if len > MAX_STATE_BYTES {
                    return Err(Error::Protocol(format!("snapshot length {len} too large")));
                }
                let mut state = vec![0; len];
                input.read_exact(&mut state).map_err(truncated)?;
                Message::JobData(JobData {
                    round,
                    job_id,
                    branch,
                    alpha,
                    beta,
                    depth,
                    eval_scheme,
                    first,
                    second,
                    state,
                })
            }
            TAG_NO_WORK_YET => Message::NoWorkYet,
            TAG_RESULT => {
                let round = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let job_id = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let branch = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let reply = M::read_from(&mut input)?;
                let score = input.read_i32::<LittleEndian>().map_err(truncated)?;
                let cutoff = match input.read_u8().map_err(truncated)? {
                    0 => false,
                    1 => true,
                    other => return Err(Error::Protocol(format!("bad cutoff flag {other}"))),
                };
                let nodes = input.read_u64::<LittleEndian>().map_err(truncated)?;
                Message::Result(JobResult {
                    round,
                    job_id,
                    branch,
                    reply,
                    score,
                    cutoff,
                    nodes,
                })
            }
            TAG_BOUND_UPDATE => {
                let round = input.read_u32::<LittleEndian>().map_err(truncated)?;
                let alpha = input.read_i32::<LittleEndian>().map_err(truncated)?;
                Message::BoundUpdate { round, alpha }
            }
            TAG_TERMINATE => Message::Terminate,
            TAG_TIMEOUT_ABORT => {
                let round = input.read_u32::<LittleEndian>().map_err(truncated)?;
                Message::TimeoutAbort { round }
            }
            other => return Err(Error::Protocol(format!("unknown tag {other}"))),
        };
        if !input.is_empty() {
            return Err(Error::Protocol(format!(
                "{} trailing bytes after tag {tag}",
                input.len()
            )));
        }
        Ok(message)
    }
}

fn truncated(err: io::Error) -> Error {
    Error::Protocol(format!("truncated frame: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> JobData<Move> {
        let board = Board::new();
        let moves = board.generate_moves();
        JobData {
            round: 3,
            job_id: 17,
            branch: 2,
            alpha: -250,
            beta: 1_000_000,
            depth: 4,
            eval_scheme: 1,
            first: moves.get(0).unwrap(),
            second: moves.get(1).unwrap(),
            state: board.encode_state(),
        }
    }

    #[test]
    fn test_job_data_layout() {
        let frame = Message::JobData(sample_job()).encode().unwrap();
        assert_eq!(frame[0], TAG_JOB_DATA);
        let state_len = Board::new().encode_state().len();
        // tag + six u32/i32 fields + scheme + two moves + length + snapshot
        assert_eq!(frame.len(), 1 + 24 + 1 + 8 + 2 + state_len);
        assert_eq!(&frame[1..5], &3u32.to_le_bytes());
        assert_eq!(
            Message::<Move>::decode(&frame).unwrap(),
            Message::JobData(sample_job())
        );
    }

    #[test]
    fn test_snapshot_restores_board() {
        let job = sample_job();
        assert_eq!(Board::decode_state(&job.state).unwrap(), Board::new());
    }

    #[test]
    fn test_rejects_malformed_frames() {
        assert!(matches!(
            Message::<Move>::decode(&[]),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            Message::<Move>::decode(&[99]),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            Message::<Move>::decode(&[TAG_TERMINATE, 0]),
            Err(Error::Protocol(_))
        ));
        let frame = Message::JobData(sample_job()).encode().unwrap();
        assert!(Message::<Move>::decode(&frame[..frame.len() - 1]).is_err());

        let mut bad_move = vec![TAG_RESULT];
        bad_move.extend_from_slice(&[0; 12]);
        bad_move.extend_from_slice(&[60, 0, 9, 1]);
        bad_move.extend_from_slice(&[0; 13]);
        assert!(matches!(
            Message::<Move>::decode(&bad_move),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_control_messages() {
        for message in [
            Message::<Move>::RequestWork,
            Message::NoWorkYet,
            Message::Terminate,
            Message::BoundUpdate {
                round: 9,
                alpha: -17,
            },
            Message::TimeoutAbort { round: 9 },
        ] {
            let frame = message.encode().unwrap();
            assert_eq!(Message::<Move>::decode(&frame).unwrap(), message);
        }
        assert_eq!(
            Message::<Move>::BoundUpdate { round: 1, alpha: 2 }
                .encode()
                .unwrap()
                .len(),
            9
        );
        assert_eq!(Message::<Move>::Terminate.name(), "Terminate");
    }

    #[test]
    fn test_oversized_snapshot_is_refused() {
        let mut job = sample_job();
        job.state = vec![b'.'; MAX_STATE_BYTES + 1];
        assert!(Message::JobData(job).encode().is_err());
    }
}
