pub mod board;
pub mod cell;
pub mod color;
pub mod distributed;
pub mod error;
pub mod eval;
pub mod moves;
pub mod options;
pub mod perft;
pub mod player;
pub mod search;
pub mod time_control;
pub mod types;
