use crate::board::Board;

/// Executes a perft run starting from the standard initial position.
///
/// # Arguments
///
/// * `depth` - Number of plies to expand from the initial position. A depth of
///   `1` counts the immediate legal moves; larger values walk the tree
///   recursively.
///
/// # Returns
///
/// The number of leaf positions at `depth`.
pub fn perft_root(depth: u32) -> u64 {
    let mut board = Board::new();
    perft(&mut board, depth)
}

/// Counts the leaf positions `depth` plies below `board`. The board is
/// restored before returning.
pub fn perft(board: &mut Board, depth: u32) -> u64 {
    if depth == 0 {
        return 1;
    }
    let moves = board.generate_moves();
    if depth == 1 {
        return moves.count() as u64;
    }
    let mut nodes = 0;
    for &mv in moves.iter() {
        board.play_move(mv);
        nodes += perft(board, depth - 1);
        board.take_back();
    }
    nodes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shallow_counts() {
        assert_eq!(perft_root(0), 1);
        assert_eq!(perft_root(1), 44);
    }

    #[test]
    fn test_board_is_restored() {
        let mut board = Board::new();
        perft(&mut board, 2);
        assert_eq!(board, Board::new());
        assert_eq!(board.history_len(), 0);
    }
}
