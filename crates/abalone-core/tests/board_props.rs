use abalone_core::board::{Board, Slot};
use abalone_core::cell::Cell;
use abalone_core::color::Color;
use abalone_core::distributed::protocol::WireState;
use proptest::prelude::*;

proptest! {
    #[test]
    fn test_random_games_unwind(picks in prop::collection::vec(any::<u16>(), 0..60)) {
        let mut board = Board::new();
        let mut snapshots = vec![board.clone()];
        for pick in picks {
            if !board.is_valid() {
                break;
            }
            let moves = board.generate_moves();
            if moves.is_empty() {
                break;
            }
            let mv = moves.get(usize::from(pick) % moves.count()).unwrap();
            prop_assert!(board.play_move(mv));
            snapshots.push(board.clone());
        }
        while let Some(expected) = snapshots.pop() {
            prop_assert_eq!(&board, &expected);
            if !snapshots.is_empty() {
                prop_assert!(board.take_back());
            }
        }
        prop_assert_eq!(board, Board::new());
    }

    #[test]
    fn test_snapshots_restore_positions(picks in prop::collection::vec(any::<u16>(), 0..30)) {
        let mut board = Board::new();
        for pick in picks {
            let moves = board.generate_moves();
            if moves.is_empty() || !board.is_valid() {
                break;
            }
            board.play_move(moves.get(usize::from(pick) % moves.count()).unwrap());
        }
        let restored = Board::decode_state(&board.encode_state()).unwrap();
        prop_assert_eq!(&restored, &board);
        prop_assert_eq!(restored.generate_moves().count(), board.generate_moves().count());
    }

    #[test]
    fn test_marbles_are_conserved(picks in prop::collection::vec(any::<u16>(), 0..60)) {
        let mut board = Board::new();
        for pick in picks {
            let moves = board.generate_moves();
            if moves.is_empty() || !board.is_valid() {
                break;
            }
            board.play_move(moves.get(usize::from(pick) % moves.count()).unwrap());
            let on_board = Cell::playable()
                .filter(|&cell| matches!(board.slot(cell), Slot::Marble(_)))
                .count();
            let counted =
                usize::from(board.marbles(Color::One)) + usize::from(board.marbles(Color::Two));
            prop_assert_eq!(on_board, counted);
        }
    }
}
