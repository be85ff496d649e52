//! Rules oracle backed by the [`chess`] crate.
//!
//! Only compiled with the `chess-rules` feature. The adapter translates
//! between the engine's string-typed positions/moves and the `chess`
//! crate's board types; it adds nothing of its own beyond detecting the
//! promotion-required case, which the underlying crate reports only as
//! "illegal".

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece};

use crate::game_record::{Fen, San};
use crate::oracle::{MoveApplication, RulesOracle};

/// A [`RulesOracle`] implementation delegating to the `chess` crate.
///
/// Stateless; construct once and share.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChessRules;

impl ChessRules {
    /// Creates the oracle.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn parse_board(position: &Fen) -> Option<Board> {
    Board::from_str(position.as_str()).ok()
}

/// Whether moving whatever sits on `mv`'s source square would be a pawn
/// reaching the last rank, i.e. a move that must name a promotion piece.
fn requires_promotion(board: &Board, mv: ChessMove) -> bool {
    match board.piece_on(mv.get_source()) {
        Some(Piece::Pawn) => {
            let last_rank = match board.side_to_move() {
                chess::Color::White => 7,
                chess::Color::Black => 0,
            };
            mv.get_dest().get_rank().to_index() == last_rank
        }
        _ => false,
    }
}

impl RulesOracle for ChessRules {
    fn legal_moves(&self, position: &Fen) -> Vec<San> {
        let Some(board) = parse_board(position) else {
            return Vec::new();
        };
        if board.status() != BoardStatus::Ongoing {
            return Vec::new();
        }
        MoveGen::new_legal(&board)
            .map(|mv| San::new(mv.to_string()))
            .collect()
    }

    fn apply(&self, position: &Fen, notation: &San) -> MoveApplication {
        let Some(board) = parse_board(position) else {
            return MoveApplication::Illegal;
        };
        let Ok(mv) = ChessMove::from_str(notation.as_str()) else {
            return MoveApplication::Illegal;
        };
        if mv.get_promotion().is_none() && requires_promotion(&board, mv) {
            // The bare push may still be flatly illegal (e.g. blocked); only
            // report PromotionRequired when some promotion of it is legal.
            let promotes = MoveGen::new_legal(&board).any(|legal| {
                legal.get_source() == mv.get_source()
                    && legal.get_dest() == mv.get_dest()
                    && legal.get_promotion().is_some()
            });
            return if promotes {
                MoveApplication::PromotionRequired
            } else {
                MoveApplication::Illegal
            };
        }
        if !MoveGen::new_legal(&board).any(|legal| legal == mv) {
            return MoveApplication::Illegal;
        }
        let next = board.make_move_new(mv);
        MoveApplication::Applied(Fen::new(next.to_string()))
    }
}
