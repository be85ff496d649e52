//! The seam to the move-legality rules.
//!
//! The synchronization engine never implements chess rules itself. Every
//! legality question and every position derivation goes through a
//! [`RulesOracle`]: a pure, synchronous collaborator that, given a position
//! and a candidate move, reports whether it is legal and what position
//! results. The engine treats the oracle as authoritative for immediate
//! legality only; the server record always wins on conflict, and
//! end-of-game conditions are never inferred locally.
//!
//! A production adapter over the `chess` crate ships behind the
//! `chess-rules` feature; tests inject table-driven fakes.

#[cfg(feature = "chess-rules")]
pub mod chess_rules;

use crate::game_record::{Fen, San};

/// Result of asking the oracle to apply one move to a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveApplication {
    /// The move is legal; this is the resulting position.
    Applied(Fen),
    /// The move is a legal pawn push to the last rank but does not name a
    /// promotion piece. The caller must re-submit with the piece appended.
    PromotionRequired,
    /// The move is not legal in the given position (or the position itself
    /// could not be interpreted).
    Illegal,
}

/// External, stateless component that validates moves and computes
/// resulting positions. Pure and synchronous: no I/O, no interior state.
///
/// Implementations must be deterministic — the reconciler replays the
/// canonical move list through [`apply`] to detect divergence from the
/// server, and the history navigator re-derives past positions on every
/// read.
///
/// [`apply`]: RulesOracle::apply
pub trait RulesOracle {
    /// Returns every legal move in `position`.
    ///
    /// The result may be cached by callers between authoritative updates;
    /// it is recomputed after every record change.
    fn legal_moves(&self, position: &Fen) -> Vec<San>;

    /// Applies `notation` to `position`.
    fn apply(&self, position: &Fen, notation: &San) -> MoveApplication;
}
