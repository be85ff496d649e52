//! Historical move navigation.
//!
//! The navigator derives a board position for any ply index by replaying
//! the canonical move list through the rules oracle, independent of
//! whether the user is viewing the live position or a past one. It never
//! stores a position: recomputing on every call is what makes it
//! impossible for a historical view to drift away from the canonical
//! record.

use crate::error::LiveboardError;
use crate::game_record::{Fen, GameRecord, Ply};
use crate::oracle::{MoveApplication, RulesOracle};

/// Where the user is looking in the game's history.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum NavigationCursor {
    /// Track the tail of the move list as it grows. The only cursor at
    /// which interactive input is permitted.
    #[default]
    Live,
    /// A fixed half-move index, clamped to the move list when resolved.
    AtPly(Ply),
}

/// Derives displayed positions from the canonical record and a cursor.
#[derive(Debug, Default)]
pub struct MoveHistoryNavigator {
    cursor: NavigationCursor,
}

impl MoveHistoryNavigator {
    /// Creates a navigator at the live cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The current cursor.
    #[must_use]
    pub fn cursor(&self) -> NavigationCursor {
        self.cursor
    }

    /// Moves the cursor. An out-of-range `AtPly` is kept as-is and clamps
    /// to the last ply whenever it is resolved against the record.
    pub fn set_cursor(&mut self, cursor: NavigationCursor) {
        self.cursor = cursor;
    }

    /// Whether the cursor tracks the live position.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.cursor == NavigationCursor::Live
    }

    /// The position at the cursor.
    ///
    /// `Live` — and any `AtPly` that clamps to the tail — returns the
    /// canonical position itself (the record's own value wins over a
    /// replay by the snapshot-wins rule). A strictly historical cursor
    /// replays `moves[0..=ply]` from the starting position through the
    /// oracle, freshly on every call.
    pub fn position(
        &self,
        record: &GameRecord,
        oracle: &dyn RulesOracle,
    ) -> Result<Fen, LiveboardError> {
        let take = match self.cursor {
            NavigationCursor::Live => record.moves.len(),
            NavigationCursor::AtPly(ply) => record
                .moves
                .len()
                .min(ply.as_usize().saturating_add(1)),
        };
        if take == record.moves.len() {
            return Ok(record.position.clone());
        }

        let mut position = Fen::starting();
        for notation in &record.moves[..take] {
            match oracle.apply(&position, notation) {
                MoveApplication::Applied(next) => position = next,
                MoveApplication::PromotionRequired | MoveApplication::Illegal => {
                    return Err(LiveboardError::MalformedPosition {
                        context: format!("canonical move {notation} does not replay"),
                    });
                }
            }
        }
        Ok(position)
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::game_record::{GameId, GameStatus, San};

    /// Replay stub: resulting position is `start` plus each move appended.
    struct ConcatOracle;

    impl RulesOracle for ConcatOracle {
        fn legal_moves(&self, _position: &Fen) -> Vec<San> {
            Vec::new()
        }

        fn apply(&self, position: &Fen, notation: &San) -> MoveApplication {
            MoveApplication::Applied(Fen::new(format!("{}/{}", position, notation)))
        }
    }

    fn record_with_moves(moves: &[&str]) -> GameRecord {
        let mut record = GameRecord::initial(GameId::from("g1"));
        record.status = GameStatus::Active;
        record.moves = moves.iter().map(|m| San::from(*m)).collect();
        record.position = Fen::from("canonical-tail");
        record
    }

    fn replayed(moves: &[&str]) -> Fen {
        let mut fen = String::from(crate::game_record::STARTING_POSITION);
        for mv in moves {
            fen = format!("{}/{}", fen, mv);
        }
        Fen::new(fen)
    }

    #[test]
    fn live_cursor_returns_the_canonical_position() {
        let navigator = MoveHistoryNavigator::new();
        let record = record_with_moves(&["e2e4", "e7e5"]);
        let position = navigator.position(&record, &ConcatOracle).unwrap();
        assert_eq!(position, Fen::from("canonical-tail"));
    }

    #[test]
    fn at_ply_zero_shows_the_position_after_the_first_move_only() {
        let mut navigator = MoveHistoryNavigator::new();
        navigator.set_cursor(NavigationCursor::AtPly(Ply::new(0)));
        let record = record_with_moves(&["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"]);
        let position = navigator.position(&record, &ConcatOracle).unwrap();
        assert_eq!(position, replayed(&["e2e4"]));
    }

    #[test]
    fn out_of_range_ply_clamps_to_the_tail() {
        let mut navigator = MoveHistoryNavigator::new();
        navigator.set_cursor(NavigationCursor::AtPly(Ply::new(99)));
        let record = record_with_moves(&["e2e4", "e7e5"]);
        // Clamped to the tail, which is the canonical position.
        let position = navigator.position(&record, &ConcatOracle).unwrap();
        assert_eq!(position, Fen::from("canonical-tail"));
        assert!(!navigator.is_live());
    }

    #[test]
    fn live_tracks_list_growth_without_resetting() {
        let navigator = MoveHistoryNavigator::new();
        let mut record = record_with_moves(&["e2e4"]);
        let _ = navigator.position(&record, &ConcatOracle).unwrap();

        record.moves.push(San::from("e7e5"));
        record.position = Fen::from("canonical-tail-2");
        let position = navigator.position(&record, &ConcatOracle).unwrap();
        assert_eq!(position, Fen::from("canonical-tail-2"));
    }

    #[test]
    fn empty_record_yields_the_canonical_initial_position() {
        let mut navigator = MoveHistoryNavigator::new();
        navigator.set_cursor(NavigationCursor::AtPly(Ply::new(0)));
        let record = GameRecord::initial(GameId::from("g1"));
        let position = navigator.position(&record, &ConcatOracle).unwrap();
        assert_eq!(position, Fen::starting());
    }

    #[test]
    fn unreplayable_canonical_move_is_reported() {
        struct RefusingOracle;
        impl RulesOracle for RefusingOracle {
            fn legal_moves(&self, _position: &Fen) -> Vec<San> {
                Vec::new()
            }
            fn apply(&self, _position: &Fen, _notation: &San) -> MoveApplication {
                MoveApplication::Illegal
            }
        }

        let mut navigator = MoveHistoryNavigator::new();
        navigator.set_cursor(NavigationCursor::AtPly(Ply::new(0)));
        let record = record_with_moves(&["e2e4", "e7e5"]);
        let result = navigator.position(&record, &RefusingOracle);
        assert!(matches!(
            result,
            Err(LiveboardError::MalformedPosition { .. })
        ));
    }
}
