//! Optimistic move submission.
//!
//! A locally-initiated move is validated synchronously, predicted through
//! the rules oracle, shown immediately, and only then confirmed by the
//! server. All of that state lives in a single [`PendingMove`] slot with
//! one explicit confirm/rollback transition, so server races can be
//! simulated deterministically in tests.
//!
//! The canonical record is always the rollback target — never a locally
//! reconstructed "previous" position.

use tracing::debug;

use crate::error::LiveboardError;
use crate::game_record::{Color, Fen, GameRecord, San};
use crate::oracle::{MoveApplication, RulesOracle};

/// A submitted move held until the server confirms or rejects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMove {
    /// The submitted notation.
    pub notation: San,
    /// The oracle-predicted resulting position, displayed optimistically.
    pub predicted_position: Fen,
    /// The canonical position at submission time, kept for diagnostics.
    pub position_before: Fen,
    /// The canonical move-list length at which the confirmation must land.
    pub expected_len: usize,
}

/// How a pending move was resolved against the canonical record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The authoritative update reflects the predicted move and position;
    /// nothing visibly changes.
    Confirmed {
        /// The confirmed notation.
        notation: San,
    },
    /// The authoritative record went another way (different move, or a
    /// resulting position the prediction did not match). The prediction is
    /// discarded and the display reverts to the canonical record.
    RolledBack {
        /// The discarded notation.
        notation: San,
    },
}

/// Accepts locally-initiated moves and reconciles them against the
/// canonical record. At most one move may be outstanding at a time.
#[derive(Debug, Default)]
pub struct OptimisticMoveController {
    pending: Option<PendingMove>,
}

impl OptimisticMoveController {
    /// Creates a controller with an empty pending slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The outstanding move, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&PendingMove> {
        self.pending.as_ref()
    }

    /// The position to display while a move is outstanding.
    #[must_use]
    pub fn predicted_position(&self) -> Option<&Fen> {
        self.pending.as_ref().map(|p| &p.predicted_position)
    }

    /// Validates a submission and computes its prediction. Everything here
    /// is synchronous and rejects without contacting the server:
    /// an occupied pending slot, a game that is not active, a turn that is
    /// not the local player's (derived from the record's active color,
    /// never from UI state), and oracle verdicts.
    ///
    /// Nothing is recorded yet — the caller sends the move first and then
    /// [`commit`]s, so a failed send leaves no state behind.
    ///
    /// [`commit`]: Self::commit
    pub fn prepare(
        &self,
        record: &GameRecord,
        local_color: Color,
        notation: &San,
        oracle: &dyn RulesOracle,
    ) -> Result<PendingMove, LiveboardError> {
        if let Some(pending) = &self.pending {
            return Err(LiveboardError::MoveAlreadyPending {
                pending: pending.notation.clone(),
            });
        }
        if !record.is_active() {
            return Err(LiveboardError::GameNotActive {
                status: record.status,
            });
        }
        if record.active_color != Some(local_color) {
            return Err(LiveboardError::NotYourTurn);
        }
        match oracle.apply(&record.position, notation) {
            MoveApplication::Illegal => Err(LiveboardError::IllegalMove {
                notation: notation.clone(),
            }),
            MoveApplication::PromotionRequired => Err(LiveboardError::PromotionRequired {
                notation: notation.clone(),
            }),
            MoveApplication::Applied(predicted) => Ok(PendingMove {
                notation: notation.clone(),
                predicted_position: predicted,
                position_before: record.position.clone(),
                expected_len: record.move_count() + 1,
            }),
        }
    }

    /// Records a prepared move as outstanding, after it was sent.
    pub fn commit(&mut self, pending: PendingMove) {
        debug!(notation = %pending.notation, "move sent, awaiting confirmation");
        self.pending = Some(pending);
    }

    /// Resolves the pending move against a canonical record that just
    /// changed. Returns `None` while there is nothing to resolve — either
    /// no move is outstanding or the record has not yet reached the
    /// expected length (e.g. a stale snapshot was installed).
    pub fn reconcile(&mut self, record: &GameRecord) -> Option<Resolution> {
        let pending = self.pending.take()?;
        if record.move_count() < pending.expected_len {
            self.pending = Some(pending);
            return None;
        }
        let move_matches =
            record.moves.get(pending.expected_len - 1) == Some(&pending.notation);
        // At exactly the expected length the authoritative position must
        // also agree with the prediction; past it, later moves have
        // changed the board and the move identity alone decides.
        let confirmed = move_matches
            && (record.move_count() > pending.expected_len
                || record.position == pending.predicted_position);
        if confirmed {
            Some(Resolution::Confirmed {
                notation: pending.notation,
            })
        } else {
            debug!(notation = %pending.notation, "authoritative record went another way");
            Some(Resolution::RolledBack {
                notation: pending.notation,
            })
        }
    }

    /// Discards the pending move after a server-side rejection notice.
    /// The display reverts to whatever the reconciler holds as canonical.
    pub fn reject(&mut self) -> Option<PendingMove> {
        self.pending.take()
    }
}

// #########
// # TESTS #
// #########
