//! The canonical owner of "current known game record".
//!
//! The [`GameStateReconciler`] is the only writer of the [`GameRecord`];
//! it merges full snapshots and incremental push messages into it,
//! enforcing ordering and idempotence with the move-list length rule:
//!
//! - claimed length `<=` canonical length: duplicate or stale, discarded
//!   (except no-move status advances, see [`ApplyOutcome::StatusAdvanced`]);
//! - claimed length `==` canonical length `+ 1`: applied by appending the
//!   move and adopting the server's position and clocks;
//! - anything further ahead: a gap — nothing is mutated and the caller
//!   requests a full snapshot.
//!
//! This rule, not locking, is what serializes the three independent
//! triggers (push stream, periodic re-poll, user submissions) onto one
//! sequential application path.
//!
//! Readers never touch the record directly: they hold a [`RecordCell`]
//! and take consistent snapshots on demand.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::game_record::{Color, GameRecord, GameStatus, Ply};
use crate::network::messages::{Snapshot, Update};
use crate::oracle::{MoveApplication, RulesOracle};

/// A shared handle to the canonical record.
///
/// Wraps the record in an `Arc<Mutex>` so any number of readers (the UI,
/// the clock renderer, tests) can take consistent snapshots while the
/// reconciler remains the sole writer. Clones share the same underlying
/// record.
pub struct RecordCell(Arc<Mutex<GameRecord>>);

impl RecordCell {
    pub(crate) fn new(record: GameRecord) -> Self {
        Self(Arc::new(Mutex::new(record)))
    }

    /// Returns a consistent clone of the current record.
    #[must_use]
    pub fn snapshot(&self) -> GameRecord {
        self.0.lock().clone()
    }

    /// Runs `f` against the current record without cloning it.
    pub fn read<R>(&self, f: impl FnOnce(&GameRecord) -> R) -> R {
        f(&self.0.lock())
    }

    /// Writer access, reserved for the reconciler.
    fn write<R>(&self, f: impl FnOnce(&mut GameRecord) -> R) -> R {
        f(&mut self.0.lock())
    }
}

impl Clone for RecordCell {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl std::fmt::Debug for RecordCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.lock();
        f.debug_struct("RecordCell")
            .field("id", &inner.id)
            .field("status", &inner.status)
            .field("moves", &inner.moves.len())
            .finish_non_exhaustive()
    }
}

/// What happened when a message was merged into the canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A full snapshot replaced the record wholesale.
    SnapshotInstalled,
    /// An incremental appended exactly one move. `diverged` is set when
    /// the locally replayed position disagreed with the server's — the
    /// server value was adopted and the caller should request a resync.
    MoveApplied {
        /// Index of the appended half-move.
        ply: Ply,
        /// Whether local replay disagreed with the server position.
        diverged: bool,
    },
    /// A no-move status change was applied: an explicit start signal
    /// (pending to active) or a terminal update that appends nothing
    /// (resignation, timeout, draw agreement).
    StatusAdvanced,
    /// The update was a duplicate or older than the canonical record.
    /// Nothing changed; logged only.
    StaleDiscarded,
    /// The update claims a move-list length more than one ahead of the
    /// canonical record. Nothing was mutated; the caller requests a full
    /// snapshot.
    GapDetected {
        /// Canonical length at the time of the update.
        canonical_len: usize,
        /// Length the update claimed.
        claimed_len: usize,
    },
    /// The record is finished; later incrementals are discarded.
    FinishedDiscarded,
    /// The update carried neither a move list nor a length and cannot be
    /// ordered. Dropped like a malformed message.
    MissingLength,
}

impl ApplyOutcome {
    /// Whether this outcome calls for a full snapshot request.
    #[must_use]
    pub fn needs_resync(self) -> bool {
        matches!(
            self,
            ApplyOutcome::GapDetected { .. } | ApplyOutcome::MoveApplied { diverged: true, .. }
        )
    }

    /// Whether the canonical record changed.
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(
            self,
            ApplyOutcome::SnapshotInstalled
                | ApplyOutcome::MoveApplied { .. }
                | ApplyOutcome::StatusAdvanced
        )
    }
}

/// Sole writer of the canonical [`GameRecord`].
pub struct GameStateReconciler {
    cell: RecordCell,
}

impl GameStateReconciler {
    /// Creates a reconciler owning `record` as the canonical state.
    #[must_use]
    pub fn new(record: GameRecord) -> Self {
        Self {
            cell: RecordCell::new(record),
        }
    }

    /// A read handle to the canonical record. Clones are cheap and all
    /// observe the reconciler's writes.
    #[must_use]
    pub fn cell(&self) -> RecordCell {
        self.cell.clone()
    }

    /// A consistent clone of the canonical record.
    #[must_use]
    pub fn record(&self) -> GameRecord {
        self.cell.snapshot()
    }

    /// Replaces the canonical record wholesale from a full snapshot.
    ///
    /// Used after reconnection, on gaps, and whenever an incremental's
    /// derived position disagreed with local replay. Snapshots are
    /// authoritative: a move list shorter than the canonical one is
    /// installed as-is (and logged), since the append-only invariant
    /// governs incrementals only.
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) -> ApplyOutcome {
        self.cell.write(|record| {
            if record.id != snapshot.game_id {
                warn!(
                    expected = %record.id,
                    got = %snapshot.game_id,
                    "discarding snapshot for a different game"
                );
                return ApplyOutcome::StaleDiscarded;
            }
            if snapshot.move_list.len() < record.moves.len() {
                warn!(
                    canonical = record.moves.len(),
                    snapshot = snapshot.move_list.len(),
                    "authoritative snapshot shrank the move list"
                );
            }
            record.status = snapshot.status;
            record.position = snapshot.position.clone();
            record.moves = snapshot.move_list.clone();
            record.outcome = snapshot.result;
            record.end_reason = snapshot.reason;
            record.white_time_ms = snapshot.white_time_left_ms;
            record.black_time_ms = snapshot.black_time_left_ms;
            record.clock_timestamp_ms = snapshot.server_timestamp;
            record.active_color = if record.status == GameStatus::Active {
                snapshot.active_color
            } else {
                None
            };
            debug!(
                game_id = %record.id,
                moves = record.moves.len(),
                status = ?record.status,
                "snapshot installed"
            );
            ApplyOutcome::SnapshotInstalled
        })
    }

    /// Merges an incremental move/clock/status delta into the canonical
    /// record under the length ordering rule.
    ///
    /// The `oracle` is used purely as a divergence detector: the appended
    /// move is replayed locally and compared against the server's
    /// resulting position. On disagreement the server position wins and
    /// the outcome asks for a resync.
    pub fn apply_incremental(
        &mut self,
        update: &Update,
        oracle: &dyn RulesOracle,
    ) -> ApplyOutcome {
        self.cell.write(|record| {
            if record.status == GameStatus::Finished {
                trace!("discarding incremental for a finished game");
                return ApplyOutcome::FinishedDiscarded;
            }
            let Some(claimed_len) = update.claimed_len() else {
                warn!("discarding incremental with neither move list nor length");
                return ApplyOutcome::MissingLength;
            };
            let canonical_len = record.moves.len();

            if claimed_len == canonical_len {
                let starts = record.status == GameStatus::Pending
                    && update.status == Some(GameStatus::Active);
                if update.is_terminal() || starts {
                    Self::adopt_no_move_change(record, update);
                    return ApplyOutcome::StatusAdvanced;
                }
                trace!(claimed_len, "discarding duplicate update");
                return ApplyOutcome::StaleDiscarded;
            }
            if claimed_len < canonical_len {
                trace!(claimed_len, canonical_len, "discarding stale update");
                return ApplyOutcome::StaleDiscarded;
            }
            if claimed_len > canonical_len + 1 {
                debug!(
                    claimed_len,
                    canonical_len, "gap detected, full snapshot needed"
                );
                return ApplyOutcome::GapDetected {
                    canonical_len,
                    claimed_len,
                };
            }

            // Exactly one ahead: append.
            let Some(appended) = update.appended_move().cloned() else {
                warn!("discarding incremental that claims a new move but names none");
                return ApplyOutcome::MissingLength;
            };

            let diverged = match oracle.apply(&record.position, &appended) {
                MoveApplication::Applied(replayed) => replayed != update.position,
                MoveApplication::PromotionRequired | MoveApplication::Illegal => true,
            };
            if diverged {
                debug!(
                    %appended,
                    "local replay disagreed with server position; adopting server value"
                );
            }

            match &update.move_list {
                Some(list) => record.moves = list.clone(),
                None => record.moves.push(appended),
            }
            record.position = update.position.clone();
            Self::adopt_status_and_clocks(record, update);

            ApplyOutcome::MoveApplied {
                ply: Ply::new(canonical_len as u32),
                diverged,
            }
        })
    }

    /// Applies a start signal or a terminal update that appends no move.
    fn adopt_no_move_change(record: &mut GameRecord, update: &Update) {
        record.position = update.position.clone();
        Self::adopt_status_and_clocks(record, update);
    }

    fn adopt_status_and_clocks(record: &mut GameRecord, update: &Update) {
        if let Some(status) = update.status {
            record.status = status;
        } else if record.status == GameStatus::Pending {
            // The first accepted move starts the game.
            record.status = GameStatus::Active;
        }
        if update.is_terminal() {
            record.status = GameStatus::Finished;
            record.outcome = update.result;
            record.end_reason = update.reason;
        }
        if let Some(white) = update.white_time_left_ms {
            record.white_time_ms = white;
        }
        if let Some(black) = update.black_time_left_ms {
            record.black_time_ms = black;
        }
        record.clock_timestamp_ms = update.server_timestamp;
        record.active_color = if record.status == GameStatus::Active {
            // Fall back on move parity when the server omits the field:
            // with an even number of half-moves it is white to move.
            update.active_color.or(Some(if record.moves.len() % 2 == 0 {
                Color::White
            } else {
                Color::Black
            }))
        } else {
            None
        };
    }
}

// #########
// # TESTS #
// #########
