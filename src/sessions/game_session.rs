use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use web_time::{Duration, Instant};

use crate::clock::{ClockEngine, ClockReading};
use crate::error::LiveboardError;
use crate::game_record::{Color, Fen, GameRecord, San};
use crate::history::{MoveHistoryNavigator, NavigationCursor};
use crate::network::connection::{ConnectionManager, ConnectionState, LinkEvent};
use crate::network::messages::{ClientMessage, ServerMessage, Update};
use crate::optimistic::{OptimisticMoveController, Resolution};
use crate::oracle::RulesOracle;
use crate::reconciler::{ApplyOutcome, GameStateReconciler, RecordCell};
use crate::sessions::config::PollConfig;
use crate::sessions::event_drain::EventDrain;
use crate::{LiveboardEvent, ResyncReason};

/// Maximum number of events to queue before oldest are dropped.
///
/// This prevents unbounded memory growth if events aren't being consumed.
const MAX_EVENT_QUEUE_SIZE: usize = 100;

/// A `GameSession` ties the synchronization engine together for one game:
/// it owns the connection, the canonical record, the clock prediction, the
/// single optimistic-move slot and the history cursor, and funnels all
/// three update triggers (push stream, periodic re-poll, user submissions)
/// through one sequential application path.
///
/// Drive it by calling [`poll`] regularly (each UI tick is plenty) and
/// draining [`events`]; read the board through [`displayed_position`] and
/// the clocks through [`clock_reading`], re-reading at the cadence
/// [`next_clock_refresh_in`] suggests.
///
/// [`poll`]: GameSession::poll
/// [`events`]: GameSession::events
/// [`displayed_position`]: GameSession::displayed_position
/// [`clock_reading`]: GameSession::clock_reading
/// [`next_clock_refresh_in`]: GameSession::next_clock_refresh_in
pub struct GameSession {
    /// Sole writer of the canonical record.
    reconciler: GameStateReconciler,
    /// Remaining-time prediction between authoritative updates.
    clock: ClockEngine,
    /// The persistent duplex link and its reconnection state machine.
    connection: ConnectionManager,
    /// The single pending-move slot.
    controller: OptimisticMoveController,
    /// Live/historical cursor.
    navigator: MoveHistoryNavigator,
    /// The rules collaborator; never consulted for end-of-game conditions.
    oracle: Arc<dyn RulesOracle>,
    /// Which side this client plays.
    local_color: Color,
    poll_config: PollConfig,
    /// Contains all events to be forwarded to the user.
    event_queue: VecDeque<LiveboardEvent>,
    /// Cached legal moves for the current canonical position; dropped on
    /// every successful apply.
    legal_moves_cache: Option<Vec<San>>,
    /// When the last snapshot request went out, for re-poll pacing.
    last_snapshot_request: Option<Instant>,
    /// One authoritative fetch per timeout suspicion; re-armed on sync.
    timeout_suspicion_sent: bool,
    /// The terminal event fires exactly once.
    finished_announced: bool,
}

impl GameSession {
    pub(crate) fn new(
        connection: ConnectionManager,
        record: GameRecord,
        oracle: Arc<dyn RulesOracle>,
        local_color: Color,
        clock: ClockEngine,
        poll_config: PollConfig,
    ) -> Self {
        Self {
            reconciler: GameStateReconciler::new(record),
            clock,
            connection,
            controller: OptimisticMoveController::new(),
            navigator: MoveHistoryNavigator::new(),
            oracle,
            local_color,
            poll_config,
            event_queue: VecDeque::new(),
            legal_moves_cache: None,
            last_snapshot_request: None,
            timeout_suspicion_sent: false,
            finished_announced: false,
        }
    }

    /// Advances the session: drains the link, merges inbound messages into
    /// the canonical record, fires due reconnection attempts and periodic
    /// authoritative re-polls, and checks for local timeout suspicion.
    ///
    /// Call this regularly; it never blocks.
    pub fn poll(&mut self) {
        let now = Instant::now();
        self.poll_at(now);
    }

    pub(crate) fn poll_at(&mut self, now: Instant) {
        let link_events: Vec<LinkEvent> = self.connection.poll(now).collect();
        for event in link_events {
            match event {
                LinkEvent::Opened { reconnection } => {
                    // Incrementals may race a snapshot already in flight;
                    // request a fresh one and let the length rule
                    // de-duplicate.
                    self.request_snapshot(now);
                    self.push_event(LiveboardEvent::Connected { reconnection });
                }
                LinkEvent::Inbound(msg) => self.handle_message(msg, now),
                LinkEvent::Lost {
                    attempt,
                    next_attempt_in,
                } => {
                    // Freeze rather than guess: no state is synthesized
                    // while the link is down.
                    self.clock.freeze(now);
                    self.push_event(LiveboardEvent::ConnectionLost {
                        attempt,
                        next_attempt_in,
                    });
                }
                LinkEvent::Closed => self.push_event(LiveboardEvent::Closed),
            }
        }

        self.maybe_repoll(now);
        self.check_timeout_suspicion(now);
    }

    /// The position to render: the optimistic prediction while a move is
    /// outstanding at the live cursor, otherwise the cursor's position
    /// derived from the canonical record.
    #[must_use]
    pub fn displayed_position(&self) -> Fen {
        let record = self.reconciler.record();
        if self.navigator.is_live() {
            if let Some(predicted) = self.controller.predicted_position() {
                return predicted.clone();
            }
        }
        match self.navigator.position(&record, &*self.oracle) {
            Ok(position) => position,
            Err(e) => {
                // The canonical record always wins over a failed replay.
                warn!("history replay failed ({e}); falling back to the canonical position");
                record.position
            }
        }
    }

    /// Extrapolated clock values at `now`. Pure; callable from a render
    /// timer at whatever rate suits the caller.
    #[must_use]
    pub fn clock_reading(&self, now: Instant) -> ClockReading {
        self.clock.read(now)
    }

    /// How long until the displayed clock value would visibly change.
    #[must_use]
    pub fn next_clock_refresh_in(&self, now: Instant) -> Duration {
        self.clock.next_refresh_in(now)
    }

    /// Submits a move from the local player.
    ///
    /// Fails synchronously — with no network call and no state change — if
    /// the history cursor is detached, a move is already pending, the game
    /// is not active, it is not the local player's turn, or the oracle
    /// rejects the move ([`IllegalMove`]) or wants a promotion piece
    /// ([`PromotionRequired`]). A send failure surfaces as
    /// [`NotConnected`] and likewise leaves no trace.
    ///
    /// [`IllegalMove`]: LiveboardError::IllegalMove
    /// [`PromotionRequired`]: LiveboardError::PromotionRequired
    /// [`NotConnected`]: LiveboardError::NotConnected
    pub fn submit_move(&mut self, notation: &San) -> Result<(), LiveboardError> {
        if !self.navigator.is_live() {
            return Err(LiveboardError::HistoryDetached);
        }
        let record = self.reconciler.record();
        let pending = self
            .controller
            .prepare(&record, self.local_color, notation, &*self.oracle)?;
        self.connection.send(&ClientMessage::Move {
            notation: notation.clone(),
        })?;
        self.controller.commit(pending);
        self.push_event(LiveboardEvent::MoveSubmitted {
            notation: notation.clone(),
        });
        Ok(())
    }

    /// Moves the history cursor. Interactive submission is only permitted
    /// back at [`NavigationCursor::Live`].
    pub fn set_cursor(&mut self, cursor: NavigationCursor) {
        self.navigator.set_cursor(cursor);
    }

    /// The current history cursor.
    #[must_use]
    pub fn cursor(&self) -> NavigationCursor {
        self.navigator.cursor()
    }

    /// Legal moves from the current canonical position, computed through
    /// the oracle and cached until the next authoritative change.
    pub fn legal_moves(&mut self) -> &[San] {
        if self.legal_moves_cache.is_none() {
            let record = self.reconciler.record();
            self.legal_moves_cache = Some(self.oracle.legal_moves(&record.position));
        }
        self.legal_moves_cache.as_deref().unwrap_or_default()
    }

    /// A consistent clone of the canonical record.
    #[must_use]
    pub fn record(&self) -> GameRecord {
        self.reconciler.record()
    }

    /// A shared read handle to the canonical record for external readers.
    #[must_use]
    pub fn record_cell(&self) -> RecordCell {
        self.reconciler.cell()
    }

    /// Current state of the underlying connection.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Drains all events since the last call. This is the subscription
    /// point: it yields whenever the canonical record, the prediction, or
    /// the connection changed.
    pub fn events(&mut self) -> EventDrain<'_> {
        EventDrain::from_drain(self.event_queue.drain(..))
    }

    /// Intentional shutdown: closes the link and cancels any pending
    /// reconnection attempt. The last known record stays readable.
    pub fn close(&mut self) {
        self.connection.close();
    }

    fn handle_message(&mut self, msg: ServerMessage, now: Instant) {
        match msg {
            ServerMessage::Snapshot(snapshot) => {
                let outcome = self.reconciler.apply_snapshot(&snapshot);
                if outcome.changed() {
                    self.after_record_change(outcome, now);
                }
            }
            ServerMessage::Update(update) => self.handle_update(&update, now),
            ServerMessage::Error { message } => {
                if let Some(discarded) = self.controller.reject() {
                    debug!(notation = %discarded.notation, "server rejected the pending move");
                    self.push_event(LiveboardEvent::MoveRejected {
                        notation: discarded.notation,
                        message,
                    });
                } else {
                    debug!("server error with no move pending: {message}");
                }
            }
        }
    }

    fn handle_update(&mut self, update: &Update, now: Instant) {
        let outcome = self.reconciler.apply_incremental(update, &*self.oracle);
        if outcome.changed() {
            self.after_record_change(outcome, now);
        }
        match outcome {
            ApplyOutcome::GapDetected { .. } => {
                self.push_event(LiveboardEvent::ResyncRequested {
                    reason: ResyncReason::GapDetected,
                });
                self.request_snapshot(now);
            }
            ApplyOutcome::MoveApplied { diverged: true, .. } => {
                self.push_event(LiveboardEvent::ResyncRequested {
                    reason: ResyncReason::ReplayDivergence,
                });
                self.request_snapshot(now);
            }
            _ => {}
        }
    }

    fn after_record_change(&mut self, outcome: ApplyOutcome, now: Instant) {
        let record = self.reconciler.record();
        self.clock.sync(&record, now);
        self.timeout_suspicion_sent = false;
        self.legal_moves_cache = None;

        match self.controller.reconcile(&record) {
            Some(Resolution::Confirmed { notation }) => {
                trace!(%notation, "optimistic move confirmed");
                self.push_event(LiveboardEvent::MoveConfirmed { notation });
            }
            Some(Resolution::RolledBack { notation }) => {
                self.push_event(LiveboardEvent::MoveRolledBack { notation });
            }
            None => {}
        }

        match outcome {
            ApplyOutcome::SnapshotInstalled => {
                self.push_event(LiveboardEvent::SnapshotInstalled);
            }
            ApplyOutcome::MoveApplied { ply, .. } => {
                self.push_event(LiveboardEvent::RecordUpdated { ply });
            }
            ApplyOutcome::StatusAdvanced => {
                self.push_event(LiveboardEvent::StatusChanged {
                    status: record.status,
                });
            }
            _ => {}
        }

        if !self.finished_announced {
            if let Some(final_outcome) = record.outcome {
                self.finished_announced = true;
                self.push_event(LiveboardEvent::GameFinished {
                    outcome: final_outcome,
                    reason: record.end_reason,
                });
            }
        }
    }

    fn maybe_repoll(&mut self, now: Instant) {
        if self.connection.state() != ConnectionState::Open {
            return;
        }
        if self.reconciler.cell().read(|r| r.outcome.is_some()) {
            return;
        }
        let Some(interval) = self.poll_config.repoll_interval else {
            return;
        };
        let due = self
            .last_snapshot_request
            .map_or(true, |at| at + interval <= now);
        if due {
            self.request_snapshot(now);
        }
    }

    fn check_timeout_suspicion(&mut self, now: Instant) {
        if self.timeout_suspicion_sent {
            return;
        }
        let Some(color) = self.clock.timed_out(now) else {
            return;
        };
        // The suspicion never ends the game locally; the authoritative
        // record decides.
        self.timeout_suspicion_sent = true;
        debug!(%color, "local timeout suspicion, requesting authoritative record");
        self.push_event(LiveboardEvent::TimeoutSuspected { color });
        self.request_snapshot(now);
    }

    fn request_snapshot(&mut self, now: Instant) {
        let game_id = self.reconciler.cell().read(|r| r.id.clone());
        match self.connection.send(&ClientMessage::SnapshotRequest { game_id }) {
            Ok(()) => self.last_snapshot_request = Some(now),
            // Not connected: the next successful open requests one anyway.
            Err(e) => trace!("snapshot request skipped: {e}"),
        }
    }

    fn push_event(&mut self, event: LiveboardEvent) {
        if self.event_queue.len() >= MAX_EVENT_QUEUE_SIZE {
            self.event_queue.pop_front();
        }
        self.event_queue.push_back(event);
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("connection_state", &self.connection.state())
            .field("record", &self.reconciler.cell())
            .field("pending_move", &self.controller.pending())
            .field("cursor", &self.navigator.cursor())
            .field("queued_events", &self.event_queue.len())
            .finish_non_exhaustive()
    }
}
