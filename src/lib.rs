//! # Liveboard
//!
//! Liveboard is a real-time synchronization engine for two-party online
//! chess clients. It keeps a client consistent with an authoritative
//! server across an unreliable, asynchronous transport while staying
//! responsive to local input, by reconciling four independent sources of
//! truth — periodic polled snapshots, push messages, locally predicted
//! state, and user-driven time travel through the move history — without
//! ever presenting an inconsistent or stale board.
//!
//! The crate is poll-driven: build a [`GameSession`] with the
//! [`SessionBuilder`], call [`GameSession::poll`] every tick, drain
//! [`GameSession::events`], and read the board and clocks through
//! [`GameSession::displayed_position`] and [`GameSession::clock_reading`].
//! All I/O goes through the [`DuplexTransport`] trait and every rules
//! question through [`RulesOracle`], so the whole engine is testable with
//! fakes and renders itself agnostic of both the socket library and the
//! chess library. Nothing in the engine is fatal: transport and message
//! anomalies self-heal (reconnect with exponential backoff, automatic
//! resync), degrading at worst to a frozen last-known board plus
//! background retry.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use clock::{ClockConfig, ClockEngine, ClockReading};
pub use error::LiveboardError;
pub use game_record::{
    Color, EndReason, Fen, GameId, GameOutcome, GameRecord, GameStatus, Ply, San,
    STARTING_POSITION,
};
pub use history::{MoveHistoryNavigator, NavigationCursor};
pub use network::connection::ConnectionState;
pub use network::messages::{ClientMessage, ServerMessage, Snapshot, Update};
pub use optimistic::{OptimisticMoveController, PendingMove, Resolution};
pub use oracle::{MoveApplication, RulesOracle};
pub use reconciler::{ApplyOutcome, GameStateReconciler, RecordCell};
pub use sessions::builder::SessionBuilder;
pub use sessions::config::{ConnectionConfig, PollConfig};
pub use sessions::event_drain::EventDrain;
pub use sessions::game_session::GameSession;

#[cfg(feature = "chess-rules")]
pub use oracle::chess_rules::ChessRules;
#[cfg(feature = "ws-transport")]
pub use network::ws_transport::WsTransport;

/// Remaining-time prediction between authoritative clock updates.
pub mod clock;
/// The error taxonomy returned to callers.
pub mod error;
pub mod game_record;
pub mod history;
pub mod optimistic;
pub mod oracle;
pub mod reconciler;

/// Network-facing modules: wire messages, the JSON codec, the connection
/// state machine and the optional production transport.
pub mod network {
    pub mod codec;
    /// The connection state machine and reconnection policy.
    pub mod connection;
    /// The JSON wire envelopes exchanged with the server.
    pub mod messages;
    #[cfg(feature = "ws-transport")]
    pub mod ws_transport;
}

/// Session assembly: the facade, its builder, configuration and the event
/// drain.
pub mod sessions {
    /// Builds a [`GameSession`](crate::GameSession).
    pub mod builder;
    pub mod config;
    /// The drained-iterator subscription point.
    pub mod event_drain;
    /// The session facade tying all components together.
    pub mod game_session;
}

use web_time::Duration;

/// Raw events a [`DuplexTransport`] reports from one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// An open attempt completed; the link is up.
    Opened,
    /// A text frame arrived.
    Inbound(String),
    /// The link went down. `clean` distinguishes an orderly shutdown from
    /// a failure; a closure the caller did not request triggers
    /// reconnection either way.
    Closed {
        /// Whether the closure was an orderly websocket shutdown.
        clean: bool,
    },
}

/// The transport seam: one persistent duplex stream per game.
///
/// Implement this to run the engine over your own socket; the crate ships
/// a `tungstenite`-backed [`WsTransport`] behind the `ws-transport`
/// feature, and tests drive the engine with scripted fakes.
///
/// All methods must be non-blocking apart from `open`, which may block for
/// the duration of a connection handshake (it runs when a reconnection
/// attempt fires, never on every poll).
///
/// [`WsTransport`]: crate::network::ws_transport::WsTransport
pub trait DuplexTransport {
    /// Begins an open attempt for `game_id`'s stream. The outcome arrives
    /// as a [`TransportEvent::Opened`] or [`TransportEvent::Closed`] on a
    /// later [`poll`](Self::poll).
    fn open(&mut self, game_id: &GameId);

    /// Returns all events since the last call, in order.
    fn poll(&mut self) -> Vec<TransportEvent>;

    /// Sends one text frame, failing with [`LiveboardError::NotConnected`]
    /// while the link is down. No queueing across reconnects.
    fn send(&mut self, text: &str) -> Result<(), LiveboardError>;

    /// Shuts the stream down. Must not produce reconnection attempts.
    fn close(&mut self);
}

/// Why the engine requested a fresh authoritative snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResyncReason {
    /// An incremental update claimed a move-list length more than one
    /// ahead of the canonical record.
    GapDetected,
    /// Local replay of an appended move disagreed with the server's
    /// resulting position.
    ReplayDivergence,
}

/// Events a [`GameSession`] yields through its
/// [`events()`](GameSession::events) drain — the subscription point that
/// fires whenever the canonical record, the optimistic prediction, or the
/// connection changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveboardEvent {
    /// The link came up. The session has already requested a full
    /// snapshot; `reconnection` is false only for the first open.
    Connected {
        /// Whether this open follows an earlier loss.
        reconnection: bool,
    },
    /// The link dropped without being asked to. The last known record is
    /// frozen (clocks included) until the link recovers; a retry is
    /// scheduled.
    ConnectionLost {
        /// Consecutive failures so far, this one included.
        attempt: u32,
        /// Delay until the scheduled reconnection attempt.
        next_attempt_in: Duration,
    },
    /// The session was closed intentionally. No reconnection follows.
    Closed,
    /// A full snapshot replaced the canonical record.
    SnapshotInstalled,
    /// An incremental update appended a move to the canonical record.
    RecordUpdated {
        /// Index of the appended half-move.
        ply: Ply,
    },
    /// The game's status changed without a move (explicit start signal, or
    /// a terminal update such as a resignation).
    StatusChanged {
        /// The new status.
        status: GameStatus,
    },
    /// A local move was sent and is displayed optimistically.
    MoveSubmitted {
        /// The submitted notation.
        notation: San,
    },
    /// The server confirmed the pending move; the display did not change.
    MoveConfirmed {
        /// The confirmed notation.
        notation: San,
    },
    /// The authoritative record went another way; the optimistic
    /// prediction was discarded and the display reverted to canonical.
    MoveRolledBack {
        /// The discarded notation.
        notation: San,
    },
    /// The server explicitly rejected the pending move.
    MoveRejected {
        /// The rejected notation.
        notation: San,
        /// The server's explanation.
        message: String,
    },
    /// Reconciliation needs a full snapshot; one was requested. Self-
    /// healing, surfaced for observability only.
    ResyncRequested {
        /// What triggered the resync.
        reason: ResyncReason,
    },
    /// The active side's extrapolated clock reached zero. Only the
    /// authoritative record may actually end the game; it has been
    /// requested.
    TimeoutSuspected {
        /// The side suspected to have flagged.
        color: Color,
    },
    /// The game ended. Fires exactly once.
    GameFinished {
        /// The final outcome.
        outcome: GameOutcome,
        /// Why the game ended, when the server said.
        reason: Option<EndReason>,
    },
}

// ###################
// # UNIT TESTS      #
// ###################
