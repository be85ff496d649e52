use std::collections::vec_deque::Drain;
use std::collections::VecDeque;

use tracing::{debug, trace, warn};
use web_time::{Duration, Instant};

use crate::error::LiveboardError;
use crate::game_record::GameId;
use crate::network::codec;
use crate::network::messages::{ClientMessage, ServerMessage};
use crate::sessions::config::ConnectionConfig;
use crate::{DuplexTransport, TransportEvent};

/// State of the single persistent duplex connection for one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// An open attempt is in flight.
    Connecting,
    /// The link is up; sends succeed and inbound frames flow.
    Open,
    /// Shut down on purpose. No reconnection will be attempted.
    ClosedClean,
    /// The link dropped without being asked to; a reconnection attempt is
    /// scheduled.
    ClosedAbnormal,
}

/// Events the connection surfaces to the session on each poll.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LinkEvent {
    /// The link came up. `reconnection` is false only for the very first
    /// open of this connection's lifetime.
    Opened {
        /// Whether this open follows an earlier loss.
        reconnection: bool,
    },
    /// A well-formed server message arrived.
    Inbound(ServerMessage),
    /// The link dropped abnormally; the next attempt is scheduled.
    Lost {
        /// How many consecutive failures have occurred, this one included.
        attempt: u32,
        /// Delay until the scheduled reconnection attempt.
        next_attempt_in: Duration,
    },
    /// The link was shut down intentionally.
    Closed,
}

/// Owns the persistent duplex connection to the server for one game.
///
/// An explicit finite state machine over an injected [`DuplexTransport`]:
/// {connecting, open, closed-clean, closed-abnormal} with one transition
/// function ([`poll`]), testable without real network I/O.
///
/// Reconnection policy: any closure not requested through [`close`]
/// schedules a retry after a delay that doubles per consecutive failure
/// (starting at [`ConnectionConfig::initial_backoff`], capped at
/// [`ConnectionConfig::max_backoff`]); a successful open resets the
/// sequence. Retries never give up. Malformed inbound frames are logged
/// and dropped individually; they do not terminate the connection.
///
/// [`poll`]: ConnectionManager::poll
/// [`close`]: ConnectionManager::close
pub(crate) struct ConnectionManager {
    transport: Box<dyn DuplexTransport>,
    game_id: GameId,
    config: ConnectionConfig,
    state: ConnectionState,
    /// Consecutive abnormal closures since the last successful open.
    consecutive_failures: u32,
    /// When the next reconnection attempt fires; `None` when none is due.
    next_attempt_at: Option<Instant>,
    /// Set by `close()`; suppresses reconnection for any later closure.
    close_requested: bool,
    /// Whether the link has ever been up, to tell first opens from
    /// reconnections.
    has_opened_before: bool,
    event_queue: VecDeque<LinkEvent>,
}

impl ConnectionManager {
    /// Creates the manager and starts the first open attempt immediately.
    pub(crate) fn open(
        mut transport: Box<dyn DuplexTransport>,
        game_id: GameId,
        config: ConnectionConfig,
    ) -> Self {
        transport.open(&game_id);
        Self {
            transport,
            game_id,
            config,
            state: ConnectionState::Connecting,
            consecutive_failures: 0,
            next_attempt_at: None,
            close_requested: false,
            has_opened_before: false,
            event_queue: VecDeque::new(),
        }
    }

    /// Current state of the link.
    pub(crate) fn state(&self) -> ConnectionState {
        self.state
    }

    /// Advances the state machine at `now` and drains the resulting
    /// events. This is the single transition function: transport events
    /// in, [`LinkEvent`]s out.
    pub(crate) fn poll(&mut self, now: Instant) -> Drain<'_, LinkEvent> {
        for event in self.transport.poll() {
            match event {
                TransportEvent::Opened => self.handle_opened(),
                TransportEvent::Inbound(text) => self.handle_inbound(&text),
                TransportEvent::Closed { clean } => self.handle_closed(clean, now),
            }
        }

        // Fire a due reconnection attempt.
        if self.state == ConnectionState::ClosedAbnormal && !self.close_requested {
            if let Some(at) = self.next_attempt_at {
                if at <= now {
                    debug!(
                        game_id = %self.game_id,
                        attempt = self.consecutive_failures + 1,
                        "reconnecting"
                    );
                    self.next_attempt_at = None;
                    self.state = ConnectionState::Connecting;
                    self.transport.open(&self.game_id);
                }
            }
        }

        self.event_queue.drain(..)
    }

    /// Sends a message, failing immediately with
    /// [`LiveboardError::NotConnected`] while the link is down. No
    /// queueing: sends are not replayed across reconnects.
    pub(crate) fn send(&mut self, msg: &ClientMessage) -> Result<(), LiveboardError> {
        if self.state != ConnectionState::Open {
            return Err(LiveboardError::NotConnected);
        }
        let text = codec::encode_client(msg).map_err(|e| LiveboardError::InvalidRequest {
            info: format!("unencodable outbound message: {e}"),
        })?;
        trace!(game_id = %self.game_id, "sending {text}");
        self.transport.send(&text)
    }

    /// Intentional shutdown. Cancels any pending reconnection attempt and
    /// must not trigger a new one.
    pub(crate) fn close(&mut self) {
        if self.close_requested {
            return;
        }
        self.close_requested = true;
        self.next_attempt_at = None;
        self.transport.close();
        if self.state != ConnectionState::ClosedClean {
            self.state = ConnectionState::ClosedClean;
            self.event_queue.push_back(LinkEvent::Closed);
        }
    }

    fn handle_opened(&mut self) {
        if self.close_requested {
            // A late open racing a close; shut it down again.
            self.transport.close();
            return;
        }
        self.state = ConnectionState::Open;
        self.consecutive_failures = 0;
        self.next_attempt_at = None;
        let reconnection = self.has_opened_before;
        self.has_opened_before = true;
        debug!(game_id = %self.game_id, reconnection, "link up");
        self.event_queue.push_back(LinkEvent::Opened { reconnection });
    }

    fn handle_inbound(&mut self, text: &str) {
        if self.state != ConnectionState::Open {
            trace!("dropping frame received while not open");
            return;
        }
        match codec::decode_server(text) {
            Ok(msg) => self.event_queue.push_back(LinkEvent::Inbound(msg)),
            Err(e) => {
                // Malformed frames are dropped individually; the
                // connection stays open.
                warn!(game_id = %self.game_id, "dropping malformed frame: {e}");
            }
        }
    }

    fn handle_closed(&mut self, clean: bool, now: Instant) {
        match self.state {
            ConnectionState::ClosedClean | ConnectionState::ClosedAbnormal => {}
            ConnectionState::Connecting | ConnectionState::Open => {
                if clean && self.close_requested {
                    self.state = ConnectionState::ClosedClean;
                    self.event_queue.push_back(LinkEvent::Closed);
                } else {
                    self.state = ConnectionState::ClosedAbnormal;
                    self.schedule_reconnect(now);
                }
            }
        }
    }

    fn schedule_reconnect(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let delay = self.backoff_delay(self.consecutive_failures);
        self.next_attempt_at = Some(now + delay);
        debug!(
            game_id = %self.game_id,
            attempt = self.consecutive_failures,
            delay_ms = delay.as_millis() as u64,
            "link lost, retry scheduled"
        );
        self.event_queue.push_back(LinkEvent::Lost {
            attempt: self.consecutive_failures,
            next_attempt_in: delay,
        });
    }

    /// Delay before attempt number `failures`: doubling from the initial
    /// backoff, capped.
    fn backoff_delay(&self, failures: u32) -> Duration {
        let doublings = failures.saturating_sub(1).min(16);
        self.config
            .initial_backoff
            .saturating_mul(1_u32 << doublings)
            .min(self.config.max_backoff)
    }
}

// #########
// # TESTS #
// #########

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Transport stub whose events are pushed by the test.
    struct ScriptedTransport {
        pending: Rc<RefCell<VecDeque<TransportEvent>>>,
        opens: Rc<RefCell<u32>>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    struct Script {
        pending: Rc<RefCell<VecDeque<TransportEvent>>>,
        opens: Rc<RefCell<u32>>,
        sent: Rc<RefCell<Vec<String>>>,
    }

    fn scripted() -> (Box<ScriptedTransport>, Script) {
        let pending = Rc::new(RefCell::new(VecDeque::new()));
        let opens = Rc::new(RefCell::new(0));
        let sent = Rc::new(RefCell::new(Vec::new()));
        (
            Box::new(ScriptedTransport {
                pending: pending.clone(),
                opens: opens.clone(),
                sent: sent.clone(),
            }),
            Script {
                pending,
                opens,
                sent,
            },
        )
    }

    impl DuplexTransport for ScriptedTransport {
        fn open(&mut self, _game_id: &GameId) {
            *self.opens.borrow_mut() += 1;
        }

        fn poll(&mut self) -> Vec<TransportEvent> {
            self.pending.borrow_mut().drain(..).collect()
        }

        fn send(&mut self, text: &str) -> Result<(), LiveboardError> {
            self.sent.borrow_mut().push(text.to_owned());
            Ok(())
        }

        fn close(&mut self) {}
    }

    fn new_manager() -> (ConnectionManager, Script) {
        let (transport, script) = scripted();
        let manager = ConnectionManager::open(
            transport,
            GameId::from("g1"),
            ConnectionConfig::default(),
        );
        (manager, script)
    }

    #[test]
    fn send_while_connecting_fails_fast() {
        let (mut manager, _script) = new_manager();
        assert_eq!(manager.state(), ConnectionState::Connecting);
        let result = manager.send(&ClientMessage::Move {
            notation: crate::game_record::San::from("e2e4"),
        });
        assert_eq!(result, Err(LiveboardError::NotConnected));
    }

    #[test]
    fn opened_event_transitions_to_open() {
        let (mut manager, script) = new_manager();
        script.pending.borrow_mut().push_back(TransportEvent::Opened);
        let events: Vec<_> = manager.poll(Instant::now()).collect();
        assert_eq!(
            events,
            vec![LinkEvent::Opened {
                reconnection: false
            }]
        );
        assert_eq!(manager.state(), ConnectionState::Open);
    }

    #[test]
    fn abnormal_close_schedules_doubling_backoff() {
        let (mut manager, script) = new_manager();
        let mut now = Instant::now();
        script.pending.borrow_mut().push_back(TransportEvent::Opened);
        let _ = manager.poll(now).count();

        let mut seen = Vec::new();
        for _ in 0..7 {
            script
                .pending
                .borrow_mut()
                .push_back(TransportEvent::Closed { clean: false });
            for event in manager.poll(now) {
                if let LinkEvent::Lost {
                    next_attempt_in, ..
                } = event
                {
                    seen.push(next_attempt_in);
                }
            }
            // Jump past the scheduled attempt so the next closure counts
            // as a consecutive failure.
            now += Duration::from_secs(120);
            let _ = manager.poll(now).count();
            assert_eq!(manager.state(), ConnectionState::Connecting);
        }

        let expected: Vec<Duration> = [1, 2, 4, 8, 16, 30, 30]
            .into_iter()
            .map(Duration::from_secs)
            .collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn successful_open_resets_the_backoff_counter() {
        let (mut manager, script) = new_manager();
        let mut now = Instant::now();

        // Two failures, then a success.
        for _ in 0..2 {
            script
                .pending
                .borrow_mut()
                .push_back(TransportEvent::Closed { clean: false });
            let _ = manager.poll(now).count();
            now += Duration::from_secs(120);
            let _ = manager.poll(now).count();
        }
        script.pending.borrow_mut().push_back(TransportEvent::Opened);
        let _ = manager.poll(now).count();
        assert_eq!(manager.state(), ConnectionState::Open);

        // The next failure starts over at the initial delay.
        script
            .pending
            .borrow_mut()
            .push_back(TransportEvent::Closed { clean: false });
        let events: Vec<_> = manager.poll(now).collect();
        assert!(matches!(
            events.as_slice(),
            [LinkEvent::Lost {
                attempt: 1,
                next_attempt_in,
            }] if *next_attempt_in == Duration::from_secs(1)
        ));
    }

    #[test]
    fn reconnect_does_not_fire_before_its_delay() {
        let (mut manager, script) = new_manager();
        let now = Instant::now();
        script
            .pending
            .borrow_mut()
            .push_back(TransportEvent::Closed { clean: false });
        let _ = manager.poll(now).count();
        let opens_before = *script.opens.borrow();

        let _ = manager.poll(now + Duration::from_millis(500)).count();
        assert_eq!(*script.opens.borrow(), opens_before);
        assert_eq!(manager.state(), ConnectionState::ClosedAbnormal);

        let _ = manager.poll(now + Duration::from_millis(1001)).count();
        assert_eq!(*script.opens.borrow(), opens_before + 1);
    }

    #[test]
    fn close_cancels_a_pending_reconnect() {
        let (mut manager, script) = new_manager();
        let now = Instant::now();
        script
            .pending
            .borrow_mut()
            .push_back(TransportEvent::Closed { clean: false });
        let _ = manager.poll(now).count();
        let opens_before = *script.opens.borrow();

        manager.close();
        let events: Vec<_> = manager.poll(now + Duration::from_secs(60)).collect();
        assert_eq!(events, vec![LinkEvent::Closed]);
        assert_eq!(manager.state(), ConnectionState::ClosedClean);
        assert_eq!(*script.opens.borrow(), opens_before);
    }

    #[test]
    fn malformed_frames_are_dropped_without_closing() {
        let (mut manager, script) = new_manager();
        let now = Instant::now();
        script.pending.borrow_mut().push_back(TransportEvent::Opened);
        script
            .pending
            .borrow_mut()
            .push_back(TransportEvent::Inbound("{broken".to_owned()));
        script.pending.borrow_mut().push_back(TransportEvent::Inbound(
            r#"{"type":"error","message":"nope"}"#.to_owned(),
        ));

        let events: Vec<_> = manager.poll(now).collect();
        assert_eq!(events.len(), 2); // Opened + the one well-formed frame
        assert!(matches!(
            events[1],
            LinkEvent::Inbound(ServerMessage::Error { .. })
        ));
        assert_eq!(manager.state(), ConnectionState::Open);
    }

    #[test]
    fn send_reaches_the_transport_when_open() {
        let (mut manager, script) = new_manager();
        script.pending.borrow_mut().push_back(TransportEvent::Opened);
        let _ = manager.poll(Instant::now()).count();

        manager
            .send(&ClientMessage::SnapshotRequest {
                game_id: GameId::from("g1"),
            })
            .unwrap();
        assert_eq!(script.sent.borrow().len(), 1);
        assert!(script.sent.borrow()[0].contains("snapshotRequest"));
    }
}
