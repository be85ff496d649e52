//! Transport and oracle stubs shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use liveboard::{
    Color, ConnectionConfig, DuplexTransport, Fen, GameId, GameOutcome, GameSession, GameStatus,
    LiveboardError, MoveApplication, PollConfig, RulesOracle, San, ServerMessage, SessionBuilder,
    Snapshot, TransportEvent, Update, STARTING_POSITION,
};

/// Shared view into a [`ScriptedTransport`]: tests push inbound events and
/// inspect what the session sent.
#[derive(Default)]
pub struct TransportScript {
    /// Events delivered on the transport's next poll.
    pub pending: VecDeque<TransportEvent>,
    /// Every text frame the session sent, in order.
    pub sent: Vec<String>,
    /// How many open attempts were made.
    pub opens: u32,
    /// How many times the session closed the transport.
    pub closes: u32,
}

impl TransportScript {
    /// Queues a transport event for the next poll.
    pub fn push(&mut self, event: TransportEvent) {
        self.pending.push_back(event);
    }

    /// Queues a server message as an inbound JSON frame.
    pub fn push_message(&mut self, msg: &ServerMessage) {
        let text = serde_json::to_string(msg).expect("server message encodes");
        self.pending.push_back(TransportEvent::Inbound(text));
    }

    /// The decoded `type` tags of everything sent so far.
    pub fn sent_types(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|text| {
                let value: serde_json::Value = serde_json::from_str(text).expect("sent JSON");
                value["type"].as_str().unwrap_or("?").to_owned()
            })
            .collect()
    }
}

/// A [`DuplexTransport`] whose behavior is scripted by the test.
pub struct ScriptedTransport {
    script: Rc<RefCell<TransportScript>>,
}

/// Creates a scripted transport and the handle that drives it.
pub fn scripted_transport() -> (Box<ScriptedTransport>, Rc<RefCell<TransportScript>>) {
    let script = Rc::new(RefCell::new(TransportScript::default()));
    (
        Box::new(ScriptedTransport {
            script: script.clone(),
        }),
        script,
    )
}

impl DuplexTransport for ScriptedTransport {
    fn open(&mut self, _game_id: &GameId) {
        self.script.borrow_mut().opens += 1;
    }

    fn poll(&mut self) -> Vec<TransportEvent> {
        self.script.borrow_mut().pending.drain(..).collect()
    }

    fn send(&mut self, text: &str) -> Result<(), LiveboardError> {
        self.script.borrow_mut().sent.push(text.to_owned());
        Ok(())
    }

    fn close(&mut self) {
        self.script.borrow_mut().closes += 1;
    }
}

/// Deterministic replay oracle: the "position" after a move is the old
/// position with `/<move>` appended, so predictions and server positions
/// can be written down literally in tests.
pub struct ConcatOracle;

impl RulesOracle for ConcatOracle {
    fn legal_moves(&self, _position: &Fen) -> Vec<San> {
        vec![San::from("e2e4"), San::from("d2d4")]
    }

    fn apply(&self, position: &Fen, notation: &San) -> MoveApplication {
        match notation.as_str() {
            "zzzz" => MoveApplication::Illegal,
            "e7e8" => MoveApplication::PromotionRequired,
            _ => MoveApplication::Applied(Fen::new(format!("{}/{}", position, notation))),
        }
    }
}

/// The concat-oracle position after playing `moves` from the start.
pub fn concat_position(moves: &[&str]) -> Fen {
    let mut fen = String::from(STARTING_POSITION);
    for mv in moves {
        fen = format!("{}/{}", fen, mv);
    }
    Fen::new(fen)
}

/// An active-game snapshot consistent with [`ConcatOracle`] replay.
pub fn active_snapshot(game_id: &str, moves: &[&str]) -> Snapshot {
    Snapshot {
        game_id: GameId::from(game_id),
        status: GameStatus::Active,
        position: concat_position(moves),
        move_list: moves.iter().map(|m| San::from(*m)).collect(),
        result: None,
        reason: None,
        white_time_left_ms: 60_000,
        black_time_left_ms: 60_000,
        active_color: Some(if moves.len() % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }),
        server_timestamp: 1_700_000_000_000,
    }
}

/// An incremental update claiming the state after `moves`, consistent with
/// [`ConcatOracle`] replay.
pub fn update_after(moves: &[&str]) -> Update {
    Update {
        position: concat_position(moves),
        move_list: None,
        move_list_length: Some(moves.len() as u64),
        last_move: moves.last().map(|m| San::from(*m)),
        status: None,
        result: None,
        reason: None,
        white_time_left_ms: Some(59_000),
        black_time_left_ms: Some(60_000),
        active_color: None,
        server_timestamp: 1_700_000_005_000,
    }
}

/// A terminal update appending no move.
pub fn terminal_update(moves: &[&str], outcome: GameOutcome) -> Update {
    let mut update = update_after(moves);
    update.status = Some(GameStatus::Finished);
    update.result = Some(outcome);
    update
}

/// Starts a session over a scripted transport with the concat oracle,
/// playing White in game `g1`. Backoff is shrunk so reconnection tests
/// run in milliseconds, and periodic re-polling is off so `sent` stays
/// deterministic.
pub fn start_session() -> (GameSession, Rc<RefCell<TransportScript>>) {
    let (transport, script) = scripted_transport();
    let session = SessionBuilder::new(GameId::from("g1"), Color::White)
        .with_transport(transport)
        .with_oracle(Arc::new(ConcatOracle))
        .with_connection_config(ConnectionConfig {
            initial_backoff: web_time::Duration::from_millis(10),
            max_backoff: web_time::Duration::from_millis(80),
        })
        .with_poll_config(PollConfig::push_only())
        .start()
        .expect("session starts");
    (session, script)
}

/// Brings the scripted link up and installs a snapshot for `moves`,
/// draining the resulting events.
pub fn open_with_snapshot(
    session: &mut GameSession,
    script: &Rc<RefCell<TransportScript>>,
    moves: &[&str],
) {
    script.borrow_mut().push(TransportEvent::Opened);
    session.poll();
    script
        .borrow_mut()
        .push_message(&ServerMessage::Snapshot(active_snapshot("g1", moves)));
    session.poll();
    let _ = session.events().count();
}
