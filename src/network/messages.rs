use serde::{Deserialize, Serialize};

use crate::game_record::{Color, EndReason, Fen, GameId, GameOutcome, GameStatus, San};

/// A complete, self-consistent restatement of the canonical record.
///
/// Requested after every (re)connect and whenever reconciliation detects a
/// gap or divergence; also returned by the periodic authoritative re-poll.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// The game this snapshot restates.
    pub game_id: GameId,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Position after the last listed move.
    pub position: Fen,
    /// The full move list.
    pub move_list: Vec<San>,
    /// Outcome, present only for finished games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameOutcome>,
    /// End reason, present only for finished games.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
    /// White's remaining milliseconds at `server_timestamp`.
    pub white_time_left_ms: u64,
    /// Black's remaining milliseconds at `server_timestamp`.
    pub black_time_left_ms: u64,
    /// Whose clock is running; absent when the game is not active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_color: Option<Color>,
    /// Server wall-clock moment (ms since epoch) the clock values refer to.
    pub server_timestamp: u64,
}

/// An incremental move/clock/status delta since the last known state.
///
/// Carries either the full resulting `moveList` or its length plus the
/// appended move; the reconciler's ordering rule works off the claimed
/// resulting length either way. A terminal update additionally carries
/// `result` and `reason`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    /// Position after this update, authoritative over local replay.
    pub position: Fen,
    /// The full resulting move list, if the server sends it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_list: Option<Vec<San>>,
    /// Length of the resulting move list, when `move_list` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_list_length: Option<u64>,
    /// The move this update appends, when `move_list` is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_move: Option<San>,
    /// New status, if it changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GameStatus>,
    /// Outcome; presence makes this a terminal update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<GameOutcome>,
    /// End reason accompanying `result`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
    /// White's remaining milliseconds at `server_timestamp`, if updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub white_time_left_ms: Option<u64>,
    /// Black's remaining milliseconds at `server_timestamp`, if updated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub black_time_left_ms: Option<u64>,
    /// Whose clock runs after this update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_color: Option<Color>,
    /// Server wall-clock moment (ms since epoch) of this update.
    pub server_timestamp: u64,
}

impl Update {
    /// The resulting move-list length this update claims, from whichever
    /// field the server chose to send. `None` when the update is unusable
    /// for ordering (neither list nor length present).
    #[must_use]
    pub fn claimed_len(&self) -> Option<usize> {
        match (&self.move_list, self.move_list_length) {
            (Some(list), _) => Some(list.len()),
            (None, Some(len)) => Some(len as usize),
            (None, None) => None,
        }
    }

    /// The move this update appends, from whichever field carries it.
    #[must_use]
    pub fn appended_move(&self) -> Option<&San> {
        match &self.move_list {
            Some(list) => list.last(),
            None => self.last_move.as_ref(),
        }
    }

    /// Whether this update ends the game.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }
}

/// Messages the server pushes over the duplex connection.
///
/// The envelope is JSON, discriminated by a `type` field. Anything that
/// fails to decode into one of these kinds is logged and dropped without
/// terminating the connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    /// A full snapshot.
    Snapshot(Snapshot),
    /// An incremental update (terminal when it carries a result).
    Update(Update),
    /// A server-side rejection notice, e.g. for a refused move.
    Error {
        /// Human-readable explanation from the server.
        message: String,
    },
}

/// Messages the client sends over the duplex connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// A move submission.
    Move {
        /// The move in coordinate notation.
        notation: San,
    },
    /// The idempotent authoritative-record fetch: always answered with a
    /// full snapshot. Used after (re)connect, for periodic re-polling, on
    /// reconciliation gaps and on local timeout suspicion.
    #[serde(rename_all = "camelCase")]
    SnapshotRequest {
        /// The game to restate.
        game_id: GameId,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_round_trips_through_the_wire_shape() {
        let json = r#"{
            "type": "snapshot",
            "gameId": "g-42",
            "status": "active",
            "position": "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
            "moveList": ["e2e4"],
            "whiteTimeLeftMs": 60000,
            "blackTimeLeftMs": 60000,
            "activeColor": "black",
            "serverTimestamp": 1700000000000
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Snapshot(snapshot) = msg else {
            panic!("expected a snapshot");
        };
        assert_eq!(snapshot.game_id, GameId::from("g-42"));
        assert_eq!(snapshot.status, GameStatus::Active);
        assert_eq!(snapshot.move_list, vec![San::from("e2e4")]);
        assert_eq!(snapshot.active_color, Some(Color::Black));
        assert!(snapshot.result.is_none());
    }

    #[test]
    fn update_with_full_move_list() {
        let json = r#"{
            "type": "update",
            "position": "pos",
            "moveList": ["e2e4", "e7e5"],
            "whiteTimeLeftMs": 59000,
            "activeColor": "white",
            "serverTimestamp": 1700000005000
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Update(update) = msg else {
            panic!("expected an update");
        };
        assert_eq!(update.claimed_len(), Some(2));
        assert_eq!(update.appended_move(), Some(&San::from("e7e5")));
        assert!(!update.is_terminal());
    }

    #[test]
    fn update_with_length_and_last_move() {
        let json = r#"{
            "type": "update",
            "position": "pos",
            "moveListLength": 3,
            "lastMove": "g1f3",
            "serverTimestamp": 1700000007000
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Update(update) = msg else {
            panic!("expected an update");
        };
        assert_eq!(update.claimed_len(), Some(3));
        assert_eq!(update.appended_move(), Some(&San::from("g1f3")));
    }

    #[test]
    fn terminal_update_carries_result_and_reason() {
        let json = r#"{
            "type": "update",
            "position": "pos",
            "moveListLength": 40,
            "lastMove": "d8h4",
            "status": "finished",
            "result": "blackWins",
            "reason": "checkmate",
            "serverTimestamp": 1700000009000
        }"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        let ServerMessage::Update(update) = msg else {
            panic!("expected an update");
        };
        assert!(update.is_terminal());
        assert_eq!(update.result, Some(GameOutcome::BlackWins));
        assert_eq!(update.reason, Some(EndReason::Checkmate));
    }

    #[test]
    fn client_messages_use_tagged_envelopes() {
        let mv = ClientMessage::Move {
            notation: San::from("e2e4"),
        };
        let json = serde_json::to_string(&mv).unwrap();
        assert!(json.contains("\"type\":\"move\""));
        assert!(json.contains("\"notation\":\"e2e4\""));

        let req = ClientMessage::SnapshotRequest {
            game_id: GameId::from("g-42"),
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"snapshotRequest\""));
        assert!(json.contains("\"gameId\":\"g-42\""));
    }

    #[test]
    fn unknown_type_fails_to_decode() {
        let json = r#"{"type": "chatLine", "text": "hi"}"#;
        assert!(serde_json::from_str::<ServerMessage>(json).is_err());
    }
}
