//! The canonical game record and the small domain types it is built from.
//!
//! A [`GameRecord`] is the single source of truth for one game: identity,
//! lifecycle status, the current position, the full move list, the result
//! once finished, and the last authoritative clock snapshot. It is owned
//! exclusively by the reconciler; every other component reads consistent
//! snapshots of it on demand.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Board position of a fresh game, in Forsyth-Edwards notation.
///
/// All replays derive positions by applying the move list to this position,
/// so a historical view can never drift away from the canonical record.
pub const STARTING_POSITION: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Opaque identifier of one game on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Creates a game id from its server-side string form.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// A single move in coordinate notation as exchanged with the server,
/// e.g. `"e2e4"` or `"e7e8q"` for a promotion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct San(String);

impl San {
    /// Creates a move notation from its string form. No validation happens
    /// here; legality is the rules oracle's business.
    #[must_use]
    pub fn new(notation: impl Into<String>) -> Self {
        Self(notation.into())
    }

    /// Returns the underlying notation string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for San {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for San {
    fn from(notation: &str) -> Self {
        Self(notation.to_owned())
    }
}

/// A full board-position encoding (FEN): piece placement, side to move,
/// castling rights, en-passant target and move counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fen(String);

impl Fen {
    /// Creates a position from its FEN string form.
    #[must_use]
    pub fn new(fen: impl Into<String>) -> Self {
        Self(fen.into())
    }

    /// The standard starting position.
    #[must_use]
    pub fn starting() -> Self {
        Self(STARTING_POSITION.to_owned())
    }

    /// Returns the underlying FEN string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fen {
    fn from(fen: &str) -> Self {
        Self(fen.to_owned())
    }
}

/// Index of one half-move in the move list, starting at 0 for the first
/// move of the game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ply(u32);

impl Ply {
    /// Creates a new `Ply` from a zero-based half-move index.
    #[inline]
    #[must_use]
    pub const fn new(ply: u32) -> Self {
        Self(ply)
    }

    /// Returns the underlying index.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize` for slicing the move list.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Ply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two sides of the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// The side that moves first.
    White,
    /// The side that moves second.
    Black,
}

impl Color {
    /// Returns the opposing side.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

/// Lifecycle status of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    /// Created but not yet started; no moves accepted.
    Pending,
    /// In progress; the move list is append-only while in this state.
    Active,
    /// Over. Terminal: later incremental updates are discarded.
    Finished,
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameOutcome {
    /// White won.
    WhiteWins,
    /// Black won.
    BlackWins,
    /// The game was drawn.
    Draw,
}

/// Why a finished game ended.
///
/// Carried by terminal updates alongside the outcome. The engine never
/// infers any of these locally; they always come from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    /// A side ran out of time.
    Timeout,
    /// A side resigned.
    Resignation,
    /// Checkmate on the board.
    Checkmate,
    /// Stalemate on the board.
    Stalemate,
    /// Both sides agreed to a draw.
    DrawAgreement,
    /// The game was abandoned.
    Abandoned,
}

/// The canonical record of one game.
///
/// Owned exclusively by the reconciler and mutated only through its merge
/// operations; everything else reads snapshots. Invariants:
///
/// - `moves` only grows while `status` is [`GameStatus::Active`]; a shrink
///   or mid-list mutation in an incremental update is a reconciliation
///   error and triggers a full resync.
/// - `position` is derivable by replaying `moves` from
///   [`STARTING_POSITION`]; on disagreement the server value wins.
/// - `active_color` is `None` whenever the game is not active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    /// Immutable identifier of the game.
    pub id: GameId,
    /// Current lifecycle status.
    pub status: GameStatus,
    /// Position after the last move in `moves`, as reported by the server.
    pub position: Fen,
    /// Every half-move played so far, in order.
    pub moves: Vec<San>,
    /// Outcome, set only once `status` is [`GameStatus::Finished`].
    pub outcome: Option<GameOutcome>,
    /// Why the game ended, set together with `outcome`.
    pub end_reason: Option<EndReason>,
    /// White's remaining time in milliseconds, valid at `clock_timestamp_ms`.
    pub white_time_ms: u64,
    /// Black's remaining time in milliseconds, valid at `clock_timestamp_ms`.
    pub black_time_ms: u64,
    /// Server wall-clock moment (ms since epoch) at which the clock values
    /// above were valid. Converted into the local monotonic domain exactly
    /// once, when the clock engine resynchronizes.
    pub clock_timestamp_ms: u64,
    /// Whose clock is running; `None` when the game is not active.
    pub active_color: Option<Color>,
}

impl GameRecord {
    /// Creates the placeholder record held before the first snapshot
    /// arrives: pending, starting position, empty move list, zeroed clocks.
    #[must_use]
    pub fn initial(id: GameId) -> Self {
        Self {
            id,
            status: GameStatus::Pending,
            position: Fen::starting(),
            moves: Vec::new(),
            outcome: None,
            end_reason: None,
            white_time_ms: 0,
            black_time_ms: 0,
            clock_timestamp_ms: 0,
            active_color: None,
        }
    }

    /// Number of half-moves played.
    #[inline]
    #[must_use]
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    /// Whether the game is currently in progress.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == GameStatus::Active
    }

    /// Remaining time of `color` at the last authoritative snapshot.
    #[inline]
    #[must_use]
    pub fn time_ms(&self, color: Color) -> u64 {
        match color {
            Color::White => self.white_time_ms,
            Color::Black => self.black_time_ms,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn initial_record_is_pending_at_start_position() {
        let record = GameRecord::initial(GameId::from("g1"));
        assert_eq!(record.status, GameStatus::Pending);
        assert_eq!(record.position, Fen::starting());
        assert!(record.moves.is_empty());
        assert!(record.outcome.is_none());
        assert!(record.active_color.is_none());
    }

    #[test]
    fn color_opponent_flips() {
        assert_eq!(Color::White.opponent(), Color::Black);
        assert_eq!(Color::Black.opponent(), Color::White);
    }

    #[test]
    fn color_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Color::White).unwrap(), "\"white\"");
        assert_eq!(serde_json::to_string(&Color::Black).unwrap(), "\"black\"");
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&GameStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&GameStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(
            serde_json::to_string(&GameStatus::Finished).unwrap(),
            "\"finished\""
        );
    }

    #[test]
    fn outcome_and_reason_serialize_camel_case() {
        assert_eq!(
            serde_json::to_string(&GameOutcome::WhiteWins).unwrap(),
            "\"whiteWins\""
        );
        assert_eq!(
            serde_json::to_string(&EndReason::DrawAgreement).unwrap(),
            "\"drawAgreement\""
        );
    }

    #[test]
    fn newtypes_are_transparent_in_json() {
        let san = San::from("e2e4");
        assert_eq!(serde_json::to_string(&san).unwrap(), "\"e2e4\"");
        let back: San = serde_json::from_str("\"e2e4\"").unwrap();
        assert_eq!(back, san);

        let ply = Ply::new(7);
        assert_eq!(serde_json::to_string(&ply).unwrap(), "7");
    }

    #[test]
    fn time_ms_selects_by_color() {
        let mut record = GameRecord::initial(GameId::from("g1"));
        record.white_time_ms = 1000;
        record.black_time_ms = 2000;
        assert_eq!(record.time_ms(Color::White), 1000);
        assert_eq!(record.time_ms(Color::Black), 2000);
    }
}
