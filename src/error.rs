use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::game_record::{GameStatus, San};

/// This enum contains all error messages this library can return. Most API
/// functions will generally return a [`Result<(), LiveboardError>`].
///
/// Transport and message-level anomalies (stale updates, reconciliation
/// gaps, malformed frames) are self-healing and never appear here; only
/// move-submission-time failures and invalid requests are surfaced
/// synchronously to the caller.
///
/// [`Result<(), LiveboardError>`]: std::result::Result
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiveboardError {
    /// A send was attempted while the link is down. Sends are not queued
    /// across reconnects; the caller may retry after the connection is
    /// re-established.
    NotConnected,
    /// The rules oracle rejected the move. No state was mutated.
    IllegalMove {
        /// The rejected notation.
        notation: San,
    },
    /// The move is a pawn push to the last rank and needs a promotion
    /// piece. Re-submit with the fully disambiguated notation (e.g.
    /// `"e7e8q"`).
    PromotionRequired {
        /// The ambiguous notation that was submitted.
        notation: San,
    },
    /// A move is already awaiting server confirmation. Only one optimistic
    /// move may be outstanding at a time.
    MoveAlreadyPending {
        /// The notation currently awaiting confirmation.
        pending: San,
    },
    /// The game is not in a state that accepts moves.
    GameNotActive {
        /// The game's current status.
        status: GameStatus,
    },
    /// It is not the local player's turn. Turn is derived from the
    /// canonical record's active color, never from UI state.
    NotYourTurn,
    /// The history cursor is detached from the live position. Interactive
    /// input is only permitted at the live cursor.
    HistoryDetached,
    /// A position could not be parsed or replayed by the rules oracle.
    MalformedPosition {
        /// Further context on what failed.
        context: String,
    },
    /// You made an invalid request, usually by using wrong parameters for
    /// function calls.
    InvalidRequest {
        /// Further specifies why the request was invalid.
        info: String,
    },
}

impl Display for LiveboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveboardError::NotConnected => {
                write!(f, "The connection is down; the move was not sent.")
            }
            LiveboardError::IllegalMove { notation } => {
                write!(f, "Illegal move: {}", notation)
            }
            LiveboardError::PromotionRequired { notation } => {
                write!(
                    f,
                    "Move {} requires a promotion piece; re-submit with it appended.",
                    notation
                )
            }
            LiveboardError::MoveAlreadyPending { pending } => {
                write!(
                    f,
                    "Move {} is still awaiting confirmation; only one optimistic move may be outstanding.",
                    pending
                )
            }
            LiveboardError::GameNotActive { status } => {
                write!(f, "The game does not accept moves while {:?}.", status)
            }
            LiveboardError::NotYourTurn => {
                write!(f, "It is not the local player's turn.")
            }
            LiveboardError::HistoryDetached => {
                write!(
                    f,
                    "The history cursor is not at the live position; return to Live to play."
                )
            }
            LiveboardError::MalformedPosition { context } => {
                write!(f, "Malformed position: {}", context)
            }
            LiveboardError::InvalidRequest { info } => {
                write!(f, "Invalid Request: {}", info)
            }
        }
    }
}

impl Error for LiveboardError {}
