//! Error types for the session core.
//!
//! Validation of raw wire input happens in the protocol layer; by the
//! time a request reaches these types its fields are well-formed, so
//! every variant here is a domain-level rejection.

use shakmaty::Square;
use thiserror::Error;

/// Failures from the rules adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RulesError {
    #[error("invalid square: {0}")]
    InvalidSquare(String),

    #[error("invalid position: {0}")]
    InvalidFen(String),

    #[error("illegal move {from}{to}")]
    IllegalMove { from: Square, to: Square },
}

/// Rejections from the registry and the turn/authorization state machine.
///
/// Variant order matches check precedence for move requests:
/// `Unauthorized` > `GameUnavailable` > `OutOfTurn` > `IllegalMove`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("game not found")]
    NotFound,

    #[error("game is full")]
    Full,

    /// Wrong credential, wrong color, or unknown game on a move request.
    /// Deliberately indistinguishable.
    #[error("not authorized to move in this game")]
    Unauthorized,

    #[error("game is not in progress")]
    GameUnavailable,

    #[error("not your turn")]
    OutOfTurn,

    #[error("illegal move")]
    IllegalMove,
}

impl From<RulesError> for SessionError {
    fn from(_: RulesError) -> Self {
        SessionError::IllegalMove
    }
}
