//! Requests into, and results out of, the session core.
//!
//! These are transport-agnostic: the protocol crate maps them to JSON
//! and the server decides who receives what.

use shakmaty::Square;

use crate::clock::ClockSnapshot;
use crate::color::Color;
use crate::fairplay::FairplaySignals;
use crate::ids::{AuthToken, GameId};
use crate::rules::Promotion;
use crate::session::{GameResult, SessionStatus};
use crate::time_control::TimeControl;

/// A move request whose fields have already been parsed.
#[derive(Debug, Clone)]
pub struct MoveRequest {
    /// Credential as presented by the caller.
    pub credential: String,

    /// Color the caller claims to play.
    pub color: Color,

    pub from: Square,
    pub to: Square,
    pub promotion: Option<Promotion>,
}

/// Public view of a seated player. Never carries the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    pub name: String,
    pub color: Color,
}

/// Authoritative state of one session at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub game_id: GameId,
    pub fen: String,
    pub status: SessionStatus,
    pub turn: Color,
    pub time_control: TimeControl,
    pub clock: ClockSnapshot,
    pub players: Vec<PlayerView>,
    pub result: Option<GameResult>,
    pub last_move: Option<(Square, Square)>,
}

impl SessionSnapshot {
    pub fn is_game_over(&self) -> bool {
        self.status == SessionStatus::Terminal
    }
}

/// Reply to a create request.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub game_id: GameId,
    pub fen: String,
    pub time_control: TimeControl,
    pub clock: ClockSnapshot,
}

/// Reply to a successful join.
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub color: Color,
    pub token: AuthToken,

    /// True when this join moved the session from `Waiting` to `Active`.
    pub activated: bool,

    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MoveKind {
    /// The move was legal and is now on the board.
    Played { from: Square, to: Square },

    /// The mover's clock had already run out; nothing was played.
    Forfeited,
}

/// Reply to an accepted move request (including a time forfeit).
#[derive(Debug, Clone)]
pub struct MoveOutcome {
    pub mover: Color,
    pub kind: MoveKind,

    /// Mover's signals after this request.
    pub fairplay: FairplaySignals,

    pub snapshot: SessionSnapshot,
}

/// Reply to a practice-board move.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeOutcome {
    pub fen: String,
    pub result: Option<GameResult>,
}
