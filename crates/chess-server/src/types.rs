//! Shared types for the chess session server.
//!
//! This module defines:
//! - `ConnectionId`: a lightweight handle for realtime connections
//! - channel aliases between handlers and the session task
//! - `SessionCommand`: messages flowing from handlers to the session task

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chess_core::{
    CreatedSession, GameId, JoinOutcome, MoveOutcome, MoveRequest, PracticeOutcome, Promotion,
    SessionError, SessionSnapshot, Square, TimeControl,
};
use tokio::sync::{mpsc, oneshot};

/// Identifier for a realtime connection.
///
/// Opaque; unique over the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One serialized realtime event. Encoded once, shared by every
/// subscriber of the session.
pub type Outbound = Arc<str>;

/// Bounded queue from the session task to one socket writer.
pub type OutboundTx = mpsc::Sender<Outbound>;
pub type OutboundRx = mpsc::Receiver<Outbound>;

/// Reply slot for one command.
pub type Reply<T> = oneshot::Sender<T>;

/// Message flowing from an HTTP or realtime handler into the session task.
#[derive(Debug)]
pub enum SessionCommand {
    Create {
        time_control: TimeControl,
        reply: Reply<CreatedSession>,
    },
    Join {
        game_id: GameId,
        name: String,
        reply: Reply<Result<JoinOutcome, SessionError>>,
    },
    Get {
        game_id: GameId,
        reply: Reply<Result<SessionSnapshot, SessionError>>,
    },
    Move {
        game_id: GameId,
        request: MoveRequest,
        reply: Reply<Result<MoveOutcome, SessionError>>,
    },
    /// The new board also becomes `caller`'s default board.
    PracticeNew {
        caller: String,
        reply: Reply<(GameId, String)>,
    },
    /// `game_id: None` plays on `caller`'s default board, creating one
    /// if needed.
    PracticeMove {
        game_id: Option<GameId>,
        caller: String,
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
        reply: Reply<Result<PracticeOutcome, SessionError>>,
    },
    /// Register a socket; on success a `sync` event is queued on `tx`
    /// before the reply is sent.
    Subscribe {
        game_id: GameId,
        connection_id: ConnectionId,
        tx: OutboundTx,
        reply: Reply<Result<(), SessionError>>,
    },
    Unsubscribe {
        game_id: GameId,
        connection_id: ConnectionId,
    },
}

/// Channel from handlers → session task.
pub type CommandTx = mpsc::UnboundedSender<SessionCommand>;
pub type CommandRx = mpsc::UnboundedReceiver<SessionCommand>;
