//! Cloneable front door to the session task.
//!
//! Each call sends one command and awaits its oneshot reply. If the task
//! is gone, callers get `ApiError::Internal`.

use chess_core::{
    CreatedSession, GameId, JoinOutcome, MoveOutcome, MoveRequest, PracticeOutcome, Promotion,
    SessionError, SessionSnapshot, Square, TimeControl,
};
use tokio::sync::oneshot;

use crate::error::ApiError;
use crate::types::{CommandTx, ConnectionId, OutboundTx, Reply, SessionCommand};

#[derive(Debug, Clone)]
pub struct SessionHandle {
    tx: CommandTx,
}

impl SessionHandle {
    pub fn new(tx: CommandTx) -> Self {
        SessionHandle { tx }
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> SessionCommand) -> Result<T, ApiError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| ApiError::Internal("session task is not running".into()))?;
        rx.await
            .map_err(|_| ApiError::Internal("session task dropped the reply".into()))
    }

    pub async fn create(&self, time_control: TimeControl) -> Result<CreatedSession, ApiError> {
        self.request(|reply| SessionCommand::Create { time_control, reply })
            .await
    }

    pub async fn join(&self, game_id: GameId, name: String) -> Result<JoinOutcome, ApiError> {
        self.request(|reply| SessionCommand::Join { game_id, name, reply })
            .await?
            .map_err(ApiError::from)
    }

    pub async fn get(&self, game_id: GameId) -> Result<SessionSnapshot, ApiError> {
        self.request(|reply| SessionCommand::Get { game_id, reply })
            .await?
            .map_err(ApiError::from)
    }

    pub async fn submit_move(
        &self,
        game_id: GameId,
        request: MoveRequest,
    ) -> Result<MoveOutcome, ApiError> {
        self.request(|reply| SessionCommand::Move {
            game_id,
            request,
            reply,
        })
        .await?
        .map_err(ApiError::from)
    }

    pub async fn practice_new(&self, caller: String) -> Result<(GameId, String), ApiError> {
        self.request(|reply| SessionCommand::PracticeNew { caller, reply })
            .await
    }

    pub async fn practice_move(
        &self,
        game_id: Option<GameId>,
        caller: String,
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
    ) -> Result<PracticeOutcome, ApiError> {
        self.request(|reply| SessionCommand::PracticeMove {
            game_id,
            caller,
            from,
            to,
            promotion,
            reply,
        })
        .await?
        .map_err(ApiError::from)
    }

    /// Outer error: the task is gone. Inner error: no such game.
    pub async fn subscribe(
        &self,
        game_id: GameId,
        connection_id: ConnectionId,
        tx: OutboundTx,
    ) -> Result<Result<(), SessionError>, ApiError> {
        self.request(|reply| SessionCommand::Subscribe {
            game_id,
            connection_id,
            tx,
            reply,
        })
        .await
    }

    /// Fire and forget.
    pub fn unsubscribe(&self, game_id: GameId, connection_id: ConnectionId) {
        let _ = self.tx.send(SessionCommand::Unsubscribe {
            game_id,
            connection_id,
        });
    }
}
