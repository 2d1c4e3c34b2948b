//! Fan-out channel manager.
//!
//! Maps each game to the realtime connections watching it. Owned by the
//! session task, so it needs no locking. A socket task only knows its
//! `GameId` and `ConnectionId`; it never holds a session reference.

use std::collections::HashMap;

use chess_core::GameId;
use chess_protocol::{encode_event, ServerEvent};
use tokio::sync::mpsc::error::TrySendError;

use crate::types::{ConnectionId, Outbound, OutboundTx};

#[derive(Debug, Default)]
pub struct Subscribers {
    by_game: HashMap<GameId, HashMap<ConnectionId, OutboundTx>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Subscribers::default()
    }

    pub fn subscribe(&mut self, game_id: GameId, connection_id: ConnectionId, tx: OutboundTx) {
        self.by_game
            .entry(game_id)
            .or_default()
            .insert(connection_id, tx);
    }

    /// Remove one connection. Returns true if this emptied the game's
    /// subscriber set.
    pub fn unsubscribe(&mut self, game_id: &GameId, connection_id: ConnectionId) -> bool {
        let Some(conns) = self.by_game.get_mut(game_id) else {
            return false;
        };
        if conns.remove(&connection_id).is_none() {
            return false;
        }
        if conns.is_empty() {
            self.by_game.remove(game_id);
            return true;
        }
        false
    }

    pub fn is_watched(&self, game_id: &GameId) -> bool {
        self.by_game.contains_key(game_id)
    }

    pub fn count(&self, game_id: &GameId) -> usize {
        self.by_game.get(game_id).map_or(0, HashMap::len)
    }

    /// Queue an event for one connection (the post-subscribe `sync`).
    pub fn send_to(&self, game_id: &GameId, connection_id: ConnectionId, event: &ServerEvent) {
        let Some(tx) = self
            .by_game
            .get(game_id)
            .and_then(|conns| conns.get(&connection_id))
        else {
            return;
        };
        if let Some(text) = encode(event) {
            deliver(game_id, connection_id, tx, text);
        }
    }

    /// Send the same event to every subscriber of `game_id`.
    ///
    /// Best-effort: a full or closed queue is skipped, never awaited.
    /// Returns the number of connections the event was queued on.
    pub fn broadcast(&self, game_id: &GameId, event: &ServerEvent) -> usize {
        let Some(conns) = self.by_game.get(game_id) else {
            return 0;
        };
        let Some(text) = encode(event) else {
            return 0;
        };

        let delivered = conns
            .iter()
            .filter(|(connection_id, tx)| deliver(game_id, **connection_id, tx, text.clone()))
            .count();

        tracing::debug!(
            game_id = %game_id,
            event = event.kind(),
            delivered,
            subscribers = conns.len(),
            "broadcast"
        );
        delivered
    }
}

fn encode(event: &ServerEvent) -> Option<Outbound> {
    match encode_event(event) {
        Ok(text) => Some(Outbound::from(text)),
        Err(e) => {
            tracing::error!(event = event.kind(), error = %e, "failed to encode event");
            None
        }
    }
}

fn deliver(game_id: &GameId, connection_id: ConnectionId, tx: &OutboundTx, text: Outbound) -> bool {
    match tx.try_send(text) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::warn!(
                game_id = %game_id,
                connection_id = %connection_id,
                "outbound queue full, dropping event"
            );
            false
        }
        // The socket task is already on its way out and will unsubscribe.
        Err(TrySendError::Closed(_)) => false,
    }
}
