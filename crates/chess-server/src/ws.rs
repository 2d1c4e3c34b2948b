//! Realtime (WebSocket) connections.
//!
//! A client connects to `/?gameId=XXXXXX` (or `/ws?gameId=XXXXXX`).
//! The handshake is refused
//! when the `Origin` is not allowed, the id is malformed, or the
//! connection limit is reached. After the upgrade the socket subscribes
//! to its game, gets a `sync` event, and from then on receives every
//! event broadcast for that game. The channel is push-only: inbound
//! text is ignored.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::header::ORIGIN;
use axum::http::HeaderMap;
use axum::response::Response;
use chess_core::GameId;
use chess_protocol::validation;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{ConnectionId, OutboundRx};

/// Close code sent when the requested game does not exist.
pub const CLOSE_GAME_NOT_FOUND: u16 = 4004;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WsParams {
    #[serde(default)]
    pub game_id: Option<String>,
}

/// Counts open sockets. A slot is held for the socket's whole life.
#[derive(Debug, Default)]
pub struct ConnectionGauge {
    open: AtomicUsize,
}

impl ConnectionGauge {
    pub fn new() -> Self {
        ConnectionGauge::default()
    }

    pub fn open(&self) -> usize {
        self.open.load(Ordering::Relaxed)
    }

    /// Reserve a slot unless `max` are already taken.
    fn acquire(self: &Arc<Self>, max: usize) -> Option<ConnectionSlot> {
        self.open
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| ConnectionSlot {
                gauge: Arc::clone(self),
            })
    }
}

struct ConnectionSlot {
    gauge: Arc<ConnectionGauge>,
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        self.gauge.open.fetch_sub(1, Ordering::AcqRel);
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let origin = headers.get(ORIGIN).and_then(|v| v.to_str().ok());
    if !state.allowed_origins.allows(origin) {
        tracing::warn!(origin = ?origin, "realtime connection refused: origin not allowed");
        return Err(ApiError::OriginRejected);
    }

    let game_id = validation::game_id(params.game_id.as_deref().unwrap_or_default())?;

    let Some(slot) = state.connections.acquire(state.max_connections) else {
        tracing::warn!(
            max_connections = state.max_connections,
            "realtime connection refused: limit reached"
        );
        return Err(ApiError::ConnectionLimit);
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, game_id, slot)))
}

async fn handle_socket(socket: WebSocket, state: AppState, game_id: GameId, _slot: ConnectionSlot) {
    let connection_id = ConnectionId::next();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (tx, rx) = mpsc::channel(state.outbound_buffer.max(1));

    match state.sessions.subscribe(game_id.clone(), connection_id, tx).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::info!(
                game_id = %game_id,
                connection_id = %connection_id,
                error = %e,
                "realtime connection refused"
            );
            let _ = ws_sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_GAME_NOT_FOUND,
                    reason: Utf8Bytes::from_static("game not found"),
                })))
                .await;
            return;
        }
        Err(e) => {
            tracing::error!(game_id = %game_id, error = %e, "subscribe failed");
            return;
        }
    }

    tracing::info!(
        game_id = %game_id,
        connection_id = %connection_id,
        "realtime connection established"
    );

    let mut send_task = tokio::spawn(write_events(ws_sender, rx));

    // Drain inbound frames until the peer goes away. Nothing inbound is
    // acted on; pings are answered by the transport.
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(_) => break,
            }
        }
    });

    // Either side finishing ends the connection.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.sessions.unsubscribe(game_id.clone(), connection_id);
    tracing::info!(
        game_id = %game_id,
        connection_id = %connection_id,
        "realtime connection terminated"
    );
}

async fn write_events(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: OutboundRx) {
    while let Some(text) = rx.recv().await {
        if ws_sender.send(Message::Text(text.to_string().into())).await.is_err() {
            return;
        }
    }
    let _ = ws_sender.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauge_enforces_max_and_releases() {
        let gauge = Arc::new(ConnectionGauge::new());
        let a = gauge.acquire(2).unwrap();
        let _b = gauge.acquire(2).unwrap();
        assert!(gauge.acquire(2).is_none());
        assert_eq!(gauge.open(), 2);
        drop(a);
        assert_eq!(gauge.open(), 1);
        assert!(gauge.acquire(2).is_some());
    }
}
