//! Central session loop.
//!
//! This task owns the `SessionRegistry` and the subscriber map, and
//! processes every `SessionCommand` one at a time. No command handler
//! awaits, so a mutation is never split across a suspension point and
//! two requests for the same game cannot interleave.
//!
//! Routing policy:
//! - the command's result goes back **only** to the caller (oneshot).
//! - `joined`, `move` and `flag` events are broadcast to **every**
//!   subscriber of the affected game.
//! - `sync` is sent only to the connection that just subscribed.
//!
//! A periodic tick settles flag-falls nobody submitted against and drops
//! idle games.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chess_core::{GameId, SessionRegistry, TimeSource};
use chess_protocol::ServerEvent;
use tokio::time::MissedTickBehavior;

use crate::config::{millis, Config};
use crate::subscribers::Subscribers;
use crate::types::{CommandRx, SessionCommand};

/// Knobs the loop needs from `Config`.
#[derive(Debug, Clone, Copy)]
pub struct LoopSettings {
    pub idle_timeout: Duration,
    pub sweep_interval: Duration,
    pub gc_on_last_disconnect: bool,
}

impl From<&Config> for LoopSettings {
    fn from(config: &Config) -> Self {
        LoopSettings {
            idle_timeout: config.idle_timeout,
            sweep_interval: config.sweep_interval,
            gc_on_last_disconnect: config.gc_on_last_disconnect,
        }
    }
}

/// Everything the loop owns.
pub struct SessionState {
    registry: SessionRegistry,
    subscribers: Subscribers,
    /// Practice board used when a caller's move names no game.
    default_boards: HashMap<String, GameId>,
    clock: Arc<dyn TimeSource>,
    settings: LoopSettings,
}

/// Run the central session loop until every command sender is dropped.
pub async fn run_session_loop(
    mut command_rx: CommandRx,
    registry: SessionRegistry,
    clock: Arc<dyn TimeSource>,
    settings: LoopSettings,
) {
    let mut state = SessionState::new(registry, clock, settings);

    let mut sweep = tokio::time::interval(settings.sweep_interval.max(Duration::from_millis(10)));
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            cmd = command_rx.recv() => match cmd {
                Some(cmd) => state.handle(cmd),
                None => break,
            },
            _ = sweep.tick() => state.sweep(),
        }
    }

    tracing::info!("session loop shutting down (command channel closed)");
}

impl SessionState {
    pub fn new(registry: SessionRegistry, clock: Arc<dyn TimeSource>, settings: LoopSettings) -> Self {
        SessionState {
            registry,
            subscribers: Subscribers::new(),
            default_boards: HashMap::new(),
            clock,
            settings,
        }
    }

    fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Apply one command. Replies are best-effort: a caller that went
    /// away simply doesn't get one.
    pub fn handle(&mut self, cmd: SessionCommand) {
        let now = self.now();
        match cmd {
            SessionCommand::Create { time_control, reply } => {
                let created = self.registry.create_session(time_control, now);
                tracing::info!(
                    game_id = %created.game_id,
                    minutes = time_control.minutes,
                    increment = time_control.increment_secs,
                    "session created"
                );
                let _ = reply.send(created);
            }

            SessionCommand::Join { game_id, name, reply } => {
                let result = self.registry.join_session(&game_id, &name, now);
                match &result {
                    Ok(outcome) => {
                        tracing::info!(
                            game_id = %game_id,
                            color = outcome.color.name(),
                            activated = outcome.activated,
                            "player joined"
                        );
                        self.subscribers
                            .broadcast(&game_id, &ServerEvent::joined(outcome));
                    }
                    Err(e) => tracing::debug!(game_id = %game_id, error = %e, "join rejected"),
                }
                let _ = reply.send(result);
            }

            SessionCommand::Get { game_id, reply } => {
                let _ = reply.send(self.registry.get_session(&game_id, now));
            }

            SessionCommand::Move { game_id, request, reply } => {
                let result = self.registry.submit_move(&game_id, &request, now);
                match &result {
                    Ok(outcome) => {
                        let event = ServerEvent::from_move(outcome);
                        tracing::info!(
                            game_id = %game_id,
                            color = outcome.mover.name(),
                            event = event.kind(),
                            game_over = outcome.snapshot.is_game_over(),
                            "move accepted"
                        );
                        self.subscribers.broadcast(&game_id, &event);
                    }
                    Err(e) => tracing::debug!(
                        game_id = %game_id,
                        color = request.color.name(),
                        error = %e,
                        "move rejected"
                    ),
                }
                let _ = reply.send(result);
            }

            SessionCommand::PracticeNew { caller, reply } => {
                let created = self.registry.create_practice(now);
                tracing::debug!(game_id = %created.0, caller = %caller, "practice board created");
                self.default_boards.insert(caller, created.0.clone());
                let _ = reply.send(created);
            }

            SessionCommand::PracticeMove {
                game_id,
                caller,
                from,
                to,
                promotion,
                reply,
            } => {
                let game_id = match game_id {
                    Some(id) => id,
                    None => self.default_board(caller, now),
                };
                let _ = reply.send(self.registry.practice_move(&game_id, from, to, promotion, now));
            }

            SessionCommand::Subscribe {
                game_id,
                connection_id,
                tx,
                reply,
            } => {
                let result = self.registry.get_session(&game_id, now).map(|snapshot| {
                    self.subscribers.subscribe(game_id.clone(), connection_id, tx);
                    self.subscribers
                        .send_to(&game_id, connection_id, &ServerEvent::sync(&snapshot));
                    self.registry.touch(&game_id, now);
                    tracing::info!(
                        game_id = %game_id,
                        connection_id = %connection_id,
                        subscribers = self.subscribers.count(&game_id),
                        "subscribed"
                    );
                });
                let _ = reply.send(result);
            }

            SessionCommand::Unsubscribe {
                game_id,
                connection_id,
            } => {
                let emptied = self.subscribers.unsubscribe(&game_id, connection_id);
                tracing::info!(
                    game_id = %game_id,
                    connection_id = %connection_id,
                    "unsubscribed"
                );
                if emptied && self.settings.gc_on_last_disconnect && self.registry.remove_session(&game_id) {
                    tracing::info!(game_id = %game_id, "session removed (last subscriber left)");
                }
            }
        }
    }

    /// Settle overdue flags, then drop idle games.
    pub fn sweep(&mut self) {
        let now = self.now();

        for expired in self.registry.expire_flags(now) {
            let game_id = &expired.snapshot.game_id;
            tracing::info!(game_id = %game_id, color = expired.loser.name(), "flag fell");
            self.subscribers
                .broadcast(game_id, &ServerEvent::flag(expired.loser, &expired.snapshot));
        }

        let idle_ms = millis(self.settings.idle_timeout);
        let subscribers = &self.subscribers;
        let removed = self
            .registry
            .sweep_idle(now, idle_ms, |id| subscribers.is_watched(id));
        if !removed.is_empty() {
            tracing::info!(count = removed.len(), "idle games removed");
        }

        let registry = &self.registry;
        self.default_boards
            .retain(|_, id| registry.contains_practice(id));
    }

    /// The caller's default practice board, started fresh if it has none
    /// or the old one was swept.
    fn default_board(&mut self, caller: String, now: u64) -> GameId {
        if let Some(id) = self.default_boards.get(&caller) {
            if self.registry.contains_practice(id) {
                return id.clone();
            }
        }
        let (id, _) = self.registry.create_practice(now);
        tracing::debug!(game_id = %id, caller = %caller, "default practice board created");
        self.default_boards.insert(caller, id.clone());
        id
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::{parse_square, Color, GameId, ManualTimeSource, MoveRequest, TimeControl};
    use tokio::sync::{mpsc, oneshot};

    use crate::types::ConnectionId;

    fn state(clock: Arc<ManualTimeSource>, gc: bool) -> SessionState {
        SessionState::new(
            SessionRegistry::new(),
            clock,
            LoopSettings {
                idle_timeout: Duration::from_secs(60),
                sweep_interval: Duration::from_secs(1),
                gc_on_last_disconnect: gc,
            },
        )
    }

    fn create(state: &mut SessionState, tc: TimeControl) -> GameId {
        let (reply, mut rx) = oneshot::channel();
        state.handle(SessionCommand::Create { time_control: tc, reply });
        rx.try_recv().unwrap().game_id
    }

    fn join(state: &mut SessionState, game_id: &GameId, name: &str) -> chess_core::JoinOutcome {
        let (reply, mut rx) = oneshot::channel();
        state.handle(SessionCommand::Join {
            game_id: game_id.clone(),
            name: name.into(),
            reply,
        });
        rx.try_recv().unwrap().unwrap()
    }

    fn subscribe(state: &mut SessionState, game_id: &GameId, id: u64) -> mpsc::Receiver<Arc<str>> {
        let (tx, rx) = mpsc::channel(16);
        let (reply, mut reply_rx) = oneshot::channel();
        state.handle(SessionCommand::Subscribe {
            game_id: game_id.clone(),
            connection_id: ConnectionId(id),
            tx,
            reply,
        });
        reply_rx.try_recv().unwrap().unwrap();
        rx
    }

    #[test]
    fn subscriber_sees_sync_join_and_move_in_order() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock.clone(), true);
        let id = create(&mut st, TimeControl::new(5, 0));
        let mut events = subscribe(&mut st, &id, 1);

        let white = join(&mut st, &id, "alice");
        join(&mut st, &id, "bob");

        clock.advance(2_000);
        let (reply, mut rx) = oneshot::channel();
        st.handle(SessionCommand::Move {
            game_id: id.clone(),
            request: MoveRequest {
                credential: white.token.as_str().to_string(),
                color: Color::White,
                from: parse_square("e2").unwrap(),
                to: parse_square("e4").unwrap(),
                promotion: None,
            },
            reply,
        });
        rx.try_recv().unwrap().unwrap();

        let kinds: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
            .map(|text| {
                let v: serde_json::Value = serde_json::from_str(&text).unwrap();
                v["type"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(kinds, ["sync", "joined", "joined", "move"]);
    }

    #[test]
    fn subscribe_to_unknown_game_fails() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock, true);
        let (tx, _rx) = mpsc::channel(1);
        let (reply, mut reply_rx) = oneshot::channel();
        st.handle(SessionCommand::Subscribe {
            game_id: GameId::parse("ABCDEF").unwrap(),
            connection_id: ConnectionId(1),
            tx,
            reply,
        });
        assert_eq!(
            reply_rx.try_recv().unwrap(),
            Err(chess_core::SessionError::NotFound)
        );
    }

    #[test]
    fn last_disconnect_collects_session() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock.clone(), true);
        let id = create(&mut st, TimeControl::default());
        let _a = subscribe(&mut st, &id, 1);
        let _b = subscribe(&mut st, &id, 2);

        st.handle(SessionCommand::Unsubscribe { game_id: id.clone(), connection_id: ConnectionId(1) });
        assert!(st.registry().contains(&id));
        st.handle(SessionCommand::Unsubscribe { game_id: id.clone(), connection_id: ConnectionId(2) });
        assert!(!st.registry().contains(&id));
    }

    #[test]
    fn gc_can_be_disabled() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock, false);
        let id = create(&mut st, TimeControl::default());
        let _a = subscribe(&mut st, &id, 1);
        st.handle(SessionCommand::Unsubscribe { game_id: id.clone(), connection_id: ConnectionId(1) });
        assert!(st.registry().contains(&id));
    }

    fn practice(
        state: &mut SessionState,
        game_id: Option<GameId>,
        caller: &str,
        from: &str,
        to: &str,
    ) -> Result<chess_core::PracticeOutcome, chess_core::SessionError> {
        let (reply, mut rx) = oneshot::channel();
        state.handle(SessionCommand::PracticeMove {
            game_id,
            caller: caller.into(),
            from: parse_square(from).unwrap(),
            to: parse_square(to).unwrap(),
            promotion: None,
            reply,
        });
        rx.try_recv().unwrap()
    }

    #[test]
    fn moves_without_game_id_share_the_callers_board() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock.clone(), true);

        practice(&mut st, None, "10.0.0.1", "e2", "e4").unwrap();
        let out = practice(&mut st, None, "10.0.0.1", "e7", "e5").unwrap();
        assert_eq!(
            out.fen,
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );

        // Another caller starts from scratch.
        let other = practice(&mut st, None, "10.0.0.2", "d2", "d4").unwrap();
        assert!(other.fen.starts_with("rnbqkbnr/pppppppp/8/8/3P4/"));
        assert_eq!(st.registry().num_practice(), 2);

        // `/new-game` replaces the default board.
        let (reply, mut rx) = oneshot::channel();
        st.handle(SessionCommand::PracticeNew { caller: "10.0.0.1".into(), reply });
        let (fresh, _) = rx.try_recv().unwrap();
        practice(&mut st, None, "10.0.0.1", "g1", "f3").unwrap();
        let keyed = practice(&mut st, Some(fresh), "10.0.0.1", "g8", "f6").unwrap();
        assert_eq!(
            keyed.fen,
            "rnbqkb1r/pppppppp/5n2/8/8/5N2/PPPPPPPP/RNBQKB1R w KQkq - 2 2"
        );

        // Swept boards are forgotten and replaced on the next move.
        clock.set(120_000);
        st.sweep();
        assert_eq!(st.registry().num_practice(), 0);
        let restarted = practice(&mut st, None, "10.0.0.1", "e2", "e4").unwrap();
        assert!(restarted.fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/"));
    }

    #[test]
    fn sweep_broadcasts_flag_and_drops_idle() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let mut st = state(clock.clone(), true);
        let watched = create(&mut st, TimeControl::new(1, 0));
        let idle = create(&mut st, TimeControl::default());
        join(&mut st, &watched, "alice");
        join(&mut st, &watched, "bob");
        let mut events = subscribe(&mut st, &watched, 7);
        while events.try_recv().is_ok() {}

        clock.set(61_000);
        st.sweep();

        let text = events.try_recv().unwrap();
        let v: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["type"], "flag");
        assert_eq!(v["loser"], "w");
        assert_eq!(v["isGameOver"], true);

        assert!(st.registry().contains(&watched));
        assert!(!st.registry().contains(&idle));
    }
}
