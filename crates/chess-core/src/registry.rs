//! In-memory session registry.
//!
//! Owns every live [`Session`] and practice board, keyed by [`GameId`].
//! The registry is a plain value: whoever owns it serializes access to
//! it (the server keeps it inside a single task). Nothing here is
//! persisted; a restart drops all games.

use std::collections::HashMap;

use shakmaty::Square;

use crate::color::Color;
use crate::error::SessionError;
use crate::ids::GameId;
use crate::messages::{
    CreatedSession, JoinOutcome, MoveOutcome, MoveRequest, PracticeOutcome, SessionSnapshot,
};
use crate::practice::PracticeGame;
use crate::rules::Promotion;
use crate::session::Session;
use crate::time_control::TimeControl;

/// A session that ended on time during a sweep.
#[derive(Debug, Clone)]
pub struct ExpiredFlag {
    pub loser: Color,
    pub snapshot: SessionSnapshot,
}

#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<GameId, Session>,
    practice: HashMap<GameId, PracticeGame>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    // -------------------------------------------------------------------------
    // Multiplayer sessions
    // -------------------------------------------------------------------------

    /// Allocate a new `Waiting` session.
    pub fn create_session(&mut self, time_control: TimeControl, now_ms: u64) -> CreatedSession {
        let game_id = self.fresh_id();
        let session = Session::new(game_id.clone(), time_control, now_ms);
        let snapshot = session.snapshot(now_ms);
        self.sessions.insert(game_id.clone(), session);

        CreatedSession {
            game_id,
            fen: snapshot.fen,
            time_control,
            clock: snapshot.clock,
        }
    }

    pub fn join_session(
        &mut self,
        game_id: &GameId,
        display_name: &str,
        now_ms: u64,
    ) -> Result<JoinOutcome, SessionError> {
        self.sessions
            .get_mut(game_id)
            .ok_or(SessionError::NotFound)?
            .join(display_name, now_ms)
    }

    pub fn get_session(&self, game_id: &GameId, now_ms: u64) -> Result<SessionSnapshot, SessionError> {
        self.sessions
            .get(game_id)
            .map(|s| s.snapshot(now_ms))
            .ok_or(SessionError::NotFound)
    }

    /// Route a move to its session.
    ///
    /// An unknown id is reported as `Unauthorized`, the same as a bad
    /// credential, so callers cannot discover live games.
    pub fn submit_move(
        &mut self,
        game_id: &GameId,
        request: &MoveRequest,
        now_ms: u64,
    ) -> Result<MoveOutcome, SessionError> {
        self.sessions
            .get_mut(game_id)
            .ok_or(SessionError::Unauthorized)?
            .submit_move(request, now_ms)
    }

    pub fn touch(&mut self, game_id: &GameId, now_ms: u64) {
        if let Some(session) = self.sessions.get_mut(game_id) {
            session.touch(now_ms);
        }
    }

    pub fn remove_session(&mut self, game_id: &GameId) -> bool {
        self.sessions.remove(game_id).is_some()
    }

    pub fn contains(&self, game_id: &GameId) -> bool {
        self.sessions.contains_key(game_id)
    }

    /// For tests or admin tooling.
    pub fn session_mut(&mut self, game_id: &GameId) -> Option<&mut Session> {
        self.sessions.get_mut(game_id)
    }

    pub fn num_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// End every active session whose side to move is out of time.
    pub fn expire_flags(&mut self, now_ms: u64) -> Vec<ExpiredFlag> {
        self.sessions
            .values_mut()
            .filter_map(|session| {
                session.expire_flag(now_ms).map(|loser| ExpiredFlag {
                    loser,
                    snapshot: session.snapshot(now_ms),
                })
            })
            .collect()
    }

    /// Drop sessions and practice boards untouched for `idle_ms`.
    ///
    /// Sessions for which `is_watched` returns true are kept regardless;
    /// those go away when their last subscriber leaves.
    pub fn sweep_idle<F>(&mut self, now_ms: u64, idle_ms: u64, is_watched: F) -> Vec<GameId>
    where
        F: Fn(&GameId) -> bool,
    {
        let is_idle = |last: u64| now_ms.saturating_sub(last) >= idle_ms;

        let mut removed: Vec<GameId> = self
            .sessions
            .iter()
            .filter(|(id, s)| is_idle(s.last_activity_ms()) && !is_watched(id))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &removed {
            self.sessions.remove(id);
        }

        let stale_practice: Vec<GameId> = self
            .practice
            .iter()
            .filter(|(_, p)| is_idle(p.last_activity_ms()))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale_practice {
            self.practice.remove(id);
        }

        removed.extend(stale_practice);
        removed
    }

    // -------------------------------------------------------------------------
    // Practice boards
    // -------------------------------------------------------------------------

    pub fn create_practice(&mut self, now_ms: u64) -> (GameId, String) {
        let game_id = self.fresh_id();
        let game = PracticeGame::new(now_ms);
        let fen = game.fen();
        self.practice.insert(game_id.clone(), game);
        (game_id, fen)
    }

    pub fn practice_move(
        &mut self,
        game_id: &GameId,
        from: Square,
        to: Square,
        promotion: Option<Promotion>,
        now_ms: u64,
    ) -> Result<PracticeOutcome, SessionError> {
        self.practice
            .get_mut(game_id)
            .ok_or(SessionError::NotFound)?
            .play(from, to, promotion, now_ms)
    }

    pub fn contains_practice(&self, game_id: &GameId) -> bool {
        self.practice.contains_key(game_id)
    }

    pub fn num_practice(&self) -> usize {
        self.practice.len()
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    /// Random id not used by any live session or practice board.
    fn fresh_id(&self) -> GameId {
        loop {
            let id = GameId::random();
            if !self.sessions.contains_key(&id) && !self.practice.contains_key(&id) {
                return id;
            }
        }
    }
}
