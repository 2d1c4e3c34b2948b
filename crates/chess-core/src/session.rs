//! One multiplayer game: seats, board, clock and the turn/authorization
//! state machine.
//!
//! Status only moves forward: `Waiting -> Active -> Terminal`.
//!
//! Move requests are checked in this order, and nothing is mutated
//! until every check has passed (a forfeit is itself the mutation):
//!
//! 1. credential + color (`Unauthorized`)
//! 2. session is `Active` (`GameUnavailable`)
//! 3. color is on move (`OutOfTurn`)
//! 4. mover's clock has not run out (otherwise: forfeit, move ignored)
//! 5. move is legal (`IllegalMove`)

use crate::clock::{GameClock, Settlement};
use crate::color::Color;
use crate::error::SessionError;
use crate::fairplay::FairplaySignals;
use crate::ids::{AuthToken, GameId};
use crate::messages::{JoinOutcome, MoveKind, MoveOutcome, MoveRequest, PlayerView, SessionSnapshot};
use crate::rules::{Board, BoardStatus};
use crate::time_control::TimeControl;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Fewer than two players have joined.
    Waiting,
    /// Both seats taken, game in progress.
    Active,
    /// Checkmate, draw or time forfeit. Absorbing.
    Terminal,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Waiting => "waiting",
            SessionStatus::Active => "active",
            SessionStatus::Terminal => "finished",
        }
    }
}

/// How a finished game ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameResult {
    Checkmate { winner: Color },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
    TimeForfeit { loser: Color },
}

impl GameResult {
    /// Terminal classification of a board, if any.
    pub fn from_board(status: BoardStatus) -> Option<Self> {
        match status {
            BoardStatus::Ongoing => None,
            BoardStatus::Checkmate { winner } => Some(GameResult::Checkmate { winner }),
            BoardStatus::Stalemate => Some(GameResult::Stalemate),
            BoardStatus::InsufficientMaterial => Some(GameResult::InsufficientMaterial),
            BoardStatus::FiftyMoveRule => Some(GameResult::FiftyMoveRule),
            BoardStatus::ThreefoldRepetition => Some(GameResult::ThreefoldRepetition),
        }
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameResult::Checkmate { winner } => Some(winner),
            GameResult::TimeForfeit { loser } => Some(loser.opposite()),
            _ => None,
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            GameResult::Checkmate { .. } => "checkmate",
            GameResult::Stalemate => "stalemate",
            GameResult::InsufficientMaterial => "insufficient_material",
            GameResult::FiftyMoveRule => "fifty_move_rule",
            GameResult::ThreefoldRepetition => "threefold_repetition",
            GameResult::TimeForfeit { .. } => "time_forfeit",
        }
    }

    /// Human-readable one-liner for the result banner.
    pub fn description(self) -> String {
        match self {
            GameResult::Checkmate { winner } => format!("Checkmate, {} wins", winner.name()),
            GameResult::TimeForfeit { loser } => format!(
                "{} ran out of time, {} wins",
                capitalize(loser.name()),
                loser.opposite().name()
            ),
            GameResult::Stalemate => "Draw by stalemate".to_string(),
            GameResult::InsufficientMaterial => "Draw by insufficient material".to_string(),
            GameResult::FiftyMoveRule => "Draw by the fifty-move rule".to_string(),
            GameResult::ThreefoldRepetition => "Draw by threefold repetition".to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub color: Color,
    token: AuthToken,
    pub fairplay: FairplaySignals,
}

impl Player {
    fn view(&self) -> PlayerView {
        PlayerView {
            name: self.name.clone(),
            color: self.color,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    id: GameId,
    board: Board,
    players: Vec<Player>,
    status: SessionStatus,
    result: Option<GameResult>,
    time_control: TimeControl,
    clock: GameClock,
    last_move: Option<(shakmaty::Square, shakmaty::Square)>,
    last_activity_ms: u64,
}

impl Session {
    pub const MAX_PLAYERS: usize = 2;

    pub fn new(id: GameId, time_control: TimeControl, now_ms: u64) -> Self {
        Session {
            id,
            board: Board::new(),
            players: Vec::with_capacity(Self::MAX_PLAYERS),
            status: SessionStatus::Waiting,
            result: None,
            time_control,
            clock: GameClock::new(time_control),
            last_move: None,
            last_activity_ms: now_ms,
        }
    }

    pub fn id(&self) -> &GameId {
        &self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn turn(&self) -> Color {
        self.board.turn()
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn fen(&self) -> String {
        self.board.fen()
    }

    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// Direct clock access, for tests and admin tooling.
    pub fn clock_mut(&mut self) -> &mut GameClock {
        &mut self.clock
    }

    pub fn last_activity_ms(&self) -> u64 {
        self.last_activity_ms
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    /// Seat a new player. Colors are handed out in join order.
    pub fn join(&mut self, name: &str, now_ms: u64) -> Result<JoinOutcome, SessionError> {
        if self.players.len() >= Self::MAX_PLAYERS || self.status != SessionStatus::Waiting {
            return Err(SessionError::Full);
        }

        let color = Color::SEATING[self.players.len()];
        let token = AuthToken::random();
        self.players.push(Player {
            name: name.to_string(),
            color,
            token: token.clone(),
            fairplay: FairplaySignals::new(),
        });

        let activated = self.players.len() == Self::MAX_PLAYERS;
        if activated {
            self.status = SessionStatus::Active;
            self.clock.start(now_ms);
        }
        self.touch(now_ms);

        Ok(JoinOutcome {
            color,
            token,
            activated,
            snapshot: self.snapshot(now_ms),
        })
    }

    pub fn submit_move(
        &mut self,
        request: &MoveRequest,
        now_ms: u64,
    ) -> Result<MoveOutcome, SessionError> {
        let seat = self
            .players
            .iter()
            .position(|p| p.color == request.color && p.token.matches(&request.credential))
            .ok_or(SessionError::Unauthorized)?;

        if self.status != SessionStatus::Active {
            return Err(SessionError::GameUnavailable);
        }
        if request.color != self.turn() {
            return Err(SessionError::OutOfTurn);
        }

        if self.clock.has_flagged(request.color, now_ms) {
            self.forfeit(request.color, now_ms);
            return Ok(self.outcome(seat, MoveKind::Forfeited, now_ms));
        }

        let next = self
            .board
            .play(request.from, request.to, request.promotion)?;

        let think_time_ms = self.clock.elapsed_ms(now_ms);
        if let Settlement::Flagged = self.clock.settle(request.color, now_ms) {
            // has_flagged above was false at the same instant.
            self.forfeit(request.color, now_ms);
            return Ok(self.outcome(seat, MoveKind::Forfeited, now_ms));
        }

        self.board = next;
        self.last_move = Some((request.from, request.to));
        self.players[seat].fairplay.record(think_time_ms);

        if let Some(result) = GameResult::from_board(self.board.status()) {
            self.finish(result);
        }
        self.touch(now_ms);

        Ok(self.outcome(
            seat,
            MoveKind::Played {
                from: request.from,
                to: request.to,
            },
            now_ms,
        ))
    }

    /// Settle a flag-fall for the side to move without waiting for it to
    /// submit. Returns the loser if the session just ended.
    pub fn expire_flag(&mut self, now_ms: u64) -> Option<Color> {
        if self.status != SessionStatus::Active {
            return None;
        }
        let turn = self.turn();
        if !self.clock.has_flagged(turn, now_ms) {
            return None;
        }
        self.forfeit(turn, now_ms);
        Some(turn)
    }

    fn forfeit(&mut self, loser: Color, now_ms: u64) {
        self.clock.settle(loser, now_ms);
        self.clock.set_remaining_ms(loser, 0);
        self.finish(GameResult::TimeForfeit { loser });
        self.touch(now_ms);
    }

    fn finish(&mut self, result: GameResult) {
        self.status = SessionStatus::Terminal;
        self.result = Some(result);
        self.clock.stop();
    }

    fn outcome(&self, seat: usize, kind: MoveKind, now_ms: u64) -> MoveOutcome {
        let player = &self.players[seat];
        MoveOutcome {
            mover: player.color,
            kind,
            fairplay: player.fairplay,
            snapshot: self.snapshot(now_ms),
        }
    }

    pub fn snapshot(&self, now_ms: u64) -> SessionSnapshot {
        SessionSnapshot {
            game_id: self.id.clone(),
            fen: self.board.fen(),
            status: self.status,
            turn: self.turn(),
            time_control: self.time_control,
            clock: self.clock.snapshot(self.turn(), now_ms),
            players: self.players.iter().map(Player::view).collect(),
            result: self.result,
            last_move: self.last_move,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::parse_square;

    fn active_session(tc: TimeControl, now: u64) -> (Session, AuthToken, AuthToken) {
        let mut s = Session::new(GameId::random(), tc, now);
        let white = s.join("alice", now).unwrap();
        let black = s.join("bob", now).unwrap();
        (s, white.token, black.token)
    }

    fn request(token: &AuthToken, color: Color, from: &str, to: &str) -> MoveRequest {
        MoveRequest {
            credential: token.as_str().to_string(),
            color,
            from: parse_square(from).unwrap(),
            to: parse_square(to).unwrap(),
            promotion: None,
        }
    }

    #[test]
    fn join_order_assigns_colors_and_activates() {
        let mut s = Session::new(GameId::random(), TimeControl::new(5, 0), 0);
        let first = s.join("alice", 0).unwrap();
        assert_eq!(first.color, Color::White);
        assert!(!first.activated);
        assert_eq!(s.status(), SessionStatus::Waiting);
        assert!(!s.clock().is_running());

        let second = s.join("bob", 10).unwrap();
        assert_eq!(second.color, Color::Black);
        assert!(second.activated);
        assert_eq!(s.status(), SessionStatus::Active);
        assert!(s.clock().is_running());

        assert_eq!(s.join("carol", 20).unwrap_err(), SessionError::Full);
    }

    #[test]
    fn unauthorized_beats_out_of_turn() {
        let (mut s, _white, black) = active_session(TimeControl::new(5, 0), 0);
        // Black's token presented as white: wrong seat.
        let err = s
            .submit_move(&request(&black, Color::White, "e2", "e4"), 10)
            .unwrap_err();
        assert_eq!(err, SessionError::Unauthorized);

        // Black's own seat but not black's turn.
        let err = s
            .submit_move(&request(&black, Color::Black, "e7", "e5"), 10)
            .unwrap_err();
        assert_eq!(err, SessionError::OutOfTurn);
    }

    #[test]
    fn waiting_session_rejects_moves() {
        let mut s = Session::new(GameId::random(), TimeControl::new(5, 0), 0);
        let white = s.join("alice", 0).unwrap();
        let err = s
            .submit_move(&request(&white.token, Color::White, "e2", "e4"), 10)
            .unwrap_err();
        assert_eq!(err, SessionError::GameUnavailable);
    }

    #[test]
    fn illegal_move_changes_nothing() {
        let (mut s, white, _) = active_session(TimeControl::new(5, 3), 0);
        let before = s.snapshot(1_000);
        let err = s
            .submit_move(&request(&white, Color::White, "e2", "e5"), 1_000)
            .unwrap_err();
        assert_eq!(err, SessionError::IllegalMove);
        assert_eq!(s.snapshot(1_000), before);
        assert_eq!(s.players()[0].fairplay.move_count, 0);
    }

    #[test]
    fn accepted_move_flips_turn_and_settles_clock() {
        let (mut s, white, _) = active_session(TimeControl::new(5, 2), 0);
        let out = s
            .submit_move(&request(&white, Color::White, "e2", "e4"), 4_000)
            .unwrap();
        assert_eq!(s.turn(), Color::Black);
        assert_eq!(out.snapshot.turn, Color::Black);
        assert_eq!(s.clock().remaining_ms(Color::White), 300_000 - 4_000 + 2_000);
        assert_eq!(s.clock().remaining_ms(Color::Black), 300_000);
        assert_eq!(out.fairplay.move_count, 1);
        assert_eq!(out.fairplay.fast_move_count, 0);
    }

    #[test]
    fn flag_wins_over_a_legal_move() {
        let (mut s, white, _) = active_session(TimeControl::new(5, 0), 0);
        s.clock_mut().set_remaining_ms(Color::White, 10);
        let before_fen = s.fen();

        let out = s
            .submit_move(&request(&white, Color::White, "e2", "e4"), 50)
            .unwrap();
        assert_eq!(out.kind, MoveKind::Forfeited);
        assert_eq!(s.status(), SessionStatus::Terminal);
        assert_eq!(s.result(), Some(GameResult::TimeForfeit { loser: Color::White }));
        assert_eq!(s.fen(), before_fen);
        assert_eq!(out.snapshot.clock.white_ms, 0);
    }

    #[test]
    fn flag_wins_over_an_illegal_move_too() {
        let (mut s, white, _) = active_session(TimeControl::new(5, 0), 0);
        s.clock_mut().set_remaining_ms(Color::White, 10);
        let out = s
            .submit_move(&request(&white, Color::White, "e2", "e5"), 50)
            .unwrap();
        assert_eq!(out.kind, MoveKind::Forfeited);
    }

    #[test]
    fn terminal_is_absorbing() {
        let (mut s, white, black) = active_session(TimeControl::new(5, 0), 0);
        for (token, color, from, to) in [
            (&white, Color::White, "f2", "f3"),
            (&black, Color::Black, "e7", "e5"),
            (&white, Color::White, "g2", "g4"),
            (&black, Color::Black, "d8", "h4"),
        ] {
            s.submit_move(&request(token, color, from, to), 100).unwrap();
        }
        assert_eq!(s.status(), SessionStatus::Terminal);
        assert_eq!(s.result(), Some(GameResult::Checkmate { winner: Color::Black }));
        assert!(!s.clock().is_running());

        let err = s
            .submit_move(&request(&white, Color::White, "e2", "e4"), 200)
            .unwrap_err();
        assert_eq!(err, SessionError::GameUnavailable);
        assert_eq!(s.expire_flag(10_000_000), None);
    }

    #[test]
    fn expire_flag_ends_idle_game() {
        let (mut s, _, _) = active_session(TimeControl::new(1, 0), 0);
        assert_eq!(s.expire_flag(59_999), None);
        assert_eq!(s.expire_flag(60_000), Some(Color::White));
        assert_eq!(s.result(), Some(GameResult::TimeForfeit { loser: Color::White }));
    }

    #[test]
    fn result_descriptions() {
        assert_eq!(
            GameResult::TimeForfeit { loser: Color::White }.description(),
            "White ran out of time, black wins"
        );
        assert_eq!(GameResult::TimeForfeit { loser: Color::White }.winner(), Some(Color::Black));
        assert_eq!(GameResult::Stalemate.winner(), None);
    }
}
