//! JSON wire types.
//!
//! Request bodies are deserialized as-is and checked in
//! [`crate::validation`]; response bodies and realtime events are built
//! from the core's snapshots via the `From` impls at the bottom.
//!
//! Field names are camelCase on the wire. Colors are `"w"` / `"b"`.

use serde::{Deserialize, Serialize};

use chess_core::{
    ClockSnapshot, Color, CreatedSession, FairplaySignals, GameResult, JoinOutcome, MoveKind,
    MoveOutcome, PlayerView, PracticeOutcome, SessionSnapshot, TimeControl,
};

// -----------------------------------------------------------------------------
// Shared views
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeControlView {
    pub minutes: u32,
    /// Seconds added after each move.
    pub increment: u32,
}

/// Remaining time per side, already adjusted for the running side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockView {
    pub w_ms: u64,
    pub b_ms: u64,
    pub increment_ms: u64,
    pub running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub name: String,
    pub color: String,
}

/// Game outcome, flattened into the object that carries it.
///
/// `result` is display text, e.g. `"Checkmate, black wins"`.
/// All three fields are null while the game is still running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub result: Option<String>,
    /// `checkmate`, `stalemate`, `time_forfeit`, ...
    pub result_reason: Option<String>,
    /// Null for draws.
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairplayView {
    pub move_count: u32,
    pub fast_move_count: u32,
    pub suspicion_score: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMoveView {
    pub from: String,
    pub to: String,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -----------------------------------------------------------------------------
// Multiplayer lobby and moves
// -----------------------------------------------------------------------------

/// `POST /create-multiplayer-game`. Both fields are optional; an empty
/// body gets the default time control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameRequest {
    pub minutes: Option<u32>,
    pub increment: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGameResponse {
    pub game_id: String,
    pub fen: String,
    pub time_control: TimeControlView,
    pub clock: ClockView,
}

/// `POST /join-game`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameRequest {
    pub game_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinGameResponse {
    pub game_id: String,
    pub color: String,
    pub fen: String,
    pub current_player: String,
    /// Seat credential. Returned exactly once, to this caller only.
    pub token: String,
    pub status: String,
    pub time_control: TimeControlView,
    pub clock: ClockView,
    pub players: Vec<PlayerInfo>,
}

/// `GET /game/{gameId}` and the `sync` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStateResponse {
    pub game_id: String,
    pub fen: String,
    pub players: Vec<PlayerInfo>,
    pub status: String,
    pub current_player: String,
    pub time_control: TimeControlView,
    pub clock: ClockView,
    pub is_game_over: bool,
    #[serde(flatten)]
    pub outcome: ResultView,
    pub last_move: Option<LastMoveView>,
}

/// `POST /multiplayer-move`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequestBody {
    pub game_id: String,
    pub from: String,
    pub to: String,
    pub player_color: String,
    pub auth_token: String,
    /// `q`, `r`, `b` or `n`; queen when absent.
    #[serde(default)]
    pub promotion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub fen: String,
    pub current_player: String,
    pub status: String,
    pub is_game_over: bool,
    /// True when the request lost on time instead of being played.
    pub forfeited: bool,
    #[serde(flatten)]
    pub outcome: ResultView,
    pub clock: ClockView,
    pub fairplay: FairplayView,
}

// -----------------------------------------------------------------------------
// Practice boards
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeNewGameResponse {
    pub game_id: String,
    pub fen: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeMoveRequest {
    /// Absent: the caller's own default board.
    #[serde(default)]
    pub game_id: Option<String>,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub promotion: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeMoveResponse {
    pub fen: String,
    pub is_game_over: bool,
    #[serde(flatten)]
    pub outcome: ResultView,
}

// -----------------------------------------------------------------------------
// Realtime events (server -> subscriber)
// -----------------------------------------------------------------------------

/// Everything pushed over a realtime channel. Tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Full state, sent once on subscribe.
    Sync(GameStateResponse),

    /// An accepted move.
    Move(MoveEvent),

    /// A player took a seat.
    Joined(JoinedEvent),

    /// A side ran out of time.
    Flag(FlagEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    pub fen: String,
    pub from: String,
    pub to: String,
    pub current_player: String,
    pub is_game_over: bool,
    #[serde(flatten)]
    pub outcome: ResultView,
    pub clock: ClockView,
    /// Mover's signals.
    pub fairplay: FairplayView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEvent {
    pub player: PlayerInfo,
    pub players: Vec<PlayerInfo>,
    pub status: String,
    pub current_player: String,
    pub clock: ClockView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagEvent {
    pub loser: String,
    pub fen: String,
    pub current_player: String,
    pub is_game_over: bool,
    #[serde(flatten)]
    pub outcome: ResultView,
    pub clock: ClockView,
}

// -----------------------------------------------------------------------------
// Conversions from core types
// -----------------------------------------------------------------------------

pub fn color_str(color: Color) -> String {
    color.as_char().to_string()
}

impl From<TimeControl> for TimeControlView {
    fn from(tc: TimeControl) -> Self {
        TimeControlView {
            minutes: tc.minutes,
            increment: tc.increment_secs,
        }
    }
}

impl From<ClockSnapshot> for ClockView {
    fn from(c: ClockSnapshot) -> Self {
        ClockView {
            w_ms: c.white_ms,
            b_ms: c.black_ms,
            increment_ms: c.increment_ms,
            running: c.running,
        }
    }
}

impl From<&PlayerView> for PlayerInfo {
    fn from(p: &PlayerView) -> Self {
        PlayerInfo {
            name: p.name.clone(),
            color: color_str(p.color),
        }
    }
}

impl From<Option<GameResult>> for ResultView {
    fn from(r: Option<GameResult>) -> Self {
        match r {
            Some(r) => ResultView {
                result: Some(r.description()),
                result_reason: Some(r.reason().to_string()),
                winner: r.winner().map(color_str),
            },
            None => ResultView::default(),
        }
    }
}

impl From<FairplaySignals> for FairplayView {
    fn from(f: FairplaySignals) -> Self {
        FairplayView {
            move_count: f.move_count,
            fast_move_count: f.fast_move_count,
            suspicion_score: f.suspicion_score,
        }
    }
}

fn players(snapshot: &SessionSnapshot) -> Vec<PlayerInfo> {
    snapshot.players.iter().map(PlayerInfo::from).collect()
}

impl From<&CreatedSession> for CreateGameResponse {
    fn from(c: &CreatedSession) -> Self {
        CreateGameResponse {
            game_id: c.game_id.to_string(),
            fen: c.fen.clone(),
            time_control: c.time_control.into(),
            clock: c.clock.into(),
        }
    }
}

impl From<&JoinOutcome> for JoinGameResponse {
    fn from(j: &JoinOutcome) -> Self {
        let s = &j.snapshot;
        JoinGameResponse {
            game_id: s.game_id.to_string(),
            color: color_str(j.color),
            fen: s.fen.clone(),
            current_player: color_str(s.turn),
            token: j.token.as_str().to_string(),
            status: s.status.as_str().to_string(),
            time_control: s.time_control.into(),
            clock: s.clock.into(),
            players: players(s),
        }
    }
}

impl From<&SessionSnapshot> for GameStateResponse {
    fn from(s: &SessionSnapshot) -> Self {
        GameStateResponse {
            game_id: s.game_id.to_string(),
            fen: s.fen.clone(),
            players: players(s),
            status: s.status.as_str().to_string(),
            current_player: color_str(s.turn),
            time_control: s.time_control.into(),
            clock: s.clock.into(),
            is_game_over: s.is_game_over(),
            outcome: s.result.into(),
            last_move: s.last_move.map(|(from, to)| LastMoveView {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

impl From<&MoveOutcome> for MoveResponse {
    fn from(m: &MoveOutcome) -> Self {
        let s = &m.snapshot;
        MoveResponse {
            fen: s.fen.clone(),
            current_player: color_str(s.turn),
            status: s.status.as_str().to_string(),
            is_game_over: s.is_game_over(),
            forfeited: m.kind == MoveKind::Forfeited,
            outcome: s.result.into(),
            clock: s.clock.into(),
            fairplay: m.fairplay.into(),
        }
    }
}

impl From<&PracticeOutcome> for PracticeMoveResponse {
    fn from(p: &PracticeOutcome) -> Self {
        PracticeMoveResponse {
            fen: p.fen.clone(),
            is_game_over: p.result.is_some(),
            outcome: p.result.into(),
        }
    }
}

impl ServerEvent {
    pub fn sync(snapshot: &SessionSnapshot) -> Self {
        ServerEvent::Sync(snapshot.into())
    }

    /// The event to fan out after an accepted move request.
    ///
    /// A forfeited request produces a `flag` event rather than a `move`.
    pub fn from_move(outcome: &MoveOutcome) -> Self {
        let s = &outcome.snapshot;
        match outcome.kind {
            MoveKind::Played { from, to } => ServerEvent::Move(MoveEvent {
                fen: s.fen.clone(),
                from: from.to_string(),
                to: to.to_string(),
                current_player: color_str(s.turn),
                is_game_over: s.is_game_over(),
                outcome: s.result.into(),
                clock: s.clock.into(),
                fairplay: outcome.fairplay.into(),
            }),
            MoveKind::Forfeited => ServerEvent::flag(outcome.mover, s),
        }
    }

    pub fn joined(outcome: &JoinOutcome) -> Self {
        let s = &outcome.snapshot;
        let player = s
            .players
            .iter()
            .find(|p| p.color == outcome.color)
            .map(PlayerInfo::from)
            .unwrap_or_else(|| PlayerInfo {
                name: String::new(),
                color: color_str(outcome.color),
            });
        ServerEvent::Joined(JoinedEvent {
            player,
            players: players(s),
            status: s.status.as_str().to_string(),
            current_player: color_str(s.turn),
            clock: s.clock.into(),
        })
    }

    pub fn flag(loser: Color, snapshot: &SessionSnapshot) -> Self {
        ServerEvent::Flag(FlagEvent {
            loser: color_str(loser),
            fen: snapshot.fen.clone(),
            current_player: color_str(snapshot.turn),
            is_game_over: snapshot.is_game_over(),
            outcome: snapshot.result.into(),
            clock: snapshot.clock.into(),
        })
    }

    /// Event name as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Sync(_) => "sync",
            ServerEvent::Move(_) => "move",
            ServerEvent::Joined(_) => "joined",
            ServerEvent::Flag(_) => "flag",
        }
    }
}
