//! chess-core
//!
//! Pure multiplayer session logic:
//! - colors, time controls and the lazily-evaluated clock
//! - board wrapper over the `shakmaty` rules engine
//! - per-session turn/authorization state machine
//! - fair-play signal accumulation
//! - in-memory session registry (plus untimed practice boards)

pub mod color;
pub mod time_control;
pub mod clock;
pub mod fairplay;
pub mod rules;
pub mod ids;
pub mod messages;
pub mod session;
pub mod practice;
pub mod registry;
pub mod error;

pub use color::Color;
pub use time_control::TimeControl;
pub use clock::{ClockSnapshot, GameClock, ManualTimeSource, Settlement, SystemTimeSource, TimeSource};
pub use fairplay::{FairplaySignals, FAST_MOVE_THRESHOLD_MS};
pub use rules::{parse_square, Board, BoardStatus, Promotion};
pub use ids::{AuthToken, GameId};

pub use messages::{
    CreatedSession,
    JoinOutcome,
    MoveKind,
    MoveOutcome,
    MoveRequest,
    PlayerView,
    PracticeOutcome,
    SessionSnapshot,
};

pub use session::{GameResult, Player, Session, SessionStatus};
pub use registry::{ExpiredFlag, SessionRegistry};
pub use error::{RulesError, SessionError};

pub use shakmaty::Square;
