//! chess-protocol
//!
//! Wire-level JSON for the chess session server.
//!
//! This crate turns HTTP bodies into validated core requests, and core
//! snapshots/outcomes into response bodies and realtime events.
//!
//! - [`wire_types`] : request/response/event shapes (camelCase JSON)
//! - [`validation`] : identifier, square, name, token and time-control rules
//! - [`json_codec`] : body decoding and event framing

pub mod wire_types;
pub mod validation;
pub mod json_codec;

pub use validation::ValidationError;

pub use json_codec::{decode_event, decode_request, encode_event};

pub use wire_types::{
    ClockView,
    CreateGameRequest,
    CreateGameResponse,
    ErrorBody,
    FairplayView,
    FlagEvent,
    GameStateResponse,
    JoinGameRequest,
    JoinGameResponse,
    JoinedEvent,
    MoveEvent,
    MoveRequestBody,
    MoveResponse,
    PlayerInfo,
    PracticeMoveRequest,
    PracticeMoveResponse,
    PracticeNewGameResponse,
    ResultView,
    ServerEvent,
    TimeControlView,
};
