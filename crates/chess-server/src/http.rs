//! HTTP handlers.
//!
//! Each handler decodes and validates its body, hands one command to the
//! session task and maps the reply to JSON. Bodies are taken as raw bytes
//! so that a malformed body is a 400 like any other validation error.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;

use chess_protocol::validation;
use chess_protocol::{
    decode_request, CreateGameRequest, CreateGameResponse, GameStateResponse, JoinGameRequest,
    JoinGameResponse, MoveRequestBody, MoveResponse, PracticeMoveRequest, PracticeMoveResponse,
    PracticeNewGameResponse,
};

use crate::error::ApiError;
use crate::rate_limit::CallerKey;
use crate::server::AppState;

pub async fn create_game(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    body: Bytes,
) -> Result<Json<CreateGameResponse>, ApiError> {
    if !state.lobby_limiter.check(&caller) {
        tracing::warn!(caller = %caller, "create rate-limited");
        return Err(ApiError::RateLimited);
    }
    let req: CreateGameRequest = decode_request(&body)?;
    let time_control = validation::time_control(&req)?;

    let created = state.sessions.create(time_control).await?;
    Ok(Json(CreateGameResponse::from(&created)))
}

pub async fn join_game(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    body: Bytes,
) -> Result<Json<JoinGameResponse>, ApiError> {
    if !state.lobby_limiter.check(&caller) {
        tracing::warn!(caller = %caller, "join rate-limited");
        return Err(ApiError::RateLimited);
    }
    let req: JoinGameRequest = decode_request(&body)?;
    let (game_id, name) = validation::join_request(&req)?;

    let joined = state.sessions.join(game_id, name).await?;
    Ok(Json(JoinGameResponse::from(&joined)))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<GameStateResponse>, ApiError> {
    let game_id = validation::game_id(&game_id)?;
    let snapshot = state.sessions.get(game_id).await?;
    Ok(Json(GameStateResponse::from(&snapshot)))
}

pub async fn multiplayer_move(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    body: Bytes,
) -> Result<Json<MoveResponse>, ApiError> {
    if !state.move_limiter.check(&caller) {
        tracing::warn!(caller = %caller, "move rate-limited");
        return Err(ApiError::RateLimited);
    }
    let req: MoveRequestBody = decode_request(&body)?;
    let (game_id, request) = validation::move_request(&req)?;

    let outcome = state.sessions.submit_move(game_id, request).await?;
    Ok(Json(MoveResponse::from(&outcome)))
}

pub async fn practice_new_game(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
) -> Result<Json<PracticeNewGameResponse>, ApiError> {
    if !state.lobby_limiter.check(&caller) {
        return Err(ApiError::RateLimited);
    }
    let (game_id, fen) = state.sessions.practice_new(caller).await?;
    Ok(Json(PracticeNewGameResponse {
        game_id: game_id.to_string(),
        fen,
    }))
}

pub async fn practice_move(
    State(state): State<AppState>,
    CallerKey(caller): CallerKey,
    body: Bytes,
) -> Result<Json<PracticeMoveResponse>, ApiError> {
    if !state.move_limiter.check(&caller) {
        return Err(ApiError::RateLimited);
    }
    let req: PracticeMoveRequest = decode_request(&body)?;
    let (game_id, from, to, promotion) = validation::practice_move(&req)?;

    let outcome = state
        .sessions
        .practice_move(game_id, caller, from, to, promotion)
        .await?;
    Ok(Json(PracticeMoveResponse::from(&outcome)))
}
