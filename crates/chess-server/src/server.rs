//! Listener and top-level server wiring.
//!
//! This module:
//! - Spawns the single session task that owns every game.
//! - Builds the axum router (HTTP API + realtime endpoint) with CORS,
//!   request tracing and a panic catch-all.
//! - Listens on the configured address/port until ctrl-c.
//!
//! Per-request logic lives in `http` and `ws`; the state machine driver
//! lives in `session_task`.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chess_core::{SessionRegistry, SystemTimeSource, TimeSource};
use chess_protocol::ErrorBody;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{AllowedOrigins, Config};
use crate::handle::SessionHandle;
use crate::http;
use crate::rate_limit::RateLimiter;
use crate::session_task::{run_session_loop, LoopSettings};
use crate::types::{CommandRx, CommandTx};
use crate::ws::{self, ConnectionGauge};

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionHandle,
    pub lobby_limiter: Arc<RateLimiter>,
    pub move_limiter: Arc<RateLimiter>,
    pub allowed_origins: Arc<AllowedOrigins>,
    pub connections: Arc<ConnectionGauge>,
    pub max_connections: usize,
    pub outbound_buffer: usize,
}

impl AppState {
    pub fn new(config: &Config, sessions: SessionHandle) -> Self {
        AppState {
            sessions,
            lobby_limiter: Arc::new(RateLimiter::per_minute(config.lobby_limit_per_min)),
            move_limiter: Arc::new(RateLimiter::per_second(config.move_limit_per_sec)),
            allowed_origins: Arc::new(config.allowed_origins.clone()),
            connections: Arc::new(ConnectionGauge::new()),
            max_connections: config.max_connections,
            outbound_buffer: config.outbound_buffer,
        }
    }
}

/// Spawn the session task with an empty registry and return its handle.
pub fn spawn_session_task(config: &Config, clock: Arc<dyn TimeSource>) -> SessionHandle {
    let (command_tx, command_rx): (CommandTx, CommandRx) = mpsc::unbounded_channel();
    let settings = LoopSettings::from(config);
    tokio::spawn(run_session_loop(
        command_rx,
        SessionRegistry::new(),
        clock,
        settings,
    ));
    SessionHandle::new(command_tx)
}

/// Routes plus middleware, ready to serve.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .route("/create-multiplayer-game", post(http::create_game))
        .route("/join-game", post(http::join_game))
        .route("/game/{game_id}", get(http::get_game))
        .route("/multiplayer-move", post(http::multiplayer_move))
        .route("/new-game", post(http::practice_new_game))
        .route("/move", post(http::practice_move))
        .route("/", get(ws::ws_handler))
        .route("/ws", get(ws::ws_handler))
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Session task + router in one call. Needs a running tokio runtime.
pub fn app(config: &Config, clock: Arc<dyn TimeSource>) -> Router {
    let sessions = spawn_session_task(config, clock);
    build_router(AppState::new(config, sessions))
}

/// Run the server with the given configuration.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %addr,
        max_connections = config.max_connections,
        origins = ?config.allowed_origins,
        "listening"
    );

    let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource::new());
    let router = app(&config, clock);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn cors_layer(origins: &AllowedOrigins) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    match origins {
        AllowedOrigins::Any => base.allow_origin(AnyOrigin),
        AllowedOrigins::List(list) => {
            let values: Vec<HeaderValue> = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        tracing::warn!(origin = %o, "ignoring unparsable allowed origin");
                        None
                    }
                })
                .collect();
            base.allow_origin(AllowOrigin::list(values))
        }
    }
}

fn panic_response(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: "internal server error".to_string(),
        }),
    )
        .into_response()
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
