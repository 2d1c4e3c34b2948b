//! chess-server
//!
//! HTTP + WebSocket server for multiplayer chess sessions.

pub mod config;
pub mod types;
pub mod error;
pub mod handle;
pub mod rate_limit;
pub mod server;
pub mod session_task;
pub mod subscribers;

// request handlers, reached only through the router
mod http;
mod ws;

pub use config::{AllowedOrigins, Config};
pub use error::ApiError;
pub use server::{app, build_router, run, AppState};
