//! Configuration for the chess session server.
//!
//! Defaults can be overridden via environment variables (a `.env` file is
//! loaded first by the binary):
//!
//! - `CHESS_BIND_ADDR`             (default: "0.0.0.0")
//! - `CHESS_PORT` / `PORT`         (default: "3001")
//! - `CHESS_ALLOWED_ORIGINS`       (default: "http://localhost:3000", `*` = any)
//! - `CHESS_MAX_CONNECTIONS`       (default: "1024")
//! - `CHESS_IDLE_TIMEOUT_SECS`     (default: "600")
//! - `CHESS_SWEEP_INTERVAL_MS`     (default: "1000")
//! - `CHESS_GC_ON_LAST_DISCONNECT` (default: "true")
//! - `CHESS_LOBBY_LIMIT_PER_MIN`   (default: "20")
//! - `CHESS_MOVE_LIMIT_PER_SEC`    (default: "10")
//! - `CHESS_OUTBOUND_BUFFER`       (default: "64")

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

/// Origins allowed to open a realtime connection (and to call the API
/// from a browser).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Comma-separated list; a lone `*` means any origin.
    pub fn parse(raw: &str) -> Self {
        let entries: Vec<String> = raw
            .split(',')
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if entries.iter().any(|s| s == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(entries)
        }
    }

    /// A missing `Origin` header is allowed: browsers always send one
    /// on a WebSocket handshake, so only non-browser clients omit it.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (self, origin) {
            (AllowedOrigins::Any, _) => true,
            (AllowedOrigins::List(_), None) => true,
            (AllowedOrigins::List(list), Some(origin)) => {
                let origin = origin.trim_end_matches('/');
                list.iter().any(|allowed| allowed == origin)
            }
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// IP address / interface to bind to (e.g. "0.0.0.0" or "127.0.0.1").
    pub bind_addr: String,

    /// TCP port to listen on.
    pub port: u16,

    pub allowed_origins: AllowedOrigins,

    /// Maximum number of simultaneously open realtime connections.
    pub max_connections: usize,

    /// Sessions and practice boards with no activity and no subscribers
    /// for this long are dropped.
    pub idle_timeout: Duration,

    /// How often the session task checks for flag-falls and idle games.
    pub sweep_interval: Duration,

    /// Drop a session as soon as its last realtime subscriber leaves.
    pub gc_on_last_disconnect: bool,

    /// Create/join requests per caller per minute (0 disables).
    pub lobby_limit_per_min: u32,

    /// Move requests per caller per second (0 disables).
    pub move_limit_per_sec: u32,

    /// Per-connection queue of unsent realtime events.
    pub outbound_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "0.0.0.0".to_string(),
            port: 3001,
            allowed_origins: AllowedOrigins::List(vec!["http://localhost:3000".to_string()]),
            max_connections: 1024,
            idle_timeout: Duration::from_secs(600),
            sweep_interval: Duration::from_millis(1_000),
            gc_on_last_disconnect: true,
            lobby_limit_per_min: 20,
            move_limit_per_sec: 10,
            outbound_buffer: 64,
        }
    }
}

impl Config {
    /// Construct a `Config` from environment variables, falling back
    /// to the defaults above.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Config::default();

        let bind_addr = env::var("CHESS_BIND_ADDR").unwrap_or(defaults.bind_addr);
        let port = match env::var("CHESS_PORT").or_else(|_| env::var("PORT")) {
            Ok(val) => val
                .parse::<u16>()
                .with_context(|| format!("invalid port: {val:?}"))?,
            Err(_) => defaults.port,
        };
        let allowed_origins = env::var("CHESS_ALLOWED_ORIGINS")
            .map(|raw| AllowedOrigins::parse(&raw))
            .unwrap_or(defaults.allowed_origins);

        Ok(Config {
            bind_addr,
            port,
            allowed_origins,
            max_connections: read_env_or_default("CHESS_MAX_CONNECTIONS", defaults.max_connections)?,
            idle_timeout: Duration::from_secs(read_env_or_default(
                "CHESS_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?),
            sweep_interval: Duration::from_millis(read_env_or_default(
                "CHESS_SWEEP_INTERVAL_MS",
                millis(defaults.sweep_interval),
            )?),
            gc_on_last_disconnect: read_env_or_default(
                "CHESS_GC_ON_LAST_DISCONNECT",
                defaults.gc_on_last_disconnect,
            )?,
            lobby_limit_per_min: read_env_or_default(
                "CHESS_LOBBY_LIMIT_PER_MIN",
                defaults.lobby_limit_per_min,
            )?,
            move_limit_per_sec: read_env_or_default(
                "CHESS_MOVE_LIMIT_PER_SEC",
                defaults.move_limit_per_sec,
            )?,
            outbound_buffer: read_env_or_default("CHESS_OUTBOUND_BUFFER", defaults.outbound_buffer)?,
        })
    }

    /// Convenience: `addr:port` socket string.
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn read_env_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {key}: {val:?}")),
        Err(_) => Ok(default),
    }
}
