//! Binary HTTP + WebSocket server for multiplayer chess.

use chess_server::config::Config;
use chess_server::server;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chess_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!(
        bind_addr = %config.bind_addr,
        port = config.port,
        idle_timeout_secs = config.idle_timeout.as_secs(),
        gc_on_last_disconnect = config.gc_on_last_disconnect,
        "starting chess-server"
    );

    server::run(config).await
}
