use std::env;
use std::error::Error;

use chess_protocol::{decode_event, ServerEvent};
use futures_util::StreamExt;
use tokio_tungstenite::tungstenite::Message;

/// Print every event pushed for one game.
///
/// Usage: `cargo run --example watch_game -- ABC123`
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let game_id = env::args()
        .nth(1)
        .ok_or("usage: watch_game <GAME_ID>")?;
    // Where to connect: env override or default.
    let base = env::var("CHESS_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001".to_string());
    let url = format!("{base}/ws?gameId={game_id}");

    println!("Connecting to {}...", url);
    let (mut ws, _) = tokio_tungstenite::connect_async(url.as_str()).await?;
    println!("Connected. Ctrl-C to leave.\n");

    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) => match decode_event(&text) {
                Ok(event) => print_event(&event),
                Err(e) => println!("?? undecodable event ({e}): {text}"),
            },
            Message::Close(frame) => {
                match frame {
                    Some(f) => println!("closed by server: {} {}", u16::from(f.code), f.reason),
                    None => println!("closed by server"),
                }
                break;
            }
            _ => {}
        }
    }

    Ok(())
}

fn print_event(event: &ServerEvent) {
    match event {
        ServerEvent::Sync(state) => {
            println!("[sync]   {} to move, status {}", state.current_player, state.status);
            println!("         {}", state.fen);
        }
        ServerEvent::Joined(joined) => {
            println!(
                "[joined] {} plays {} ({} seated, status {})",
                joined.player.name,
                joined.player.color,
                joined.players.len(),
                joined.status
            );
        }
        ServerEvent::Move(mv) => {
            println!(
                "[move]   {}{}  w {}ms  b {}ms",
                mv.from, mv.to, mv.clock.w_ms, mv.clock.b_ms
            );
            if let Some(result) = &mv.outcome.result {
                println!("         game over: {}", result);
            }
        }
        ServerEvent::Flag(flag) => {
            println!("[flag]   {} ran out of time", flag.loser);
        }
    }
}
