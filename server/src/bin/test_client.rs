//! Headless smoke-test client: connects, readies up, then wanders
//! randomly until the match ends. Useful for exercising the server
//! without a window, e.g. `cargo run --bin test_client -- 127.0.0.1:8080`.

use rand::seq::SliceRandom;
use shared::codec::{read_packet, write_packet};
use shared::{Direction, Packet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::interval;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    println!("Connecting to {}", addr);
    let stream = TcpStream::connect(&addr).await?;
    let (mut reader, mut writer) = stream.into_split();

    let player_id = match read_packet(&mut reader).await? {
        Packet::Welcome { player_id } => player_id,
        other => {
            println!("Expected Welcome but got: {:?}", other);
            return Ok(());
        }
    };
    println!("Connected as player {}", player_id);

    println!("Sending READY");
    write_packet(&mut writer, &Packet::Ready).await?;

    // Movement runs on its own task so the snapshot reader never has to
    // race it; the flag flips once the server reports the match started.
    let started = Arc::new(AtomicBool::new(false));
    let mover = {
        let started = Arc::clone(&started);
        tokio::spawn(async move {
            let directions = [
                Direction::Up,
                Direction::Down,
                Direction::Left,
                Direction::Right,
            ];
            let mut ticker = interval(Duration::from_millis(33));
            loop {
                ticker.tick().await;
                if !started.load(Ordering::Relaxed) {
                    continue;
                }
                let direction = *directions.choose(&mut rand::thread_rng()).unwrap();
                if write_packet(&mut writer, &Packet::Move { direction })
                    .await
                    .is_err()
                {
                    break;
                }
            }
        })
    };

    let mut snapshots_seen: u64 = 0;
    loop {
        match read_packet(&mut reader).await? {
            Packet::Snapshot {
                players,
                remaining_seconds,
                game_over,
                winner,
                game_started,
                ..
            } => {
                started.store(game_started, Ordering::Relaxed);
                snapshots_seen += 1;
                if snapshots_seen % 30 == 1 {
                    println!(
                        "t={}s players={} tagger={:?}",
                        remaining_seconds,
                        players.len(),
                        players.iter().find(|p| p.is_tagger).map(|p| p.id)
                    );
                }
                if game_over {
                    match winner {
                        Some(id) => println!("Game over, player {} wins", id),
                        None => println!("Game over, tie"),
                    }
                    break;
                }
            }
            other => println!("Unexpected packet: {:?}", other),
        }
    }

    mover.abort();
    println!("Test client finished after {} snapshots", snapshots_seen);
    Ok(())
}
