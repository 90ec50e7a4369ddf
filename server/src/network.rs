//! Connection handling and the single-writer server loop.
//!
//! One task per connection turns the socket into [`ServerMessage`]s on a
//! shared channel; [`Server::run`] owns the world and the session set,
//! applies every message sequentially, and fans snapshots back out. No
//! other task ever touches [`GameState`], which is what makes each
//! command's move/tag/separate sequence atomic.

use crate::game::{GameState, Phase};
use crate::obstacles;
use log::{debug, error, info, warn};
use shared::codec::{read_packet, write_packet};
use shared::Packet;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};

/// Events feeding the main server loop.
#[derive(Debug)]
pub enum ServerMessage {
    /// A session came up; snapshots for it go through `outbound`.
    Connected {
        player_id: u32,
        outbound: mpsc::UnboundedSender<Packet>,
    },
    /// One command read from the peer.
    Command { player_id: u32, packet: Packet },
    /// The session's read side ended, cleanly or not.
    Disconnected { player_id: u32 },
}

/// Authoritative game server: acceptor, sessions, clock and broadcaster.
pub struct Server {
    listener: Arc<TcpListener>,
    game_state: GameState,
    sessions: HashMap<u32, mpsc::UnboundedSender<Packet>>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
}

impl Server {
    /// Binds the listen socket and lays out the obstacle field. A port
    /// that is already taken surfaces here and is fatal to startup.
    pub async fn new(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();

        Ok(Server {
            listener: Arc::new(listener),
            game_state: GameState::new(obstacles::generate(&mut rand::thread_rng())),
            sessions: HashMap::new(),
            server_tx,
            server_rx,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections for the lifetime of the process, assigning
    /// player ids sequentially from 0.
    fn spawn_acceptor(&self) {
        let listener = Arc::clone(&self.listener);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut next_player_id: u32 = 0;

            loop {
                match listener.accept().await {
                    Ok((stream, addr)) => {
                        let player_id = next_player_id;
                        next_player_id += 1;
                        info!("New client from {} becomes player {}", addr, player_id);
                        spawn_session(stream, player_id, server_tx.clone());
                    }
                    Err(e) => {
                        error!("Error accepting connection: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Main loop: applies session events and the 1 Hz countdown, then
    /// broadcasts. The clock keeps ticking with nobody connected; ticks
    /// outside a running match do nothing.
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.spawn_acceptor();

        let mut clock = interval(Duration::from_secs(1));
        clock.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; swallow it.
        clock.tick().await;

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::Connected { player_id, outbound }) => {
                            self.sessions.insert(player_id, outbound);
                            self.game_state.add_player(player_id);
                            self.broadcast();
                        }
                        Some(ServerMessage::Command { player_id, packet }) => {
                            self.handle_command(player_id, packet);
                            self.broadcast();
                        }
                        Some(ServerMessage::Disconnected { player_id }) => {
                            self.drop_session(player_id);
                            self.broadcast();
                        }
                        None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                }

                _ = clock.tick() => {
                    if self.game_state.phase() == Phase::Running {
                        self.game_state.advance_clock();
                        self.broadcast();
                        if self.game_state.remaining_seconds() == 0 {
                            self.game_state.finish_match();
                            self.broadcast();
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_command(&mut self, player_id: u32, packet: Packet) {
        match packet {
            Packet::Ready => self.game_state.set_ready(player_id),
            Packet::Move { direction } => self.game_state.apply_move(player_id, direction),
            other => warn!("Unexpected packet from player {}: {:?}", player_id, other),
        }
    }

    fn drop_session(&mut self, player_id: u32) {
        self.sessions.remove(&player_id);
        self.game_state.remove_player(player_id);
    }

    /// Sends a fresh snapshot to every active session. A session that
    /// can no longer be written to counts as disconnected, and the
    /// smaller world is re-broadcast to the survivors.
    fn broadcast(&mut self) {
        loop {
            let snapshot = self.game_state.snapshot();
            let mut stale = Vec::new();
            for (id, outbound) in &self.sessions {
                if outbound.send(snapshot.clone()).is_err() {
                    stale.push(*id);
                }
            }

            if stale.is_empty() {
                break;
            }
            for player_id in stale {
                warn!("Dropping unreachable session for player {}", player_id);
                self.drop_session(player_id);
            }
        }
    }
}

/// Splits one accepted connection into a reader loop feeding the server
/// channel and a writer task draining this session's snapshot queue. The
/// assigned id is transmitted before anything else.
fn spawn_session(stream: TcpStream, player_id: u32, server_tx: mpsc::UnboundedSender<ServerMessage>) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Packet>();

    // Registration goes through the same channel as commands, so the
    // main loop always sees Connected before this player's commands.
    if server_tx
        .send(ServerMessage::Connected {
            player_id,
            outbound: outbound_tx,
        })
        .is_err()
    {
        return;
    }

    tokio::spawn(async move {
        let (mut reader, mut writer) = stream.into_split();

        let write_task = tokio::spawn(async move {
            if write_packet(&mut writer, &Packet::Welcome { player_id })
                .await
                .is_err()
            {
                return;
            }
            while let Some(packet) = outbound_rx.recv().await {
                if write_packet(&mut writer, &packet).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match read_packet(&mut reader).await {
                Ok(packet) => {
                    if server_tx
                        .send(ServerMessage::Command { player_id, packet })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    debug!("Player {} connection closed: {}", player_id, e);
                    break;
                }
            }
        }

        // Connection faults stay local to this session.
        let _ = server_tx.send(ServerMessage::Disconnected { player_id });
        write_task.abort();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Direction;
    use tokio_test::assert_ok;

    #[test]
    fn test_server_message_command() {
        let msg = ServerMessage::Command {
            player_id: 2,
            packet: Packet::Move {
                direction: Direction::Left,
            },
        };

        match msg {
            ServerMessage::Command { player_id, packet } => {
                assert_eq!(player_id, 2);
                assert_eq!(
                    packet,
                    Packet::Move {
                        direction: Direction::Left
                    }
                );
            }
            _ => panic!("Unexpected message type"),
        }
    }

    #[test]
    fn test_channel_communication() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

        tx.send(ServerMessage::Disconnected { player_id: 9 }).unwrap();

        match rx.try_recv().unwrap() {
            ServerMessage::Disconnected { player_id } => assert_eq!(player_id, 9),
            _ => panic!("Unexpected message type"),
        }
    }

    #[tokio::test]
    async fn test_commands_reach_the_world() {
        let mut server = tokio_test::assert_ok!(Server::new("127.0.0.1:0").await);

        let (outbound, mut snapshots) = mpsc::unbounded_channel();
        server.sessions.insert(0, outbound);
        server.game_state.add_player(0);

        server.handle_command(0, Packet::Ready);
        server.broadcast();

        assert_eq!(server.game_state.phase(), Phase::Running);
        match snapshots.try_recv().unwrap() {
            Packet::Snapshot { game_started, .. } => assert!(game_started),
            other => panic!("unexpected packet: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_broadcast_drops_unreachable_sessions() {
        let mut server = Server::new("127.0.0.1:0").await.unwrap();

        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (dead_tx, dead_rx) = mpsc::unbounded_channel();
        drop(dead_rx);

        server.sessions.insert(0, live_tx);
        server.game_state.add_player(0);
        server.sessions.insert(1, dead_tx);
        server.game_state.add_player(1);

        server.broadcast();

        // The dead session and its player are gone...
        assert!(!server.sessions.contains_key(&1));
        assert_eq!(server.game_state.player_count(), 1);

        // ...and the survivor eventually sees a world without them.
        let mut last = None;
        while let Ok(packet) = live_rx.try_recv() {
            last = Some(packet);
        }
        match last.expect("no snapshot delivered") {
            Packet::Snapshot { players, .. } => {
                assert_eq!(players.len(), 1);
                assert_eq!(players[0].id, 0);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}
