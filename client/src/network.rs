//! TCP connection management on a background runtime thread.
//!
//! macroquad owns the main thread, so the socket lives on its own thread
//! running a small tokio runtime; packets cross over unbounded channels.
//! The render loop polls without blocking.

use log::{debug, info};
use shared::codec::{read_packet, write_packet};
use shared::Packet;
use std::io;
use std::thread;
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};

pub struct Connection {
    /// Id the server assigned during the handshake.
    pub player_id: u32,
    incoming: UnboundedReceiver<Packet>,
    outgoing: UnboundedSender<Packet>,
    closed: bool,
}

impl Connection {
    /// Connects and completes the handshake, blocking the caller until
    /// the server assigns a player id or the attempt fails.
    pub fn connect(addr: &str) -> io::Result<Connection> {
        let addr = addr.to_string();
        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let (handshake_tx, handshake_rx) = std::sync::mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = handshake_tx.send(Err(e));
                    return;
                }
            };
            runtime.block_on(run_connection(addr, handshake_tx, incoming_tx, outgoing_rx));
        });

        let player_id = handshake_rx.recv().map_err(|_| {
            io::Error::new(io::ErrorKind::ConnectionAborted, "network thread died")
        })??;

        Ok(Connection {
            player_id,
            incoming,
            outgoing,
            closed: false,
        })
    }

    /// Next packet from the server, if one is waiting.
    pub fn poll(&mut self) -> Option<Packet> {
        match self.incoming.try_recv() {
            Ok(packet) => Some(packet),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    pub fn send(&self, packet: Packet) {
        // A failed send means the connection is down; poll() reports it.
        let _ = self.outgoing.send(packet);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

async fn run_connection(
    addr: String,
    handshake_tx: std::sync::mpsc::Sender<io::Result<u32>>,
    incoming_tx: UnboundedSender<Packet>,
    mut outgoing_rx: UnboundedReceiver<Packet>,
) {
    let stream = match TcpStream::connect(&addr).await {
        Ok(stream) => stream,
        Err(e) => {
            let _ = handshake_tx.send(Err(e));
            return;
        }
    };
    let (mut reader, mut writer) = stream.into_split();

    // The server speaks first: a single Welcome with our id.
    let player_id = match read_packet(&mut reader).await {
        Ok(Packet::Welcome { player_id }) => player_id,
        Ok(other) => {
            let _ = handshake_tx.send(Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected Welcome, got {:?}", other),
            )));
            return;
        }
        Err(e) => {
            let _ = handshake_tx.send(Err(e));
            return;
        }
    };
    info!("Connected as player {}", player_id);
    if handshake_tx.send(Ok(player_id)).is_err() {
        return;
    }

    let writer_task = tokio::spawn(async move {
        while let Some(packet) = outgoing_rx.recv().await {
            if write_packet(&mut writer, &packet).await.is_err() {
                break;
            }
        }
    });

    loop {
        match read_packet(&mut reader).await {
            Ok(packet) => {
                if incoming_tx.send(packet).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Server connection closed: {}", e);
                break;
            }
        }
    }
    writer_task.abort();
    // Dropping incoming_tx is what the render loop observes as closed.
}
