//! Mirror of the latest server snapshot.

use shared::{Obstacle, Packet, Player, GAME_DURATION_SECONDS};

/// Everything the renderer needs, replaced wholesale on each snapshot.
/// The server is authoritative; nothing here is ever simulated locally.
#[derive(Debug, Clone)]
pub struct ClientWorld {
    pub players: Vec<Player>,
    pub obstacles: Vec<Obstacle>,
    pub remaining_seconds: u32,
    pub game_over: bool,
    pub winner: Option<u32>,
    pub game_started: bool,
}

impl ClientWorld {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            obstacles: Vec::new(),
            remaining_seconds: GAME_DURATION_SECONDS,
            game_over: false,
            winner: None,
            game_started: false,
        }
    }

    /// Applies one server packet. Anything that is not a snapshot is
    /// ignored; the handshake consumes `Welcome` before we get here.
    pub fn apply(&mut self, packet: Packet) {
        if let Packet::Snapshot {
            players,
            obstacles,
            remaining_seconds,
            game_over,
            winner,
            game_started,
        } = packet
        {
            self.players = players;
            self.obstacles = obstacles;
            self.remaining_seconds = remaining_seconds;
            self.game_over = game_over;
            self.winner = winner;
            self.game_started = game_started;
        }
    }

    pub fn player(&self, id: u32) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn tagger(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_tagger)
    }
}

impl Default for ClientWorld {
    fn default() -> Self {
        Self::new()
    }
}
