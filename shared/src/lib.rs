//! Rules and protocol shared between the tag server and its clients.
//!
//! Everything that has to agree on both sides of the wire lives here: map
//! geometry, hitbox sizes, movement speed, match duration, the packet
//! schema and its frame codec. If a constant in this file changes, server
//! and client must be rebuilt together or the game desyncs.

pub mod codec;

use serde::{Deserialize, Serialize};

pub const MAP_WIDTH: i32 = 1000;
pub const MAP_HEIGHT: i32 = 600;
pub const PLAYER_SIZE: i32 = 30;
/// Inward shrink applied to a player's box before tag and push-apart
/// tests, making collisions feel tighter than the sprite.
pub const HITBOX_PADDING: i32 = 5;
/// Distance covered by one movement command.
pub const PLAYER_SPEED: i32 = 5;
pub const GAME_DURATION_SECONDS: u32 = 60;
pub const NUM_OBSTACLES: usize = 15;
/// Minimum gap enforced between obstacles at generation time.
pub const MIN_OBSTACLE_DISTANCE: i32 = 25;
/// Margin kept between the map edge and anything spawned at startup.
pub const SPAWN_MARGIN: i32 = PLAYER_SIZE + HITBOX_PADDING;
/// Rate at which a well-behaved client samples held keys into commands.
pub const INPUT_RATE_HZ: u32 = 30;
pub const DEFAULT_PORT: u16 = 8080;

/// Axis-aligned box; the only geometry primitive the game needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Strict AABB overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.x + other.w
            && self.x + self.w > other.x
            && self.y < other.y + other.h
            && self.y + self.h > other.y
    }

    /// The box shrunk by `margin` on every side.
    pub fn shrink(&self, margin: i32) -> Rect {
        Rect {
            x: self.x + margin,
            y: self.y + margin,
            w: self.w - 2 * margin,
            h: self.h - 2 * margin,
        }
    }

    /// The box grown by `margin` on every side.
    pub fn grow(&self, margin: i32) -> Rect {
        self.shrink(-margin)
    }
}

/// A movement intent. Map coordinates grow right and down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Unit offset of this direction in map coordinates.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// The three obstacle sprites, each with a fixed footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObstacleKind {
    Rock,
    Crate,
    Bush,
}

impl ObstacleKind {
    pub const ALL: [ObstacleKind; 3] =
        [ObstacleKind::Rock, ObstacleKind::Crate, ObstacleKind::Bush];

    pub fn size(self) -> (i32, i32) {
        match self {
            ObstacleKind::Rock => (125, 125),
            ObstacleKind::Crate => (100, 100),
            ObstacleKind::Bush => (60, 60),
        }
    }
}

/// Static rectangle placed once at server start, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub kind: ObstacleKind,
}

impl Obstacle {
    pub fn new(x: i32, y: i32, kind: ObstacleKind) -> Self {
        let (width, height) = kind.size();
        Self {
            x,
            y,
            width,
            height,
            kind,
        }
    }

    /// Full extents; obstacles are never padded in collision tests.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub score: u32,
    pub is_tagger: bool,
    pub name: String,
    /// Meaningful only before the match starts.
    pub is_ready: bool,
}

impl Player {
    pub fn new(id: u32, x: i32, y: i32) -> Self {
        Self {
            id,
            x,
            y,
            score: 0,
            is_tagger: false,
            name: format!("P{}", id),
            is_ready: false,
        }
    }

    /// Full visual box.
    pub fn bounds(&self) -> Rect {
        Rect::new(self.x, self.y, PLAYER_SIZE, PLAYER_SIZE)
    }

    /// Box used for tag and push-apart tests.
    pub fn hitbox(&self) -> Rect {
        self.bounds().shrink(HITBOX_PADDING)
    }
}

/// True when the padded boxes of two players overlap.
pub fn hitboxes_overlap(a: &Player, b: &Player) -> bool {
    a.hitbox().overlaps(&b.hitbox())
}

/// Every message that crosses the wire, in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    // Client -> server
    Ready,
    Move {
        direction: Direction,
    },

    // Server -> client
    /// Sent exactly once, immediately after the connection is accepted.
    Welcome {
        player_id: u32,
    },
    /// Atomic copy of the world, pushed after every command and clock tick.
    Snapshot {
        players: Vec<Player>,
        obstacles: Vec<Obstacle>,
        remaining_seconds: u32,
        game_over: bool,
        winner: Option<u32>,
        game_started: bool,
    },
}
