//! Key sampling and command emission.

use macroquad::prelude::*;
use shared::{Direction, Packet, INPUT_RATE_HZ};
use std::time::{Duration, Instant};

/// At most one direction from the currently held keys, with priority
/// `UP > DOWN > LEFT > RIGHT` when several are held.
pub fn pick_direction(up: bool, down: bool, left: bool, right: bool) -> Option<Direction> {
    if up {
        Some(Direction::Up)
    } else if down {
        Some(Direction::Down)
    } else if left {
        Some(Direction::Left)
    } else if right {
        Some(Direction::Right)
    } else {
        None
    }
}

/// Turns raw key state into wire commands at the shared input rate.
pub struct InputManager {
    last_direction_sent: Instant,
    sample_interval: Duration,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            last_direction_sent: Instant::now(),
            sample_interval: Duration::from_millis(1000 / INPUT_RATE_HZ as u64),
        }
    }

    /// Commands to send this frame: a readiness signal on Space/Enter
    /// while waiting, and rate-limited movement once the match runs.
    /// Directional keys are ignored entirely before the match starts.
    pub fn update(&mut self, game_started: bool) -> Vec<Packet> {
        let mut commands = Vec::new();

        if !game_started && (is_key_pressed(KeyCode::Space) || is_key_pressed(KeyCode::Enter)) {
            commands.push(Packet::Ready);
        }

        if game_started && self.last_direction_sent.elapsed() >= self.sample_interval {
            let direction = pick_direction(
                is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
                is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
                is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
                is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
            );
            if let Some(direction) = direction {
                commands.push(Packet::Move { direction });
                self.last_direction_sent = Instant::now();
            }
        }

        commands
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
