//! macroquad drawing of the world and HUD.

use crate::game::ClientWorld;
use macroquad::prelude::*;
use shared::{Obstacle, ObstacleKind, Player, MAP_WIDTH, PLAYER_SIZE};

pub struct Renderer;

impl Renderer {
    pub fn new() -> Self {
        Renderer
    }

    pub fn render(&self, world: &ClientWorld, local_id: u32) {
        clear_background(Color::from_rgba(34, 51, 34, 255));

        for obstacle in &world.obstacles {
            self.draw_obstacle(obstacle);
        }
        for player in &world.players {
            self.draw_player(player, player.id == local_id);
        }

        self.draw_hud(world, local_id);
    }

    fn draw_obstacle(&self, obstacle: &Obstacle) {
        let color = match obstacle.kind {
            ObstacleKind::Rock => GRAY,
            ObstacleKind::Crate => Color::from_rgba(139, 94, 52, 255),
            ObstacleKind::Bush => DARKGREEN,
        };
        draw_rectangle(
            obstacle.x as f32,
            obstacle.y as f32,
            obstacle.width as f32,
            obstacle.height as f32,
            color,
        );
    }

    fn draw_player(&self, player: &Player, is_local: bool) {
        let color = if player.is_tagger {
            RED
        } else if is_local {
            GREEN
        } else {
            SKYBLUE
        };

        let x = player.x as f32;
        let y = player.y as f32;
        let size = PLAYER_SIZE as f32;

        draw_rectangle(x, y, size, size, color);
        let outline = if is_local { 3.0 } else { 1.0 };
        draw_rectangle_lines(x, y, size, size, outline, WHITE);

        draw_text(&player.name, x, y - 6.0, 16.0, WHITE);
    }

    fn draw_hud(&self, world: &ClientWorld, local_id: u32) {
        // Countdown, top center.
        let timer = format!("{}s", world.remaining_seconds);
        let dims = measure_text(&timer, None, 40, 1.0);
        draw_text(
            &timer,
            (MAP_WIDTH as f32 - dims.width) / 2.0,
            40.0,
            40.0,
            YELLOW,
        );

        // Scoreboard, top left.
        let mut line = 0.0;
        for player in &world.players {
            let marker = if player.is_tagger { " [IT]" } else { "" };
            let you = if player.id == local_id { " (you)" } else { "" };
            draw_text(
                &format!("{}: {}{}{}", player.name, player.score, marker, you),
                10.0,
                24.0 + line * 20.0,
                20.0,
                WHITE,
            );
            line += 1.0;
        }

        if !world.game_started {
            let ready = world.players.iter().filter(|p| p.is_ready).count();
            self.draw_banner(&format!(
                "Press SPACE when ready ({}/{} ready)",
                ready,
                world.players.len()
            ));
        } else if world.game_over {
            let text = match world.winner {
                Some(id) if id == local_id => "You win!".to_string(),
                Some(id) => format!("Player {} wins!", id),
                None => "It's a tie!".to_string(),
            };
            self.draw_banner(&text);
        }
    }

    fn draw_banner(&self, text: &str) {
        let dims = measure_text(text, None, 32, 1.0);
        draw_text(
            text,
            (MAP_WIDTH as f32 - dims.width) / 2.0,
            120.0,
            32.0,
            WHITE,
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
