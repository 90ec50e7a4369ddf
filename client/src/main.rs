use clap::Parser;
use client::game::ClientWorld;
use client::input::InputManager;
use client::network::Connection;
use client::rendering::Renderer;
use log::info;
use macroquad::prelude::*;
use shared::{DEFAULT_PORT, MAP_HEIGHT, MAP_WIDTH};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server host to connect to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

fn window_conf() -> Conf {
    Conf {
        window_title: "Tag".to_string(),
        window_width: MAP_WIDTH,
        window_height: MAP_HEIGHT,
        window_resizable: false,
        ..Default::default()
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    info!("Connecting to {}", addr);
    let mut connection = match Connection::connect(&addr) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Could not connect to server at {}: {}", addr, e);
            return;
        }
    };
    info!("Joined as player {}", connection.player_id);
    info!("Controls: WASD/arrows to move, Space to ready up");

    let mut world = ClientWorld::new();
    let mut input = InputManager::new();
    let renderer = Renderer::new();

    loop {
        while let Some(packet) = connection.poll() {
            world.apply(packet);
        }
        if connection.is_closed() {
            info!("Server connection closed");
            break;
        }

        for command in input.update(world.game_started) {
            connection.send(command);
        }

        renderer.render(&world, connection.player_id);
        next_frame().await;
    }
}
