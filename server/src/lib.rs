//! # Tag Game Server Library
//!
//! Authoritative server for the multiplayer tag game. The server owns the
//! canonical world (players, obstacle layout, countdown, match phase),
//! applies every client command against it, and pushes state snapshots to
//! all connected clients.
//!
//! ## Architecture
//!
//! The server is a single-writer actor. Each accepted connection gets a
//! pair of IO tasks that translate the socket into messages on one
//! channel; the main loop in [`network::Server::run`] consumes those
//! messages and the 1 Hz clock sequentially and is the only code that
//! mutates [`game::GameState`]. Locks are unnecessary by construction,
//! and every broadcast snapshot reflects the world at a single instant.
//!
//! ## Module Organization
//!
//! - [`game`]: world state and the movement, tag, separation, readiness
//!   and countdown rules.
//! - [`obstacles`]: the fixed obstacle layout generated at startup.
//! - [`network`]: acceptor, per-connection sessions, broadcaster and the
//!   main loop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("0.0.0.0:8080").await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod game;
pub mod network;
pub mod obstacles;
