//! # Tag Game Client Library
//!
//! Client-side implementation for the multiplayer tag game. The server is
//! fully authoritative, so this crate is deliberately thin: it captures
//! input, ships command tokens to the server, and draws whatever the last
//! snapshot said the world looks like. There is no prediction and no
//! local simulation to drift out of sync.
//!
//! ## Module Organization
//!
//! ### Network Module (`network`)
//! Owns the TCP connection on a background runtime thread and bridges
//! packets to the render loop over channels. Connecting blocks until the
//! server's `Welcome` handshake assigns a player id.
//!
//! ### Input Module (`input`)
//! Samples held keys at a fixed rate and emits at most one directional
//! command per sample, with `UP > DOWN > LEFT > RIGHT` priority when
//! several keys are held. Directional commands are suppressed until the
//! match starts; Space/Enter sends the readiness signal.
//!
//! ### Game Module (`game`)
//! A mirror of the latest server snapshot, replaced wholesale whenever a
//! new one arrives.
//!
//! ### Rendering Module (`rendering`)
//! macroquad drawing of the obstacle field, players and HUD.

pub mod game;
pub mod input;
pub mod network;
pub mod rendering;
