//! # Flappy Royale Server Library
//!
//! This library provides the authoritative session engine for a multiplayer
//! side-scrolling obstacle game. Every bird, pipe and score lives here; clients
//! only send flaps and admin commands and render the snapshots they receive.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server integrates bird physics, scrolls and recycles the pipe field,
//! detects collisions and keeps score. Clients never report positions.
//!
//! ### Session Lifecycle
//! One multiplayer session walks through lobby, countdown, running and over.
//! The first joiner administers it: only the admin may start, reset or toggle
//! test mode. Each client may also play a private game against the AI.
//!
//! ### State Broadcasting
//! Every tick the session's snapshot goes to its whole roster. AI games
//! publish to their single owner.
//!
//! ## Architecture Design
//!
//! ### Single Writer
//! [`game::Game`] owns every session. Network tasks hand it validated events,
//! which wait in a mailbox until the next tick boundary; nothing else mutates
//! actors or pipes.
//!
//! ### Fixed Timestep
//! [`scheduler::TickClock`] turns wall-clock time into whole fixed steps so the
//! simulation advances identically regardless of timer jitter.
//!
//! ## Module Organization
//!
//! - `config`, `error`: tunables with documented defaults and the rejection
//!   taxonomy
//! - `actor`, `physics`, `obstacles`, `collision`, `world`: the simulation
//! - `ai`: the stateless flap controller used by AI games and the bot client
//! - `session`, `ai_session`: the multiplayer and single-player state machines
//! - `mailbox`, `scheduler`, `game`: tick-boundary command handling
//! - `client_manager`, `network`: UDP transport
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::GameConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", GameConfig::default(), 32).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod ai;
pub mod ai_session;
pub mod client_manager;
pub mod collision;
pub mod config;
pub mod error;
pub mod game;
pub mod mailbox;
pub mod network;
pub mod obstacles;
pub mod physics;
pub mod scheduler;
pub mod session;
pub mod world;
