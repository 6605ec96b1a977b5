//! # Arena Server Library
//!
//! Authoritative server for two room-based modes sharing one lifecycle:
//! assault (two players, economy and units against each other's base) and
//! defense (one to four heroes holding a nexus against waves).
//!
//! ## Architecture
//!
//! ### One task per room
//! Every room is a [`room::Room`] owned by its own tokio task
//! ([`room::run_room`]). The task drains a command channel carrying intents,
//! disconnects and timer firings, so all mutation of a room happens on that
//! task. Timers come from a per-room [`scheduler::Scheduler`] and are
//! cancelled when the room stops, pauses or is dropped.
//!
//! ### Pure rules
//! Mode logic lives behind [`rules::RoomRules`]: [`assault::AssaultRules`] and
//! [`defense::DefenseRules`]. Rules take a fixed tick length, mutate their own
//! state and push events into an [`rules::Outbox`]; they never touch the
//! network. This makes rooms fully drivable from tests without a runtime.
//!
//! ### UDP front end
//! [`network::Server`] owns the socket, the [`client_manager::ClientManager`]
//! and the [`lobby::Lobby`]. Intents from seated participants are forwarded
//! to their room through the [`registry::RoomRegistry`]; rooms answer through
//! a [`gateway::Gateway`], which the network layer resolves back to addresses.
//!
//! ### Results
//! A finished room hands one [`results::MatchReport`] to a
//! [`results::ResultSink`] and is removed from the registry.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::ServerConfig;
//! use server::network::Server;
//! use server::results::LogResultSink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig {
//!         bind_addr: "127.0.0.1:8080".to_string(),
//!         ..ServerConfig::default()
//!     };
//!     let mut server = Server::new(config, Arc::new(LogResultSink)).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod assault;
pub mod client_manager;
pub mod combat;
pub mod config;
pub mod defense;
pub mod economy;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod lobby;
pub mod network;
pub mod registry;
pub mod results;
pub mod room;
pub mod rules;
pub mod scheduler;
pub mod spawn;
pub mod tables;
