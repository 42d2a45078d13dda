//! irczt - a small single-process IRC daemon with local chatter bots.
//!
//! The crate is a library so the integration tests can run the server
//! in-process; `src/main.rs` is a thin binary wrapper around
//! [`server::Server`].

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod network;
pub mod server;
pub mod state;
