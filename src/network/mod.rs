//! Network path: per-connection I/O tasks and their events.

pub mod connection;

pub use connection::Event;
