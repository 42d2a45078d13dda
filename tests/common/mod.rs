//! Shared integration-test harness.

pub mod client;
pub mod server;

pub use client::TestClient;
pub use server::{test_config, TestServer};
