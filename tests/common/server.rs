//! In-process test server.
//!
//! Binds an ephemeral port and drives the real event loop on a background
//! task, with the stdin shutdown path replaced by a future that never
//! resolves.

#![allow(dead_code)]

use std::net::SocketAddr;

use irczt::config::{BotsConfig, Config, ServerConfig};
use irczt::server::Server;

/// A running server instance.
pub struct TestServer {
    addr: SocketAddr,
}

impl TestServer {
    /// Spawn a server with the default test channels and no bots.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(test_config(&["#lobby", "#sandbox"])).await
    }

    /// Spawn a server with the given configuration.
    pub async fn spawn_with(config: Config) -> anyhow::Result<Self> {
        let server = Server::bind(config).await?;
        let addr = server.local_addr()?;
        tokio::spawn(async move {
            let _ = server.run_until(std::future::pending()).await;
        });
        Ok(Self { addr })
    }

    /// `host:port` to connect to.
    pub fn address(&self) -> String {
        self.addr.to_string()
    }

    /// The hostname the server uses as its message prefix.
    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }
}

/// A config bound to an ephemeral local port, with the given channels and
/// no bots.
pub fn test_config(channels: &[&str]) -> Config {
    Config {
        server: ServerConfig {
            listen: "127.0.0.1:0".parse().unwrap(),
            channels: channels.iter().map(|s| s.to_string()).collect(),
        },
        bots: BotsConfig::default(),
    }
}
