//! irczt - a small single-process IRC daemon with local chatter bots.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use irczt::config::Config;
use irczt::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config = Config::load_or_default().map_err(|e| {
        error!(error = %e, "failed to load config");
        e
    })?;
    info!(listen = %config.server.listen, "starting irczt");

    let server = Server::bind(config).await?;
    server.run().await
}
