//! The server: listener, state, and the event loop.
//!
//! One task owns all state and drains one event queue, so handlers run
//! strictly one at a time, each to completion, and broadcast order is the
//! deterministic iteration order of the state's indexes. Bot ticks fire
//! from a one-second interval between network events, never inside a
//! handler.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use irczt_proto::Response;

use crate::config::Config;
use crate::error::HandlerError;
use crate::handlers;
use crate::network::connection::{self, Event};
use crate::state::{ServerState, UserId};

const BOT_TICK: Duration = Duration::from_secs(1);

pub struct Server {
    listener: TcpListener,
    state: ServerState,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
}

impl Server {
    /// Bind the listener, create the preset channels, and spawn the bots.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.server.listen)
            .await
            .with_context(|| format!("failed to bind {}", config.server.listen))?;

        let mut state = ServerState::new(
            config.server_name(),
            &config.server.channels,
            config.bots.words.clone(),
            StdRng::from_entropy(),
        );
        for nick in &config.bots.nicknames {
            state.spawn_bot(nick, &config.bots);
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        info!(
            addr = %listener.local_addr()?,
            channels = config.server.channels.len(),
            bots = config.bots.nicknames.len(),
            "listening"
        );
        Ok(Self {
            listener,
            state,
            events_tx,
            events_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run until the operator sends any byte (or EOF) on stdin.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(wait_for_stdin()).await
    }

    /// Run the event loop until `shutdown` resolves, then tear down.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let mut tick = tokio::time::interval(BOT_TICK);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first interval tick fires immediately; the bots already ran
        // once at spawn.
        tick.tick().await;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.accept_client(stream, addr),
                    Err(err) => error!(error = %err, "failed to accept connection"),
                },
                Some(event) = self.events_rx.recv() => self.handle_event(event),
                _ = tick.tick() => self.state.tick_bots(),
                _ = &mut shutdown => {
                    info!("exit request");
                    break;
                }
            }
        }

        self.state.shutdown();
        Ok(())
    }

    fn accept_client(&mut self, stream: TcpStream, addr: SocketAddr) {
        info!(%addr, "connection accepted");
        let (tx, rx) = mpsc::unbounded_channel();
        let uid = self.state.add_client(tx, addr);
        tokio::spawn(connection::run(uid, stream, rx, self.events_tx.clone()));
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Line { uid, line } => self.process_client_line(uid, line),
            Event::Hangup { uid } => {
                // May be a late report for a session the dispatch wrapper
                // already destroyed.
                if self.state.contains(uid) {
                    self.state.destroy_user(uid, "Client quit");
                }
            }
        }
    }

    fn process_client_line(&mut self, uid: UserId, line: String) {
        if !self.state.contains(uid) {
            return;
        }
        match handlers::dispatch(&mut self.state, uid, &line) {
            Ok(()) => {}
            Err(HandlerError::NeedMoreParams { command }) => {
                self.state.reply(
                    uid,
                    Response::ERR_NEEDMOREPARAMS,
                    vec![command.to_string()],
                    "Not enough parameters",
                );
            }
            Err(HandlerError::Quit(reason)) => self.state.destroy_user(uid, &reason),
            Err(HandlerError::Malformed(reason)) => {
                warn!(uid, reason = %reason, "terminating connection");
                self.state.destroy_user(uid, "Client quit");
            }
        }
    }
}

/// Resolve when the operator sends any byte (or EOF) on stdin.
async fn wait_for_stdin() {
    let mut stdin = tokio::io::stdin();
    let mut buf = [0u8; 1];
    let _ = stdin.read(&mut buf).await;
}
