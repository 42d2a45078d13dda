//! Configuration loading.
//!
//! The daemon takes no command-line arguments: it reads `irczt.toml` from
//! the working directory when present, and otherwise runs on the built-in
//! defaults below. Configuration supplies the listen address, the preset
//! channel list, the bot roster with its parameter ranges, and the word
//! bank the bots draw chatter from.

use rand::distributions::uniform::SampleUniform;
use rand::Rng;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Default config file, looked up relative to the working directory.
pub const CONFIG_PATH: &str = "irczt.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub bots: BotsConfig,
}

/// Server identity and preset channels.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, `host:port`.
    pub listen: SocketAddr,
    /// Channels created at startup. Channels are never created at runtime.
    pub channels: Vec<String>,
}

/// Bot roster and behavior ranges.
///
/// Each bot samples its own parameters from these ranges once, at spawn.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BotsConfig {
    /// Nicknames to spawn a local bot for.
    pub nicknames: Vec<String>,
    /// How many channels a bot tries to stay joined to.
    pub channels_target: Range<usize>,
    /// Per-tick probability of leaving each joined channel.
    pub channels_leave_rate: Range<f64>,
    /// Per-tick probability of chattering into each joined channel.
    pub message_rate: Range<f64>,
    /// Half the upper bound on words per message.
    pub message_length: Range<usize>,
    /// Word bank for random chatter.
    pub words: Vec<String>,
}

/// An inclusive `{ min, max }` range.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: Copy + PartialOrd + SampleUniform> Range<T> {
    /// Draw a value uniformly from `min..=max`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> T {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:6667".parse().expect("static listen address"),
            channels: ["#lobby", "#random", "#rust"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            nicknames: Vec::new(),
            channels_target: Range { min: 1, max: 3 },
            channels_leave_rate: Range {
                min: 0.01,
                max: 0.1,
            },
            message_rate: Range {
                min: 0.05,
                max: 0.5,
            },
            message_length: Range { min: 2, max: 8 },
            words: [
                "lorem",
                "ipsum",
                "dolor",
                "sit",
                "amet",
                "consectetur",
                "adipiscing",
                "elit",
                "sed",
                "eiusmod",
                "tempor",
                "incididunt",
                "labore",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `irczt.toml` if it exists, otherwise the built-in defaults.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        if Path::new(CONFIG_PATH).exists() {
            Self::load(CONFIG_PATH)
        } else {
            Ok(Self::default())
        }
    }

    /// Hostname used as the prefix on server-originated lines.
    pub fn server_name(&self) -> String {
        self.server.listen.ip().to_string()
    }
}
