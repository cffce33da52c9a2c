use crate::{
    DEFAULT_CONNECTIONS, DEFAULT_DURATION, DEFAULT_LABEL, DEFAULT_PIPELINING, DEFAULT_WORKERS,
};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use std::fmt;
use std::num::NonZeroUsize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid target URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported URL scheme `{0}`; only http and https targets can be load tested")]
    UnsupportedScheme(String),

    #[error("Duration must be greater than zero")]
    ZeroDuration,

    #[error("Duration must be a whole number of seconds, got {0:?}")]
    FractionalDuration(Duration),

    #[error("`{0}` must be at least 1")]
    ZeroCount(&'static str),

    #[error("Label must not be empty")]
    EmptyLabel,
}

/// Parameters of a single load run.
///
/// Constructed through [`RunConfig::builder`] (or deserialized, which runs the same
/// validation) and never modified afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RunConfigSpec", into = "RunConfigSpec")]
pub struct RunConfig {
    url: Url,
    duration: Duration,
    connections: NonZeroUsize,
    pipelining: NonZeroUsize,
    workers: NonZeroUsize,
    label: String,
}

impl RunConfig {
    pub fn builder(url: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder::new(url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn connections(&self) -> usize {
        self.connections.get()
    }

    pub fn pipelining(&self) -> usize {
        self.pipelining.get()
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether every request can carry its own freshly generated payload.
    pub fn unique_payloads(&self) -> bool {
        self.pipelining.get() == 1
    }
}

impl fmt::Display for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({} connections, {} pipelining, {} workers, {}s)",
            self.label,
            self.url,
            self.connections,
            self.pipelining,
            self.workers,
            self.duration.as_secs(),
        )
    }
}

pub struct RunConfigBuilder {
    url: String,
    duration: Duration,
    connections: usize,
    pipelining: usize,
    workers: usize,
    label: String,
}

impl RunConfigBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            duration: DEFAULT_DURATION,
            connections: DEFAULT_CONNECTIONS,
            pipelining: DEFAULT_PIPELINING,
            workers: DEFAULT_WORKERS,
            label: DEFAULT_LABEL.to_string(),
        }
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn connections(mut self, connections: usize) -> Self {
        self.connections = connections;
        self
    }

    pub fn pipelining(mut self, pipelining: usize) -> Self {
        self.pipelining = pipelining;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn build(self) -> Result<RunConfig, ConfigError> {
        let url = Url::parse(&self.url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        if self.duration.is_zero() {
            return Err(ConfigError::ZeroDuration);
        }
        if self.duration.subsec_nanos() != 0 {
            return Err(ConfigError::FractionalDuration(self.duration));
        }

        if self.label.trim().is_empty() {
            return Err(ConfigError::EmptyLabel);
        }

        Ok(RunConfig {
            url,
            duration: self.duration,
            connections: non_zero(self.connections, "connections")?,
            pipelining: non_zero(self.pipelining, "pipelining")?,
            workers: non_zero(self.workers, "workers")?,
            label: self.label,
        })
    }
}

fn non_zero(value: usize, name: &'static str) -> Result<NonZeroUsize, ConfigError> {
    NonZeroUsize::new(value).ok_or(ConfigError::ZeroCount(name))
}

/// Wire form of [`RunConfig`]; omitted fields take the documented defaults.
#[serde_as]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunConfigSpec {
    pub url: String,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_duration")]
    pub duration: Duration,
    #[serde(default = "default_connections")]
    pub connections: usize,
    #[serde(default = "default_pipelining")]
    pub pipelining: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_duration() -> Duration {
    DEFAULT_DURATION
}

fn default_connections() -> usize {
    DEFAULT_CONNECTIONS
}

fn default_pipelining() -> usize {
    DEFAULT_PIPELINING
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

impl TryFrom<RunConfigSpec> for RunConfig {
    type Error = ConfigError;

    fn try_from(spec: RunConfigSpec) -> Result<Self, Self::Error> {
        RunConfig::builder(spec.url)
            .duration(spec.duration)
            .connections(spec.connections)
            .pipelining(spec.pipelining)
            .workers(spec.workers)
            .label(spec.label)
            .build()
    }
}

impl From<RunConfig> for RunConfigSpec {
    fn from(config: RunConfig) -> Self {
        Self {
            url: config.url.to_string(),
            duration: config.duration,
            connections: config.connections.get(),
            pipelining: config.pipelining.get(),
            workers: config.workers.get(),
            label: config.label,
        }
    }
}
