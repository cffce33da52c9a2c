//! Sequential execution of a matrix of named configurations.
use crate::error::RunError;
use crate::generator::Generator;
use crate::orchestrator::Orchestrator;
use crate::store::{RecordKey, RunStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};
use volley_core::{
    aggregate, CombinedResult, ConfigError, RunConfig, DEFAULT_CONNECTIONS, DEFAULT_DURATION,
    DEFAULT_PIPELINING, DEFAULT_WORKERS,
};

#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Suite matrix has no configurations")]
    Empty,

    #[error("Configuration name `{0}` is used more than once")]
    DuplicateName(String),

    #[error("Configuration `{name}` is invalid: {source}")]
    InvalidEntry {
        name: String,
        #[source]
        source: ConfigError,
    },

    #[error("Unable to parse suite matrix: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One named row of a suite matrix. The target URL is shared by the whole matrix.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteEntry {
    pub name: String,
    #[serde(default = "default_connections")]
    pub connections: usize,
    /// Seconds.
    #[serde(default = "default_duration")]
    pub duration: u64,
    #[serde(default = "default_pipelining")]
    pub pipelining: usize,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_connections() -> usize {
    DEFAULT_CONNECTIONS
}

fn default_duration() -> u64 {
    DEFAULT_DURATION.as_secs()
}

fn default_pipelining() -> usize {
    DEFAULT_PIPELINING
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

impl SuiteEntry {
    pub fn new(
        name: &str,
        connections: usize,
        duration: u64,
        pipelining: usize,
        workers: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            connections,
            duration,
            pipelining,
            workers,
        }
    }

    fn config(&self, target: &str) -> Result<RunConfig, SuiteError> {
        RunConfig::builder(target)
            .label(&self.name)
            .connections(self.connections)
            .duration(std::time::Duration::from_secs(self.duration))
            .pipelining(self.pipelining)
            .workers(self.workers)
            .build()
            .map_err(|source| SuiteError::InvalidEntry {
                name: self.name.clone(),
                source,
            })
    }
}

/// An ordered, validated list of configurations.
///
/// Non-empty, with unique labels, and every entry a valid [`RunConfig`].
#[derive(Clone, Debug, PartialEq)]
pub struct SuiteMatrix {
    configs: Vec<RunConfig>,
}

impl SuiteMatrix {
    pub fn new(target: &str, entries: &[SuiteEntry]) -> Result<Self, SuiteError> {
        let configs = entries
            .iter()
            .map(|entry| entry.config(target))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_configs(configs)
    }

    /// baseline, medium-load, high-load, pipelined, multi-worker and max-throughput; 30s each.
    pub fn standard(target: &str) -> Result<Self, SuiteError> {
        Self::new(target, &standard_entries())
    }

    /// Parse a JSON array of [`SuiteEntry`] objects.
    pub fn from_json(target: &str, json: &str) -> Result<Self, SuiteError> {
        let entries: Vec<SuiteEntry> = serde_json::from_str(json)?;
        Self::new(target, &entries)
    }

    pub fn from_configs(configs: Vec<RunConfig>) -> Result<Self, SuiteError> {
        if configs.is_empty() {
            return Err(SuiteError::Empty);
        }

        let mut seen = HashSet::new();
        for config in &configs {
            if !seen.insert(config.label()) {
                return Err(SuiteError::DuplicateName(config.label().to_string()));
            }
        }

        Ok(Self { configs })
    }

    pub fn configs(&self) -> &[RunConfig] {
        &self.configs
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

fn standard_entries() -> Vec<SuiteEntry> {
    vec![
        SuiteEntry::new("baseline", 10, 30, 1, 1),
        SuiteEntry::new("medium-load", 50, 30, 1, 1),
        SuiteEntry::new("high-load", 100, 30, 1, 1),
        SuiteEntry::new("pipelined", 100, 30, 10, 1),
        SuiteEntry::new("multi-worker", 100, 30, 1, 4),
        SuiteEntry::new("max-throughput", 200, 30, 10, 4),
    ]
}

/// A configuration that ran to completion and was persisted.
#[derive(Clone, Debug)]
pub struct CompletedRun {
    pub key: RecordKey,
    pub result: CombinedResult,
}

#[derive(Debug, Default)]
pub struct SuiteReport {
    completed: Vec<CompletedRun>,
    failed: Vec<(String, RunError)>,
}

impl SuiteReport {
    pub fn completed(&self) -> &[CompletedRun] {
        &self.completed
    }

    /// Labels of failed configurations with the reason they failed.
    pub fn failed(&self) -> &[(String, RunError)] {
        &self.failed
    }
}

/// Runs configurations one at a time through orchestration, aggregation and persistence.
pub struct SuiteDriver<G, S> {
    orchestrator: Orchestrator<G>,
    store: S,
}

impl<G, S> SuiteDriver<G, S>
where
    G: Generator + Sync + 'static,
    S: RunStore + Sync,
{
    pub fn new(generator: G, store: S) -> Self {
        Self {
            orchestrator: Orchestrator::new(generator),
            store,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    #[instrument(name = "run", skip_all, fields(label = config.label()))]
    pub async fn run_one(&self, config: &RunConfig) -> Result<CompletedRun, RunError> {
        info!("Running {config}");

        let results = self.orchestrator.run(config).await?;
        let result = aggregate(results)?;
        info!("Result for `{}`:\n{result}", config.label());

        let key = self
            .store
            .put(config.label(), OffsetDateTime::now_utc(), &result)
            .await?;
        info!("Saved `{}` as {key}", config.label());

        Ok(CompletedRun { key, result })
    }

    /// Run every configuration in order. A failed configuration is logged and skipped.
    #[instrument(name = "suite", skip_all, fields(configs = matrix.len()))]
    pub async fn run_suite(&self, matrix: &SuiteMatrix) -> SuiteReport {
        let mut report = SuiteReport::default();

        for config in matrix.configs() {
            match self.run_one(config).await {
                Ok(completed) => report.completed.push(completed),
                Err(err) => {
                    if matches!(&err, RunError::Generator(e) if e.is_transport_fault()) {
                        warn!("Target unreachable for `{}`", config.label());
                    }
                    error!("Configuration `{}` failed: {err}", config.label());
                    report.failed.push((config.label().to_string(), err));
                }
            }
        }

        info!(
            "Suite finished: {} completed, {} failed",
            report.completed.len(),
            report.failed.len()
        );
        report
    }
}
