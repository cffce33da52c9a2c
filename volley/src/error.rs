use std::sync::PoisonError;
use thiserror::Error;
use volley_core::AggregationError;

/// Fatal failures of a workload generator. HTTP error statuses are never reported here; they
/// are outcome data.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Target URL `{0}` has no host or port to connect to")]
    InvalidTarget(String),

    #[error("Unable to connect to {target}: {source}")]
    Transport {
        target: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connecting to {target} timed out after {timeout}")]
    ConnectTimeout { target: String, timeout: String },

    #[error("Unable to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("Generator task failed: {0}")]
    Panicked(String),
}

impl GeneratorError {
    /// Whether the target could not be reached at all.
    pub fn is_transport_fault(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::ConnectTimeout { .. })
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unable to (de)serialize run record: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unable to format record timestamp: {0}")]
    Timestamp(#[from] time::error::Format),

    #[error("No record stored under `{0}`")]
    NotFound(String),

    #[error("Store mutex is poisoned.")]
    PoisonData,
}

impl<T> From<PoisonError<T>> for PersistenceError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::PoisonData
    }
}

/// Any failure of the orchestration -> aggregation -> persistence pipeline. Configurations are
/// validated before they reach it.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Load generation failed: {0}")]
    Generator(#[from] GeneratorError),

    #[error("Aggregation contract violated: {0}")]
    Aggregation(#[from] AggregationError),

    #[error("Persisting results failed: {0}")]
    Persistence(#[from] PersistenceError),
}
