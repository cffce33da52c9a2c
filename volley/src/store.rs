//! Durable storage for combined results.
mod fs;
mod memory;

use crate::error::PersistenceError;
use std::fmt;
use time::OffsetDateTime;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{CombinedResult, RunRecord};

pub use fs::FsRunStore;
pub use memory::MemoryRunStore;

/// Opaque handle to a stored [`RunRecord`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey(String);

impl RecordKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only record storage.
///
/// `list` returns keys in a stable order; analysis uses that order to break ranking ties.
#[trait_variant::make(RunStore: Send)]
pub trait LocalRunStore {
    async fn put(
        &self,
        label: &str,
        timestamp: OffsetDateTime,
        result: &CombinedResult,
    ) -> Result<RecordKey, PersistenceError>;

    async fn list(&self) -> Result<Vec<RecordKey>, PersistenceError>;

    async fn get(&self, key: &RecordKey) -> Result<RunRecord, PersistenceError>;
}

/// Load every listed record in discovery order, skipping records that cannot be read.
pub async fn load_records<S: RunStore + Sync>(store: &S) -> Result<Vec<RunRecord>, PersistenceError> {
    let keys = store.list().await?;
    debug!("Loading {} records", keys.len());

    let mut records = Vec::with_capacity(keys.len());
    for key in keys {
        match store.get(&key).await {
            Ok(record) => records.push(record),
            Err(err) => warn!("Skipping unreadable record {key}: {err}"),
        }
    }
    Ok(records)
}
