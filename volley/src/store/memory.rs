use super::{RecordKey, RunStore};
use crate::error::PersistenceError;
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use volley_core::{CombinedResult, RunRecord};

/// In-process store; keys are insertion indices.
#[derive(Clone, Debug, Default)]
pub struct MemoryRunStore {
    records: Arc<Mutex<Vec<(RecordKey, RunRecord)>>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RunStore for MemoryRunStore {
    async fn put(
        &self,
        label: &str,
        timestamp: OffsetDateTime,
        result: &CombinedResult,
    ) -> Result<RecordKey, PersistenceError> {
        let mut records = self.records.lock()?;
        let key = RecordKey::new(format!("{:06}-{label}", records.len()));
        records.push((key.clone(), RunRecord::new(label, timestamp, result.clone())));
        Ok(key)
    }

    async fn list(&self) -> Result<Vec<RecordKey>, PersistenceError> {
        let records = self.records.lock()?;
        Ok(records.iter().map(|(key, _)| key.clone()).collect())
    }

    async fn get(&self, key: &RecordKey) -> Result<RunRecord, PersistenceError> {
        let records = self.records.lock()?;
        records
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, record)| record.clone())
            .ok_or_else(|| PersistenceError::NotFound(key.to_string()))
    }
}
