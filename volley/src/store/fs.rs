use super::{RecordKey, RunStore};
use crate::error::PersistenceError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};
use volley_core::{CombinedResult, RunRecord};

pub const REPORT_FILE_NAME: &str = "analysis-report.md";

/// One pretty-printed JSON file per record, named `<family>-<timestamp>.json`.
///
/// Timestamps are UTC RFC 3339 with `:` replaced by `-` and nanosecond precision, e.g.
/// `account-creation-2023-11-14T22-13-20.000000000Z.json`. The directory is created on the
/// first write. Records are never overwritten; a timestamp collision gets a numeric suffix
/// (`...Z-1.json`) instead. `list` only returns names of exactly that shape for this family,
/// ordered by timestamp and then suffix.
#[derive(Clone, Debug)]
pub struct FsRunStore {
    dir: PathBuf,
    family: String,
}

impl FsRunStore {
    pub fn new(dir: impl Into<PathBuf>, family: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            family: family.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Write a rendered analysis report next to the records.
    pub async fn write_report(&self, contents: &str) -> Result<PathBuf, PersistenceError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(REPORT_FILE_NAME);
        fs::write(&path, contents).await?;
        info!("Analysis report written to {}", path.display());
        Ok(path)
    }

    fn file_stem(&self, timestamp: OffsetDateTime) -> Result<String, PersistenceError> {
        let timestamp = timestamp.to_offset(UtcOffset::UTC).format(format_description!(
            "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:9]Z"
        ))?;
        Ok(format!("{}-{timestamp}", self.family))
    }

    /// Timestamp and collision suffix of a record file of this family.
    fn parse_name(&self, name: &str) -> Option<(OffsetDateTime, u32)> {
        let rest = name
            .strip_prefix(self.family.as_str())?
            .strip_prefix('-')?
            .strip_suffix(".json")?;

        let timestamp = rest.get(..TIMESTAMP_LEN)?;
        let suffix = rest.get(TIMESTAMP_LEN..)?;
        let attempt = match suffix {
            "" => 0,
            suffix => {
                let digits = suffix.strip_prefix('-')?;
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            }
        };

        let timestamp = PrimitiveDateTime::parse(
            timestamp,
            format_description!(
                "[year]-[month]-[day]T[hour]-[minute]-[second].[subsecond digits:9]Z"
            ),
        )
        .ok()?;
        Some((timestamp.assume_utc(), attempt))
    }
}

/// `2023-11-14T22-13-20.000000000Z`
const TIMESTAMP_LEN: usize = 30;

impl RunStore for FsRunStore {
    async fn put(
        &self,
        label: &str,
        timestamp: OffsetDateTime,
        result: &CombinedResult,
    ) -> Result<RecordKey, PersistenceError> {
        let record = RunRecord::new(label, timestamp, result.clone());
        let json = serde_json::to_vec_pretty(&record)?;

        fs::create_dir_all(&self.dir).await?;
        let stem = self.file_stem(timestamp)?;

        let mut attempt = 0;
        loop {
            let name = if attempt == 0 {
                format!("{stem}.json")
            } else {
                format!("{stem}-{attempt}.json")
            };
            let path = self.dir.join(&name);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(&json).await?;
                    file.flush().await?;
                    debug!("Stored `{label}` as {}", path.display());
                    return Ok(RecordKey::new(name));
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    trace!("{name} exists; retrying with a suffix");
                    attempt += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn list(&self) -> Result<Vec<RecordKey>, PersistenceError> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.dir.display());
                return Ok(vec![]);
            }
            Err(err) => return Err(err.into()),
        };

        let mut found = vec![];
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            match self.parse_name(&name) {
                Some((timestamp, attempt)) => found.push((timestamp, attempt, name)),
                None => trace!("Ignoring {name}"),
            }
        }
        found.sort();
        Ok(found
            .into_iter()
            .map(|(_, _, name)| RecordKey::new(name))
            .collect())
    }

    async fn get(&self, key: &RecordKey) -> Result<RunRecord, PersistenceError> {
        let path = self.dir.join(key.as_str());
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(PersistenceError::NotFound(key.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        Ok(serde_json::from_slice(&bytes)?)
    }
}
