use crate::RunConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Response classification by the leading digit of the HTTP status code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
}

impl StatusClass {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            100..=199 => Some(Self::Informational),
            200..=299 => Some(Self::Success),
            300..=399 => Some(Self::Redirection),
            400..=499 => Some(Self::ClientError),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Informational => "1xx",
            Self::Success => "2xx",
            Self::Redirection => "3xx",
            Self::ClientError => "4xx",
            Self::ServerError => "5xx",
        }
    }
}

/// The single bucket a finished request lands in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    Status(StatusClass),
    /// A response arrived but its status code is outside 100-599.
    Mismatch,
    Timeout,
    Reset,
    Error,
}

impl Outcome {
    pub const ALL: [Outcome; 9] = [
        Outcome::Status(StatusClass::Informational),
        Outcome::Status(StatusClass::Success),
        Outcome::Status(StatusClass::Redirection),
        Outcome::Status(StatusClass::ClientError),
        Outcome::Status(StatusClass::ServerError),
        Outcome::Mismatch,
        Outcome::Timeout,
        Outcome::Reset,
        Outcome::Error,
    ];

    pub fn from_status(code: u16) -> Self {
        StatusClass::from_code(code)
            .map(Outcome::Status)
            .unwrap_or(Outcome::Mismatch)
    }

    /// Whether the target answered, whatever the status.
    pub fn is_response(&self) -> bool {
        matches!(self, Self::Status(_) | Self::Mismatch)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status(class) => class.as_str(),
            Self::Mismatch => "mismatch",
            Self::Timeout => "timeout",
            Self::Reset => "reset",
            Self::Error => "error",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    /// Requests that reached an outcome of any kind.
    pub total: u64,
    /// Requests handed to the transport, including ones still in flight at shutdown.
    pub sent: u64,
    #[serde(rename = "1xx")]
    pub informational: u64,
    #[serde(rename = "2xx")]
    pub success: u64,
    #[serde(rename = "3xx")]
    pub redirection: u64,
    #[serde(rename = "4xx")]
    pub client_error: u64,
    #[serde(rename = "5xx")]
    pub server_error: u64,
    pub errors: u64,
    pub timeouts: u64,
    pub mismatches: u64,
    pub resets: u64,
}

impl OutcomeCounts {
    pub fn record(&mut self, outcome: Outcome) {
        self.add(outcome, 1);
    }

    pub fn add(&mut self, outcome: Outcome, n: u64) {
        self.total += n;
        match outcome {
            Outcome::Status(StatusClass::Informational) => self.informational += n,
            Outcome::Status(StatusClass::Success) => self.success += n,
            Outcome::Status(StatusClass::Redirection) => self.redirection += n,
            Outcome::Status(StatusClass::ClientError) => self.client_error += n,
            Outcome::Status(StatusClass::ServerError) => self.server_error += n,
            Outcome::Mismatch => self.mismatches += n,
            Outcome::Timeout => self.timeouts += n,
            Outcome::Reset => self.resets += n,
            Outcome::Error => self.errors += n,
        }
    }

    /// Exact field-by-field sum.
    pub fn merge(&mut self, other: &OutcomeCounts) {
        self.total += other.total;
        self.sent += other.sent;
        self.informational += other.informational;
        self.success += other.success;
        self.redirection += other.redirection;
        self.client_error += other.client_error;
        self.server_error += other.server_error;
        self.errors += other.errors;
        self.timeouts += other.timeouts;
        self.mismatches += other.mismatches;
        self.resets += other.resets;
    }

    pub fn non_2xx(&self) -> u64 {
        self.informational + self.redirection + self.client_error + self.server_error
    }

    pub fn status_class_sum(&self) -> u64 {
        self.success + self.non_2xx()
    }

    /// Percentage of finished requests answered with a 2xx.
    pub fn success_rate(&self) -> f64 {
        self.success as f64 / self.total.max(1) as f64 * 100.
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Percentile {
    pub rank: f64,
    pub value: f64,
}

/// Percentile values ordered by ascending rank.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentiles(Vec<Percentile>);

impl Percentiles {
    pub fn new(mut values: Vec<Percentile>) -> Self {
        values.sort_by(|a, b| a.rank.total_cmp(&b.rank));
        Self(values)
    }

    pub fn get(&self, rank: f64) -> Option<f64> {
        self.0
            .iter()
            .find(|p| (p.rank - rank).abs() < 1e-9)
            .map(|p| p.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Percentile> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Summary statistics for one measured quantity.
///
/// `stddev` and `percentiles` are `None` when they cannot be derived, which is the case for
/// results combined from more than one worker and for distributions with no samples. With no
/// samples the remaining fields are zero and carry no meaning.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    /// Number of observations summarized.
    #[serde(default)]
    pub samples: u64,
    pub average: f64,
    pub mean: f64,
    pub stddev: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub total: Option<f64>,
    pub percentiles: Option<Percentiles>,
}

impl Distribution {
    pub fn is_empty(&self) -> bool {
        self.samples == 0
    }

    pub fn percentile(&self, rank: f64) -> Option<f64> {
        self.percentiles.as_ref().and_then(|p| p.get(rank))
    }

    pub fn p50(&self) -> Option<f64> {
        self.percentile(50.)
    }

    pub fn p90(&self) -> Option<f64> {
        self.percentile(90.)
    }

    pub fn p99(&self) -> Option<f64> {
        self.percentile(99.)
    }
}

/// Everything measured during a run, shared by raw and combined results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub counts: OutcomeCounts,
    /// Completed requests per sampling second.
    pub requests: Distribution,
    /// Response latency in milliseconds.
    pub latency: Distribution,
    /// Received bytes per sampling second.
    pub throughput: Distribution,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub finish: OffsetDateTime,
}

/// Output of one workload generator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    config: RunConfig,
    #[serde(flatten)]
    stats: RunStats,
}

impl RawResult {
    pub fn new(config: RunConfig, stats: RunStats) -> Self {
        Self { config, stats }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }
}

/// One or more [`RawResult`]s merged by [`aggregate`](crate::aggregate).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CombinedResult {
    config: RunConfig,
    workers: usize,
    #[serde(flatten)]
    stats: RunStats,
}

impl CombinedResult {
    pub(crate) fn new(config: RunConfig, workers: usize, stats: RunStats) -> Self {
        Self {
            config,
            workers,
            stats,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Number of raw results merged into this one.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn requests_per_second(&self) -> f64 {
        self.stats.requests.average
    }
}

impl From<RawResult> for CombinedResult {
    fn from(raw: RawResult) -> Self {
        Self::new(raw.config, 1, raw.stats)
    }
}

impl fmt::Display for CombinedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = &self.stats;
        writeln!(f, "Requests per second: {:.2}", stats.requests.average)?;
        if stats.latency.is_empty() {
            writeln!(f, "Latency: no responses measured")?;
        } else {
            writeln!(f, "Latency (avg): {:.2} ms", stats.latency.average)?;
            writeln!(f, "Latency (max): {:.2} ms", stats.latency.max)?;
        }
        writeln!(
            f,
            "Throughput: {:.2} MB/s",
            stats.throughput.average / 1024. / 1024.
        )?;
        writeln!(f, "2xx responses: {}", stats.counts.success)?;
        write!(f, "Non-2xx responses: {}", stats.counts.non_2xx())
    }
}

/// A persisted [`CombinedResult`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    label: String,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    result: CombinedResult,
}

impl RunRecord {
    pub fn new(label: impl Into<String>, timestamp: OffsetDateTime, result: CombinedResult) -> Self {
        Self {
            label: label.into(),
            timestamp,
            result,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn result(&self) -> &CombinedResult {
        &self.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(
            Outcome::from_status(201),
            Outcome::Status(StatusClass::Success)
        );
        assert_eq!(
            Outcome::from_status(429),
            Outcome::Status(StatusClass::ClientError)
        );
        assert_eq!(
            Outcome::from_status(503),
            Outcome::Status(StatusClass::ServerError)
        );
        assert_eq!(Outcome::from_status(99), Outcome::Mismatch);
        assert_eq!(Outcome::from_status(600), Outcome::Mismatch);
    }

    #[test]
    fn test_counts_total_covers_non_status_outcomes() {
        let mut counts = OutcomeCounts::default();
        counts.record(Outcome::Status(StatusClass::Success));
        counts.record(Outcome::Status(StatusClass::ClientError));
        counts.record(Outcome::Timeout);
        counts.record(Outcome::Reset);
        counts.record(Outcome::Error);

        assert_eq!(counts.total, 5);
        assert_eq!(counts.status_class_sum(), 2);
        assert_eq!(counts.non_2xx(), 1);
        assert!(counts.total >= counts.status_class_sum());
    }

    #[test]
    fn test_success_rate_without_requests() {
        let counts = OutcomeCounts::default();
        assert_eq!(counts.success_rate(), 0.);
    }

    #[test]
    fn test_percentile_lookup() {
        let percentiles = Percentiles::new(vec![
            Percentile {
                rank: 99.,
                value: 12.,
            },
            Percentile {
                rank: 50.,
                value: 3.,
            },
        ]);
        assert_eq!(percentiles.get(50.), Some(3.));
        assert_eq!(percentiles.get(99.), Some(12.));
        assert_eq!(percentiles.get(90.), None);
        assert_eq!(percentiles.iter().next().map(|p| p.rank), Some(50.));
    }

    #[test]
    fn test_counts_serialize_with_status_class_names() {
        let mut counts = OutcomeCounts::default();
        counts.record(Outcome::Status(StatusClass::Success));
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["2xx"], 1);
        assert_eq!(json["total"], 1);
    }
}
