//! Ranking and capacity estimates over stored runs.
mod render;

use crate::error::PersistenceError;
use crate::store::{load_records, RunStore};
use std::fmt;
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn};
use volley_core::{CombinedResult, RunRecord, SECONDS_PER_DAY};

pub use render::ReportRow;

/// Below this many requests per second the best run is considered low throughput.
pub const LOW_THROUGHPUT_THRESHOLD: f64 = 100.;

/// Above this p99 latency the best run is considered latency bound.
pub const HIGH_P99_LATENCY_MS: f64 = 1_000.;

/// Operational guidance appended to every report.
pub const GUIDANCE: [&str; 3] = [
    "Monitor backend throttling events and adjust capacity as needed",
    "Implement retry logic with exponential backoff for failed requests",
    "Use auto-scaling to handle varying loads automatically",
];

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("No run records to analyze. Run load tests first.")]
    NoRecords,

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Recommendation {
    Throttling { non_2xx: u64 },
    LatencyBottleneck { p99_ms: f64 },
    LowThroughput { requests_per_second: f64 },
    AcceptableThroughput { requests_per_second: f64 },
}

impl Recommendation {
    pub fn finding(&self) -> String {
        match self {
            Self::Throttling { non_2xx } => format!(
                "There were {non_2xx} non-2xx responses, which might indicate throttling or errors."
            ),
            Self::LatencyBottleneck { p99_ms } => format!(
                "High p99 latency ({p99_ms:.2} ms > {HIGH_P99_LATENCY_MS} ms) indicates potential bottlenecks."
            ),
            Self::LowThroughput {
                requests_per_second,
            } => format!(
                "Throughput is relatively low ({requests_per_second:.2} < {LOW_THROUGHPUT_THRESHOLD} req/sec)."
            ),
            Self::AcceptableThroughput {
                requests_per_second,
            } => format!("Throughput is good ({requests_per_second:.2} req/sec)."),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::Throttling { .. } => "Consider reducing the load or increasing backend capacity.",
            Self::LatencyBottleneck { .. } => {
                "Consider optimizing the backend or application code."
            }
            Self::LowThroughput { .. } => {
                "Consider burst or provisioned backend capacity for higher throughput."
            }
            Self::AcceptableThroughput { .. } => {
                "For production, provision capacity at the observed values as a baseline."
            }
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n  {}", self.finding(), self.action())
    }
}

/// Extrapolated capacity of the best run. These are estimates, not measurements.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Capacity {
    pub per_second: f64,
    pub per_day: f64,
}

impl Capacity {
    pub fn from_rate(requests_per_second: f64) -> Self {
        Self {
            per_second: requests_per_second,
            per_day: requests_per_second * SECONDS_PER_DAY,
        }
    }
}

/// Ranked runs of one workload family, with the recommendations derived from the best.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    ranked: Vec<RunRecord>,
    rows: Vec<ReportRow>,
    capacity: Capacity,
    recommendations: Vec<Recommendation>,
}

impl AnalysisReport {
    /// Records are expected in store discovery order, which decides ties.
    pub fn new(records: Vec<RunRecord>) -> Result<Self, AnalysisError> {
        let ranked = rank(records);
        let best = ranked.first().ok_or(AnalysisError::NoRecords)?;

        let capacity = Capacity::from_rate(best.result().requests_per_second());
        let recommendations = recommend(best.result());
        let rows = ranked.iter().map(ReportRow::from).collect();

        Ok(Self {
            ranked,
            rows,
            capacity,
            recommendations,
        })
    }

    pub fn ranked(&self) -> &[RunRecord] {
        &self.ranked
    }

    pub fn best(&self) -> &RunRecord {
        // `new` rejects empty input.
        &self.ranked[0]
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Whether the latency check could not run because the best run has no p99.
    pub fn latency_check_skipped(&self) -> bool {
        self.best().result().stats().latency.p99().is_none()
    }

    /// Table rows in rank order, shared by both renderings.
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    pub fn render_console(&self) -> String {
        render::Console(self).to_string()
    }

    pub fn render_markdown(&self) -> String {
        render::Markdown(self).to_string()
    }
}

/// Sort by requests-per-second average, highest first. Equal rates keep their input order.
pub fn rank(mut records: Vec<RunRecord>) -> Vec<RunRecord> {
    records.sort_by(|a, b| {
        b.result()
            .requests_per_second()
            .total_cmp(&a.result().requests_per_second())
    });
    records
}

/// Findings for one result, in report order.
pub fn recommend(result: &CombinedResult) -> Vec<Recommendation> {
    let stats = result.stats();
    let mut recommendations = vec![];

    let non_2xx = stats.counts.non_2xx();
    if non_2xx > 0 {
        recommendations.push(Recommendation::Throttling { non_2xx });
    }

    match stats.latency.p99() {
        Some(p99_ms) if p99_ms > HIGH_P99_LATENCY_MS => {
            recommendations.push(Recommendation::LatencyBottleneck { p99_ms });
        }
        Some(_) => {}
        None => debug!("No p99 latency for `{}`; skipping latency check", result.config().label()),
    }

    let requests_per_second = result.requests_per_second();
    if requests_per_second < LOW_THROUGHPUT_THRESHOLD {
        recommendations.push(Recommendation::LowThroughput {
            requests_per_second,
        });
    } else {
        recommendations.push(Recommendation::AcceptableThroughput {
            requests_per_second,
        });
    }

    recommendations
}

/// Load every record from `store` and analyze them.
#[instrument(name = "analysis", skip_all)]
pub async fn analyze<S: RunStore + Sync>(store: &S) -> Result<AnalysisReport, AnalysisError> {
    let records = load_records(store).await?;
    info!("Analyzing {} run records", records.len());
    AnalysisReport::new(records)
}
