use crate::error::GeneratorError;
use crate::generator::Generator;
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use volley_core::{
    CombinedResult, Distribution, Outcome, OutcomeCounts, Percentile, Percentiles, RawResult,
    RunConfig, RunStats, StatusClass,
};

/// A local URL nothing is listening on.
pub fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/api/accounts")
}

pub fn config(label: &str, workers: usize) -> RunConfig {
    RunConfig::builder("http://localhost:3000/api/accounts")
        .duration(Duration::from_secs(5))
        .connections(10)
        .workers(workers)
        .label(label)
        .build()
        .unwrap()
}

pub fn dist(average: f64, p99: Option<f64>) -> Distribution {
    Distribution {
        samples: 5,
        average,
        mean: average,
        stddev: Some(0.),
        min: average,
        max: average,
        total: None,
        percentiles: p99.map(|value| Percentiles::new(vec![Percentile { rank: 99., value }])),
    }
}

pub fn raw_result(config: &RunConfig, rps: f64, non_2xx: u64, p99_ms: Option<f64>) -> RawResult {
    let mut counts = OutcomeCounts::default();
    counts.add(Outcome::Status(StatusClass::Success), rps as u64);
    counts.add(Outcome::Status(StatusClass::ClientError), non_2xx);
    counts.sent = counts.total;

    let start = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
    RawResult::new(
        config.clone(),
        RunStats {
            counts,
            requests: dist(rps, Some(rps)),
            latency: dist(p99_ms.unwrap_or(10.) / 2., p99_ms),
            throughput: dist(rps * 64., Some(rps * 64.)),
            start,
            finish: start + config.duration(),
        },
    )
}

pub fn combined(label: &str, rps: f64, non_2xx: u64, p99_ms: Option<f64>) -> CombinedResult {
    raw_result(&config(label, 1), rps, non_2xx, p99_ms).into()
}

/// Generator returning canned results without touching the network.
///
/// Configurations whose label starts with `fail` report a transport fault.
#[derive(Clone, Default)]
pub struct StubGenerator {
    calls: Arc<AtomicUsize>,
    rps: f64,
}

impl StubGenerator {
    pub fn new(rps: f64) -> Self {
        Self {
            calls: Arc::default(),
            rps,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Generator for StubGenerator {
    async fn generate(&self, config: &RunConfig) -> Result<RawResult, GeneratorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if config.label().starts_with("fail") {
            return Err(GeneratorError::Transport {
                target: config.url().to_string(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            });
        }

        Ok(raw_result(config, self.rps + call as f64, 0, Some(20.)))
    }
}
