//! Workload generation against a single endpoint.
mod connection;
mod outcome_atomics;
mod payload;
mod timer;

use crate::error::GeneratorError;
use crate::measurement::SampleSummary;
use connection::Connection;
use outcome_atomics::OutcomeAtomics;
use reqwest::Client;
use std::time::Duration;
use time::OffsetDateTime;
use timer::Timer;
use tokio::net::TcpStream;
use tokio::task::JoinSet;
#[allow(unused)]
use tracing::{debug, error, info, instrument, trace, warn, Instrument};
use url::Url;
use volley_core::{OutcomeCounts, RawResult, RunConfig, RunStats};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(1);

/// Something that can drive one load run and report its raw result.
///
/// Implementations must report unreachable targets as an error and every HTTP response,
/// whatever its status, as data.
#[trait_variant::make(Generator: Send)]
pub trait LocalGenerator {
    async fn generate(&self, config: &RunConfig) -> Result<RawResult, GeneratorError>;
}

/// Generator issuing HTTP POST requests with a JSON `username` body.
///
/// Each of the configured connections runs as its own task with its own client. Requests
/// per second and throughput are sampled once per interval; latency is recorded for every
/// response.
#[derive(Clone, Debug)]
pub struct HttpGenerator {
    connect_timeout: Duration,
    request_timeout: Duration,
    sample_interval: Duration,
}

impl Default for HttpGenerator {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            sample_interval: DEFAULT_SAMPLE_INTERVAL,
        }
    }
}

impl HttpGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on establishing the initial connection to the target.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Bound on a single request; a stalled request is counted as a timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn sample_interval(mut self, interval: Duration) -> Self {
        self.sample_interval = interval;
        self
    }

    fn client(&self, pipelining: usize) -> Result<Client, GeneratorError> {
        let client = Client::builder()
            .http1_only()
            .pool_max_idle_per_host(pipelining)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()?;
        Ok(client)
    }
}

impl Generator for HttpGenerator {
    #[instrument(name = "generator", skip_all, fields(label = config.label()))]
    async fn generate(&self, config: &RunConfig) -> Result<RawResult, GeneratorError> {
        preflight(config.url(), self.connect_timeout).await?;

        info!(
            "Generating load for {} with {} connections (pipelining {})",
            humantime::format_duration(config.duration()),
            config.connections(),
            config.pipelining(),
        );
        if !config.unique_payloads() {
            debug!("Pipelining enabled; request bodies are shared per connection.");
        }

        let atomics = OutcomeAtomics::new();
        let connections = (0..config.connections())
            .map(|id| {
                Ok(Connection::new(
                    id,
                    self.client(config.pipelining())?,
                    config.url().clone(),
                    config.pipelining(),
                    atomics.clone(),
                ))
            })
            .collect::<Result<Vec<_>, GeneratorError>>()?;
        // Dropping the set aborts every connection, including when this future is cancelled.
        let mut tasks = JoinSet::new();
        for connection in connections {
            tasks.spawn(connection.run().in_current_span());
        }

        let start_time = OffsetDateTime::now_utc();
        let mut timer = Timer::new(self.sample_interval, config.duration()).await;
        trace!("Sampling every {timer}");

        let mut counts = OutcomeCounts::default();
        let mut requests = SampleSummary::new();
        let mut throughput = SampleSummary::new();
        let mut latency = SampleSummary::new();
        let mut total_bytes = 0u64;

        loop {
            let tick = timer.tick().await;
            let sample = atomics.collect();
            trace!(
                "Interval: {} responses, {} bytes",
                sample.responses(),
                sample.bytes
            );

            let elapsed = tick.elapsed.as_secs_f64();
            if elapsed > 0. {
                requests.insert(sample.responses() as f64 / elapsed);
                throughput.insert(sample.bytes as f64 / elapsed);
            }
            for dur in &sample.latencies {
                latency.insert(dur.as_secs_f64() * 1_000.);
            }
            counts.merge(&sample.counts);
            total_bytes += sample.bytes;

            if tick.finished {
                break;
            }
        }

        tasks.abort_all();
        debug!("Collected {} rate samples", requests.count());

        // Outcomes landing between the last tick and the abort still count, but do not form
        // a rate sample of their own.
        let rest = atomics.collect();
        for dur in &rest.latencies {
            latency.insert(dur.as_secs_f64() * 1_000.);
        }
        counts.merge(&rest.counts);
        total_bytes += rest.bytes;

        let finish_time = OffsetDateTime::now_utc();
        let responses = counts.status_class_sum() + counts.mismatches;
        info!(
            "Generator finished: {} responses ({} 2xx, {} non-2xx), {} transport failures",
            responses,
            counts.success,
            counts.non_2xx(),
            counts.errors + counts.timeouts + counts.resets,
        );

        Ok(RawResult::new(
            config.clone(),
            RunStats {
                counts,
                requests: requests.into_distribution(Some(responses as f64)),
                latency: latency.into_distribution(None),
                throughput: throughput.into_distribution(Some(total_bytes as f64)),
                start: start_time,
                finish: finish_time,
            },
        ))
    }
}

/// Make sure the target accepts TCP connections before any traffic starts.
async fn preflight(url: &Url, timeout: Duration) -> Result<(), GeneratorError> {
    let (host, port) = match (url.host(), url.port_or_known_default()) {
        (Some(host), Some(port)) => (host, port),
        _ => return Err(GeneratorError::InvalidTarget(url.to_string())),
    };
    let target = format!("{host}:{port}");

    match tokio::time::timeout(timeout, TcpStream::connect(target.as_str())).await {
        Ok(Ok(_stream)) => {
            debug!("Target {target} is reachable");
            Ok(())
        }
        Ok(Err(source)) => Err(GeneratorError::Transport { target, source }),
        Err(_) => Err(GeneratorError::ConnectTimeout {
            target,
            timeout: humantime::format_duration(timeout).to_string(),
        }),
    }
}
