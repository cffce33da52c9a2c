use metrics_util::AtomicBucket;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use volley_core::{Outcome, OutcomeCounts, StatusClass};

/// Counters shared by every connection task of one generator.
///
/// Connections only ever add; the sampling loop drains everything once per interval.
#[derive(Clone)]
pub(crate) struct OutcomeAtomics {
    counters: Arc<Counters>,
    latency: Arc<AtomicBucket<Duration>>,
}

#[derive(Default)]
struct Counters {
    sent: AtomicU64,
    bytes: AtomicU64,
    informational: AtomicU64,
    success: AtomicU64,
    redirection: AtomicU64,
    client_error: AtomicU64,
    server_error: AtomicU64,
    mismatch: AtomicU64,
    timeout: AtomicU64,
    reset: AtomicU64,
    error: AtomicU64,
}

impl Counters {
    fn outcome(&self, outcome: Outcome) -> &AtomicU64 {
        match outcome {
            Outcome::Status(StatusClass::Informational) => &self.informational,
            Outcome::Status(StatusClass::Success) => &self.success,
            Outcome::Status(StatusClass::Redirection) => &self.redirection,
            Outcome::Status(StatusClass::ClientError) => &self.client_error,
            Outcome::Status(StatusClass::ServerError) => &self.server_error,
            Outcome::Mismatch => &self.mismatch,
            Outcome::Timeout => &self.timeout,
            Outcome::Reset => &self.reset,
            Outcome::Error => &self.error,
        }
    }
}

impl OutcomeAtomics {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            latency: Arc::new(AtomicBucket::new()),
        }
    }

    pub fn record_sent(&self) {
        self.counters.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_response(&self, outcome: Outcome, latency: Duration, bytes: u64) {
        self.counters.outcome(outcome).fetch_add(1, Ordering::Relaxed);
        self.counters.bytes.fetch_add(bytes, Ordering::Relaxed);
        self.latency.push(latency);

        #[cfg(feature = "metrics")]
        {
            metrics::counter!("volley_outcomes", "outcome" => outcome.as_str()).increment(1);
            metrics::histogram!("volley_latency_ms").record(latency.as_secs_f64() * 1_000.);
        }
    }

    pub fn record_failure(&self, outcome: Outcome) {
        self.counters.outcome(outcome).fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!("volley_outcomes", "outcome" => outcome.as_str()).increment(1);
    }

    /// Drain everything recorded since the previous call.
    pub fn collect(&self) -> IntervalSample {
        let mut counts = OutcomeCounts::default();
        for outcome in Outcome::ALL {
            let n = self.counters.outcome(outcome).swap(0, Ordering::Relaxed);
            counts.add(outcome, n);
        }
        counts.sent = self.counters.sent.swap(0, Ordering::Relaxed);

        let bytes = self.counters.bytes.swap(0, Ordering::Relaxed);
        let mut latencies = vec![];
        self.latency.clear_with(|dur| {
            latencies.extend_from_slice(dur);
        });

        IntervalSample {
            counts,
            bytes,
            latencies,
        }
    }
}

pub(crate) struct IntervalSample {
    pub counts: OutcomeCounts,
    pub bytes: u64,
    pub latencies: Vec<Duration>,
}

impl IntervalSample {
    /// Requests that received a response, whatever its status.
    pub fn responses(&self) -> u64 {
        self.counts.status_class_sum() + self.counts.mismatches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_drains() {
        let atomics = OutcomeAtomics::new();
        let shared = atomics.clone();

        shared.record_sent();
        shared.record_sent();
        shared.record_sent();
        shared.record_response(
            Outcome::Status(StatusClass::Success),
            Duration::from_millis(5),
            100,
        );
        shared.record_response(
            Outcome::Status(StatusClass::ClientError),
            Duration::from_millis(7),
            20,
        );
        shared.record_failure(Outcome::Timeout);

        let sample = atomics.collect();
        assert_eq!(sample.counts.sent, 3);
        assert_eq!(sample.counts.total, 3);
        assert_eq!(sample.counts.success, 1);
        assert_eq!(sample.counts.client_error, 1);
        assert_eq!(sample.counts.timeouts, 1);
        assert_eq!(sample.responses(), 2);
        assert_eq!(sample.bytes, 120);
        assert_eq!(sample.latencies.len(), 2);

        let empty = atomics.collect();
        assert_eq!(empty.counts, OutcomeCounts::default());
        assert!(empty.latencies.is_empty());
    }
}
