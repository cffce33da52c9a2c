//! Merging of per-worker results.
//!
//! Counting fields, minimums and maximums combine exactly. Averages are combined as an
//! average weighted by each input's requests/sec average, which approximates the pooled rate
//! rather than computing it. Standard deviations and percentiles cannot be recovered from
//! per-worker summaries, so a result combined from more than one input omits them.
use crate::{CombinedResult, Distribution, OutcomeCounts, RawResult, RunStats};
use thiserror::Error;
#[allow(unused)]
use tracing::{debug, trace, warn};

/// Caller contract violations. These indicate a bug in the caller, not a runtime condition.
#[derive(Debug, Error, PartialEq)]
pub enum AggregationError {
    #[error("No results to combine")]
    Empty,

    #[error("Result {index} was produced by `{found}`, expected `{expected}`")]
    MismatchedConfig {
        index: usize,
        expected: String,
        found: String,
    },
}

/// Combine one or more raw results produced under the same [`RunConfig`](crate::RunConfig).
///
/// A single input is returned unchanged (with a worker count of one).
pub fn aggregate(results: Vec<RawResult>) -> Result<CombinedResult, AggregationError> {
    let first = results.first().ok_or(AggregationError::Empty)?;

    if let Some((index, mismatch)) = results
        .iter()
        .enumerate()
        .find(|(_, r)| r.config() != first.config())
    {
        return Err(AggregationError::MismatchedConfig {
            index,
            expected: first.config().to_string(),
            found: mismatch.config().to_string(),
        });
    }

    if results.len() == 1 {
        let raw = results.into_iter().next().ok_or(AggregationError::Empty)?;
        return Ok(raw.into());
    }

    debug!("Combining {} results", results.len());

    let config = first.config().clone();
    let stats: Vec<&RunStats> = results.iter().map(RawResult::stats).collect();
    let weights: Vec<f64> = stats.iter().map(|s| s.requests.average).collect();

    let mut counts = OutcomeCounts::default();
    for s in &stats {
        counts.merge(&s.counts);
    }

    let combined = RunStats {
        counts,
        requests: combine(stats.iter().map(|s| &s.requests), &weights),
        latency: combine(stats.iter().map(|s| &s.latency), &weights),
        throughput: combine(stats.iter().map(|s| &s.throughput), &weights),
        start: stats
            .iter()
            .map(|s| s.start)
            .min()
            .unwrap_or(first.stats().start),
        finish: stats
            .iter()
            .map(|s| s.finish)
            .max()
            .unwrap_or(first.stats().finish),
    };

    Ok(CombinedResult::new(config, results.len(), combined))
}

/// Distributions without samples only contribute their total.
fn combine<'a>(dists: impl Iterator<Item = &'a Distribution>, weights: &[f64]) -> Distribution {
    let dists: Vec<&Distribution> = dists.collect();
    let total = dists.iter().map(|d| d.total).sum();

    let (measured, measured_weights): (Vec<&Distribution>, Vec<f64>) = dists
        .iter()
        .zip(weights)
        .filter(|(d, _)| !d.is_empty())
        .map(|(d, w)| (*d, *w))
        .unzip();

    if measured.is_empty() {
        return Distribution {
            total,
            ..Distribution::default()
        };
    }

    Distribution {
        samples: measured.iter().map(|d| d.samples).sum(),
        average: weighted_average(measured.iter().map(|d| d.average), &measured_weights),
        mean: weighted_average(measured.iter().map(|d| d.mean), &measured_weights),
        stddev: None,
        min: measured.iter().map(|d| d.min).fold(f64::INFINITY, f64::min),
        max: measured.iter().map(|d| d.max).fold(f64::NEG_INFINITY, f64::max),
        total,
        percentiles: None,
    }
}

/// `Σ(value_i · weight_i) / Σ(weight_i)`, or the plain mean when no input carries weight.
fn weighted_average(values: impl Iterator<Item = f64>, weights: &[f64]) -> f64 {
    let values: Vec<f64> = values.collect();
    let total_weight: f64 = weights.iter().sum();

    if total_weight > 0. && total_weight.is_finite() {
        values
            .iter()
            .zip(weights)
            .map(|(v, w)| v * w)
            .sum::<f64>()
            / total_weight
    } else {
        warn!("Inputs carry no requests/sec weight; using unweighted mean.");
        values.iter().sum::<f64>() / values.len().max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, Percentile, Percentiles, RunConfig, StatusClass};
    use std::time::Duration;
    use time::OffsetDateTime;

    fn config(label: &str) -> RunConfig {
        RunConfig::builder("http://localhost:3000/api/accounts")
            .duration(Duration::from_secs(10))
            .workers(2)
            .label(label)
            .build()
            .unwrap()
    }

    fn dist(average: f64, min: f64, max: f64) -> Distribution {
        Distribution {
            samples: 10,
            average,
            mean: average,
            stddev: Some(1.5),
            min,
            max,
            total: Some(average * 10.),
            percentiles: Some(Percentiles::new(vec![Percentile {
                rank: 99.,
                value: max,
            }])),
        }
    }

    fn raw(label: &str, rps: f64, latency: f64, latency_min: f64, latency_max: f64) -> RawResult {
        let mut counts = OutcomeCounts::default();
        counts.add(Outcome::Status(StatusClass::Success), (rps * 10.) as u64);
        counts.add(Outcome::Status(StatusClass::ServerError), 2);
        counts.add(Outcome::Timeout, 1);
        counts.sent = counts.total + 3;

        let start = OffsetDateTime::from_unix_timestamp(1_700_000_000 + rps as i64).unwrap();
        RawResult::new(
            config(label),
            RunStats {
                counts,
                requests: dist(rps, rps / 2., rps * 2.),
                latency: dist(latency, latency_min, latency_max),
                throughput: dist(rps * 100., rps * 50., rps * 200.),
                start,
                finish: start + Duration::from_secs(10),
            },
        )
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(aggregate(vec![]), Err(AggregationError::Empty));
    }

    #[test]
    fn test_mismatched_config() {
        let res = aggregate(vec![
            raw("a", 10., 100., 1., 500.),
            raw("b", 30., 200., 2., 700.),
        ]);
        assert!(matches!(
            res,
            Err(AggregationError::MismatchedConfig { index: 1, .. })
        ));
    }

    #[test]
    fn test_single_input_identity() {
        let input = raw("a", 10., 100., 1., 500.);
        let combined = aggregate(vec![input.clone()]).unwrap();

        assert_eq!(combined.workers(), 1);
        assert_eq!(combined.config(), input.config());
        assert_eq!(combined.stats(), input.stats());
    }

    #[test]
    fn test_weighted_latency_average() {
        let combined = aggregate(vec![
            raw("a", 10., 100., 1., 500.),
            raw("a", 30., 200., 2., 700.),
        ])
        .unwrap();

        let latency = &combined.stats().latency;
        assert!((latency.average - 175.).abs() < 1e-9);
        assert!((latency.mean - 175.).abs() < 1e-9);

        // (10·10 + 30·30) / 40
        assert!((combined.requests_per_second() - 25.).abs() < 1e-9);
        assert_eq!(combined.workers(), 2);
    }

    #[test]
    fn test_counts_are_summed() {
        let inputs = vec![
            raw("a", 10., 100., 1., 500.),
            raw("a", 30., 200., 2., 700.),
            raw("a", 20., 150., 3., 900.),
        ];
        let expected_total: u64 = inputs.iter().map(|r| r.stats().counts.total).sum();
        let expected_sent: u64 = inputs.iter().map(|r| r.stats().counts.sent).sum();

        let combined = aggregate(inputs).unwrap();
        let counts = &combined.stats().counts;
        assert_eq!(counts.total, expected_total);
        assert_eq!(counts.sent, expected_sent);
        assert_eq!(counts.server_error, 6);
        assert_eq!(counts.timeouts, 3);
        assert_eq!(combined.stats().requests.total, Some(600.));
    }

    #[test]
    fn test_min_max_across_inputs() {
        let combined = aggregate(vec![
            raw("a", 30., 200., 2., 700.),
            raw("a", 10., 100., 1., 500.),
            raw("a", 20., 150., 3., 900.),
        ])
        .unwrap();

        let latency = &combined.stats().latency;
        assert_eq!(latency.min, 1.);
        assert_eq!(latency.max, 900.);
        assert_eq!(combined.stats().requests.min, 5.);
        assert_eq!(combined.stats().requests.max, 60.);
    }

    #[test]
    fn test_spread_statistics_are_omitted() {
        let combined = aggregate(vec![
            raw("a", 10., 100., 1., 500.),
            raw("a", 30., 200., 2., 700.),
        ])
        .unwrap();

        for dist in [
            &combined.stats().requests,
            &combined.stats().latency,
            &combined.stats().throughput,
        ] {
            assert_eq!(dist.stddev, None);
            assert_eq!(dist.percentiles, None);
        }
        assert_eq!(combined.stats().latency.p99(), None);
    }

    #[test]
    fn test_time_window_spans_inputs() {
        let a = raw("a", 10., 100., 1., 500.);
        let b = raw("a", 30., 200., 2., 700.);
        let combined = aggregate(vec![b.clone(), a.clone()]).unwrap();

        assert_eq!(combined.stats().start, a.stats().start);
        assert_eq!(combined.stats().finish, b.stats().finish);
    }

    #[tracing_test::traced_test]
    #[test]
    fn test_zero_weights_fall_back_to_mean() {
        let combined = aggregate(vec![
            raw("a", 0., 100., 1., 500.),
            raw("a", 0., 300., 2., 700.),
        ])
        .unwrap();

        assert!((combined.stats().latency.average - 200.).abs() < 1e-9);
        assert!(logs_contain("no requests/sec weight"));
    }

    fn stalled(label: &str) -> RawResult {
        let raw = raw(label, 0., 0., 0., 0.);
        RawResult::new(
            raw.config().clone(),
            RunStats {
                latency: Distribution::default(),
                ..raw.stats().clone()
            },
        )
    }

    #[test]
    fn test_worker_without_responses_is_not_a_measurement() {
        let combined = aggregate(vec![
            raw("a", 10., 100., 40., 500.),
            stalled("a"),
            raw("a", 30., 200., 60., 700.),
        ])
        .unwrap();

        let latency = &combined.stats().latency;
        assert_eq!(latency.samples, 20);
        assert_eq!(latency.min, 40.);
        assert_eq!(latency.max, 700.);
        assert!((latency.average - 175.).abs() < 1e-9);
    }

    #[test]
    fn test_all_workers_without_responses() {
        let latency = aggregate(vec![stalled("a"), stalled("a")])
            .unwrap()
            .stats()
            .latency
            .clone();
        assert!(latency.is_empty());
        assert_eq!(latency.percentiles, None);
    }
}
