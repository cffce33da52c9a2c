use pdatastructs::tdigest::{TDigest, K1};
use tracing::error;
use volley_core::{Distribution, Percentile, Percentiles, PERCENTILE_RANKS};

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Streaming summary of one measured quantity.
///
/// Mean and variance are tracked exactly (Welford), quantiles are estimated with a TDigest.
#[derive(Debug)]
pub(crate) struct SampleSummary {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
    digest: TDigest<K1>,
}

impl SampleSummary {
    pub fn new() -> Self {
        Self {
            count: 0,
            mean: 0.,
            m2: 0.,
            min: 0.,
            max: 0.,
            digest: default_tdigest(),
        }
    }

    pub fn insert(&mut self, value: f64) {
        if !value.is_finite() {
            return;
        }

        if self.count == 0 {
            self.min = value;
            self.max = value;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);
        }

        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);

        self.digest.insert(value);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Population standard deviation.
    pub fn stddev(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).sqrt())
    }

    fn quantile(&self, quantile: f64) -> f64 {
        let value = self.digest.quantile(quantile);

        // TDigest occasionally yields NaN for sparse inputs.
        if value.is_finite() {
            value.clamp(self.min, self.max)
        } else {
            error!("NaN quantile calculation; reporting the minimum instead.");
            self.min
        }
    }

    /// With no samples only `total` is kept; nothing else was measured.
    pub fn into_distribution(self, total: Option<f64>) -> Distribution {
        if self.count == 0 {
            return Distribution {
                total,
                ..Distribution::default()
            };
        }

        let percentiles = PERCENTILE_RANKS
            .iter()
            .map(|&rank| Percentile {
                rank,
                value: self.quantile(rank / 100.),
            })
            .collect();

        Distribution {
            samples: self.count,
            average: self.mean,
            mean: self.mean,
            stddev: self.stddev(),
            min: self.min,
            max: self.max,
            total,
            percentiles: Some(Percentiles::new(percentiles)),
        }
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}
