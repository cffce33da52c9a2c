use std::time::Duration;

/// Default wall-clock duration of a single run.
pub const DEFAULT_DURATION: Duration = Duration::from_secs(30);

/// Default number of concurrent connections per generator.
pub const DEFAULT_CONNECTIONS: usize = 100;

/// Default number of requests queued per connection before awaiting responses.
pub const DEFAULT_PIPELINING: usize = 1;

/// Default number of generator instances run side by side.
pub const DEFAULT_WORKERS: usize = 1;

pub const DEFAULT_LABEL: &str = "run";

/// Ranks (in percent) at which every [`Distribution`](crate::Distribution) reports percentiles.
pub const PERCENTILE_RANKS: [f64; 15] = [
    0.001, 0.01, 0.1, 1., 2.5, 10., 25., 50., 75., 90., 97.5, 99., 99.9, 99.99, 99.999,
];

pub const SECONDS_PER_DAY: f64 = 86_400.;
