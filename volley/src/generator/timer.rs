use std::time::Duration;
use tokio::time::{interval, timeout_at, Instant, Interval, MissedTickBehavior};

/// Sampling clock for one run.
///
/// Ticks once per interval until the run deadline; the final tick fires at the deadline
/// itself, so the last sample may cover a shorter window.
pub(crate) struct Timer {
    interval: Interval,
    last_tick: Instant,
    interval_dur: Duration,
    deadline: Instant,
}

pub(crate) struct Tick {
    pub elapsed: Duration,
    pub finished: bool,
}

impl Timer {
    pub async fn new(interval_dur: Duration, run_for: Duration) -> Self {
        let mut interval = interval(interval_dur);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // NOTE: First tick completes instantly
        let last_tick = interval.tick().await;
        Self {
            interval,
            last_tick,
            interval_dur,
            deadline: last_tick + run_for,
        }
    }

    pub async fn tick(&mut self) -> Tick {
        let now = match timeout_at(self.deadline, self.interval.tick()).await {
            Ok(next) => next,
            Err(_) => self.deadline,
        };
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        Tick {
            elapsed,
            finished: now >= self.deadline,
        }
    }
}

impl std::fmt::Display for Timer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", humantime::format_duration(self.interval_dur))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_last_tick_lands_on_deadline() {
        let mut timer = Timer::new(Duration::from_secs(1), Duration::from_millis(2_500)).await;
        assert_eq!(timer.to_string(), "1s");

        let first = timer.tick().await;
        assert_eq!(first.elapsed, Duration::from_secs(1));
        assert!(!first.finished);

        let second = timer.tick().await;
        assert!(!second.finished);

        let last = timer.tick().await;
        assert_eq!(last.elapsed, Duration::from_millis(500));
        assert!(last.finished);
    }
}
