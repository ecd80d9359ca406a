//! Per-second rates from cumulative byte counters.

use std::time::{Duration, Instant};

/// Elapsed time never goes below this when dividing
pub const MIN_RATE_INTERVAL: Duration = Duration::from_millis(100);

/// Converts one cumulative counter stream into a per-second rate
#[derive(Debug, Clone)]
pub struct RateTracker {
    previous: Option<(u64, Instant)>,
    min_interval: Duration,
}

impl RateTracker {
    pub fn new() -> Self {
        Self::with_min_interval(MIN_RATE_INTERVAL)
    }

    pub fn with_min_interval(min_interval: Duration) -> Self {
        Self {
            previous: None,
            min_interval,
        }
    }

    /// Feed the counter's current value and return bytes/sec since the last call.
    ///
    /// The first call only sets the baseline and reports 0. A counter that went
    /// backwards (reset or wrap) reports 0 but still becomes the new baseline.
    pub fn update(&mut self, current: u64, now: Instant) -> u64 {
        let rate = match self.previous {
            None => 0,
            Some((previous, _)) if current < previous => {
                log::debug!("Counter regressed from {} to {}, rebaselining", previous, current);
                0
            }
            Some((previous, at)) => {
                let elapsed = now.saturating_duration_since(at).max(self.min_interval);
                ((current - previous) as f64 / elapsed.as_secs_f64()) as u64
            }
        };

        self.previous = Some((current, now));
        rate
    }

    pub fn baseline(&self) -> Option<u64> {
        self.previous.map(|(value, _)| value)
    }
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// One tracker per disk/network counter stream
#[derive(Debug, Clone, Default)]
pub struct IoRates {
    pub disk_read: RateTracker,
    pub disk_write: RateTracker,
    pub net_sent: RateTracker,
    pub net_received: RateTracker,
}
