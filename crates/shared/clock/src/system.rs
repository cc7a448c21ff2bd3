use chrono::{Duration, Utc};
use veritas_core::{Epoch, Timestamp};
use veritas_ports::EpochClock;

/// Wall-clock epochs counted from a genesis timestamp
///
/// Epoch `n` covers `[genesis + n * duration, genesis + (n + 1) * duration)`.
/// Before genesis the clock reports epoch 0.
pub struct SystemEpochClock {
    genesis: Timestamp,
    epoch_duration: Duration,
}

impl SystemEpochClock {
    /// Create a clock; a non-positive duration is treated as one second
    pub fn new(genesis: Timestamp, epoch_duration: Duration) -> Self {
        let epoch_duration = if epoch_duration > Duration::zero() {
            epoch_duration
        } else {
            Duration::seconds(1)
        };
        Self {
            genesis,
            epoch_duration,
        }
    }

    pub fn epoch_duration(&self) -> Duration {
        self.epoch_duration
    }

    /// Epoch containing `time`
    pub fn epoch_at(&self, time: Timestamp) -> Epoch {
        let elapsed = time - self.genesis;
        if elapsed <= Duration::zero() {
            return 0;
        }
        match (
            elapsed.num_milliseconds(),
            self.epoch_duration.num_milliseconds(),
        ) {
            (e, d) if d > 0 => (e / d) as Epoch,
            // Sub-millisecond epochs: fall back to nanoseconds
            _ => {
                let e = elapsed.num_nanoseconds().unwrap_or(i64::MAX);
                let d = self.epoch_duration.num_nanoseconds().unwrap_or(1).max(1);
                (e / d) as Epoch
            }
        }
    }
}

impl EpochClock for SystemEpochClock {
    fn current_epoch(&self) -> Epoch {
        self.epoch_at(Utc::now())
    }

    fn name(&self) -> &str {
        "SystemEpochClock"
    }
}
