use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::debug;
use veritas_core::Epoch;
use veritas_ports::EpochClock;

/// Epoch clock that only moves when told to
///
/// Used for deterministic tests and for replaying settlement history.
pub struct ManualEpochClock {
    epoch: AtomicU64,
}

impl ManualEpochClock {
    pub fn new(start: Epoch) -> Arc<Self> {
        Arc::new(Self {
            epoch: AtomicU64::new(start),
        })
    }

    /// Move forward by `epochs` and return the new epoch
    pub fn advance(&self, epochs: u64) -> Epoch {
        let next = self.epoch.fetch_add(epochs, Ordering::SeqCst) + epochs;
        debug!("ManualEpochClock advanced to epoch {}", next);
        next
    }

    /// Jump to an explicit epoch
    ///
    /// Moving backwards is allowed; callers replaying history rely on it.
    pub fn set_epoch(&self, epoch: Epoch) {
        self.epoch.store(epoch, Ordering::SeqCst);
    }
}

impl EpochClock for ManualEpochClock {
    fn current_epoch(&self) -> Epoch {
        self.epoch.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "ManualEpochClock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualEpochClock::new(5);
        assert_eq!(clock.current_epoch(), 5);
        assert_eq!(clock.advance(1), 6);
        assert_eq!(clock.advance(4), 10);
        assert_eq!(clock.current_epoch(), 10);
    }

    #[test]
    fn test_manual_clock_set_epoch() {
        let clock = ManualEpochClock::new(0);
        clock.set_epoch(42);
        assert_eq!(clock.current_epoch(), 42);
        clock.set_epoch(7);
        assert_eq!(clock.current_epoch(), 7);
        assert_eq!(clock.name(), "ManualEpochClock");
    }
}
