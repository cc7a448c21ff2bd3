use veritas_core::Epoch;

/// Port for epoch time
///
/// This allows settlement to run against different epoch sources:
/// - Wall-clock epochs derived from a genesis timestamp in production
/// - Manually advanced epochs for deterministic tests and simulation
pub trait EpochClock: Send + Sync {
    /// The epoch currently open for submissions
    fn current_epoch(&self) -> Epoch;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "EpochClock"
    }
}
