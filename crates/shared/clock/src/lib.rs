//! Veritas Clock Infrastructure
//!
//! Settlement runs in discrete epochs. Two clocks provide the current epoch:
//!
//! ```text
//! SystemEpochClock  genesis + n * epoch_duration <= now   (production)
//! ManualEpochClock  explicit advance()                    (tests, replays)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use veritas_clock::{EpochClock, ManualEpochClock, SystemEpochClock};
//! use chrono::{Duration, Utc};
//!
//! let wall = SystemEpochClock::new(Utc::now(), Duration::hours(1));
//! let epoch = wall.current_epoch();
//!
//! let manual = ManualEpochClock::new(0);
//! manual.advance(3);
//! assert_eq!(manual.current_epoch(), 3);
//! ```

mod manual;
mod system;

pub use manual::ManualEpochClock;
pub use system::SystemEpochClock;

// Re-export the EpochClock trait for convenience
pub use veritas_ports::EpochClock;
