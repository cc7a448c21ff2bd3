use chrono::{DateTime, Utc};

mod address;
mod ids;

pub use address::Address;
pub use ids::{AgentId, BeliefId, ContentId};

/// Probability in [0, 1]
pub type Probability = f64;

/// Settlement currency amount in its smallest unit
pub type Amount = u64;

/// Content token amount in atomic units
pub type TokenAmount = u64;

/// Settlement period counter
pub type Epoch = u64;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;
