//! Veritas Ports
//!
//! Port definitions (traits) for the Veritas settlement engine.
//! These define the boundaries between domain logic and infrastructure:
//! the settlement orchestrator only ever talks to a decomposer, a pool
//! ledger, a belief repository and an epoch clock through these traits.

mod clock;
mod decomposer;
mod error;
mod repository;
mod settlement;

pub use clock::EpochClock;
pub use decomposer::{
    BeliefDecomposer, DecompositionResult, LocalExpectationMatrix, LooResult, Report, Reports,
    Weights,
};
pub use error::{
    DecomposeResult, DecompositionError, ErrorKind, PoolSettlementError, PoolSettlementResult,
    RepositoryError, RepositoryResult,
};
pub use repository::BeliefRepository;
pub use settlement::{AdjustmentDirection, ElasticAdjustment, PoolSettlement};
