//! Veritas Epoch Settlement
//!
//! Turns each epoch's belief submissions into a new consensus per belief and
//! one reward or penalty per content pool.
//!
//! ## Flow
//!
//! ```text
//!   submit ──► InMemoryBeliefStore ──► EpochSettlementOrchestrator
//!                                          │
//!                      ┌───────────────────┼────────────────────┐
//!                      ▼                   ▼                    ▼
//!              BeliefDecomposer    record_aggregate     PoolSettlement
//!              (consensus + LOO)   (previous_aggregate)  (penalty | reward)
//! ```
//!
//! The orchestrator only sees the port traits; the ledger and decomposer are
//! supplied by the caller. `EpochScheduler` drives it from an `EpochClock`.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod scheduler;
pub mod scoring;
pub mod service;
pub mod store;
pub mod weights;

pub use config::{SchedulerConfig, SettlementConfig, WeightingMethod};
pub use error::{Result, SettlementError};
pub use orchestrator::{BeliefFailure, EpochReport, EpochSettlementOrchestrator, ProcessedBelief};
pub use scheduler::{EpochScheduler, SchedulerHandle};
pub use scoring::{AgentScore, Redistribution, informative_mass, score_agents, size_redistribution};
pub use service::SettlementService;
pub use store::InMemoryBeliefStore;
pub use weights::compute_weights;
