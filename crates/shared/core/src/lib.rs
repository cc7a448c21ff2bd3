//! Veritas Core Domain
//!
//! Pure domain types for the Veritas content-relevance market.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod entities;
pub mod probability;
pub mod values;

// Re-export commonly used types at crate root
pub use entities::{Agent, Belief, BeliefStatus, BeliefSubmission, SubmissionError};
pub use values::{
    Address, AgentId, Amount, BeliefId, ContentId, Epoch, Probability, Timestamp, TokenAmount,
};
