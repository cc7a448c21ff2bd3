//! Settlement errors

use serde_json::{Value, json};
use thiserror::Error;
use veritas_core::{AgentId, BeliefId, Epoch, SubmissionError};
use veritas_ports::{DecompositionError, ErrorKind, PoolSettlementError, RepositoryError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Decomposition failed: {0}")]
    Decomposition(#[from] DecompositionError),

    #[error("Pool settlement failed: {0}")]
    Ledger(#[from] PoolSettlementError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Invalid submission: {0}")]
    InvalidSubmission(#[from] SubmissionError),

    #[error("Belief not found: {0}")]
    BeliefNotFound(BeliefId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Belief {belief_id} is not active in epoch {epoch}")]
    BeliefExpired { belief_id: BeliefId, epoch: Epoch },

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),
}

impl SettlementError {
    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::Decomposition(e) => e.code(),
            SettlementError::Ledger(e) => e.code(),
            SettlementError::Repository(RepositoryError::BeliefNotFound(_))
            | SettlementError::BeliefNotFound(_) => "BELIEF_NOT_FOUND",
            SettlementError::Repository(RepositoryError::AgentNotFound(_))
            | SettlementError::AgentNotFound(_) => "AGENT_NOT_FOUND",
            SettlementError::Repository(RepositoryError::Storage(_)) => "STORAGE_ERROR",
            SettlementError::InvalidSubmission(_) => "INVALID_SUBMISSION",
            SettlementError::BeliefExpired { .. } => "BELIEF_EXPIRED",
            SettlementError::InvalidWeights(_) => "INVALID_WEIGHTS",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SettlementError::Decomposition(e) => e.kind(),
            SettlementError::Ledger(e) => e.kind(),
            SettlementError::InvalidSubmission(_) | SettlementError::InvalidWeights(_) => {
                ErrorKind::Validation
            }
            SettlementError::Repository(_)
            | SettlementError::BeliefNotFound(_)
            | SettlementError::AgentNotFound(_)
            | SettlementError::BeliefExpired { .. } => ErrorKind::State,
        }
    }

    /// Diagnostic context for callers (measured quality, weight sum, ...)
    pub fn context(&self) -> Value {
        match self {
            SettlementError::Decomposition(e) => e.context(),
            SettlementError::BeliefExpired { belief_id, epoch } => {
                json!({ "belief_id": belief_id.to_string(), "epoch": epoch })
            }
            _ => json!({}),
        }
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_pass_through() {
        let err: SettlementError = DecompositionError::QualityTooLow {
            quality: 0.1,
            threshold: 0.3,
        }
        .into();
        assert_eq!(err.code(), "QUALITY_TOO_LOW");
        assert_eq!(err.kind(), ErrorKind::Quality);
        assert_eq!(err.context()["quality"], json!(0.1));

        let err: SettlementError = RepositoryError::BeliefNotFound(BeliefId::new()).into();
        assert_eq!(err.code(), "BELIEF_NOT_FOUND");
    }
}
