use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use veritas_core::{AgentId, BeliefId, ContentId};

/// Error taxonomy shared by every component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed input: bad weights, amounts or parameters. Never retried.
    Validation,
    /// Conflicts with existing state: duplicate initialization, insufficient balance.
    State,
    /// Inputs were well-formed but could not be decomposed reliably.
    Quality,
    /// Wrong signer or mismatched registry reference.
    Authorization,
}

impl ErrorKind {
    /// Whether a caller can reasonably retry with new inputs next epoch
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Quality)
    }
}

/// Domain-level errors for belief decomposition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecompositionError {
    #[error("Invalid weights: {reason} (sum={sum})")]
    InvalidWeights { sum: f64, reason: String },

    #[error("Insufficient participants: {actual} < {required}")]
    InsufficientParticipants { actual: usize, required: usize },

    #[error("Boundary clustering: {mass:.4} of weight within {epsilon} of 0 or 1 (limit {limit})")]
    BoundaryClustering { mass: f64, epsilon: f64, limit: f64 },

    #[error("Decomposition quality {quality:.4} below threshold {threshold}")]
    QualityTooLow { quality: f64, threshold: f64 },

    #[error("Excluded agent {agent_id} must not carry weight")]
    InvalidExclusion { agent_id: AgentId },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical failure: {0}")]
    NumericalFailure(String),
}

impl DecompositionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DecompositionError::InvalidWeights { .. } => "INVALID_WEIGHTS",
            DecompositionError::InsufficientParticipants { .. } => "INSUFFICIENT_PARTICIPANTS",
            DecompositionError::BoundaryClustering { .. } => "BOUNDARY_CLUSTERING",
            DecompositionError::QualityTooLow { .. } => "QUALITY_TOO_LOW",
            DecompositionError::InvalidExclusion { .. } => "INVALID_EXCLUSION",
            DecompositionError::InvalidInput(_) => "INVALID_INPUT",
            DecompositionError::NumericalFailure(_) => "NUMERICAL_FAILURE",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DecompositionError::InvalidWeights { .. }
            | DecompositionError::InsufficientParticipants { .. }
            | DecompositionError::InvalidExclusion { .. }
            | DecompositionError::InvalidInput(_) => ErrorKind::Validation,
            DecompositionError::BoundaryClustering { .. }
            | DecompositionError::QualityTooLow { .. }
            | DecompositionError::NumericalFailure(_) => ErrorKind::Quality,
        }
    }

    /// Diagnostic numbers a caller can use to improve its inputs
    pub fn context(&self) -> Value {
        match self {
            DecompositionError::InvalidWeights { sum, .. } => json!({ "weight_sum": sum }),
            DecompositionError::InsufficientParticipants { actual, required } => {
                json!({ "participants": actual, "required": required })
            }
            DecompositionError::BoundaryClustering {
                mass,
                epsilon,
                limit,
            } => json!({ "boundary_mass": mass, "epsilon": epsilon, "limit": limit }),
            DecompositionError::QualityTooLow { quality, threshold } => {
                json!({ "quality": quality, "threshold": threshold })
            }
            DecompositionError::InvalidExclusion { agent_id } => {
                json!({ "agent_id": agent_id.to_string() })
            }
            DecompositionError::InvalidInput(_) | DecompositionError::NumericalFailure(_) => {
                json!({})
            }
        }
    }
}

pub type DecomposeResult<T> = std::result::Result<T, DecompositionError>;

/// Errors surfaced by a pool ledger through the settlement port
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PoolSettlementError {
    #[error("No pool for content {0}")]
    PoolNotFound(ContentId),

    #[error("Treasury not initialized")]
    TreasuryNotInitialized,

    #[error("{code}: {message}")]
    Rejected {
        code: &'static str,
        kind: ErrorKind,
        message: String,
    },
}

impl PoolSettlementError {
    pub fn code(&self) -> &'static str {
        match self {
            PoolSettlementError::PoolNotFound(_) => "POOL_NOT_FOUND",
            PoolSettlementError::TreasuryNotInitialized => "TREASURY_NOT_INITIALIZED",
            PoolSettlementError::Rejected { code, .. } => *code,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PoolSettlementError::PoolNotFound(_) | PoolSettlementError::TreasuryNotInitialized => {
                ErrorKind::State
            }
            PoolSettlementError::Rejected { kind, .. } => *kind,
        }
    }
}

pub type PoolSettlementResult<T> = std::result::Result<T, PoolSettlementError>;

/// Errors from belief/agent storage
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Belief not found: {0}")]
    BeliefNotFound(BeliefId),

    #[error("Agent not found: {0}")]
    AgentNotFound(AgentId),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_error_codes() {
        let err = DecompositionError::QualityTooLow {
            quality: 0.12,
            threshold: 0.3,
        };
        assert_eq!(err.code(), "QUALITY_TOO_LOW");
        assert_eq!(err.kind(), ErrorKind::Quality);
        assert!(err.kind().is_retryable());
        assert_eq!(err.context()["quality"], json!(0.12));
    }

    #[test]
    fn test_invalid_weights_context_carries_sum() {
        let err = DecompositionError::InvalidWeights {
            sum: 0.8,
            reason: "weights must sum to 1".to_string(),
        };
        assert_eq!(err.code(), "INVALID_WEIGHTS");
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.kind().is_retryable());
        assert_eq!(err.context()["weight_sum"], json!(0.8));
    }

    #[test]
    fn test_rejected_settlement_error_keeps_code() {
        let err = PoolSettlementError::Rejected {
            code: "UNAUTHORIZED",
            kind: ErrorKind::Authorization,
            message: "signer is not the pool authority".to_string(),
        };
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }
}
