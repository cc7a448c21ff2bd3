//! Ledger errors

use thiserror::Error;
use veritas_core::{Address, Amount, ContentId};
use veritas_ports::{ErrorKind, PoolSettlementError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: String },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Pool already exists for content {0}")]
    PoolAlreadyExists(ContentId),

    #[error("Pool not found for content {0}")]
    PoolNotFound(ContentId),

    #[error("Treasury already initialized")]
    TreasuryAlreadyInitialized,

    #[error("Treasury not initialized")]
    TreasuryNotInitialized,

    #[error("Insufficient reserve: requested={requested}, reserve={reserve}")]
    InsufficientReserve { requested: Amount, reserve: Amount },

    #[error("Insufficient pool vault balance: requested={requested}, balance={balance}")]
    InsufficientVaultBalance { requested: Amount, balance: Amount },

    #[error("Insufficient treasury balance: requested={requested}, balance={balance}")]
    InsufficientTreasuryBalance { requested: Amount, balance: Amount },

    #[error("Insufficient funds for {address}: requested={requested}, balance={balance}")]
    InsufficientFunds {
        address: Address,
        requested: Amount,
        balance: Amount,
    },

    #[error("Insufficient tokens for {address}: requested={requested}, balance={balance}")]
    InsufficientTokens {
        address: Address,
        requested: Amount,
        balance: Amount,
    },

    #[error("Reserve cap exceeded: reserve would be {reserve}, cap={cap}")]
    ReserveCapExceeded { reserve: Amount, cap: Amount },

    #[error("Supply cap exceeded: supply would be {supply}, cap={cap}")]
    SupplyCapExceeded { supply: Amount, cap: Amount },

    #[error("Unauthorized: {0} is not the registered authority")]
    Unauthorized(Address),

    #[error("Invalid factory: expected {expected}, got {actual}")]
    InvalidFactory { expected: Address, actual: Address },

    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

impl LedgerError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount { .. } => "INVALID_AMOUNT",
            LedgerError::InvalidParameters(_) => "INVALID_PARAMETERS",
            LedgerError::PoolAlreadyExists(_) => "POOL_ALREADY_EXISTS",
            LedgerError::PoolNotFound(_) => "POOL_NOT_FOUND",
            LedgerError::TreasuryAlreadyInitialized => "TREASURY_ALREADY_INITIALIZED",
            LedgerError::TreasuryNotInitialized => "TREASURY_NOT_INITIALIZED",
            LedgerError::InsufficientReserve { .. } => "INSUFFICIENT_RESERVE",
            LedgerError::InsufficientVaultBalance { .. } => "INSUFFICIENT_VAULT_BALANCE",
            LedgerError::InsufficientTreasuryBalance { .. } => "INSUFFICIENT_TREASURY_BALANCE",
            LedgerError::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            LedgerError::InsufficientTokens { .. } => "INSUFFICIENT_TOKENS",
            LedgerError::ReserveCapExceeded { .. } => "RESERVE_CAP_EXCEEDED",
            LedgerError::SupplyCapExceeded { .. } => "SUPPLY_CAP_EXCEEDED",
            LedgerError::Unauthorized(_) => "UNAUTHORIZED",
            LedgerError::InvalidFactory { .. } => "INVALID_FACTORY",
            LedgerError::ArithmeticOverflow(_) => "ARITHMETIC_OVERFLOW",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidAmount { .. }
            | LedgerError::InvalidParameters(_)
            | LedgerError::ArithmeticOverflow(_) => ErrorKind::Validation,
            LedgerError::Unauthorized(_) | LedgerError::InvalidFactory { .. } => {
                ErrorKind::Authorization
            }
            _ => ErrorKind::State,
        }
    }
}

impl From<LedgerError> for PoolSettlementError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::PoolNotFound(content_id) => PoolSettlementError::PoolNotFound(content_id),
            LedgerError::TreasuryNotInitialized => PoolSettlementError::TreasuryNotInitialized,
            other => PoolSettlementError::Rejected {
                code: other.code(),
                kind: other.kind(),
                message: other.to_string(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
