//! Curve constants, pool parameters and ledger configuration

use serde::{Deserialize, Serialize};
use veritas_core::{Address, Amount, TokenAmount};

use crate::error::{LedgerError, Result};

/// Decimal places of every pool token
pub const TOKEN_DECIMALS: u8 = 6;
/// Atomic units per whole token
pub const TOKEN_UNIT: u64 = 1_000_000;
/// Fixed-point scale of `k_quadratic`
pub const K_PRECISION: u64 = 1_000_000;

/// `k_quadratic` for a pool whose price is `s²` micro-units per token
pub const DEFAULT_K_QUADRATIC: u64 = K_PRECISION;
pub const K_MIN: u64 = 1_000;
pub const K_MAX: u64 = 1_000_000_000_000;

/// Smallest buy (currency units) or sell (token atomic units)
pub const MIN_TRADE_AMOUNT: Amount = 1_000;
/// Price below which tokens mint at a constant rate (currency units per whole token)
pub const PRICE_FLOOR: Amount = 1_000;

pub const MIN_RESERVE_CAP: Amount = 1_000 * TOKEN_UNIT;
pub const MAX_RESERVE_CAP: Amount = 1_000_000_000 * TOKEN_UNIT;
pub const MIN_SUPPLY_CAP: TokenAmount = TOKEN_UNIT;
pub const MAX_SUPPLY_CAP: TokenAmount = 1_000_000_000 * TOKEN_UNIT;

const MAX_NAME_LEN: usize = 32;
const MAX_SYMBOL_LEN: usize = 10;

/// Parameters supplied when a content pool is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub k_quadratic: u64,
    pub token_name: String,
    pub token_symbol: String,
    pub reserve_cap: Option<Amount>,
    pub supply_cap: Option<TokenAmount>,
    /// Signer for penalties and rewards; the ledger's `pool_authority` when unset
    #[serde(default)]
    pub authority: Option<Address>,
}

impl PoolParams {
    pub fn new(token_name: impl Into<String>, token_symbol: impl Into<String>) -> Self {
        Self {
            k_quadratic: DEFAULT_K_QUADRATIC,
            token_name: token_name.into(),
            token_symbol: token_symbol.into(),
            reserve_cap: None,
            supply_cap: None,
            authority: None,
        }
    }

    pub fn with_k(mut self, k_quadratic: u64) -> Self {
        self.k_quadratic = k_quadratic;
        self
    }

    pub fn with_reserve_cap(mut self, cap: Amount) -> Self {
        self.reserve_cap = Some(cap);
        self
    }

    pub fn with_supply_cap(mut self, cap: TokenAmount) -> Self {
        self.supply_cap = Some(cap);
        self
    }

    pub fn with_authority(mut self, authority: Address) -> Self {
        self.authority = Some(authority);
        self
    }

    /// Check every parameter against the fixed bounds
    pub fn validate(&self) -> Result<()> {
        if !(K_MIN..=K_MAX).contains(&self.k_quadratic) {
            return Err(LedgerError::InvalidParameters(format!(
                "k_quadratic {} outside [{}, {}]",
                self.k_quadratic, K_MIN, K_MAX
            )));
        }
        if let Some(cap) = self
            .reserve_cap
            .filter(|cap| !(MIN_RESERVE_CAP..=MAX_RESERVE_CAP).contains(cap))
        {
            return Err(LedgerError::InvalidParameters(format!(
                "reserve_cap {} outside [{}, {}]",
                cap, MIN_RESERVE_CAP, MAX_RESERVE_CAP
            )));
        }
        if let Some(cap) = self
            .supply_cap
            .filter(|cap| !(MIN_SUPPLY_CAP..=MAX_SUPPLY_CAP).contains(cap))
        {
            return Err(LedgerError::InvalidParameters(format!(
                "supply_cap {} outside [{}, {}]",
                cap, MIN_SUPPLY_CAP, MAX_SUPPLY_CAP
            )));
        }
        let name = self.token_name.trim();
        if name.is_empty() || name.len() > MAX_NAME_LEN {
            return Err(LedgerError::InvalidParameters(format!(
                "token name must be 1..={} bytes",
                MAX_NAME_LEN
            )));
        }
        let symbol = self.token_symbol.trim();
        if symbol.is_empty() || symbol.len() > MAX_SYMBOL_LEN {
            return Err(LedgerError::InvalidParameters(format!(
                "token symbol must be 1..={} bytes",
                MAX_SYMBOL_LEN
            )));
        }
        Ok(())
    }

    pub fn effective_reserve_cap(&self) -> Amount {
        self.reserve_cap.unwrap_or(MAX_RESERVE_CAP)
    }

    pub fn effective_supply_cap(&self) -> TokenAmount {
        self.supply_cap.unwrap_or(MAX_SUPPLY_CAP)
    }
}

/// Ledger-wide configuration
///
/// `factory` is the registry every pool is created under; `pool_authority`
/// is recorded on each new pool as the signer allowed to apply penalties
/// and rewards, unless the pool's parameters name another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub factory: Address,
    pub pool_authority: Address,
    pub price_floor: Amount,
    pub min_trade_amount: Amount,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            factory: Address::derive("pool_factory", b"veritas"),
            pool_authority: Address::derive("settlement_authority", b"veritas"),
            price_floor: PRICE_FLOOR,
            min_trade_amount: MIN_TRADE_AMOUNT,
        }
    }
}

impl LedgerConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(PoolParams::new("Veritas Post", "VPOST").validate().is_ok());
    }

    #[test]
    fn test_k_out_of_bounds() {
        for k in [0, K_MIN - 1, K_MAX + 1] {
            let err = PoolParams::new("Post", "P").with_k(k).validate().unwrap_err();
            assert_eq!(err.code(), "INVALID_PARAMETERS");
        }
        assert!(PoolParams::new("Post", "P").with_k(K_MIN).validate().is_ok());
        assert!(PoolParams::new("Post", "P").with_k(K_MAX).validate().is_ok());
    }

    #[test]
    fn test_caps_out_of_bounds() {
        let err = PoolParams::new("Post", "P")
            .with_reserve_cap(MAX_RESERVE_CAP + 1)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");

        let err = PoolParams::new("Post", "P")
            .with_supply_cap(0)
            .validate()
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMETERS");
    }

    #[test]
    fn test_metadata_bounds() {
        assert!(PoolParams::new("", "P").validate().is_err());
        assert!(PoolParams::new("Post", "WAYTOOLONGSYMBOL").validate().is_err());
    }

    #[test]
    fn test_ledger_config_from_json() {
        let config = LedgerConfig::from_json(r#"{ "price_floor": 5000 }"#).unwrap();
        assert_eq!(config.price_floor, 5000);
        assert_eq!(config.min_trade_amount, MIN_TRADE_AMOUNT);
        assert_eq!(config.factory, LedgerConfig::default().factory);
    }
}
