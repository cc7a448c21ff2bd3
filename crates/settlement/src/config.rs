use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use veritas_core::Address;

/// A redistribution can move at most the whole reserve
pub const MAX_REDISTRIBUTION_BPS: u32 = 10_000;

/// How agent weights are derived for decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeightingMethod {
    /// Proportional to stake; equal when nobody has stake (default)
    #[default]
    Stake,
    /// Every submitting agent counts the same
    Equal,
}

/// Configuration for epoch settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    pub weighting: WeightingMethod,
    /// Fewest submissions for a belief to be settled in an epoch
    pub min_submissions: usize,
    /// Aggregate shift (basis points of probability) below which no value moves
    pub min_shift_bps: u32,
    /// Largest penalty or reward per epoch, in basis points of the pool reserve
    pub max_redistribution_bps: u32,
    /// Signer presented to the pool ledger
    pub authority: Address,
    /// Registry the pools were created under
    pub factory: Address,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            weighting: WeightingMethod::Stake,
            min_submissions: 2,
            min_shift_bps: 10,
            max_redistribution_bps: 500,
            authority: Address::derive("settlement_authority", b"veritas"),
            factory: Address::derive("pool_factory", b"veritas"),
        }
    }
}

impl SettlementConfig {
    /// Parse and validate
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate().map_err(serde_json::Error::custom)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_redistribution_bps > MAX_REDISTRIBUTION_BPS {
            return Err(format!(
                "max_redistribution_bps {} exceeds {}",
                self.max_redistribution_bps, MAX_REDISTRIBUTION_BPS
            ));
        }
        if self.min_submissions == 0 {
            return Err("min_submissions must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Configuration for the background epoch scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// How often the clock is polled for closed epochs
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SettlementConfig::default();
        assert_eq!(config.weighting, WeightingMethod::Stake);
        assert_eq!(config.min_submissions, 2);
        assert!(config.min_shift_bps < config.max_redistribution_bps);
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            SettlementConfig::from_json(r#"{ "weighting": "Equal", "max_redistribution_bps": 100 }"#)
                .unwrap();
        assert_eq!(config.weighting, WeightingMethod::Equal);
        assert_eq!(config.max_redistribution_bps, 100);
        assert_eq!(config.min_shift_bps, 10);
    }

    #[test]
    fn test_from_json_rejects_out_of_range_bps() {
        let err = SettlementConfig::from_json(r#"{ "max_redistribution_bps": 10001 }"#).unwrap_err();
        assert!(err.to_string().contains("max_redistribution_bps"));
        assert!(SettlementConfig::from_json(r#"{ "max_redistribution_bps": 10000 }"#).is_ok());
        assert!(SettlementConfig::from_json(r#"{ "min_submissions": 0 }"#).is_err());
        assert!(SettlementConfig::default().validate().is_ok());
    }
}
