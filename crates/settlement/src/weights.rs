use veritas_core::{AgentId, Amount};
use veritas_ports::Weights;

use crate::config::WeightingMethod;

/// Normalized decomposition weights for the given `(agent, stake)` pairs
///
/// Stake weighting falls back to equal weights when the total stake is zero.
pub fn compute_weights(method: WeightingMethod, stakes: &[(AgentId, Amount)]) -> Weights {
    if stakes.is_empty() {
        return Weights::new();
    }
    let total: u128 = stakes.iter().map(|(_, stake)| *stake as u128).sum();

    match method {
        WeightingMethod::Stake if total > 0 => stakes
            .iter()
            .map(|(id, stake)| (*id, *stake as f64 / total as f64))
            .collect(),
        _ => {
            let weight = 1.0 / stakes.len() as f64;
            stakes.iter().map(|(id, _)| (*id, weight)).collect()
        }
    }
}
