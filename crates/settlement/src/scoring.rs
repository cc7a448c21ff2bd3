//! BTS scoring of agents and redistribution sizing.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use veritas_core::probability::{DEFAULT_PROBABILITY_FLOOR, bernoulli_kl};
use veritas_core::{AgentId, Amount};
use veritas_ports::{AdjustmentDirection, DecompositionResult, Reports, Weights};

use crate::config::SettlementConfig;

const BPS: u32 = 10_000;

/// Counterfactual score of one agent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentScore {
    pub agent_id: AgentId,
    pub weight: f64,
    /// `KL(b ‖ loo_meta) - KL(b ‖ loo_agg)`: how much closer the belief is to
    /// what peers actually said than to what peers were expected to say
    pub information: f64,
    /// `-KL(loo_agg ‖ m)`: accuracy of the meta-prediction
    pub prediction: f64,
    pub score: f64,
}

/// Score every reporting agent against its leave-one-out consensus
///
/// Agents missing from the leave-one-out maps are scored against the
/// neutral 0.5. Output is ordered by agent id.
pub fn score_agents(
    reports: &Reports,
    weights: &Weights,
    result: &DecompositionResult,
) -> Vec<AgentScore> {
    let floor = DEFAULT_PROBABILITY_FLOOR;
    let mut scores: Vec<AgentScore> = reports
        .iter()
        .map(|(agent_id, report)| {
            let loo_agg = result
                .leave_one_out_aggregates
                .get(agent_id)
                .copied()
                .unwrap_or(0.5);
            let loo_meta = result
                .leave_one_out_meta_aggregates
                .get(agent_id)
                .copied()
                .unwrap_or(0.5);

            let information = bernoulli_kl(report.belief, loo_meta, floor)
                - bernoulli_kl(report.belief, loo_agg, floor);
            let prediction = -bernoulli_kl(loo_agg, report.meta_prediction, floor);
            AgentScore {
                agent_id: *agent_id,
                weight: weights.get(agent_id).copied().unwrap_or(0.0),
                information,
                prediction,
                score: information + prediction,
            }
        })
        .collect();
    scores.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    scores
}

/// Total weight of agents whose score is positive
pub fn informative_mass(scores: &[AgentScore]) -> f64 {
    scores
        .iter()
        .filter(|s| s.score > 0.0)
        .map(|s| s.weight)
        .sum::<f64>()
        .clamp(0.0, 1.0)
}

/// One net transfer between a pool and the treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redistribution {
    pub direction: AdjustmentDirection,
    pub bps: u32,
    pub amount: Amount,
}

/// Size the epoch's transfer for a consensus shift of `delta`
///
/// `bps = min(max_bps, round(|delta| · mass · 10_000))` of the reserve. A
/// rising consensus rewards the pool (capped at what the treasury holds), a
/// falling one penalizes it. Returns `None` when nothing should move.
pub fn size_redistribution(
    delta: f64,
    mass: f64,
    reserve: Amount,
    treasury_balance: Amount,
    config: &SettlementConfig,
) -> Option<Redistribution> {
    let shift = Decimal::from_f64(delta.abs())?;
    let mass = Decimal::from_f64(mass.clamp(0.0, 1.0))?;
    let bps_scale = Decimal::from(BPS);

    if shift * bps_scale < Decimal::from(config.min_shift_bps) {
        return None;
    }

    let bps = (shift * mass * bps_scale)
        .round()
        .to_u32()?
        .min(config.max_redistribution_bps)
        .min(BPS);
    if bps == 0 {
        return None;
    }

    let amount = Amount::try_from(reserve as u128 * bps as u128 / BPS as u128).ok()?;
    let (direction, amount) = if delta > 0.0 {
        (AdjustmentDirection::Reward, amount.min(treasury_balance))
    } else {
        (AdjustmentDirection::Penalty, amount)
    };
    if amount == 0 {
        return None;
    }

    Some(Redistribution {
        direction,
        bps,
        amount,
    })
}
