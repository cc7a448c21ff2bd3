//! Input checks shared by full and leave-one-out decomposition.

use veritas_core::AgentId;
use veritas_core::probability::clamp_probability;
use veritas_ports::{DecomposeResult, DecompositionError, Reports, Weights};

use crate::config::DecomposerConfig;

/// One validated report with its weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub agent_id: AgentId,
    pub weight: f64,
    /// Belief as reported
    pub raw_belief: f64,
    /// Belief clamped away from {0, 1}
    pub belief: f64,
    /// Meta-prediction clamped away from {0, 1}
    pub meta: f64,
}

/// Validate reports against weights and return samples ordered by agent id
///
/// Checks, in order: weight keys match report keys, participant count,
/// every value finite and in range, weight sum within tolerance.
pub fn prepare_samples(
    reports: &Reports,
    weights: &Weights,
    config: &DecomposerConfig,
) -> DecomposeResult<Vec<Sample>> {
    let sum: f64 = weights.values().sum();

    if reports.len() != weights.len() || reports.keys().any(|id| !weights.contains_key(id)) {
        return Err(DecompositionError::InvalidWeights {
            sum,
            reason: "weight keys must match submitting agents".to_string(),
        });
    }

    if reports.len() < config.min_participants {
        return Err(DecompositionError::InsufficientParticipants {
            actual: reports.len(),
            required: config.min_participants,
        });
    }

    let mut samples = Vec::with_capacity(reports.len());
    for (agent_id, report) in reports {
        let weight = weights[agent_id];
        if !weight.is_finite() || weight < 0.0 {
            return Err(DecompositionError::InvalidWeights {
                sum,
                reason: format!("weight {} for agent {} is not a non-negative number", weight, agent_id),
            });
        }
        for (label, value) in [
            ("belief", report.belief),
            ("meta-prediction", report.meta_prediction),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(DecompositionError::InvalidInput(format!(
                    "{} {} for agent {} is outside [0, 1]",
                    label, value, agent_id
                )));
            }
        }
        samples.push(Sample {
            agent_id: *agent_id,
            weight,
            raw_belief: report.belief,
            belief: clamp_probability(report.belief, config.probability_floor),
            meta: clamp_probability(report.meta_prediction, config.probability_floor),
        });
    }

    if !sum.is_finite() || (sum - 1.0).abs() > config.weight_tolerance {
        return Err(DecompositionError::InvalidWeights {
            sum,
            reason: "weights must sum to 1".to_string(),
        });
    }

    // Fixed order keeps floating point sums reproducible
    samples.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
    Ok(samples)
}

/// Weight mass whose belief lies within `epsilon` of 0 or 1
pub fn boundary_mass(samples: &[Sample], epsilon: f64) -> f64 {
    samples
        .iter()
        .filter(|s| s.raw_belief <= epsilon || s.raw_belief >= 1.0 - epsilon)
        .map(|s| s.weight)
        .sum()
}

/// Reject inputs whose beliefs pile up at the boundary
pub fn check_full_support(samples: &[Sample], config: &DecomposerConfig) -> DecomposeResult<()> {
    let mass = boundary_mass(samples, config.boundary_epsilon);
    if mass > config.max_boundary_mass {
        return Err(DecompositionError::BoundaryClustering {
            mass,
            epsilon: config.boundary_epsilon,
            limit: config.max_boundary_mass,
        });
    }
    Ok(())
}
