//! Disagreement and goodness-of-fit measures.

use veritas_core::probability::{bernoulli_kl, binary_entropy_bits};

use crate::config::DecomposerConfig;
use crate::fit::FitOutcome;
use crate::validation::Sample;

/// Diagnostic metrics reported alongside the aggregate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Weighted Jensen-Shannon divergence of the beliefs, in bits
    pub disagreement: f64,
    /// `1 - disagreement`
    pub certainty: f64,
    /// How closely the fit reproduces the meta-predictions
    pub quality: f64,
}

impl Diagnostics {
    pub fn compute(samples: &[Sample], fit: &FitOutcome, config: &DecomposerConfig) -> Self {
        let disagreement = disagreement_bits(samples);
        Self {
            disagreement,
            certainty: (1.0 - disagreement).clamp(0.0, 1.0),
            quality: fit_quality(samples, fit, config),
        }
    }
}

/// Generalized Jensen-Shannon divergence of the Bernoulli beliefs
///
/// `H(Σ wᵢ bᵢ) - Σ wᵢ H(bᵢ)` in bits: 0 when all agents agree, 1 when the
/// weight is split evenly between certain-yes and certain-no.
pub fn disagreement_bits(samples: &[Sample]) -> f64 {
    let mixture: f64 = samples.iter().map(|s| s.weight * s.raw_belief).sum();
    let mean_entropy: f64 = samples
        .iter()
        .map(|s| s.weight * binary_entropy_bits(s.raw_belief))
        .sum();
    (binary_entropy_bits(mixture.clamp(0.0, 1.0)) - mean_entropy).clamp(0.0, 1.0)
}

/// How well the fitted matrix reproduces the meta-predictions, in [0, 1]
///
/// The better of two scores. The relative score is the deviance explained
/// against the best constant (the weighted mean meta-prediction),
/// `1 - KL_model / max(KL_null, floor)`. The absolute score is
/// `1 - KL_model / fit_tolerance`, so reports the model already matches
/// closely pass even when there is little variation left to explain.
pub fn fit_quality(samples: &[Sample], fit: &FitOutcome, config: &DecomposerConfig) -> f64 {
    let floor = config.probability_floor;
    let mean_meta: f64 = samples.iter().map(|s| s.weight * s.meta).sum();

    let (model, null) = samples.iter().fold((0.0, 0.0), |(model, null), s| {
        let predicted = fit.predicted_meta(s.belief);
        (
            model + s.weight * bernoulli_kl(s.meta, predicted, floor),
            null + s.weight * bernoulli_kl(s.meta, mean_meta, floor),
        )
    });

    let relative = 1.0 - model / null.max(config.null_divergence_floor);
    let absolute = 1.0 - model / config.fit_tolerance.max(f64::MIN_POSITIVE);
    let quality = relative.max(absolute);
    if quality.is_finite() {
        quality.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
