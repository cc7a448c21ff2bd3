use std::collections::HashMap;

use log::debug;
use veritas_core::AgentId;
use veritas_ports::{
    BeliefDecomposer, DecomposeResult, DecompositionError, DecompositionResult, LooResult,
    Reports, Weights,
};

use crate::config::DecomposerConfig;
use crate::diagnostics::Diagnostics;
use crate::fit::fit_local_expectations;
use crate::pooling::{PooledStatistics, leave_one_out, pool};
use crate::validation::{Sample, check_full_support, prepare_samples};

/// Bayesian-Truth-Serum style decomposer
///
/// Fits the local expectation matrix from meta-predictions, pools beliefs
/// log-linearly and gates the result on fit quality.
#[derive(Debug, Clone, Default)]
pub struct BtsDecomposer {
    config: DecomposerConfig,
}

impl BtsDecomposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DecomposerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecomposerConfig {
        &self.config
    }

    fn belief_items(samples: &[Sample]) -> Vec<(f64, f64)> {
        samples.iter().map(|s| (s.weight, s.belief)).collect()
    }

    fn meta_items(samples: &[Sample]) -> Vec<(f64, f64)> {
        samples.iter().map(|s| (s.weight, s.meta)).collect()
    }

    fn pooled(stats: &PooledStatistics, what: &str) -> DecomposeResult<f64> {
        match stats.probability() {
            Some(p) if p.is_finite() => Ok(p),
            _ => Err(DecompositionError::NumericalFailure(format!(
                "{} pool has no finite value",
                what
            ))),
        }
    }

    /// Leave-one-out aggregates keyed by agent
    ///
    /// When removing one agent leaves fewer than `min_participants`, or no
    /// weight at all, that agent's entry is the neutral 0.5.
    fn leave_one_out_maps(
        &self,
        samples: &[Sample],
    ) -> (HashMap<AgentId, f64>, HashMap<AgentId, f64>) {
        let neutral = LooResult::neutral();
        if samples.len().saturating_sub(1) < self.config.min_participants {
            let beliefs = samples
                .iter()
                .map(|s| (s.agent_id, neutral.aggregate))
                .collect();
            let metas = samples
                .iter()
                .map(|s| (s.agent_id, neutral.meta_aggregate))
                .collect();
            return (beliefs, metas);
        }

        let loo_beliefs = leave_one_out(&Self::belief_items(samples));
        let loo_metas = leave_one_out(&Self::meta_items(samples));

        let mut beliefs = HashMap::with_capacity(samples.len());
        let mut metas = HashMap::with_capacity(samples.len());
        for (i, sample) in samples.iter().enumerate() {
            let b = loo_beliefs[i].probability().filter(|p| p.is_finite());
            let m = loo_metas[i].probability().filter(|p| p.is_finite());
            beliefs.insert(sample.agent_id, b.unwrap_or(neutral.aggregate));
            metas.insert(sample.agent_id, m.unwrap_or(neutral.meta_aggregate));
        }
        (beliefs, metas)
    }
}

impl BeliefDecomposer for BtsDecomposer {
    fn decompose(
        &self,
        reports: &Reports,
        weights: &Weights,
    ) -> DecomposeResult<DecompositionResult> {
        let samples = prepare_samples(reports, weights, &self.config)?;
        check_full_support(&samples, &self.config)?;

        let fit = fit_local_expectations(&samples, &self.config);
        let aggregate = Self::pooled(&pool(&Self::belief_items(&samples)), "belief")?;
        let meta_aggregate = Self::pooled(&pool(&Self::meta_items(&samples)), "meta-prediction")?;

        let diagnostics = Diagnostics::compute(&samples, &fit, &self.config);
        if diagnostics.quality < self.config.min_quality {
            debug!(
                "Rejecting decomposition of {} reports: quality {:.4} < {}",
                samples.len(),
                diagnostics.quality,
                self.config.min_quality
            );
            return Err(DecompositionError::QualityTooLow {
                quality: diagnostics.quality,
                threshold: self.config.min_quality,
            });
        }

        let (leave_one_out_aggregates, leave_one_out_meta_aggregates) =
            self.leave_one_out_maps(&samples);

        debug!(
            "Decomposed {} reports: aggregate={:.6}, prior={:.6}, disagreement={:.4}, quality={:.4}",
            samples.len(),
            aggregate,
            fit.prior,
            diagnostics.disagreement,
            diagnostics.quality
        );

        Ok(DecompositionResult {
            aggregate,
            common_prior: fit.prior,
            local_expectations: fit.matrix,
            meta_aggregate,
            jensen_shannon_disagreement_entropy: diagnostics.disagreement,
            certainty: diagnostics.certainty,
            decomposition_quality: diagnostics.quality,
            leave_one_out_aggregates,
            leave_one_out_meta_aggregates,
        })
    }

    fn decompose_loo(
        &self,
        reports: &Reports,
        weights: &Weights,
        exclude: &AgentId,
    ) -> DecomposeResult<LooResult> {
        if weights.contains_key(exclude) {
            return Err(DecompositionError::InvalidExclusion {
                agent_id: *exclude,
            });
        }

        let remaining: Reports = reports
            .iter()
            .filter(|(id, _)| *id != exclude)
            .map(|(id, report)| (*id, *report))
            .collect();
        if remaining.len() < self.config.min_participants {
            return Ok(LooResult::neutral());
        }

        let samples = prepare_samples(&remaining, weights, &self.config)?;
        let aggregate = pool(&Self::belief_items(&samples)).probability();
        let meta_aggregate = pool(&Self::meta_items(&samples)).probability();
        let (Some(aggregate), Some(meta_aggregate)) = (aggregate, meta_aggregate) else {
            return Ok(LooResult::neutral());
        };

        let fit = fit_local_expectations(&samples, &self.config);
        Ok(LooResult {
            aggregate,
            prior: fit.prior,
            meta_aggregate,
        })
    }

    fn name(&self) -> &str {
        "BTS"
    }
}
