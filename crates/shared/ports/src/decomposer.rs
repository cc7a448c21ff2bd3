use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use veritas_core::{AgentId, Probability};

use crate::error::DecomposeResult;

/// One agent's report as seen by a decomposer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub belief: Probability,
    pub meta_prediction: Probability,
}

impl Report {
    pub fn new(belief: Probability, meta_prediction: Probability) -> Self {
        Self {
            belief,
            meta_prediction,
        }
    }
}

/// Reports keyed by agent
pub type Reports = HashMap<AgentId, Report>;

/// Normalized agent weights (must sum to 1)
pub type Weights = HashMap<AgentId, f64>;

/// Row-stochastic 2x2 local expectation matrix
///
/// Row `s` is the expected distribution of other agents' reports given
/// latent state `s`: `rows[s][1]` is the expected belief of a peer when the
/// true state is `s`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalExpectationMatrix {
    pub rows: [[f64; 2]; 2],
}

impl LocalExpectationMatrix {
    /// Build from the two "expected peer belief" entries
    pub fn from_expectations(given_zero: f64, given_one: f64) -> Self {
        Self {
            rows: [[1.0 - given_zero, given_zero], [1.0 - given_one, given_one]],
        }
    }

    /// Uninformative matrix with identical rows
    pub fn uniform(expectation: f64) -> Self {
        Self::from_expectations(expectation, expectation)
    }

    pub fn row_sums(&self) -> [f64; 2] {
        [
            self.rows[0][0] + self.rows[0][1],
            self.rows[1][0] + self.rows[1][1],
        ]
    }

    /// Stationary probability of state 1 under this transition matrix
    pub fn stationary(&self) -> f64 {
        let inflow = self.rows[0][1];
        let outflow = self.rows[1][0];
        let total = inflow + outflow;
        if total <= 0.0 { 0.5 } else { inflow / total }
    }
}

/// Output of a full decomposition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionResult {
    /// Consensus probability
    pub aggregate: Probability,
    /// Inferred latent base rate
    pub common_prior: Probability,
    /// Fitted local expectation matrix
    pub local_expectations: LocalExpectationMatrix,
    /// Pooled meta-prediction
    pub meta_aggregate: Probability,
    /// Weighted Jensen-Shannon divergence between the reported beliefs, in bits
    pub jensen_shannon_disagreement_entropy: f64,
    /// `1 - disagreement`
    pub certainty: f64,
    /// Goodness of fit of the modeled meta-predictions
    pub decomposition_quality: f64,
    /// Aggregate with each agent removed and weights renormalized
    pub leave_one_out_aggregates: HashMap<AgentId, Probability>,
    /// Meta aggregate with each agent removed and weights renormalized
    pub leave_one_out_meta_aggregates: HashMap<AgentId, Probability>,
}

/// Output of a single leave-one-out decomposition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LooResult {
    pub aggregate: Probability,
    pub prior: Probability,
    pub meta_aggregate: Probability,
}

impl LooResult {
    /// Returned when too few participants remain to decompose
    pub fn neutral() -> Self {
        Self {
            aggregate: 0.5,
            prior: 0.5,
            meta_aggregate: 0.5,
        }
    }
}

/// Port for belief aggregation algorithms
///
/// Implementations must be pure: the same reports and weights always
/// produce the same result, and nothing outside the return value changes.
pub trait BeliefDecomposer: Send + Sync {
    /// Decompose all reports into a consensus and diagnostics
    ///
    /// `weights` must cover exactly the agents in `reports` and sum to 1.
    fn decompose(
        &self,
        reports: &Reports,
        weights: &Weights,
    ) -> DecomposeResult<DecompositionResult>;

    /// Decompose with `exclude` removed
    ///
    /// `weights` covers the remaining agents only and must not contain
    /// `exclude`. Fewer than two remaining participants yields
    /// [`LooResult::neutral`].
    fn decompose_loo(
        &self,
        reports: &Reports,
        weights: &Weights,
        exclude: &AgentId,
    ) -> DecomposeResult<LooResult>;

    /// Get the name of the algorithm
    fn name(&self) -> &str;
}
