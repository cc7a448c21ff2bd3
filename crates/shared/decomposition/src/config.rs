use serde::{Deserialize, Serialize};

/// Tuning and validation bounds for decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecomposerConfig {
    /// Allowed deviation of the weight sum from 1
    pub weight_tolerance: f64,
    /// Minimum number of reporting agents
    pub min_participants: usize,
    /// Distance from 0 or 1 that counts as "at the boundary"
    pub boundary_epsilon: f64,
    /// Maximum weight mass allowed at the boundary
    pub max_boundary_mass: f64,
    /// Reject decompositions whose quality falls below this
    pub min_quality: f64,
    /// Probabilities are clamped this far from {0, 1} before taking logs
    pub probability_floor: f64,
    /// Entries of the fitted matrix are kept this far from {0, 1}
    pub parameter_floor: f64,
    /// Strength of the pull of both matrix rows toward the mean meta-prediction
    pub regularization: f64,
    /// Newton iteration cap
    pub max_iterations: usize,
    /// Convergence tolerance on the parameter step
    pub tolerance: f64,
    /// Lower bound on the null-model divergence used by the quality ratio
    pub null_divergence_floor: f64,
    /// Mean meta-prediction divergence from the model (nats) scored as a
    /// quality of zero; smaller divergences score linearly toward one
    pub fit_tolerance: f64,
}

impl Default for DecomposerConfig {
    fn default() -> Self {
        Self {
            weight_tolerance: 1e-6,
            min_participants: 2,
            boundary_epsilon: 0.01,
            max_boundary_mass: 0.8,
            min_quality: 0.3,
            probability_floor: 1e-9,
            parameter_floor: 1e-6,
            regularization: 1e-4,
            max_iterations: 100,
            tolerance: 1e-10,
            null_divergence_floor: 1e-3,
            fit_tolerance: 1e-2,
        }
    }
}

impl DecomposerConfig {
    /// Load from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DecomposerConfig::default();
        assert_eq!(config.min_participants, 2);
        assert_eq!(config.min_quality, 0.3);
        assert_eq!(config.max_boundary_mass, 0.8);
    }

    #[test]
    fn test_from_json_partial() {
        let config = DecomposerConfig::from_json(r#"{ "min_quality": 0.5 }"#).unwrap();
        assert_eq!(config.min_quality, 0.5);
        assert_eq!(config.weight_tolerance, 1e-6);
    }
}
