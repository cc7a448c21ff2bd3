use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::values::{AgentId, BeliefId, Epoch, Probability, Timestamp};

/// Reasons a submission is malformed
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionError {
    BeliefOutOfRange(f64),
    MetaPredictionOutOfRange(f64),
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionError::BeliefOutOfRange(v) => {
                write!(f, "belief {} is outside [0, 1]", v)
            }
            SubmissionError::MetaPredictionOutOfRange(v) => {
                write!(f, "meta-prediction {} is outside [0, 1]", v)
            }
        }
    }
}

impl std::error::Error for SubmissionError {}

/// One agent's report for one belief in one epoch
///
/// `(belief_id, agent_id, epoch)` is unique; a resubmission in the same
/// epoch overwrites the previous report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeliefSubmission {
    pub belief_id: BeliefId,
    pub agent_id: AgentId,
    pub epoch: Epoch,
    /// Agent's own probability for the proposition
    pub belief: Probability,
    /// Agent's forecast of the weighted-average belief of the others
    pub meta_prediction: Probability,
    pub submitted_at: Timestamp,
}

impl BeliefSubmission {
    pub fn new(
        belief_id: BeliefId,
        agent_id: AgentId,
        epoch: Epoch,
        belief: Probability,
        meta_prediction: Probability,
    ) -> Self {
        Self {
            belief_id,
            agent_id,
            epoch,
            belief,
            meta_prediction,
            submitted_at: Utc::now(),
        }
    }

    /// Both reported values must be finite probabilities
    pub fn validate(&self) -> Result<(), SubmissionError> {
        if !is_probability(self.belief) {
            return Err(SubmissionError::BeliefOutOfRange(self.belief));
        }
        if !is_probability(self.meta_prediction) {
            return Err(SubmissionError::MetaPredictionOutOfRange(
                self.meta_prediction,
            ));
        }
        Ok(())
    }
}

fn is_probability(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_boundaries() {
        let sub = BeliefSubmission::new(BeliefId::new(), AgentId::new(), 0, 0.0, 1.0);
        assert!(sub.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let sub = BeliefSubmission::new(BeliefId::new(), AgentId::new(), 0, 1.2, 0.5);
        assert_eq!(sub.validate(), Err(SubmissionError::BeliefOutOfRange(1.2)));

        let sub = BeliefSubmission::new(BeliefId::new(), AgentId::new(), 0, 0.5, f64::NAN);
        assert!(matches!(
            sub.validate(),
            Err(SubmissionError::MetaPredictionOutOfRange(_))
        ));
    }
}
