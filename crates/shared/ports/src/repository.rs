use veritas_core::{Agent, AgentId, Belief, BeliefId, BeliefSubmission, Epoch, Probability};

use crate::error::RepositoryResult;

/// Port for belief, submission and agent storage
///
/// Persistence is left to the implementation; settlement only needs these
/// reads plus the two writes it owns (`record_aggregate`, `expire_belief`).
pub trait BeliefRepository: Send + Sync {
    fn belief(&self, id: &BeliefId) -> RepositoryResult<Belief>;

    /// All beliefs regardless of status
    fn beliefs(&self) -> Vec<Belief>;

    /// Submissions made for `belief_id` during `epoch`
    fn submissions(&self, belief_id: &BeliefId, epoch: Epoch) -> Vec<BeliefSubmission>;

    fn agent(&self, id: &AgentId) -> RepositoryResult<Agent>;

    /// Overwrite the belief's settled aggregate
    fn record_aggregate(
        &self,
        belief_id: &BeliefId,
        aggregate: Probability,
        epoch: Epoch,
    ) -> RepositoryResult<()>;

    fn expire_belief(&self, belief_id: &BeliefId) -> RepositoryResult<()>;
}
