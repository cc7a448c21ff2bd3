use std::collections::HashMap;

use dashmap::DashMap;
use log::debug;
use veritas_core::{
    Agent, AgentId, Amount, Belief, BeliefId, BeliefSubmission, Epoch, Probability,
};
use veritas_ports::{BeliefRepository, RepositoryError, RepositoryResult};

use crate::error::{Result, SettlementError};

/// In-memory belief, agent and submission storage
///
/// Submissions are keyed by `(belief, epoch)` then agent, so a resubmission
/// within an epoch overwrites the earlier one.
#[derive(Default)]
pub struct InMemoryBeliefStore {
    beliefs: DashMap<BeliefId, Belief>,
    agents: DashMap<AgentId, Agent>,
    submissions: DashMap<(BeliefId, Epoch), HashMap<AgentId, BeliefSubmission>>,
}

impl InMemoryBeliefStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_belief(&self, belief: Belief) -> BeliefId {
        let id = belief.id;
        debug!(
            "[SETTLEMENT] Belief {} created for content {} (initial {:.4}, {} epochs)",
            id, belief.content_id, belief.initial_value, belief.duration_epochs
        );
        self.beliefs.insert(id, belief);
        id
    }

    pub fn register_agent(&self, agent: Agent) -> AgentId {
        let id = agent.id;
        self.agents.insert(id, agent);
        id
    }

    pub fn update_stake(&self, agent_id: &AgentId, stake: Amount) -> Result<()> {
        let mut agent = self
            .agents
            .get_mut(agent_id)
            .ok_or(SettlementError::AgentNotFound(*agent_id))?;
        agent.stake = stake;
        Ok(())
    }

    /// Store a validated submission, replacing any earlier one for the same epoch
    pub fn submit(&self, submission: BeliefSubmission) -> Result<()> {
        submission.validate()?;
        if !self.agents.contains_key(&submission.agent_id) {
            return Err(SettlementError::AgentNotFound(submission.agent_id));
        }
        let belief = self
            .beliefs
            .get(&submission.belief_id)
            .ok_or(SettlementError::BeliefNotFound(submission.belief_id))?;
        if !belief.is_active_at(submission.epoch) {
            return Err(SettlementError::BeliefExpired {
                belief_id: submission.belief_id,
                epoch: submission.epoch,
            });
        }
        drop(belief);

        self.submissions
            .entry((submission.belief_id, submission.epoch))
            .or_default()
            .insert(submission.agent_id, submission);
        Ok(())
    }

    pub fn submission_count(&self, belief_id: &BeliefId, epoch: Epoch) -> usize {
        self.submissions
            .get(&(*belief_id, epoch))
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

impl BeliefRepository for InMemoryBeliefStore {
    fn belief(&self, id: &BeliefId) -> RepositoryResult<Belief> {
        self.beliefs
            .get(id)
            .map(|b| b.clone())
            .ok_or(RepositoryError::BeliefNotFound(*id))
    }

    fn beliefs(&self) -> Vec<Belief> {
        let mut beliefs: Vec<Belief> = self.beliefs.iter().map(|b| b.value().clone()).collect();
        beliefs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        beliefs
    }

    fn submissions(&self, belief_id: &BeliefId, epoch: Epoch) -> Vec<BeliefSubmission> {
        let mut subs: Vec<BeliefSubmission> = self
            .submissions
            .get(&(*belief_id, epoch))
            .map(|subs| subs.values().cloned().collect())
            .unwrap_or_default();
        subs.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        subs
    }

    fn agent(&self, id: &AgentId) -> RepositoryResult<Agent> {
        self.agents
            .get(id)
            .map(|a| a.clone())
            .ok_or(RepositoryError::AgentNotFound(*id))
    }

    fn record_aggregate(
        &self,
        belief_id: &BeliefId,
        aggregate: Probability,
        epoch: Epoch,
    ) -> RepositoryResult<()> {
        let mut belief = self
            .beliefs
            .get_mut(belief_id)
            .ok_or(RepositoryError::BeliefNotFound(*belief_id))?;
        belief.settle(aggregate, epoch);
        Ok(())
    }

    fn expire_belief(&self, belief_id: &BeliefId) -> RepositoryResult<()> {
        let mut belief = self
            .beliefs
            .get_mut(belief_id)
            .ok_or(RepositoryError::BeliefNotFound(*belief_id))?;
        belief.expire();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_core::{BeliefStatus, ContentId};

    fn store_with_belief() -> (InMemoryBeliefStore, BeliefId, AgentId) {
        let store = InMemoryBeliefStore::new();
        let agent = store.register_agent(Agent::new(100, "alice"));
        let belief = store.create_belief(Belief::new(ContentId::new(), agent, 0.5, 10, 0));
        (store, belief, agent)
    }

    #[test]
    fn test_resubmission_overwrites() {
        let (store, belief, agent) = store_with_belief();
        store
            .submit(BeliefSubmission::new(belief, agent, 1, 0.3, 0.4))
            .unwrap();
        store
            .submit(BeliefSubmission::new(belief, agent, 1, 0.8, 0.6))
            .unwrap();

        let subs = store.submissions(&belief, 1);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].belief, 0.8);
        assert_eq!(store.submission_count(&belief, 2), 0);
    }

    #[test]
    fn test_submit_validates() {
        let (store, belief, agent) = store_with_belief();
        let err = store
            .submit(BeliefSubmission::new(belief, agent, 1, 1.3, 0.4))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SUBMISSION");

        let err = store
            .submit(BeliefSubmission::new(belief, AgentId::new(), 1, 0.3, 0.4))
            .unwrap_err();
        assert_eq!(err.code(), "AGENT_NOT_FOUND");

        let err = store
            .submit(BeliefSubmission::new(belief, agent, 10, 0.3, 0.4))
            .unwrap_err();
        assert_eq!(err.code(), "BELIEF_EXPIRED");
    }

    #[test]
    fn test_record_and_expire() {
        let (store, belief, _) = store_with_belief();
        store.record_aggregate(&belief, 0.72, 3).unwrap();
        let stored = store.belief(&belief).unwrap();
        assert_eq!(stored.previous_aggregate, 0.72);
        assert_eq!(stored.last_settled_epoch, Some(3));

        store.expire_belief(&belief).unwrap();
        assert_eq!(store.belief(&belief).unwrap().status, BeliefStatus::Expired);
    }

    #[test]
    fn test_update_stake() {
        let (store, _, agent) = store_with_belief();
        store.update_stake(&agent, 7).unwrap();
        assert_eq!(store.agent(&agent).unwrap().stake, 7);
        assert!(store.update_stake(&AgentId::new(), 1).is_err());
    }
}
