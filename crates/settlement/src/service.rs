use std::sync::Arc;

use veritas_clock::EpochClock;
use veritas_core::{AgentId, Amount, BeliefId, BeliefSubmission, Epoch, Probability};
use veritas_decomposition::BtsDecomposer;
use veritas_ports::{
    BeliefDecomposer, BeliefRepository, DecompositionResult, LooResult, PoolSettlement, Weights,
};

use crate::config::SettlementConfig;
use crate::error::{Result, SettlementError};
use crate::orchestrator::{EpochReport, EpochSettlementOrchestrator, reports_from};
use crate::store::InMemoryBeliefStore;
use crate::weights::compute_weights;

/// Entry point for submissions, on-demand decomposition and epoch processing
///
/// Submissions are stamped with the clock's current epoch.
pub struct SettlementService {
    store: Arc<InMemoryBeliefStore>,
    clock: Arc<dyn EpochClock>,
    orchestrator: EpochSettlementOrchestrator,
}

impl SettlementService {
    pub fn new(
        store: Arc<InMemoryBeliefStore>,
        decomposer: Arc<dyn BeliefDecomposer>,
        pools: Option<Arc<dyn PoolSettlement>>,
        clock: Arc<dyn EpochClock>,
        config: SettlementConfig,
    ) -> Self {
        let orchestrator =
            EpochSettlementOrchestrator::new(decomposer, store.clone(), pools, config);
        Self {
            store,
            clock,
            orchestrator,
        }
    }

    /// Service backed by the default BTS decomposer
    pub fn with_bts(
        store: Arc<InMemoryBeliefStore>,
        pools: Option<Arc<dyn PoolSettlement>>,
        clock: Arc<dyn EpochClock>,
        config: SettlementConfig,
    ) -> Self {
        Self::new(store, Arc::new(BtsDecomposer::new()), pools, clock, config)
    }

    pub fn store(&self) -> &Arc<InMemoryBeliefStore> {
        &self.store
    }

    pub fn current_epoch(&self) -> Epoch {
        self.clock.current_epoch()
    }

    /// Submit (or overwrite) an agent's report for the current epoch
    pub fn submit(
        &self,
        belief_id: BeliefId,
        agent_id: AgentId,
        belief: Probability,
        meta_prediction: Probability,
    ) -> Result<()> {
        let epoch = self.clock.current_epoch();
        self.store.submit(BeliefSubmission::new(
            belief_id,
            agent_id,
            epoch,
            belief,
            meta_prediction,
        ))
    }

    /// Decompose the current epoch's submissions for a belief
    ///
    /// Without explicit weights, weights come from the configured method.
    pub fn decompose(
        &self,
        belief_id: &BeliefId,
        weights: Option<Weights>,
    ) -> Result<DecompositionResult> {
        let submissions = self.current_submissions(belief_id)?;
        let reports = reports_from(&submissions);
        let weights = match weights {
            Some(weights) => weights,
            None => self.default_weights(&submissions, None)?,
        };
        Ok(self.orchestrator.decomposer().decompose(&reports, &weights)?)
    }

    /// Single leave-one-out decomposition excluding `exclude`
    ///
    /// `weights` must not contain `exclude`; without explicit weights they
    /// are derived over the remaining agents.
    pub fn decompose_loo(
        &self,
        belief_id: &BeliefId,
        exclude: &AgentId,
        weights: Option<Weights>,
    ) -> Result<LooResult> {
        let submissions = self.current_submissions(belief_id)?;
        let reports = reports_from(&submissions);
        let weights = match weights {
            Some(weights) => weights,
            None => self.default_weights(&submissions, Some(exclude))?,
        };
        Ok(self
            .orchestrator
            .decomposer()
            .decompose_loo(&reports, &weights, exclude)?)
    }

    /// Settle `epoch`, or the clock's current epoch when `None`
    pub fn process_epoch(&self, epoch: Option<Epoch>) -> EpochReport {
        let epoch = epoch.unwrap_or_else(|| self.clock.current_epoch());
        self.orchestrator.process_epoch(epoch)
    }

    fn current_submissions(&self, belief_id: &BeliefId) -> Result<Vec<BeliefSubmission>> {
        self.store
            .belief(belief_id)
            .map_err(|_| SettlementError::BeliefNotFound(*belief_id))?;
        Ok(self
            .store
            .submissions(belief_id, self.clock.current_epoch()))
    }

    fn default_weights(
        &self,
        submissions: &[BeliefSubmission],
        exclude: Option<&AgentId>,
    ) -> Result<Weights> {
        let stakes = submissions
            .iter()
            .filter(|s| Some(&s.agent_id) != exclude)
            .map(|s| {
                let agent = self.store.agent(&s.agent_id)?;
                Ok((s.agent_id, agent.stake))
            })
            .collect::<Result<Vec<(AgentId, Amount)>>>()?;
        Ok(compute_weights(
            self.orchestrator.config().weighting,
            &stakes,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use veritas_clock::ManualEpochClock;
    use veritas_core::{Agent, Belief, ContentId};

    fn service() -> (SettlementService, Arc<ManualEpochClock>) {
        let clock = ManualEpochClock::new(0);
        let service = SettlementService::with_bts(
            Arc::new(InMemoryBeliefStore::new()),
            None,
            clock.clone(),
            SettlementConfig::default(),
        );
        (service, clock)
    }

    #[test]
    fn test_decompose_with_default_weights() {
        let _ = env_logger::try_init();
        let (service, _) = service();
        let a = service.store().register_agent(Agent::new(300, "a"));
        let b = service.store().register_agent(Agent::new(100, "b"));
        let belief = service
            .store()
            .create_belief(Belief::new(ContentId::new(), a, 0.5, 5, 0));
        service.submit(belief, a, 0.8, 0.62).unwrap();
        service.submit(belief, b, 0.2, 0.38).unwrap();

        let result = service.decompose(&belief, None).unwrap();
        // Stake-weighted toward the 0.8 report
        assert!(result.aggregate > 0.5);

        let explicit: Weights = [(a, 0.5), (b, 0.5)].into_iter().collect();
        let equal = service.decompose(&belief, Some(explicit)).unwrap();
        assert_abs_diff_eq!(equal.aggregate, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_decompose_unknown_belief() {
        let (service, _) = service();
        let err = service.decompose(&BeliefId::new(), None).unwrap_err();
        assert_eq!(err.code(), "BELIEF_NOT_FOUND");
    }

    #[test]
    fn test_decompose_loo_defaults_when_too_few_remain() {
        let (service, _) = service();
        let a = service.store().register_agent(Agent::new(1, "a"));
        let b = service.store().register_agent(Agent::new(1, "b"));
        let belief = service
            .store()
            .create_belief(Belief::new(ContentId::new(), a, 0.5, 5, 0));
        service.submit(belief, a, 0.3, 0.4).unwrap();
        service.submit(belief, b, 0.9, 0.7).unwrap();

        let loo = service.decompose_loo(&belief, &a, None).unwrap();
        assert_eq!(loo, LooResult::neutral());

        let with_excluded: Weights = [(a, 0.5), (b, 0.5)].into_iter().collect();
        let err = service
            .decompose_loo(&belief, &a, Some(with_excluded))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_EXCLUSION");
    }

    #[test]
    fn test_submissions_follow_the_clock() {
        let (service, clock) = service();
        let a = service.store().register_agent(Agent::new(1, "a"));
        let belief = service
            .store()
            .create_belief(Belief::new(ContentId::new(), a, 0.5, 5, 0));
        service.submit(belief, a, 0.3, 0.4).unwrap();
        clock.advance(1);
        service.submit(belief, a, 0.6, 0.5).unwrap();

        assert_eq!(service.store().submission_count(&belief, 0), 1);
        assert_eq!(service.store().submission_count(&belief, 1), 1);

        clock.set_epoch(5);
        let err = service.submit(belief, a, 0.6, 0.5).unwrap_err();
        assert_eq!(err.code(), "BELIEF_EXPIRED");
    }
}
