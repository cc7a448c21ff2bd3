//! Epoch Settlement Orchestrator
//!
//! One settlement pass per active belief per epoch:
//! - Weights are derived from the submitting agents' stakes
//! - The decomposer produces the new consensus and leave-one-out counterfactuals
//! - The consensus overwrites the belief's `previous_aggregate`
//! - If the belief's content has a pool, exactly one penalty or reward is
//!   issued against it, sized to the consensus shift
//!
//! Beliefs are settled independently; a failure on one is recorded in the
//! epoch report and never blocks the others.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;
use veritas_core::{
    AgentId, Amount, Belief, BeliefId, BeliefStatus, BeliefSubmission, ContentId, Epoch,
    Probability,
};
use veritas_ports::{
    AdjustmentDirection, BeliefDecomposer, BeliefRepository, DecompositionResult,
    ElasticAdjustment, ErrorKind, PoolSettlement, Report, Reports, Weights,
};

use crate::config::SettlementConfig;
use crate::error::{Result, SettlementError};
use crate::scoring::{informative_mass, score_agents, size_redistribution};
use crate::weights::compute_weights;

/// A belief that settled in this epoch
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedBelief {
    pub belief_id: BeliefId,
    pub content_id: ContentId,
    pub aggregate: Probability,
    pub previous_aggregate: Probability,
    pub participants: usize,
    pub informative_mass: f64,
    pub redistribution_occurred: bool,
    pub adjustment: Option<ElasticAdjustment>,
}

/// A belief whose settlement failed in this epoch
#[derive(Debug, Clone, Serialize)]
pub struct BeliefFailure {
    pub belief_id: BeliefId,
    pub code: &'static str,
    pub kind: ErrorKind,
    pub message: String,
    pub context: Value,
}

impl BeliefFailure {
    fn new(belief_id: BeliefId, error: &SettlementError) -> Self {
        Self {
            belief_id,
            code: error.code(),
            kind: error.kind(),
            message: error.to_string(),
            context: error.context(),
        }
    }
}

/// Outcome of one epoch's settlement pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct EpochReport {
    pub epoch: Epoch,
    pub processed: Vec<ProcessedBelief>,
    pub errors: Vec<BeliefFailure>,
    /// Beliefs whose duration ran out during this pass
    pub expired: Vec<BeliefId>,
}

impl EpochReport {
    fn new(epoch: Epoch) -> Self {
        Self {
            epoch,
            ..Default::default()
        }
    }

    pub fn processed(&self, belief_id: &BeliefId) -> Option<&ProcessedBelief> {
        self.processed.iter().find(|p| &p.belief_id == belief_id)
    }

    pub fn error(&self, belief_id: &BeliefId) -> Option<&BeliefFailure> {
        self.errors.iter().find(|e| &e.belief_id == belief_id)
    }

    /// Net value moved from pools to the treasury (negative when rewards dominate)
    pub fn net_penalties(&self) -> i128 {
        self.processed
            .iter()
            .filter_map(|p| p.adjustment.as_ref())
            .map(|adj| match adj.direction {
                AdjustmentDirection::Penalty => adj.amount as i128,
                AdjustmentDirection::Reward => -(adj.amount as i128),
            })
            .sum()
    }
}

/// Drives per-epoch settlement over the repository's beliefs
pub struct EpochSettlementOrchestrator {
    decomposer: Arc<dyn BeliefDecomposer>,
    repository: Arc<dyn BeliefRepository>,
    pools: Option<Arc<dyn PoolSettlement>>,
    config: SettlementConfig,
}

impl EpochSettlementOrchestrator {
    pub fn new(
        decomposer: Arc<dyn BeliefDecomposer>,
        repository: Arc<dyn BeliefRepository>,
        pools: Option<Arc<dyn PoolSettlement>>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            decomposer,
            repository,
            pools,
            config,
        }
    }

    pub fn config(&self) -> &SettlementConfig {
        &self.config
    }

    pub fn decomposer(&self) -> &Arc<dyn BeliefDecomposer> {
        &self.decomposer
    }

    /// Settle every belief active in `epoch` against that epoch's submissions
    pub fn process_epoch(&self, epoch: Epoch) -> EpochReport {
        let mut report = EpochReport::new(epoch);

        for belief in self.repository.beliefs() {
            if belief.status == BeliefStatus::Expired {
                continue;
            }
            if epoch >= belief.expires_at_epoch() {
                match self.repository.expire_belief(&belief.id) {
                    Ok(()) => {
                        info!(
                            "[SETTLEMENT] Belief {} expired at epoch {}",
                            belief.id, epoch
                        );
                        report.expired.push(belief.id);
                    }
                    Err(e) => report.errors.push(BeliefFailure::new(belief.id, &e.into())),
                }
                continue;
            }
            if !belief.is_active_at(epoch) {
                continue;
            }

            match self.settle_belief(&belief, epoch, &mut report) {
                Ok(Some(processed)) => report.processed.push(processed),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "[SETTLEMENT] Belief {} failed in epoch {}: {} ({})",
                        belief.id,
                        epoch,
                        e,
                        e.code()
                    );
                    report.errors.push(BeliefFailure::new(belief.id, &e));
                }
            }
        }

        info!(
            "[SETTLEMENT] Epoch {} settled: {} processed, {} failed, {} expired",
            epoch,
            report.processed.len(),
            report.errors.len(),
            report.expired.len()
        );
        report
    }

    /// Decompose, record and redistribute one belief
    ///
    /// Returns `Ok(None)` when the belief has too few submissions. Errors
    /// before the aggregate is recorded leave the belief untouched; a ledger
    /// error afterwards is pushed to the report and the new aggregate stands.
    fn settle_belief(
        &self,
        belief: &Belief,
        epoch: Epoch,
        report: &mut EpochReport,
    ) -> Result<Option<ProcessedBelief>> {
        let submissions = self.repository.submissions(&belief.id, epoch);
        if submissions.len() < self.config.min_submissions {
            debug!(
                "[SETTLEMENT] Belief {} skipped in epoch {}: {} submissions",
                belief.id,
                epoch,
                submissions.len()
            );
            return Ok(None);
        }

        let weights = self.weights_for(&submissions)?;
        let reports = reports_from(&submissions);
        let result = self.decomposer.decompose(&reports, &weights)?;

        let previous = belief.previous_aggregate;
        self.repository
            .record_aggregate(&belief.id, result.aggregate, epoch)?;

        let scores = score_agents(&reports, &weights, &result);
        let mass = informative_mass(&scores);

        let mut processed = ProcessedBelief {
            belief_id: belief.id,
            content_id: belief.content_id,
            aggregate: result.aggregate,
            previous_aggregate: previous,
            participants: submissions.len(),
            informative_mass: mass,
            redistribution_occurred: false,
            adjustment: None,
        };

        match self.redistribute(belief, &result, previous, mass) {
            Ok(adjustment) => {
                processed.redistribution_occurred = adjustment.is_some();
                processed.adjustment = adjustment;
            }
            Err(e) => {
                warn!(
                    "[SETTLEMENT] Redistribution for belief {} failed in epoch {}: {}",
                    belief.id, epoch, e
                );
                report.errors.push(BeliefFailure::new(belief.id, &e));
            }
        }

        info!(
            "[SETTLEMENT] Belief {} epoch {}: aggregate {:.6} -> {:.6} ({} agents, mass {:.3}, redistributed={})",
            belief.id,
            epoch,
            previous,
            processed.aggregate,
            processed.participants,
            mass,
            processed.redistribution_occurred
        );
        Ok(Some(processed))
    }

    fn weights_for(&self, submissions: &[BeliefSubmission]) -> Result<Weights> {
        let stakes = submissions
            .iter()
            .map(|s| {
                let agent = self.repository.agent(&s.agent_id)?;
                Ok((s.agent_id, agent.stake))
            })
            .collect::<Result<Vec<(AgentId, Amount)>>>()?;
        Ok(compute_weights(self.config.weighting, &stakes))
    }

    /// Issue at most one penalty or reward against the belief's pool
    fn redistribute(
        &self,
        belief: &Belief,
        result: &DecompositionResult,
        previous: Probability,
        mass: f64,
    ) -> Result<Option<ElasticAdjustment>> {
        let Some(pools) = self.pools.as_ref() else {
            return Ok(None);
        };
        if !pools.has_pool(&belief.content_id) {
            return Ok(None);
        }

        let delta = result.aggregate - previous;
        let reserve = pools.pool_reserve(&belief.content_id)?;
        let treasury = pools.treasury_balance()?;

        let Some(sized) = size_redistribution(delta, mass, reserve, treasury, &self.config)
        else {
            debug!(
                "[SETTLEMENT] No redistribution for belief {}: shift {:+.6}, mass {:.3}",
                belief.id, delta, mass
            );
            return Ok(None);
        };

        let adjustment = match sized.direction {
            AdjustmentDirection::Penalty => pools.apply_pool_penalty(
                &belief.content_id,
                &self.config.authority,
                &self.config.factory,
                sized.amount,
            )?,
            AdjustmentDirection::Reward => pools.apply_pool_reward(
                &belief.content_id,
                &self.config.authority,
                &self.config.factory,
                sized.amount,
            )?,
        };
        debug!(
            "[SETTLEMENT] {:?} of {} ({} bps) on content {}",
            sized.direction, sized.amount, sized.bps, belief.content_id
        );
        Ok(Some(adjustment))
    }
}

pub(crate) fn reports_from(submissions: &[BeliefSubmission]) -> Reports {
    submissions
        .iter()
        .map(|s| (s.agent_id, Report::new(s.belief, s.meta_prediction)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryBeliefStore;
    use std::sync::Mutex;
    use veritas_core::{Address, Agent};
    use veritas_decomposition::BtsDecomposer;
    use veritas_ports::{PoolSettlementError, PoolSettlementResult};

    /// Pool port double that records the calls it receives
    #[derive(Default)]
    struct RecordingPools {
        content: Mutex<Option<ContentId>>,
        calls: Mutex<Vec<(AdjustmentDirection, Amount)>>,
    }

    impl RecordingPools {
        fn adjustment(
            &self,
            content_id: &ContentId,
            direction: AdjustmentDirection,
            amount: Amount,
        ) -> PoolSettlementResult<ElasticAdjustment> {
            self.calls.lock().unwrap().push((direction, amount));
            Ok(ElasticAdjustment {
                content_id: *content_id,
                direction,
                amount,
                reserve_before: 1_000_000,
                reserve_after: 1_000_000,
                k_before: 1,
                k_after: 1,
            })
        }
    }

    impl PoolSettlement for RecordingPools {
        fn has_pool(&self, content_id: &ContentId) -> bool {
            self.content.lock().unwrap().as_ref() == Some(content_id)
        }

        fn pool_reserve(&self, content_id: &ContentId) -> PoolSettlementResult<Amount> {
            if self.has_pool(content_id) {
                Ok(1_000_000)
            } else {
                Err(PoolSettlementError::PoolNotFound(*content_id))
            }
        }

        fn treasury_balance(&self) -> PoolSettlementResult<Amount> {
            Ok(1_000_000)
        }

        fn apply_pool_penalty(
            &self,
            content_id: &ContentId,
            _authority: &Address,
            _factory: &Address,
            amount: Amount,
        ) -> PoolSettlementResult<ElasticAdjustment> {
            self.adjustment(content_id, AdjustmentDirection::Penalty, amount)
        }

        fn apply_pool_reward(
            &self,
            content_id: &ContentId,
            _authority: &Address,
            _factory: &Address,
            amount: Amount,
        ) -> PoolSettlementResult<ElasticAdjustment> {
            self.adjustment(content_id, AdjustmentDirection::Reward, amount)
        }
    }

    fn setup(
        pools: Option<Arc<RecordingPools>>,
    ) -> (Arc<InMemoryBeliefStore>, EpochSettlementOrchestrator) {
        let store = Arc::new(InMemoryBeliefStore::new());
        let orchestrator = EpochSettlementOrchestrator::new(
            Arc::new(BtsDecomposer::new()),
            store.clone(),
            pools.map(|p| p as Arc<dyn PoolSettlement>),
            SettlementConfig::default(),
        );
        (store, orchestrator)
    }

    fn agents(store: &InMemoryBeliefStore, n: usize) -> Vec<AgentId> {
        (0..n)
            .map(|i| store.register_agent(Agent::new(100, format!("agent-{}", i).as_str())))
            .collect()
    }

    fn submit_all(
        store: &InMemoryBeliefStore,
        belief: BeliefId,
        agents: &[AgentId],
        epoch: Epoch,
        values: &[f64],
    ) {
        for (agent, &b) in agents.iter().zip(values) {
            store
                .submit(BeliefSubmission::new(belief, *agent, epoch, b, 0.3 + 0.4 * b))
                .unwrap();
        }
    }

    #[test]
    fn test_settles_and_records_aggregate() {
        let _ = env_logger::try_init();
        let (store, orchestrator) = setup(None);
        let ids = agents(&store, 4);
        let belief = store.create_belief(Belief::new(ContentId::new(), ids[0], 0.5, 10, 0));
        submit_all(&store, belief, &ids, 0, &[0.6, 0.7, 0.8, 0.9]);

        let report = orchestrator.process_epoch(0);

        assert!(report.errors.is_empty());
        let processed = report.processed(&belief).unwrap();
        assert!(processed.aggregate > 0.6 && processed.aggregate < 0.9);
        assert_eq!(processed.previous_aggregate, 0.5);
        assert!(!processed.redistribution_occurred);
        assert_eq!(store.belief(&belief).unwrap().previous_aggregate, processed.aggregate);
    }

    #[test]
    fn test_single_submission_skipped() {
        let (store, orchestrator) = setup(None);
        let ids = agents(&store, 1);
        let belief = store.create_belief(Belief::new(ContentId::new(), ids[0], 0.5, 10, 0));
        submit_all(&store, belief, &ids, 0, &[0.9]);

        let report = orchestrator.process_epoch(0);
        assert!(report.processed.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(store.belief(&belief).unwrap().previous_aggregate, 0.5);
    }

    #[test]
    fn test_one_call_per_pooled_belief() {
        let pools = Arc::new(RecordingPools::default());
        let (store, orchestrator) = setup(Some(pools.clone()));
        let content = ContentId::new();
        *pools.content.lock().unwrap() = Some(content);

        let ids = agents(&store, 4);
        let belief = store.create_belief(Belief::new(content, ids[0], 0.5, 10, 0));
        submit_all(&store, belief, &ids, 0, &[0.1, 0.2, 0.3, 0.4]);

        let report = orchestrator.process_epoch(0);

        let processed = report.processed(&belief).unwrap();
        assert!(processed.aggregate < 0.5);
        assert!(processed.redistribution_occurred);
        let calls = pools.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, AdjustmentDirection::Penalty);
        assert!(calls[0].1 <= 50_000);
        assert_eq!(report.net_penalties(), calls[0].1 as i128);
    }

    #[test]
    fn test_expired_belief_is_marked_and_skipped() {
        let (store, orchestrator) = setup(None);
        let ids = agents(&store, 2);
        let belief = store.create_belief(Belief::new(ContentId::new(), ids[0], 0.5, 2, 0));
        submit_all(&store, belief, &ids, 1, &[0.4, 0.6]);

        let report = orchestrator.process_epoch(2);
        assert_eq!(report.expired, vec![belief]);
        assert_eq!(store.belief(&belief).unwrap().status, BeliefStatus::Expired);

        let report = orchestrator.process_epoch(3);
        assert!(report.expired.is_empty());
        assert!(report.processed.is_empty());
    }
}
