use serde::{Deserialize, Serialize};
use veritas_core::{Address, Amount, ContentId};

use crate::error::PoolSettlementResult;

/// Which way value moved between a pool and the treasury
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdjustmentDirection {
    /// Pool vault -> treasury vault
    Penalty,
    /// Treasury vault -> pool vault
    Reward,
}

/// Record of one elastic rescale of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticAdjustment {
    pub content_id: ContentId,
    pub direction: AdjustmentDirection,
    pub amount: Amount,
    pub reserve_before: Amount,
    pub reserve_after: Amount,
    pub k_before: u64,
    pub k_after: u64,
}

/// Port for the pool/treasury ledger as seen by epoch settlement
pub trait PoolSettlement: Send + Sync {
    /// Whether a pool exists for this content
    fn has_pool(&self, content_id: &ContentId) -> bool;

    /// Current reserve of the content's pool
    fn pool_reserve(&self, content_id: &ContentId) -> PoolSettlementResult<Amount>;

    /// Current treasury vault balance
    fn treasury_balance(&self) -> PoolSettlementResult<Amount>;

    /// Move `amount` from the pool vault to the treasury and shrink `k`
    fn apply_pool_penalty(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> PoolSettlementResult<ElasticAdjustment>;

    /// Move `amount` from the treasury to the pool vault and grow `k`
    fn apply_pool_reward(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> PoolSettlementResult<ElasticAdjustment>;
}
