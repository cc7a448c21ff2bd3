use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::values::{AgentId, BeliefId, ContentId, Epoch, Probability, Timestamp};

/// Lifecycle status of a belief
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BeliefStatus {
    /// Accepting submissions and settled every epoch
    Active,
    /// Duration elapsed; no further settlement
    Expired,
}

/// A proposition about one piece of content, settled once per epoch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Belief {
    pub id: BeliefId,
    /// Content this belief scores (and whose pool it settles against)
    pub content_id: ContentId,
    pub creator: AgentId,
    pub initial_value: Probability,
    /// Number of epochs the belief stays active
    pub duration_epochs: u64,
    /// Epoch in which the belief was created
    pub created_epoch: Epoch,
    /// Last settled consensus; only settlement writes this
    pub previous_aggregate: Probability,
    /// Epoch of the last successful settlement
    pub last_settled_epoch: Option<Epoch>,
    pub status: BeliefStatus,
    pub created_at: Timestamp,
}

impl Belief {
    pub fn new(
        content_id: ContentId,
        creator: AgentId,
        initial_value: Probability,
        duration_epochs: u64,
        created_epoch: Epoch,
    ) -> Self {
        Self {
            id: BeliefId::new(),
            content_id,
            creator,
            initial_value,
            duration_epochs,
            created_epoch,
            previous_aggregate: initial_value,
            last_settled_epoch: None,
            status: BeliefStatus::Active,
            created_at: Utc::now(),
        }
    }

    /// First epoch in which the belief is no longer active
    pub fn expires_at_epoch(&self) -> Epoch {
        self.created_epoch.saturating_add(self.duration_epochs)
    }

    /// Whether the belief should be settled in `epoch`
    pub fn is_active_at(&self, epoch: Epoch) -> bool {
        self.status == BeliefStatus::Active
            && epoch >= self.created_epoch
            && epoch < self.expires_at_epoch()
    }

    pub fn expire(&mut self) {
        self.status = BeliefStatus::Expired;
    }

    /// Record a settled aggregate for `epoch`
    pub fn settle(&mut self, aggregate: Probability, epoch: Epoch) {
        self.previous_aggregate = aggregate;
        self.last_settled_epoch = Some(epoch);
    }
}
