use serde::{Deserialize, Serialize};

use crate::values::{Address, AgentId, Amount};

/// A reporting agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    /// Stake backing this agent's reports (weights are derived from it)
    pub stake: Amount,
    /// Wallet address used for trading and payouts
    pub address: Address,
}

impl Agent {
    pub fn new(stake: Amount, address: impl Into<Address>) -> Self {
        Self {
            id: AgentId::new(),
            stake,
            address: address.into(),
        }
    }

    pub fn with_id(id: AgentId, stake: Amount, address: impl Into<Address>) -> Self {
        Self {
            id,
            stake,
            address: address.into(),
        }
    }
}
