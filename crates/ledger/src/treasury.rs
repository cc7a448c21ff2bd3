use chrono::Utc;
use log::info;
use serde::{Deserialize, Serialize};
use veritas_core::{Address, Amount, Timestamp};

use crate::error::{LedgerError, Result};

/// Global clearing vault for penalties and rewards
///
/// Holds no accounting beyond its balance and the running totals, so a
/// cycle in which collected penalties equal paid rewards leaves `balance`
/// exactly where it started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolTreasury {
    pub address: Address,
    pub vault: Address,
    pub authority: Address,
    pub balance: Amount,
    /// Total ever received from pool penalties
    pub penalties_collected: Amount,
    /// Total ever paid out as pool rewards
    pub rewards_paid: Amount,
    pub created_at: Timestamp,
}

impl ProtocolTreasury {
    pub fn derive_address() -> Address {
        Address::derive("protocol_treasury", b"")
    }

    pub fn new(authority: Address) -> Self {
        Self {
            address: Self::derive_address(),
            vault: Address::derive("protocol_treasury_vault", b""),
            authority,
            balance: 0,
            penalties_collected: 0,
            rewards_paid: 0,
            created_at: Utc::now(),
        }
    }

    /// Add funds to the vault
    pub fn deposit(&mut self, amount: Amount) -> Result<()> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("treasury balance"))?;
        Ok(())
    }

    /// Take funds out of the vault
    pub fn withdraw(&mut self, amount: Amount) -> Result<()> {
        if amount > self.balance {
            return Err(LedgerError::InsufficientTreasuryBalance {
                requested: amount,
                balance: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    pub(crate) fn collect_penalty(&mut self, amount: Amount) -> Result<()> {
        self.deposit(amount)?;
        self.penalties_collected = self.penalties_collected.saturating_add(amount);
        Ok(())
    }

    pub(crate) fn pay_reward(&mut self, amount: Amount) -> Result<()> {
        self.withdraw(amount)?;
        self.rewards_paid = self.rewards_paid.saturating_add(amount);
        Ok(())
    }

    /// Hand the treasury to a new authority; only the current one may
    pub fn update_authority(&mut self, caller: &Address, new_authority: Address) -> Result<()> {
        if caller != &self.authority {
            return Err(LedgerError::Unauthorized(caller.clone()));
        }
        info!(
            "[LEDGER] Treasury authority changed: {} -> {}",
            self.authority, new_authority
        );
        self.authority = new_authority;
        Ok(())
    }
}
