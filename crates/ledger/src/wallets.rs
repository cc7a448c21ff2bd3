use std::collections::HashMap;

use veritas_core::{Address, Amount, ContentId, TokenAmount};

use crate::error::{LedgerError, Result};

/// Currency and content-token balances held outside the pools
#[derive(Debug, Default)]
pub struct Wallets {
    currency: HashMap<Address, Amount>,
    tokens: HashMap<(Address, ContentId), TokenAmount>,
}

impl Wallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.currency.get(address).copied().unwrap_or(0)
    }

    pub fn token_balance(&self, address: &Address, content_id: &ContentId) -> TokenAmount {
        self.tokens
            .get(&(address.clone(), *content_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn credit(&mut self, address: &Address, amount: Amount) -> Result<()> {
        let balance = self.currency.entry(address.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("wallet balance"))?;
        Ok(())
    }

    /// Check that `address` can pay `amount` without changing anything
    pub fn ensure_funds(&self, address: &Address, amount: Amount) -> Result<()> {
        let balance = self.balance(address);
        if amount > balance {
            return Err(LedgerError::InsufficientFunds {
                address: address.clone(),
                requested: amount,
                balance,
            });
        }
        Ok(())
    }

    pub fn debit(&mut self, address: &Address, amount: Amount) -> Result<()> {
        self.ensure_funds(address, amount)?;
        if let Some(balance) = self.currency.get_mut(address) {
            *balance -= amount;
        }
        Ok(())
    }

    pub fn credit_tokens(
        &mut self,
        address: &Address,
        content_id: &ContentId,
        amount: TokenAmount,
    ) -> Result<()> {
        let balance = self
            .tokens
            .entry((address.clone(), *content_id))
            .or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("token balance"))?;
        Ok(())
    }

    pub fn ensure_tokens(
        &self,
        address: &Address,
        content_id: &ContentId,
        amount: TokenAmount,
    ) -> Result<()> {
        let balance = self.token_balance(address, content_id);
        if amount > balance {
            return Err(LedgerError::InsufficientTokens {
                address: address.clone(),
                requested: amount,
                balance,
            });
        }
        Ok(())
    }

    pub fn debit_tokens(
        &mut self,
        address: &Address,
        content_id: &ContentId,
        amount: TokenAmount,
    ) -> Result<()> {
        self.ensure_tokens(address, content_id, amount)?;
        if let Some(balance) = self.tokens.get_mut(&(address.clone(), *content_id)) {
            *balance -= amount;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_debit() {
        let mut wallets = Wallets::new();
        let alice = Address::new("alice");
        wallets.credit(&alice, 100).unwrap();
        wallets.debit(&alice, 40).unwrap();
        assert_eq!(wallets.balance(&alice), 60);

        let err = wallets.debit(&alice, 61).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(wallets.balance(&alice), 60);
    }

    #[test]
    fn test_token_balances_are_per_content() {
        let mut wallets = Wallets::new();
        let alice = Address::new("alice");
        let post_a = ContentId::new();
        let post_b = ContentId::new();

        wallets.credit_tokens(&alice, &post_a, 10).unwrap();
        assert_eq!(wallets.token_balance(&alice, &post_a), 10);
        assert_eq!(wallets.token_balance(&alice, &post_b), 0);

        let err = wallets.debit_tokens(&alice, &post_b, 1).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_TOKENS");
    }
}
