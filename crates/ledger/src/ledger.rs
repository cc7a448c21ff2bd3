use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use log::{debug, info, warn};
use parking_lot::Mutex;
use veritas_core::{Address, Amount, ContentId, TokenAmount};
use veritas_ports::{ElasticAdjustment, PoolSettlement, PoolSettlementResult};

use crate::config::{LedgerConfig, PoolParams};
use crate::error::{LedgerError, Result};
use crate::pool::{BuyQuote, ContentPool, PoolSnapshot, SellQuote};
use crate::treasury::ProtocolTreasury;
use crate::wallets::Wallets;

/// Pools, treasury and wallets behind one handle
///
/// Each pool is its own lock (a map entry), wallets and the treasury have
/// one lock each. Calls that touch several always lock in the order
/// pool -> wallets -> treasury. Every mutation is computed in full first
/// and committed only once all checks pass.
pub struct Ledger {
    config: LedgerConfig,
    pools: DashMap<ContentId, ContentPool>,
    wallets: Mutex<Wallets>,
    treasury: Mutex<Option<ProtocolTreasury>>,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            pools: DashMap::new(),
            wallets: Mutex::new(Wallets::new()),
            treasury: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Treasury
    // ------------------------------------------------------------------

    /// Create the singleton treasury
    pub fn initialize_treasury(&self, authority: Address) -> Result<ProtocolTreasury> {
        let mut slot = self.treasury.lock();
        if slot.is_some() {
            return Err(LedgerError::TreasuryAlreadyInitialized);
        }
        let treasury = ProtocolTreasury::new(authority);
        info!(
            "[LEDGER] Treasury initialized at {} (authority {})",
            treasury.address, treasury.authority
        );
        *slot = Some(treasury.clone());
        Ok(treasury)
    }

    pub fn update_treasury_authority(&self, caller: &Address, new_authority: Address) -> Result<()> {
        let mut slot = self.treasury.lock();
        let treasury = slot.as_mut().ok_or(LedgerError::TreasuryNotInitialized)?;
        treasury.update_authority(caller, new_authority)
    }

    pub fn treasury(&self) -> Result<ProtocolTreasury> {
        self.treasury
            .lock()
            .clone()
            .ok_or(LedgerError::TreasuryNotInitialized)
    }

    /// Move currency from a wallet into the treasury vault
    pub fn fund_treasury(&self, from: &Address, amount: Amount) -> Result<()> {
        let mut wallets = self.wallets.lock();
        let mut slot = self.treasury.lock();
        let treasury = slot.as_mut().ok_or(LedgerError::TreasuryNotInitialized)?;

        wallets.ensure_funds(from, amount)?;
        treasury.deposit(amount)?;
        wallets.debit(from, amount)?;
        info!("[LEDGER] Treasury funded with {} by {}", amount, from);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Wallets
    // ------------------------------------------------------------------

    /// Credit external currency to a wallet
    pub fn credit(&self, address: &Address, amount: Amount) -> Result<()> {
        self.wallets.lock().credit(address, amount)
    }

    pub fn balance(&self, address: &Address) -> Amount {
        self.wallets.lock().balance(address)
    }

    pub fn token_balance(&self, address: &Address, content_id: &ContentId) -> TokenAmount {
        self.wallets.lock().token_balance(address, content_id)
    }

    /// Peer-to-peer token transfer; the pool is not involved
    pub fn transfer_tokens(
        &self,
        content_id: &ContentId,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<()> {
        let mut wallets = self.wallets.lock();
        wallets.ensure_tokens(from, content_id, amount)?;
        wallets.token_balance(to, content_id)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("token balance"))?;
        wallets.debit_tokens(from, content_id, amount)?;
        wallets.credit_tokens(to, content_id, amount)
    }

    /// Destroy tokens outside the curve
    ///
    /// The curve's `token_supply` and `reserve` do not move.
    pub fn burn_tokens(
        &self,
        content_id: &ContentId,
        owner: &Address,
        amount: TokenAmount,
    ) -> Result<()> {
        if !self.pools.contains_key(content_id) {
            return Err(LedgerError::PoolNotFound(*content_id));
        }
        self.wallets
            .lock()
            .debit_tokens(owner, content_id, amount)?;
        debug!("[LEDGER] {} burned {} tokens of {}", owner, amount, content_id);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pools
    // ------------------------------------------------------------------

    /// Create the pool for `content_id`; fails if one already exists
    pub fn initialize_pool(&self, content_id: ContentId, params: PoolParams) -> Result<PoolSnapshot> {
        params.validate()?;
        match self.pools.entry(content_id) {
            Entry::Occupied(_) => Err(LedgerError::PoolAlreadyExists(content_id)),
            Entry::Vacant(slot) => {
                let authority = params
                    .authority
                    .clone()
                    .unwrap_or_else(|| self.config.pool_authority.clone());
                let pool = ContentPool::new(
                    content_id,
                    &params,
                    authority,
                    self.config.factory.clone(),
                );
                info!(
                    "[LEDGER] Pool initialized: content={}, address={}, k={}, token={} ({})",
                    content_id, pool.address, pool.k_quadratic, pool.token_name, pool.token_symbol
                );
                let snapshot = pool.snapshot();
                slot.insert(pool);
                Ok(snapshot)
            }
        }
    }

    pub fn pool(&self, content_id: &ContentId) -> Result<PoolSnapshot> {
        self.pools
            .get(content_id)
            .map(|pool| pool.snapshot())
            .ok_or(LedgerError::PoolNotFound(*content_id))
    }

    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    pub fn quote_buy(&self, content_id: &ContentId, amount: Amount) -> Result<BuyQuote> {
        let pool = self
            .pools
            .get(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        pool.quote_buy(amount, &self.config)
    }

    pub fn quote_sell(&self, content_id: &ContentId, tokens: TokenAmount) -> Result<SellQuote> {
        let pool = self
            .pools
            .get(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        pool.quote_sell(tokens, &self.config)
    }

    /// Pay `amount` into the pool and receive freshly minted tokens
    pub fn buy(&self, content_id: &ContentId, buyer: &Address, amount: Amount) -> Result<BuyQuote> {
        let mut pool = self
            .pools
            .get_mut(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        let quote = pool.quote_buy(amount, &self.config)?;

        let mut wallets = self.wallets.lock();
        wallets.ensure_funds(buyer, amount)?;
        wallets
            .token_balance(buyer, content_id)
            .checked_add(quote.tokens_minted)
            .ok_or(LedgerError::ArithmeticOverflow("token balance"))?;

        wallets.debit(buyer, amount)?;
        wallets.credit_tokens(buyer, content_id, quote.tokens_minted)?;
        pool.commit_buy(&quote);

        info!(
            "[LEDGER] Buy: content={}, buyer={}, amount={}, minted={}, supply={}, reserve={}",
            content_id, buyer, amount, quote.tokens_minted, pool.token_supply, pool.reserve
        );
        Ok(quote)
    }

    /// Burn `tokens` back into the pool and receive the curve payout
    pub fn sell(
        &self,
        content_id: &ContentId,
        seller: &Address,
        tokens: TokenAmount,
    ) -> Result<SellQuote> {
        let mut pool = self
            .pools
            .get_mut(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        let quote = pool.quote_sell(tokens, &self.config)?;

        let mut wallets = self.wallets.lock();
        wallets.ensure_tokens(seller, content_id, tokens)?;
        wallets
            .balance(seller)
            .checked_add(quote.payout)
            .ok_or(LedgerError::ArithmeticOverflow("wallet balance"))?;

        wallets.debit_tokens(seller, content_id, tokens)?;
        wallets.credit(seller, quote.payout)?;
        pool.commit_sell(&quote);

        info!(
            "[LEDGER] Sell: content={}, seller={}, tokens={}, payout={}, supply={}, reserve={}",
            content_id, seller, tokens, quote.payout, pool.token_supply, pool.reserve
        );
        Ok(quote)
    }

    fn authorize(&self, pool: &ContentPool, authority: &Address, factory: &Address) -> Result<()> {
        if factory != &pool.factory {
            warn!(
                "[LEDGER] Rejected adjustment on {}: factory {} does not match {}",
                pool.content_id, factory, pool.factory
            );
            return Err(LedgerError::InvalidFactory {
                expected: pool.factory.clone(),
                actual: factory.clone(),
            });
        }
        if authority != &pool.authority {
            warn!(
                "[LEDGER] Rejected adjustment on {}: {} is not the pool authority",
                pool.content_id, authority
            );
            return Err(LedgerError::Unauthorized(authority.clone()));
        }
        Ok(())
    }

    /// Move `amount` from the pool vault to the treasury and shrink `k`
    pub fn apply_pool_penalty(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> Result<ElasticAdjustment> {
        let mut pool = self
            .pools
            .get_mut(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        self.authorize(&pool, authority, factory)?;
        let adjustment = pool.quote_penalty(amount)?;

        let mut slot = self.treasury.lock();
        let treasury = slot.as_mut().ok_or(LedgerError::TreasuryNotInitialized)?;
        treasury.collect_penalty(amount)?;
        pool.commit_adjustment(&adjustment);

        info!(
            "[LEDGER] Penalty: content={}, amount={}, reserve {} -> {}, k {} -> {}",
            content_id,
            amount,
            adjustment.reserve_before,
            adjustment.reserve_after,
            adjustment.k_before,
            adjustment.k_after
        );
        Ok(adjustment)
    }

    /// Move `amount` from the treasury to the pool vault and grow `k`
    pub fn apply_pool_reward(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> Result<ElasticAdjustment> {
        let mut pool = self
            .pools
            .get_mut(content_id)
            .ok_or(LedgerError::PoolNotFound(*content_id))?;
        self.authorize(&pool, authority, factory)?;
        let adjustment = pool.quote_reward(amount)?;

        let mut slot = self.treasury.lock();
        let treasury = slot.as_mut().ok_or(LedgerError::TreasuryNotInitialized)?;
        treasury.pay_reward(amount)?;
        pool.commit_adjustment(&adjustment);

        info!(
            "[LEDGER] Reward: content={}, amount={}, reserve {} -> {}, k {} -> {}",
            content_id,
            amount,
            adjustment.reserve_before,
            adjustment.reserve_after,
            adjustment.k_before,
            adjustment.k_after
        );
        Ok(adjustment)
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl PoolSettlement for Ledger {
    fn has_pool(&self, content_id: &ContentId) -> bool {
        self.pools.contains_key(content_id)
    }

    fn pool_reserve(&self, content_id: &ContentId) -> PoolSettlementResult<Amount> {
        Ok(self.pool(content_id)?.reserve)
    }

    fn treasury_balance(&self) -> PoolSettlementResult<Amount> {
        Ok(self.treasury()?.balance)
    }

    fn apply_pool_penalty(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> PoolSettlementResult<ElasticAdjustment> {
        Ok(Ledger::apply_pool_penalty(self, content_id, authority, factory, amount)?)
    }

    fn apply_pool_reward(
        &self,
        content_id: &ContentId,
        authority: &Address,
        factory: &Address,
        amount: Amount,
    ) -> PoolSettlementResult<ElasticAdjustment> {
        Ok(Ledger::apply_pool_reward(self, content_id, authority, factory, amount)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Ledger, ContentId) {
        let _ = env_logger::try_init();
        let ledger = Ledger::default();
        ledger.initialize_treasury(Address::new("admin")).unwrap();
        let content_id = ContentId::new();
        ledger
            .initialize_pool(content_id, PoolParams::new("Post", "POST"))
            .unwrap();
        (ledger, content_id)
    }

    #[test]
    fn test_duplicate_pool_fails() {
        let (ledger, content_id) = setup();
        let err = ledger
            .initialize_pool(content_id, PoolParams::new("Again", "AGN"))
            .unwrap_err();
        assert_eq!(err.code(), "POOL_ALREADY_EXISTS");
        assert_eq!(ledger.pool_count(), 1);
    }

    #[test]
    fn test_duplicate_treasury_fails() {
        let (ledger, _) = setup();
        let err = ledger
            .initialize_treasury(Address::new("other"))
            .unwrap_err();
        assert_eq!(err.code(), "TREASURY_ALREADY_INITIALIZED");
        assert_eq!(ledger.treasury().unwrap().authority, Address::new("admin"));
    }

    #[test]
    fn test_buy_without_funds_leaves_state() {
        let (ledger, content_id) = setup();
        let buyer = Address::new("buyer");
        ledger.credit(&buyer, 500_000).unwrap();

        let err = ledger.buy(&content_id, &buyer, 1_000_000).unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_FUNDS");
        assert_eq!(ledger.balance(&buyer), 500_000);
        assert_eq!(ledger.pool(&content_id).unwrap().reserve, 0);
    }

    #[test]
    fn test_sell_requires_tokens() {
        let (ledger, content_id) = setup();
        let alice = Address::new("alice");
        let bob = Address::new("bob");
        ledger.credit(&alice, 1_000_000).unwrap();
        let bought = ledger.buy(&content_id, &alice, 1_000_000).unwrap();

        let err = ledger
            .sell(&content_id, &bob, bought.tokens_minted / 2)
            .unwrap_err();
        assert_eq!(err.code(), "INSUFFICIENT_TOKENS");
    }

    #[test]
    fn test_wrong_factory_is_rejected() {
        let (ledger, content_id) = setup();
        let authority = ledger.config().pool_authority.clone();
        let err = ledger
            .apply_pool_reward(&content_id, &authority, &Address::new("rogue-factory"), 1)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_FACTORY");
    }

    #[test]
    fn test_adjustments_check_the_pool_authority() {
        let (ledger, _) = setup();
        let content_id = ContentId::new();
        let curator = Address::new("curator");
        ledger
            .initialize_pool(
                content_id,
                PoolParams::new("Curated", "CUR").with_authority(curator.clone()),
            )
            .unwrap();
        let alice = Address::new("alice");
        ledger.credit(&alice, 10_000_000).unwrap();
        ledger.buy(&content_id, &alice, 10_000_000).unwrap();
        let factory = ledger.config().factory.clone();
        assert_eq!(ledger.pool(&content_id).unwrap().authority, curator);

        let ledger_authority = ledger.config().pool_authority.clone();
        let err = ledger
            .apply_pool_penalty(&content_id, &ledger_authority, &factory, 1_000)
            .unwrap_err();
        assert_eq!(err.code(), "UNAUTHORIZED");
        assert_eq!(ledger.pool(&content_id).unwrap().reserve, 10_000_000);

        ledger
            .apply_pool_penalty(&content_id, &curator, &factory, 1_000)
            .unwrap();
        assert_eq!(ledger.pool(&content_id).unwrap().reserve, 9_999_000);
        assert_eq!(ledger.treasury().unwrap().balance, 1_000);
    }

    #[test]
    fn test_burn_does_not_touch_curve() {
        let (ledger, content_id) = setup();
        let alice = Address::new("alice");
        ledger.credit(&alice, 1_000_000).unwrap();
        let bought = ledger.buy(&content_id, &alice, 1_000_000).unwrap();

        ledger.burn_tokens(&content_id, &alice, 1_000).unwrap();
        let pool = ledger.pool(&content_id).unwrap();
        assert_eq!(pool.token_supply, bought.tokens_minted);
        assert_eq!(
            ledger.token_balance(&alice, &content_id),
            bought.tokens_minted - 1_000
        );
        assert_eq!(pool.reserve, 1_000_000);
    }

    #[test]
    fn test_settlement_port_maps_errors() {
        let ledger = Ledger::default();
        let missing = ContentId::new();
        assert!(!ledger.has_pool(&missing));
        let err = PoolSettlement::pool_reserve(&ledger, &missing).unwrap_err();
        assert_eq!(err.code(), "POOL_NOT_FOUND");
        let err = PoolSettlement::treasury_balance(&ledger).unwrap_err();
        assert_eq!(err.code(), "TREASURY_NOT_INITIALIZED");
    }
}
