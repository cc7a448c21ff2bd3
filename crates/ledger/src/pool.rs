use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use veritas_core::{Address, Amount, ContentId, Timestamp, TokenAmount};
use veritas_ports::{AdjustmentDirection, ElasticAdjustment};

use crate::config::{LedgerConfig, PoolParams, TOKEN_DECIMALS, TOKEN_UNIT};
use crate::curve::{self, mul_div_floor};
use crate::error::{LedgerError, Result};

/// Outcome of a buy, computed before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyQuote {
    pub amount: Amount,
    pub tokens_minted: TokenAmount,
    pub supply_after: TokenAmount,
    pub reserve_after: Amount,
}

/// Outcome of a sell, computed before anything is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellQuote {
    pub tokens: TokenAmount,
    pub payout: Amount,
    pub supply_after: TokenAmount,
    pub reserve_after: Amount,
}

/// Read model of a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub content_id: ContentId,
    pub address: Address,
    pub mint: Address,
    pub vault: Address,
    pub k_quadratic: u64,
    pub token_supply: TokenAmount,
    pub reserve: Amount,
    pub vault_balance: Amount,
    pub authority: Address,
    /// Currency per whole token
    pub spot_price: Decimal,
}

/// Bonding-curve pool for one content item
///
/// `token_supply` and `reserve` are the curve's view and only move through
/// buy/sell. Penalties and rewards move `reserve` and `k_quadratic`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPool {
    pub content_id: ContentId,
    pub address: Address,
    pub mint: Address,
    pub vault: Address,
    pub authority: Address,
    pub factory: Address,

    pub k_quadratic: u64,
    pub token_supply: TokenAmount,
    pub reserve: Amount,
    pub vault_balance: Amount,

    pub reserve_cap: Amount,
    pub supply_cap: TokenAmount,

    pub token_name: String,
    pub token_symbol: String,
    pub decimals: u8,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ContentPool {
    /// Program address of the pool for `content_id`
    pub fn derive_address(content_id: &ContentId) -> Address {
        Address::derive("content_pool", content_id.as_uuid().as_bytes())
    }

    /// Create an empty pool; `params` must already be validated
    pub fn new(
        content_id: ContentId,
        params: &PoolParams,
        authority: Address,
        factory: Address,
    ) -> Self {
        let seed = content_id.as_uuid().as_bytes();
        let now = Utc::now();
        Self {
            content_id,
            address: Self::derive_address(&content_id),
            mint: Address::derive("content_mint", seed),
            vault: Address::derive("content_vault", seed),
            authority,
            factory,
            k_quadratic: params.k_quadratic,
            token_supply: 0,
            reserve: 0,
            vault_balance: 0,
            reserve_cap: params.effective_reserve_cap(),
            supply_cap: params.effective_supply_cap(),
            token_name: params.token_name.trim().to_string(),
            token_symbol: params.token_symbol.trim().to_string(),
            decimals: TOKEN_DECIMALS,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marginal price at the current supply, currency units per whole token
    pub fn spot_price(&self) -> Result<u128> {
        curve::spot_price(self.k_quadratic, self.token_supply)
    }

    pub fn quote_buy(&self, amount: Amount, config: &LedgerConfig) -> Result<BuyQuote> {
        if amount < config.min_trade_amount {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: format!("below minimum trade amount {}", config.min_trade_amount),
            });
        }

        let reserve_after = self
            .reserve
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("reserve"))?;
        if reserve_after > self.reserve_cap {
            return Err(LedgerError::ReserveCapExceeded {
                reserve: reserve_after,
                cap: self.reserve_cap,
            });
        }

        let curve_supply = curve::supply_at(self.k_quadratic, reserve_after)?;
        let curve_minted = curve_supply.saturating_sub(self.token_supply);

        // Below the floor tokens cost the floor price, never less than the curve
        let tokens_minted = if config.price_floor > 0
            && self.spot_price()? < config.price_floor as u128
        {
            let floor_minted = mul_div_floor(
                amount as u128,
                TOKEN_UNIT as u128,
                config.price_floor as u128,
            )?;
            let floor_minted = u64::try_from(floor_minted)
                .map_err(|_| LedgerError::ArithmeticOverflow("floor mint"))?;
            floor_minted.min(curve_minted)
        } else {
            curve_minted
        };

        if tokens_minted == 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "too small to mint any tokens".to_string(),
            });
        }

        let supply_after = self
            .token_supply
            .checked_add(tokens_minted)
            .ok_or(LedgerError::ArithmeticOverflow("token supply"))?;
        if supply_after > self.supply_cap {
            return Err(LedgerError::SupplyCapExceeded {
                supply: supply_after,
                cap: self.supply_cap,
            });
        }

        Ok(BuyQuote {
            amount,
            tokens_minted,
            supply_after,
            reserve_after,
        })
    }

    pub fn quote_sell(&self, tokens: TokenAmount, config: &LedgerConfig) -> Result<SellQuote> {
        if tokens < config.min_trade_amount {
            return Err(LedgerError::InvalidAmount {
                amount: tokens,
                reason: format!("below minimum trade amount {}", config.min_trade_amount),
            });
        }
        if tokens > self.token_supply {
            return Err(LedgerError::InvalidAmount {
                amount: tokens,
                reason: format!("exceeds token supply {}", self.token_supply),
            });
        }

        let payout = curve::sell_payout(self.k_quadratic, self.token_supply, self.reserve, tokens)?;
        if payout == 0 {
            return Err(LedgerError::InvalidAmount {
                amount: tokens,
                reason: "sell would pay out nothing".to_string(),
            });
        }
        if payout > self.vault_balance {
            return Err(LedgerError::InsufficientVaultBalance {
                requested: payout,
                balance: self.vault_balance,
            });
        }

        Ok(SellQuote {
            tokens,
            payout,
            supply_after: self.token_supply - tokens,
            reserve_after: self.reserve - payout,
        })
    }

    /// Elastic rescale for moving `amount` out of the pool
    pub fn quote_penalty(&self, amount: Amount) -> Result<ElasticAdjustment> {
        Self::require_positive(amount)?;
        if amount > self.reserve {
            return Err(LedgerError::InsufficientReserve {
                requested: amount,
                reserve: self.reserve,
            });
        }
        if amount > self.vault_balance {
            return Err(LedgerError::InsufficientVaultBalance {
                requested: amount,
                balance: self.vault_balance,
            });
        }
        let reserve_after = self.reserve - amount;
        // Outstanding supply must stay backed by a curve with k >= K_MIN
        if self.token_supply > 0 {
            let floor = curve::min_backing_reserve(self.k_quadratic, self.reserve)?;
            if reserve_after < floor {
                return Err(LedgerError::InsufficientReserve {
                    requested: amount,
                    reserve: self.reserve.saturating_sub(floor),
                });
            }
        }
        self.adjustment(AdjustmentDirection::Penalty, amount, reserve_after)
    }

    /// Elastic rescale for moving `amount` into the pool
    pub fn quote_reward(&self, amount: Amount) -> Result<ElasticAdjustment> {
        Self::require_positive(amount)?;
        let reserve_after = self
            .reserve
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("reserve"))?;
        self.vault_balance
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow("vault balance"))?;
        self.adjustment(AdjustmentDirection::Reward, amount, reserve_after)
    }

    fn require_positive(amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount {
                amount,
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn adjustment(
        &self,
        direction: AdjustmentDirection,
        amount: Amount,
        reserve_after: Amount,
    ) -> Result<ElasticAdjustment> {
        let k_after = curve::rescale_k(
            self.k_quadratic,
            self.token_supply,
            self.reserve,
            reserve_after,
        )?;
        Ok(ElasticAdjustment {
            content_id: self.content_id,
            direction,
            amount,
            reserve_before: self.reserve,
            reserve_after,
            k_before: self.k_quadratic,
            k_after,
        })
    }

    pub(crate) fn commit_buy(&mut self, quote: &BuyQuote) {
        self.token_supply = quote.supply_after;
        self.reserve = quote.reserve_after;
        self.vault_balance += quote.amount;
        self.updated_at = Utc::now();
    }

    pub(crate) fn commit_sell(&mut self, quote: &SellQuote) {
        self.token_supply = quote.supply_after;
        self.reserve = quote.reserve_after;
        self.vault_balance -= quote.payout;
        self.updated_at = Utc::now();
    }

    pub(crate) fn commit_adjustment(&mut self, adjustment: &ElasticAdjustment) {
        match adjustment.direction {
            AdjustmentDirection::Penalty => self.vault_balance -= adjustment.amount,
            AdjustmentDirection::Reward => self.vault_balance += adjustment.amount,
        }
        self.reserve = adjustment.reserve_after;
        self.k_quadratic = adjustment.k_after;
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        let spot_price = self
            .spot_price()
            .ok()
            .and_then(|p| i128::try_from(p).ok())
            .and_then(|p| Decimal::try_from_i128_with_scale(p, TOKEN_DECIMALS as u32).ok())
            .unwrap_or(Decimal::MAX);
        PoolSnapshot {
            content_id: self.content_id,
            address: self.address.clone(),
            mint: self.mint.clone(),
            vault: self.vault.clone(),
            k_quadratic: self.k_quadratic,
            token_supply: self.token_supply,
            reserve: self.reserve,
            vault_balance: self.vault_balance,
            authority: self.authority.clone(),
            spot_price,
        }
    }
}
