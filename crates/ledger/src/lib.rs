//! Veritas Ledger
//!
//! Per-content bonding-curve pools and the protocol treasury they settle
//! against.
//!
//! ## Money flow
//!
//! ```text
//!  buyer ──amount──▶ pool vault ──payout──▶ seller        (curve: supply and reserve move)
//!                        │  ▲
//!                penalty │  │ reward                      (elastic: reserve and k move)
//!                        ▼  │
//!                  treasury vault
//! ```
//!
//! All amounts are integers. Curve math lives in [`curve`]; [`Ledger`]
//! serializes mutation per pool and commits nothing until every check passed.

pub mod config;
pub mod curve;
mod error;
mod ledger;
mod pool;
mod treasury;
mod wallets;

pub use config::{LedgerConfig, PoolParams};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use pool::{BuyQuote, ContentPool, PoolSnapshot, SellQuote};
pub use treasury::ProtocolTreasury;
pub use wallets::Wallets;

// Re-export the settlement port for convenience
pub use veritas_ports::{AdjustmentDirection, ElasticAdjustment, PoolSettlement};
