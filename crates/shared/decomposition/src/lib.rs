//! Veritas Belief Decomposition
//!
//! Aggregates per-agent `(belief, meta-prediction)` reports into a single
//! consensus probability, in the spirit of the Bayesian Truth Serum.
//!
//! ## Model
//!
//! ```text
//!            latent state ω ∈ {0, 1},  P(ω = 1) = p   (common prior)
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!     agent i: belief b_i = P(ω=1 | s_i)   meta m_i = E[peer belief | s_i]
//!                                              = (1 - b_i)·W[0][1] + b_i·W[1][1]
//! ```
//!
//! The local expectation matrix `W` is fitted by maximum likelihood over the
//! meta-predictions (log-domain, Newton ascent). The common prior is the
//! stationary distribution of `W`. The consensus is the weighted log-linear
//! pool of the beliefs, and every leave-one-out aggregate is derived from
//! prefix/suffix sums of the same statistics.
//!
//! All components are pure: no I/O, no shared state.

mod bts;
mod config;
mod diagnostics;
mod fit;
mod pooling;
mod validation;

pub use bts::BtsDecomposer;
pub use config::DecomposerConfig;
pub use diagnostics::{Diagnostics, disagreement_bits, fit_quality};
pub use fit::{FitOutcome, fit_local_expectations};
pub use pooling::{PooledStatistics, pool};
pub use validation::{Sample, boundary_mass, prepare_samples};

// Re-export the trait from ports for convenience
pub use veritas_ports::{
    BeliefDecomposer, DecomposeResult, DecompositionError, DecompositionResult,
    LocalExpectationMatrix, LooResult, Report, Reports, Weights,
};

