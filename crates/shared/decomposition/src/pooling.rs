//! Weighted log-linear pooling.
//!
//! The pooled probability of a set of weighted reports is
//! `σ(Σ wᵢ·logit(pᵢ))`, evaluated as a normalized pair of log-weights so
//! extreme inputs stay finite. Leave-one-out pools reuse prefix and suffix
//! sums, so all `n` of them cost `O(n)` and never subtract large terms.

use veritas_core::probability::{ln_pair, normalize_log_pair};

/// Weighted sums of `ln p` and `ln(1 - p)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PooledStatistics {
    pub weight: f64,
    pub ln_one: f64,
    pub ln_zero: f64,
}

impl PooledStatistics {
    fn observe(&mut self, weight: f64, p: f64) {
        let (ln_p, ln_q) = ln_pair(p);
        self.weight += weight;
        self.ln_one += weight * ln_p;
        self.ln_zero += weight * ln_q;
    }

    fn merge(&self, other: &PooledStatistics) -> PooledStatistics {
        PooledStatistics {
            weight: self.weight + other.weight,
            ln_one: self.ln_one + other.ln_one,
            ln_zero: self.ln_zero + other.ln_zero,
        }
    }

    /// Pooled probability with weights renormalized to sum to 1
    ///
    /// Returns `None` when no weight remains.
    pub fn probability(&self) -> Option<f64> {
        if self.weight <= 0.0 || !self.weight.is_finite() {
            return None;
        }
        Some(normalize_log_pair(
            self.ln_zero / self.weight,
            self.ln_one / self.weight,
        ))
    }
}

/// Pool `(weight, probability)` pairs; probabilities must already be clamped
pub fn pool(items: &[(f64, f64)]) -> PooledStatistics {
    let mut stats = PooledStatistics::default();
    for &(weight, p) in items {
        stats.observe(weight, p);
    }
    stats
}

/// Statistics of every item except index `i`, for each `i`
pub fn leave_one_out(items: &[(f64, f64)]) -> Vec<PooledStatistics> {
    let n = items.len();
    let mut prefix = vec![PooledStatistics::default(); n + 1];
    for (i, &(weight, p)) in items.iter().enumerate() {
        let mut next = prefix[i];
        next.observe(weight, p);
        prefix[i + 1] = next;
    }

    let mut suffix = vec![PooledStatistics::default(); n + 1];
    for i in (0..n).rev() {
        let (weight, p) = items[i];
        let mut next = suffix[i + 1];
        next.observe(weight, p);
        suffix[i] = next;
    }

    (0..n).map(|i| prefix[i].merge(&suffix[i + 1])).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pool_of_identical_values() {
        let stats = pool(&[(0.25, 0.7), (0.75, 0.7)]);
        assert_abs_diff_eq!(stats.probability().unwrap(), 0.7, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_pool_is_half() {
        let stats = pool(&[(0.5, 0.2), (0.5, 0.8)]);
        assert_abs_diff_eq!(stats.probability().unwrap(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_pool_extremes_are_finite() {
        let stats = pool(&[(0.5, 1e-9), (0.5, 1.0 - 1e-12)]);
        let p = stats.probability().unwrap();
        assert!(p.is_finite());
        assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn test_leave_one_out_matches_direct_pool() {
        let items = [(0.1, 0.3), (0.2, 0.9), (0.3, 0.55), (0.4, 0.05)];
        let loo = leave_one_out(&items);
        for i in 0..items.len() {
            let rest: Vec<(f64, f64)> = items
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, item)| *item)
                .collect();
            let direct = pool(&rest).probability().unwrap();
            assert_abs_diff_eq!(loo[i].probability().unwrap(), direct, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_empty_pool_has_no_probability() {
        assert!(pool(&[]).probability().is_none());
        assert!(pool(&[(0.0, 0.4)]).probability().is_none());
    }
}
