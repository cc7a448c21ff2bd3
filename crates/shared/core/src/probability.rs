//! Numerically stable helpers for Bernoulli probabilities.
//!
//! Everything here works in the log domain where it matters so that inputs
//! arbitrarily close to 0 or 1 still produce finite results.

use std::f64::consts::LN_2;

/// Smallest distance from {0, 1} used before taking logarithms
pub const DEFAULT_PROBABILITY_FLOOR: f64 = 1e-9;

/// Clamp `p` into `[floor, 1 - floor]`; NaN maps to 0.5
pub fn clamp_probability(p: f64, floor: f64) -> f64 {
    if p.is_nan() {
        return 0.5;
    }
    p.clamp(floor, 1.0 - floor)
}

/// `(ln p, ln(1 - p))` for a probability already clamped away from the boundary
pub fn ln_pair(p: f64) -> (f64, f64) {
    (p.ln(), (-p).ln_1p())
}

/// `ln(e^a + e^b)` without overflow
pub fn log_sum_exp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

/// Normalize a two-state log-weight pair into the probability of the second state
pub fn normalize_log_pair(ln_zero: f64, ln_one: f64) -> f64 {
    let ln_total = log_sum_exp(ln_zero, ln_one);
    (ln_one - ln_total).exp()
}

/// Binary entropy in bits; 0 at the boundaries
pub fn binary_entropy_bits(p: f64) -> f64 {
    (xlnx(p) + xlnx(1.0 - p)) / -LN_2
}

/// `KL(Bern(p) || Bern(q))` in nats, with `q` clamped by `floor`
pub fn bernoulli_kl(p: f64, q: f64, floor: f64) -> f64 {
    let q = clamp_probability(q, floor);
    let (ln_q, ln_1q) = ln_pair(q);
    let kl = xlnx(p) + xlnx(1.0 - p) - p * ln_q - (1.0 - p) * ln_1q;
    kl.max(0.0)
}

/// `x ln x` with the continuous extension `0 ln 0 = 0`
fn xlnx(x: f64) -> f64 {
    if x <= 0.0 { 0.0 } else { x * x.ln() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_clamp_probability() {
        assert_eq!(clamp_probability(0.0, 1e-9), 1e-9);
        assert_eq!(clamp_probability(1.0, 1e-9), 1.0 - 1e-9);
        assert_eq!(clamp_probability(f64::NAN, 1e-9), 0.5);
        assert_eq!(clamp_probability(0.3, 1e-9), 0.3);
    }

    #[test]
    fn test_log_sum_exp_large_inputs() {
        let v = log_sum_exp(1000.0, 1000.0);
        assert!(v.is_finite());
        assert_abs_diff_eq!(v, 1000.0 + LN_2, epsilon = 1e-9);
        assert_eq!(log_sum_exp(f64::NEG_INFINITY, -3.0), -3.0);
    }

    #[test]
    fn test_binary_entropy() {
        assert_abs_diff_eq!(binary_entropy_bits(0.5), 1.0, epsilon = 1e-12);
        assert_eq!(binary_entropy_bits(0.0), 0.0);
        assert_eq!(binary_entropy_bits(1.0), 0.0);
        assert_abs_diff_eq!(binary_entropy_bits(0.1), 0.468_995_6, epsilon = 1e-6);
    }

    #[test]
    fn test_bernoulli_kl() {
        assert_abs_diff_eq!(bernoulli_kl(0.4, 0.4, 1e-9), 0.0, epsilon = 1e-12);
        assert!(bernoulli_kl(0.9, 0.1, 1e-9) > 1.0);
        assert!(bernoulli_kl(1.0, 0.0, 1e-9).is_finite());
    }
}
