//! Maximum-likelihood fit of the local expectation matrix.
//!
//! Each agent's meta-prediction is modeled as
//! `m̂ᵢ = (1 - bᵢ)·a + bᵢ·c` where `a = W[0][1]` and `c = W[1][1]`.
//! The reported meta-prediction is scored as a soft label under that model:
//!
//! ```text
//! ℓ(a, c) = Σ wᵢ [ mᵢ ln m̂ᵢ + (1 - mᵢ) ln(1 - m̂ᵢ) ]
//!         + τ Σ_{x ∈ {a, c}} [ m̄ ln x + (1 - m̄) ln(1 - x) ]
//! ```
//!
//! The second term is a weak Beta-style pull of both rows toward the mean
//! meta-prediction `m̄`; it makes the objective strictly concave so the
//! maximizer is unique even when every agent reports the same belief.
//! `ln m̂ᵢ` and `ln(1 - m̂ᵢ)` are evaluated with log-sum-exp.

use log::debug;
use veritas_core::probability::{ln_pair, log_sum_exp};
use veritas_ports::LocalExpectationMatrix;

use crate::config::DecomposerConfig;
use crate::validation::Sample;

/// Result of fitting the local expectation matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOutcome {
    pub matrix: LocalExpectationMatrix,
    /// Stationary distribution of `matrix`
    pub prior: f64,
    /// Objective value at the optimum (including the regularizer)
    pub log_likelihood: f64,
    pub iterations: usize,
    pub converged: bool,
}

impl FitOutcome {
    /// Modeled meta-prediction for a belief
    pub fn predicted_meta(&self, belief: f64) -> f64 {
        let a = self.matrix.rows[0][1];
        let c = self.matrix.rows[1][1];
        (1.0 - belief) * a + belief * c
    }
}

/// First and second derivatives of the objective at one point
struct Curvature {
    value: f64,
    grad: [f64; 2],
    hessian: [[f64; 2]; 2],
}

struct Objective<'a> {
    samples: &'a [Sample],
    mean_meta: f64,
    tau: f64,
}

impl Objective<'_> {
    fn value(&self, a: f64, c: f64) -> f64 {
        let (ln_a, ln_1a) = ln_pair(a);
        let (ln_c, ln_1c) = ln_pair(c);
        let mut total = 0.0;
        for s in self.samples {
            let (ln_b, ln_1b) = ln_pair(s.belief);
            let ln_m_hat = log_sum_exp(ln_1b + ln_a, ln_b + ln_c);
            let ln_r_hat = log_sum_exp(ln_1b + ln_1a, ln_b + ln_1c);
            total += s.weight * (s.meta * ln_m_hat + (1.0 - s.meta) * ln_r_hat);
        }
        total + self.tau * (self.prior_term(ln_a, ln_1a) + self.prior_term(ln_c, ln_1c))
    }

    fn prior_term(&self, ln_x: f64, ln_1x: f64) -> f64 {
        self.mean_meta * ln_x + (1.0 - self.mean_meta) * ln_1x
    }

    fn curvature(&self, a: f64, c: f64) -> Curvature {
        let (ln_a, ln_1a) = ln_pair(a);
        let (ln_c, ln_1c) = ln_pair(c);
        let mut grad = [0.0; 2];
        let mut hessian = [[0.0; 2]; 2];

        for s in self.samples {
            let (ln_b, ln_1b) = ln_pair(s.belief);
            let m_hat = log_sum_exp(ln_1b + ln_a, ln_b + ln_c).exp();
            let r_hat = log_sum_exp(ln_1b + ln_1a, ln_b + ln_1c).exp();

            let residual = s.meta / m_hat - (1.0 - s.meta) / r_hat;
            let spread = s.meta / (m_hat * m_hat) + (1.0 - s.meta) / (r_hat * r_hat);
            let da = 1.0 - s.belief;
            let dc = s.belief;

            grad[0] += s.weight * da * residual;
            grad[1] += s.weight * dc * residual;
            hessian[0][0] -= s.weight * da * da * spread;
            hessian[0][1] -= s.weight * da * dc * spread;
            hessian[1][1] -= s.weight * dc * dc * spread;
        }

        let m = self.mean_meta;
        grad[0] += self.tau * (m / a - (1.0 - m) / (1.0 - a));
        grad[1] += self.tau * (m / c - (1.0 - m) / (1.0 - c));
        hessian[0][0] -= self.tau * (m / (a * a) + (1.0 - m) / ((1.0 - a) * (1.0 - a)));
        hessian[1][1] -= self.tau * (m / (c * c) + (1.0 - m) / ((1.0 - c) * (1.0 - c)));
        hessian[1][0] = hessian[0][1];

        Curvature {
            value: self.value(a, c),
            grad,
            hessian,
        }
    }
}

/// Newton ascent direction, or the gradient when the Hessian is degenerate
fn ascent_direction(curv: &Curvature) -> [f64; 2] {
    let [[haa, hac], [_, hcc]] = curv.hessian;
    let [ga, gc] = curv.grad;
    let det = haa * hcc - hac * hac;
    if det.is_finite() && det > f64::EPSILON && haa < 0.0 {
        [-(hcc * ga - hac * gc) / det, -(-hac * ga + haa * gc) / det]
    } else {
        let norm = (ga * ga + gc * gc).sqrt().max(1.0);
        [ga / norm * 0.1, gc / norm * 0.1]
    }
}

/// Fit `W` (and through it the common prior) to the samples
///
/// Samples must carry weights summing to 1 and clamped probabilities.
pub fn fit_local_expectations(samples: &[Sample], config: &DecomposerConfig) -> FitOutcome {
    let mean_meta: f64 = samples.iter().map(|s| s.weight * s.meta).sum();
    let lo = config.parameter_floor;
    let hi = 1.0 - config.parameter_floor;
    let mean_meta = mean_meta.clamp(lo, hi);

    let objective = Objective {
        samples,
        mean_meta,
        tau: config.regularization,
    };

    let (mut a, mut c) = (mean_meta, mean_meta);
    let mut value = objective.value(a, c);
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;
        let curv = objective.curvature(a, c);
        value = curv.value;
        let step = ascent_direction(&curv);

        // Backtracking line search inside the open box
        let mut t = 1.0;
        let mut accepted = None;
        for _ in 0..40 {
            let na = (a + t * step[0]).clamp(lo, hi);
            let nc = (c + t * step[1]).clamp(lo, hi);
            let nv = objective.value(na, nc);
            if nv.is_finite() && nv >= value {
                accepted = Some((na, nc, nv));
                break;
            }
            t *= 0.5;
        }

        let Some((na, nc, nv)) = accepted else {
            converged = true;
            break;
        };

        let moved = (na - a).abs().max((nc - c).abs());
        a = na;
        c = nc;
        value = nv;
        if moved < config.tolerance {
            converged = true;
            break;
        }
    }

    let matrix = LocalExpectationMatrix::from_expectations(a, c);
    debug!(
        "Fitted local expectations: a={:.6}, c={:.6}, ll={:.6}, iterations={}, converged={}",
        a, c, value, iterations, converged
    );

    FitOutcome {
        matrix,
        prior: matrix.stationary(),
        log_likelihood: value,
        iterations,
        converged,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use veritas_core::AgentId;

    fn sample(weight: f64, belief: f64, meta: f64) -> Sample {
        Sample {
            agent_id: AgentId::new(),
            weight,
            raw_belief: belief,
            belief,
            meta,
        }
    }

    #[test]
    fn test_recovers_linear_meta_model() {
        // m = 0.3 + 0.4·b  =>  a = 0.3, c = 0.7
        let samples: Vec<Sample> = [0.1, 0.3, 0.5, 0.7, 0.9]
            .iter()
            .map(|&b| sample(0.2, b, 0.3 + 0.4 * b))
            .collect();
        let fit = fit_local_expectations(&samples, &DecomposerConfig::default());

        assert!(fit.converged);
        assert_abs_diff_eq!(fit.matrix.rows[0][1], 0.3, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.matrix.rows[1][1], 0.7, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.prior, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_unanimous_reports_give_flat_matrix() {
        let samples = vec![sample(0.5, 0.7, 0.7), sample(0.5, 0.7, 0.7)];
        let fit = fit_local_expectations(&samples, &DecomposerConfig::default());

        assert_abs_diff_eq!(fit.matrix.rows[0][1], 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.matrix.rows[1][1], 0.7, epsilon = 1e-6);
        assert_abs_diff_eq!(fit.prior, 0.7, epsilon = 1e-6);
    }

    #[test]
    fn test_rows_are_stochastic_at_extremes() {
        let samples = vec![
            sample(0.98, 1e-9, 1.0 - 1e-9),
            sample(0.01, 1.0 - 1e-9, 1e-9),
            sample(0.01, 0.5, 0.5),
        ];
        let fit = fit_local_expectations(&samples, &DecomposerConfig::default());

        assert!(fit.log_likelihood.is_finite());
        for row in fit.matrix.rows {
            assert!(row.iter().all(|x| (0.0..=1.0).contains(x)));
            assert_abs_diff_eq!(row[0] + row[1], 1.0, epsilon = 1e-9);
        }
        assert!((0.0..=1.0).contains(&fit.prior));
    }

    #[test]
    fn test_predicted_meta() {
        let samples: Vec<Sample> = [0.2, 0.8]
            .iter()
            .map(|&b| sample(0.5, b, 0.2 + 0.6 * b))
            .collect();
        let fit = fit_local_expectations(&samples, &DecomposerConfig::default());
        assert_abs_diff_eq!(fit.predicted_meta(0.2), 0.32, epsilon = 1e-3);
        assert_abs_diff_eq!(fit.predicted_meta(0.8), 0.68, epsilon = 1e-3);
    }
}
