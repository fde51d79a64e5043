use rand::rngs::StdRng;
use std::time::Instant;

use super::{binary_labels, squared_norm, Solver, DEFAULT_MAX_STEPS};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

const MAX_INNER_STEPS: usize = 100;
const INNER_EPS: f64 = 1e-2;
const INNER_EPS_MIN: f64 = 1e-8;

/// Dual coordinate descent for L2 regularized logistic regression.
///
/// Every instance owns the pair `(αᵢ, Cᵢ - αᵢ)`; the one-variable
/// subproblems carry an entropy term and are solved by a damped Newton
/// method whose tolerance tightens while the outer sweeps get cheap.
#[derive(Debug, Clone)]
pub struct LrDual {
    /// Tolerance on the largest subproblem gradient
    pub eps: f64,
    /// Cost of positive instances
    pub cp: f64,
    /// Cost of negative instances
    pub cn: f64,
    /// Maximum number of sweeps
    pub max_steps: usize,
}

impl LrDual {
    /// Creates a [`LrDual`] solver.
    pub fn new(eps: f64, cp: f64, cn: f64) -> Self {
        LrDual {
            eps,
            cp,
            cn,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Sets the maximum number of sweeps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Solves the problem and additionally returns `αᵢ` (the first variable of each pair).
    pub fn solve_dual(
        &self,
        prob: &Problem<'_>,
        w: &mut [f64],
        rng: &mut StdRng,
    ) -> (Status, Vec<f64>) {
        let start = Instant::now();
        let l = prob.l();
        let x = prob.x();
        let y = binary_labels(prob.y());
        let upper = |i: usize| if y[i] > 0.0 { self.cp } else { self.cn };
        let mut status = Status::new();

        let mut inner_eps = INNER_EPS;
        let inner_eps_min = INNER_EPS_MIN.min(self.eps);

        // alpha[2i] + alpha[2i + 1] = C_i, both kept strictly inside (0, C_i)
        let mut alpha = vec![0.0; 2 * l];
        w.fill(0.0);
        let mut xtx = vec![0.0; l];
        for i in 0..l {
            let c = upper(i);
            alpha[2 * i] = (0.001 * c).min(1e-8);
            alpha[2 * i + 1] = c - alpha[2 * i];
            xtx[i] = x.squared_norm(i);
            x.axpy(y[i] * alpha[2 * i], i, w);
        }
        let mut index: Vec<usize> = (0..l).collect();

        let mut step = 0;
        while step < self.max_steps {
            shuffle_prefix(&mut index, l, rng);
            let mut newton_steps = 0;
            let mut g_max: f64 = 0.0;
            for &i in index.iter() {
                let yi = y[i];
                let c = upper(i);
                let a = xtx[i];
                let b = yi * x.dot(i, w);

                // pick the variable whose subproblem is solved
                let (ind1, ind2, sign) = if 0.5 * a * (alpha[2 * i + 1] - alpha[2 * i]) + b < 0.0 {
                    (2 * i + 1, 2 * i, -1.0)
                } else {
                    (2 * i, 2 * i + 1, 1.0)
                };

                let alpha_old = alpha[ind1];
                let mut z = alpha_old;
                if c - z < 0.5 * c {
                    z *= 0.1;
                }
                let mut gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                g_max = g_max.max(gp.abs());

                let mut inner = 0;
                while inner <= MAX_INNER_STEPS {
                    if gp.abs() < inner_eps {
                        break;
                    }
                    let gpp = a + c / (c - z) / z;
                    let tmpz = z - gp / gpp;
                    if tmpz <= 0.0 {
                        z *= 0.1;
                    } else {
                        z = tmpz;
                    }
                    gp = a * (z - alpha_old) + sign * b + (z / (c - z)).ln();
                    newton_steps += 1;
                    inner += 1;
                }

                if inner > 0 {
                    alpha[ind1] = z;
                    alpha[ind2] = c - z;
                    x.axpy(sign * (z - alpha_old) * yi, i, w);
                }
            }

            step += 1;
            status.violation = g_max;
            if g_max < self.eps {
                status.code = StatusCode::Optimal;
                break;
            }
            if newton_steps <= l / 10 {
                inner_eps = inner_eps_min.max(0.1 * inner_eps);
                log::trace!("lr dual: inner tolerance lowered to {inner_eps:e}");
            }
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations, using a smaller eps or a different solver may help");
            status.code = StatusCode::MaxSteps;
        }

        let mut v = squared_norm(w) / 2.0;
        for i in 0..l {
            let c = upper(i);
            v += alpha[2 * i] * alpha[2 * i].ln() + alpha[2 * i + 1] * alpha[2 * i + 1].ln()
                - c * c.ln();
        }
        status.steps = step;
        status.value = v;
        status.nonzero = l;
        status.time = start.elapsed().as_secs_f64();
        log::info!(
            "optimization finished, #iter = {}, objective value = {:.6}",
            status.steps,
            status.value
        );
        let first = alpha.iter().step_by(2).copied().collect();
        (status, first)
    }
}

impl Solver for LrDual {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        Ok(self.solve_dual(prob, w, rng).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cd::testing::{blobs, combination};
    use crate::objective::{Logistic, Objective, Regularized};
    use crate::random::{seeded, DEFAULT_SEED};
    use approx::assert_abs_diff_eq;

    #[test]
    fn coefficients_stay_inside_interval() {
        let prob = blobs(50);
        let solver = LrDual::new(0.01, 1.5, 0.5);
        let mut w = vec![0.0; prob.n()];
        let (status, alpha) = solver.solve_dual(&prob, &mut w, &mut seeded(DEFAULT_SEED));
        assert!(status.is_optimal());
        for (i, &a) in alpha.iter().enumerate() {
            let c = if prob.y()[i] > 0.0 { 1.5 } else { 0.5 };
            assert!(a > 0.0 && a < c);
        }
        let signed: Vec<f64> = alpha
            .iter()
            .zip(prob.y())
            .map(|(a, &yi)| if yi > 0.0 { *a } else { -a })
            .collect();
        let w_ref = combination(&prob, &signed);
        for (wj, rj) in w.iter().zip(&w_ref) {
            assert_abs_diff_eq!(*wj, *rj, epsilon = 1e-9);
        }
    }

    #[test]
    fn primal_gradient_is_small() {
        let prob = blobs(50);
        let solver = LrDual::new(1e-4, 1.0, 1.0);
        let mut w = vec![0.0; prob.n()];
        solver.solve(&prob, &mut w, &mut seeded(DEFAULT_SEED)).unwrap();

        let mut obj = Regularized::new(Logistic, prob.x(), prob.y(), vec![1.0; prob.l()]);
        let mut g = vec![0.0; prob.n()];
        obj.value(&w);
        obj.gradient(&w, &mut g);
        let gnorm = g.iter().map(|gj| gj * gj).sum::<f64>().sqrt();
        assert!(gnorm < 1e-2);
    }
}
