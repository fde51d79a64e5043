use rand::rngs::StdRng;
use std::time::Instant;

use super::{squared_norm, DualLoss, Solver, DEFAULT_MAX_STEPS, TINY};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

/// Dual coordinate descent for L2 regularized L1/L2-loss support vector regression.
///
/// Solves `min_β ½ βᵀQβ - yᵀβ + p‖β‖₁ + ½λ‖β‖²` with `-U ≤ βᵢ ≤ U` and
/// `Q = XXᵀ`. For the L1 loss `λ = 0, U = C`, for the L2 loss
/// `λ = 1 / (2C), U = ∞`.
#[derive(Debug, Clone)]
pub struct SvrDual {
    /// Tolerance relative to the violation of the first sweep
    pub eps: f64,
    /// Cost parameter
    pub c: f64,
    /// Width of the insensitive tube
    pub p: f64,
    /// Loss function
    pub loss: DualLoss,
    /// Maximum number of sweeps
    pub max_steps: usize,
}

impl SvrDual {
    /// Creates a [`SvrDual`] solver.
    pub fn new(eps: f64, c: f64, p: f64, loss: DualLoss) -> Self {
        SvrDual {
            eps,
            c,
            p,
            loss,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Sets the maximum number of sweeps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Solves the problem and additionally returns the dual coefficients.
    pub fn solve_dual(
        &self,
        prob: &Problem<'_>,
        w: &mut [f64],
        rng: &mut StdRng,
    ) -> (Status, Vec<f64>) {
        let start = Instant::now();
        let l = prob.l();
        let x = prob.x();
        let y = prob.y();
        let p = self.p;
        let mut status = Status::new();

        let (lambda, upper) = match self.loss {
            DualLoss::L2 => (0.5 / self.c, f64::INFINITY),
            DualLoss::L1 => (0.0, self.c),
        };

        let mut beta = vec![0.0; l];
        w.fill(0.0);
        let qd: Vec<f64> = (0..l).map(|i| x.squared_norm(i)).collect();
        let mut index: Vec<usize> = (0..l).collect();
        let mut active_size = l;

        let mut g_max_old = f64::INFINITY;
        let mut gnorm1_init = f64::NEG_INFINITY;
        let mut step = 0;
        while step < self.max_steps {
            let mut g_max_new: f64 = 0.0;
            let mut gnorm1_new = 0.0;

            shuffle_prefix(&mut index, active_size, rng);

            let mut s = 0;
            while s < active_size {
                let i = index[s];
                let g = -y[i] + lambda * beta[i] + x.dot(i, w);
                let h = qd[i] + lambda;
                let gp = g + p;
                let gn = g - p;

                let violation;
                if beta[i] == 0.0 {
                    if gp < 0.0 {
                        violation = -gp;
                    } else if gn > 0.0 {
                        violation = gn;
                    } else if gp > g_max_old && gn < -g_max_old {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else {
                        violation = 0.0;
                    }
                } else if beta[i] >= upper {
                    if gp > 0.0 {
                        violation = gp;
                    } else if gp < -g_max_old {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else {
                        violation = 0.0;
                    }
                } else if beta[i] <= -upper {
                    if gn < 0.0 {
                        violation = -gn;
                    } else if gn > g_max_old {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else {
                        violation = 0.0;
                    }
                } else if beta[i] > 0.0 {
                    violation = gp.abs();
                } else {
                    violation = gn.abs();
                }

                g_max_new = g_max_new.max(violation);
                gnorm1_new += violation;

                // Newton direction of the piecewise quadratic
                let d = if gp < h * beta[i] {
                    -gp / h
                } else if gn > h * beta[i] {
                    -gn / h
                } else {
                    -beta[i]
                };
                s += 1;
                if d.abs() < TINY {
                    continue;
                }

                let beta_old = beta[i];
                beta[i] = (beta[i] + d).max(-upper).min(upper);
                let d = beta[i] - beta_old;
                if d != 0.0 {
                    x.axpy(d, i, w);
                }
            }

            if step == 0 {
                gnorm1_init = gnorm1_new;
            }
            step += 1;
            status.violation = gnorm1_new;

            if gnorm1_new <= self.eps * gnorm1_init {
                if active_size == l {
                    status.code = StatusCode::Optimal;
                    break;
                }
                log::trace!("svr dual: resetting shrunk active set");
                active_size = l;
                g_max_old = f64::INFINITY;
                continue;
            }
            g_max_old = g_max_new;
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations, using a smaller eps or a different solver may help");
            status.code = StatusCode::MaxSteps;
        }

        let mut v = squared_norm(w) / 2.0;
        for i in 0..l {
            v += p * beta[i].abs() - y[i] * beta[i] + 0.5 * lambda * beta[i] * beta[i];
        }
        status.steps = step;
        status.value = v;
        status.nonzero = beta.iter().filter(|&&b| b != 0.0).count();
        status.time = start.elapsed().as_secs_f64();
        log::info!(
            "optimization finished, #iter = {}, objective value = {:.6}, nSV = {}",
            status.steps,
            status.value,
            status.nonzero
        );
        (status, beta)
    }
}

impl Solver for SvrDual {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        Ok(self.solve_dual(prob, w, rng).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cd::testing::{combination, linear_targets};
    use crate::random::{seeded, DEFAULT_SEED};
    use approx::assert_abs_diff_eq;

    #[test]
    fn coefficients_stay_in_symmetric_box() {
        let prob = linear_targets(50);
        for loss in [DualLoss::L1, DualLoss::L2] {
            let solver = SvrDual::new(0.01, 0.5, 0.1, loss);
            let mut w = vec![0.0; prob.n()];
            let (status, beta) = solver.solve_dual(&prob, &mut w, &mut seeded(DEFAULT_SEED));
            assert!(status.is_optimal());
            if loss == DualLoss::L1 {
                assert!(beta.iter().all(|b| b.abs() <= 0.5));
            }
            let w_ref = combination(&prob, &beta);
            for (wj, rj) in w.iter().zip(&w_ref) {
                assert_abs_diff_eq!(*wj, *rj, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn recovers_linear_trend() {
        let prob = linear_targets(80);
        let solver = SvrDual::new(0.001, 10.0, 0.05, DualLoss::L2);
        let mut w = vec![0.0; prob.n()];
        solver.solve(&prob, &mut w, &mut seeded(DEFAULT_SEED)).unwrap();
        assert_abs_diff_eq!(w[0], 2.0, epsilon = 0.2);
        assert_abs_diff_eq!(w[1], -1.0, epsilon = 0.2);
    }
}
