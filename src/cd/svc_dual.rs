use rand::rngs::StdRng;
use std::time::Instant;

use super::{binary_labels, squared_norm, DualLoss, Solver, DEFAULT_MAX_STEPS, TINY};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

/// Dual coordinate descent for L2 regularized L1/L2-loss support vector classification.
///
/// Solves `min_α ½ αᵀQα - eᵀα` with `0 ≤ αᵢ ≤ Uᵢ`, where
/// `Q = yᵢyⱼxᵢᵀxⱼ + Dᵢᵢ`. For the L1 loss `D = 0` and `Uᵢ = Cᵢ`, for the L2
/// loss `Dᵢᵢ = 1 / (2Cᵢ)` and `Uᵢ = ∞`. Labels are `+1` for `y > 0` and `-1`
/// otherwise.
#[derive(Debug, Clone)]
pub struct SvcDual {
    /// Tolerance on the projected gradient gap
    pub eps: f64,
    /// Cost of positive instances
    pub cp: f64,
    /// Cost of negative instances
    pub cn: f64,
    /// Loss function
    pub loss: DualLoss,
    /// Maximum number of sweeps
    pub max_steps: usize,
}

impl SvcDual {
    /// Creates a [`SvcDual`] solver.
    pub fn new(eps: f64, cp: f64, cn: f64, loss: DualLoss) -> Self {
        SvcDual {
            eps,
            cp,
            cn,
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
        let y = binary_labels(prob.y());
        let mut status = Status::new();

        // indexed by class: 0 for negative, 1 for positive instances
        let (diag, upper) = match self.loss {
            DualLoss::L2 => ([0.5 / self.cn, 0.5 / self.cp], [f64::INFINITY; 2]),
            DualLoss::L1 => ([0.0; 2], [self.cn, self.cp]),
        };
        let class = |i: usize| usize::from(y[i] > 0.0);

        let mut alpha = vec![0.0; l];
        w.fill(0.0);
        let qd: Vec<f64> = (0..l).map(|i| diag[class(i)] + x.squared_norm(i)).collect();
        let mut index: Vec<usize> = (0..l).collect();
        let mut active_size = l;

        let mut pg_max_old = f64::INFINITY;
        let mut pg_min_old = f64::NEG_INFINITY;
        let mut step = 0;
        while step < self.max_steps {
            let mut pg_max_new = f64::NEG_INFINITY;
            let mut pg_min_new = f64::INFINITY;

            shuffle_prefix(&mut index, active_size, rng);

            let mut s = 0;
            while s < active_size {
                let i = index[s];
                let yi = y[i];
                let ci = class(i);
                let ub = upper[ci];

                let g = yi * x.dot(i, w) - 1.0 + alpha[i] * diag[ci];

                let mut pg = 0.0;
                if alpha[i] == 0.0 {
                    if g > pg_max_old {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else if g < 0.0 {
                        pg = g;
                    }
                } else if alpha[i] == ub {
                    if g < pg_min_old {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else if g > 0.0 {
                        pg = g;
                    }
                } else {
                    pg = g;
                }

                pg_max_new = pg_max_new.max(pg);
                pg_min_new = pg_min_new.min(pg);

                if pg.abs() > TINY {
                    let alpha_old = alpha[i];
                    alpha[i] = (alpha[i] - g / qd[i]).max(0.0).min(ub);
                    x.axpy((alpha[i] - alpha_old) * yi, i, w);
                }
                s += 1;
            }

            step += 1;
            status.violation = pg_max_new - pg_min_new;

            if pg_max_new - pg_min_new <= self.eps {
                if active_size == l {
                    status.code = StatusCode::Optimal;
                    break;
                }
                log::trace!("svc dual: resetting shrunk active set");
                active_size = l;
                pg_max_old = f64::INFINITY;
                pg_min_old = f64::NEG_INFINITY;
                continue;
            }
            pg_max_old = if pg_max_new <= 0.0 {
                f64::INFINITY
            } else {
                pg_max_new
            };
            pg_min_old = if pg_min_new >= 0.0 {
                f64::NEG_INFINITY
            } else {
                pg_min_new
            };
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations, using a smaller eps or a different solver may help");
            status.code = StatusCode::MaxSteps;
        }

        let mut v = squared_norm(w);
        for i in 0..l {
            v += alpha[i] * (alpha[i] * diag[class(i)] - 2.0);
        }
        status.steps = step;
        status.value = v / 2.0;
        status.nonzero = alpha.iter().filter(|&&a| a > 0.0).count();
        status.time = start.elapsed().as_secs_f64();
        log::info!(
            "optimization finished, #iter = {}, objective value = {:.6}, nSV = {}",
            status.steps,
            status.value,
            status.nonzero
        );
        (status, alpha)
    }
}

impl Solver for SvcDual {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        Ok(self.solve_dual(prob, w, rng).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cd::testing::{blobs, combination};
    use crate::random::{seeded, DEFAULT_SEED};
    use approx::assert_abs_diff_eq;

    #[test]
    fn coefficients_stay_in_box() {
        let prob = blobs(60);
        for loss in [DualLoss::L1, DualLoss::L2] {
            let solver = SvcDual::new(0.01, 2.0, 0.5, loss);
            let mut w = vec![0.0; prob.n()];
            let (status, alpha) = solver.solve_dual(&prob, &mut w, &mut seeded(DEFAULT_SEED));
            assert!(status.is_optimal());
            for (i, &a) in alpha.iter().enumerate() {
                assert!(a >= 0.0);
                if loss == DualLoss::L1 {
                    let c = if prob.y()[i] > 0.0 { 2.0 } else { 0.5 };
                    assert!(a <= c);
                }
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
    }

    #[test]
    fn separates_the_blobs() {
        let prob = blobs(60);
        let solver = SvcDual::new(0.1, 1.0, 1.0, DualLoss::L2);
        let mut w = vec![0.0; prob.n()];
        let status = solver.solve(&prob, &mut w, &mut seeded(DEFAULT_SEED)).unwrap();
        assert!(status.nonzero > 0);
        let correct = (0..prob.l())
            .filter(|&i| prob.x().dot(i, &w) * prob.y()[i] > 0.0)
            .count();
        assert!(correct as f64 >= 0.7 * prob.l() as f64);
    }

    #[test]
    fn step_limit_is_reported() {
        let prob = blobs(40);
        let solver = SvcDual::new(1e-12, 1.0, 1.0, DualLoss::L1).with_max_steps(2);
        let mut w = vec![0.0; prob.n()];
        let status = solver.solve(&prob, &mut w, &mut seeded(1)).unwrap();
        assert_eq!(status.code, StatusCode::MaxSteps);
        assert_eq!(status.steps, 2);
    }
}
