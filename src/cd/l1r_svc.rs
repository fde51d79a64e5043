use rand::rngs::StdRng;
use std::time::Instant;

use super::{binary_labels, Solver, DEFAULT_MAX_STEPS, TINY};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

const MAX_LINE_SEARCH: usize = 20;
const SIGMA: f64 = 0.01;

/// Primal coordinate descent for L1 regularized L2-loss support vector classification.
///
/// Minimizes `‖w‖₁ + Σᵢ Cᵢ max(0, 1 - yᵢwᵀxᵢ)²` one feature at a time. Each
/// coordinate takes a Newton step on the one-dimensional problem followed by
/// a backtracking line search, which is skipped whenever the cheap quadratic
/// upper bound already guarantees sufficient decrease.
#[derive(Debug, Clone)]
pub struct L1rSvc {
    /// Tolerance relative to the violation of the first sweep
    pub eps: f64,
    /// Cost of positive instances
    pub cp: f64,
    /// Cost of negative instances
    pub cn: f64,
    /// Maximum number of sweeps
    pub max_steps: usize,
}

impl L1rSvc {
    /// Creates a [`L1rSvc`] solver.
    pub fn new(eps: f64, cp: f64, cn: f64) -> Self {
        L1rSvc {
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
}

impl Solver for L1rSvc {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        let start = Instant::now();
        let l = prob.l();
        let n = prob.n();
        let y = binary_labels(prob.y());
        let c: Vec<f64> = y
            .iter()
            .map(|&yi| if yi > 0.0 { self.cp } else { self.cn })
            .collect();
        let mut status = Status::new();

        // columns of X with every entry multiplied by its label
        let mut xt = prob.transpose();
        for j in 0..n {
            xt.map_row(j, &mut |i, v| v * y[i])?;
        }

        w.fill(0.0);
        // b[i] = 1 - yᵢwᵀxᵢ
        let mut b = vec![1.0; l];
        let xj_sq: Vec<f64> = (0..n)
            .map(|j| xt.row(j).iter().map(|(i, v)| c[i] * v * v).sum())
            .collect();
        let mut index: Vec<usize> = (0..n).collect();
        let mut active_size = n;

        let mut g_max_old = f64::INFINITY;
        let mut gnorm1_init = f64::NEG_INFINITY;
        let mut step = 0;
        while step < self.max_steps {
            let mut g_max_new: f64 = 0.0;
            let mut gnorm1_new = 0.0;

            shuffle_prefix(&mut index, active_size, rng);

            let mut s = 0;
            while s < active_size {
                let j = index[s];
                let col = xt.row(j);

                let mut g_loss = 0.0;
                let mut h = 0.0;
                for (i, v) in col.iter() {
                    if b[i] > 0.0 {
                        let tmp = c[i] * v;
                        g_loss -= tmp * b[i];
                        h += tmp * v;
                    }
                }
                g_loss *= 2.0;
                let g = g_loss;
                let h = (2.0 * h).max(TINY);

                let gp = g + 1.0;
                let gn = g - 1.0;
                let bound = g_max_old / l as f64;
                let violation;
                if w[j] == 0.0 {
                    if gp < 0.0 {
                        violation = -gp;
                    } else if gn > 0.0 {
                        violation = gn;
                    } else if gp > bound && gn < -bound {
                        active_size -= 1;
                        index.swap(s, active_size);
                        continue;
                    } else {
                        violation = 0.0;
                    }
                } else if w[j] > 0.0 {
                    violation = gp.abs();
                } else {
                    violation = gn.abs();
                }

                g_max_new = g_max_new.max(violation);
                gnorm1_new += violation;
                s += 1;

                let mut d = if gp < h * w[j] {
                    -gp / h
                } else if gn > h * w[j] {
                    -gn / h
                } else {
                    -w[j]
                };
                if d.abs() < TINY {
                    continue;
                }

                let mut delta = (w[j] + d).abs() - w[j].abs() + g * d;
                let mut d_old = 0.0;
                let mut loss_old = 0.0;
                let mut searches = 0;
                while searches < MAX_LINE_SEARCH {
                    let d_diff = d_old - d;
                    let mut cond = (w[j] + d).abs() - w[j].abs() - SIGMA * delta;

                    let appxcond = xj_sq[j] * d * d + g_loss * d + cond;
                    if appxcond <= 0.0 {
                        col.axpy(d_diff, &mut b);
                        break;
                    }

                    let mut loss_new = 0.0;
                    for (i, v) in col.iter() {
                        if searches == 0 && b[i] > 0.0 {
                            loss_old += c[i] * b[i] * b[i];
                        }
                        b[i] += d_diff * v;
                        if b[i] > 0.0 {
                            loss_new += c[i] * b[i] * b[i];
                        }
                    }

                    cond += loss_new - loss_old;
                    if cond <= 0.0 {
                        break;
                    }
                    d_old = d;
                    d *= 0.5;
                    delta *= 0.5;
                    searches += 1;
                }

                w[j] += d;

                // b drifted from the accepted step, rebuild it from w
                if searches >= MAX_LINE_SEARCH {
                    log::debug!("l1r svc: line search failed on feature {j}, recomputing margins");
                    b.fill(1.0);
                    for (k, &wk) in w.iter().enumerate() {
                        if wk != 0.0 {
                            xt.row(k).axpy(-wk, &mut b);
                        }
                    }
                }
            }

            if step == 0 {
                gnorm1_init = gnorm1_new;
            }
            step += 1;
            status.violation = gnorm1_new;

            if gnorm1_new <= self.eps * gnorm1_init {
                if active_size == n {
                    status.code = StatusCode::Optimal;
                    break;
                }
                log::trace!("l1r svc: resetting shrunk active set");
                active_size = n;
                g_max_old = f64::INFINITY;
                continue;
            }
            g_max_old = g_max_new;
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations");
            status.code = StatusCode::MaxSteps;
        }

        let mut v: f64 = w.iter().map(|wj| wj.abs()).sum();
        for i in 0..l {
            if b[i] > 0.0 {
                v += c[i] * b[i] * b[i];
            }
        }
        status.steps = step;
        status.value = v;
        status.nonzero = w.iter().filter(|&&wj| wj != 0.0).count();
        status.time = start.elapsed().as_secs_f64();
        log::info!(
            "optimization finished, #iter = {}, objective value = {:.6}, #nonzeros/#features = {}/{}",
            status.steps,
            status.value,
            status.nonzero,
            n
        );
        Ok(status)
    }
}
