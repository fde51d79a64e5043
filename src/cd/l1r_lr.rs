use rand::rngs::StdRng;
use std::time::Instant;

use super::{binary_labels, Solver, TINY};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

/// Default bound on the number of Newton iterations.
pub const DEFAULT_MAX_NEWTON_STEPS: usize = 100;

const MAX_INNER_STEPS: usize = 1000;
const MAX_LINE_SEARCH: usize = 20;
const SIGMA: f64 = 0.01;
// keeps the quadratic model strictly convex
const NU: f64 = 1e-12;

/// Newton method with coordinate descent subproblems for L1 regularized logistic regression.
///
/// Minimizes `‖w‖₁ + Σᵢ Cᵢ log(1 + exp(-yᵢwᵀxᵢ))`. Every Newton step builds a
/// quadratic model of the loss, solves the L1 regularized model by
/// coordinate descent and accepts the direction through a line search.
#[derive(Debug, Clone)]
pub struct L1rLr {
    /// Tolerance relative to the violation at the first Newton iteration
    pub eps: f64,
    /// Cost of positive instances
    pub cp: f64,
    /// Cost of negative instances
    pub cn: f64,
    /// Maximum number of Newton iterations
    pub max_steps: usize,
}

impl L1rLr {
    /// Creates a [`L1rLr`] solver.
    pub fn new(eps: f64, cp: f64, cn: f64) -> Self {
        L1rLr {
            eps,
            cp,
            cn,
            max_steps: DEFAULT_MAX_NEWTON_STEPS,
        }
    }

    /// Sets the maximum number of Newton iterations.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

/// Per instance quantities derived from `exp(wᵀxᵢ)`.
fn curvature(c: &[f64], exp_wtx: &[f64], tau: &mut [f64], d: &mut [f64]) {
    for i in 0..c.len() {
        let tau_tmp = 1.0 / (1.0 + exp_wtx[i]);
        tau[i] = c[i] * tau_tmp;
        d[i] = c[i] * exp_wtx[i] * tau_tmp * tau_tmp;
    }
}

impl Solver for L1rLr {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        let start = Instant::now();
        let l = prob.l();
        let n = prob.n();
        let y = binary_labels(prob.y());
        let c: Vec<f64> = y
            .iter()
            .map(|&yi| if yi > 0.0 { self.cp } else { self.cn })
            .collect();
        let xt = prob.transpose();
        let mut status = Status::new();

        w.fill(0.0);
        let mut wpd = vec![0.0; n];
        let mut w_norm = 0.0;
        let xjneg_sum: Vec<f64> = (0..n)
            .map(|j| {
                xt.row(j)
                    .iter()
                    .filter(|&(i, _)| y[i] < 0.0)
                    .map(|(i, v)| c[i] * v)
                    .sum()
            })
            .collect();

        let mut exp_wtx = vec![1.0; l];
        let mut exp_wtx_new = vec![0.0; l];
        let mut tau = vec![0.0; l];
        let mut d = vec![0.0; l];
        curvature(&c, &exp_wtx, &mut tau, &mut d);

        let mut grad = vec![0.0; n];
        let mut hdiag = vec![0.0; n];
        let mut xtd = vec![0.0; l];
        let mut index: Vec<usize> = (0..n).collect();

        let mut inner_eps = 1.0;
        let mut g_max_old = f64::INFINITY;
        let mut gnorm1_init = f64::NEG_INFINITY;
        let mut newton_step = 0;
        while newton_step < self.max_steps {
            let mut g_max_new: f64 = 0.0;
            let mut gnorm1_new = 0.0;
            let mut active_size = n;
            let bound = g_max_old / l as f64;

            let mut s = 0;
            while s < active_size {
                let j = index[s];
                hdiag[j] = NU;
                let mut tmp = 0.0;
                for (i, v) in xt.row(j).iter() {
                    hdiag[j] += v * v * d[i];
                    tmp += v * tau[i];
                }
                grad[j] = -tmp + xjneg_sum[j];

                let gp = grad[j] + 1.0;
                let gn = grad[j] - 1.0;
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
            }

            if newton_step == 0 {
                gnorm1_init = gnorm1_new;
            }
            status.violation = gnorm1_new;
            if gnorm1_new <= self.eps * gnorm1_init {
                status.code = StatusCode::Optimal;
                break;
            }

            // coordinate descent on the quadratic model, wpd holds w + d
            let mut qp_step = 0;
            let mut qp_g_max_old = f64::INFINITY;
            let mut qp_active_size = active_size;
            xtd.fill(0.0);
            while qp_step < MAX_INNER_STEPS {
                let mut qp_g_max_new: f64 = 0.0;
                let mut qp_gnorm1_new = 0.0;
                let qp_bound = qp_g_max_old / l as f64;

                shuffle_prefix(&mut index, qp_active_size, rng);

                let mut s = 0;
                while s < qp_active_size {
                    let j = index[s];
                    let col = xt.row(j);
                    let h = hdiag[j];
                    let mut g = grad[j] + (wpd[j] - w[j]) * NU;
                    for (i, v) in col.iter() {
                        g += v * d[i] * xtd[i];
                    }

                    let gp = g + 1.0;
                    let gn = g - 1.0;
                    let violation;
                    if wpd[j] == 0.0 {
                        if gp < 0.0 {
                            violation = -gp;
                        } else if gn > 0.0 {
                            violation = gn;
                        } else if gp > qp_bound && gn < -qp_bound {
                            qp_active_size -= 1;
                            index.swap(s, qp_active_size);
                            continue;
                        } else {
                            violation = 0.0;
                        }
                    } else if wpd[j] > 0.0 {
                        violation = gp.abs();
                    } else {
                        violation = gn.abs();
                    }
                    qp_g_max_new = qp_g_max_new.max(violation);
                    qp_gnorm1_new += violation;
                    s += 1;

                    let z = if gp < h * wpd[j] {
                        -gp / h
                    } else if gn > h * wpd[j] {
                        -gn / h
                    } else {
                        -wpd[j]
                    };
                    if z.abs() < TINY {
                        continue;
                    }
                    let z = z.clamp(-10.0, 10.0);
                    wpd[j] += z;
                    col.axpy(z, &mut xtd);
                }

                qp_step += 1;
                if qp_gnorm1_new <= inner_eps * gnorm1_init {
                    if qp_active_size == active_size {
                        break;
                    }
                    qp_active_size = active_size;
                    qp_g_max_old = f64::INFINITY;
                    continue;
                }
                qp_g_max_old = qp_g_max_new;
            }
            if qp_step >= MAX_INNER_STEPS {
                log::warn!("reaching max number of inner iterations");
            }

            let mut delta = 0.0;
            let mut w_norm_new = 0.0;
            for j in 0..n {
                delta += grad[j] * (wpd[j] - w[j]);
                w_norm_new += wpd[j].abs();
            }
            delta += w_norm_new - w_norm;

            let mut negsum_xtd: f64 = (0..l).filter(|&i| y[i] < 0.0).map(|i| c[i] * xtd[i]).sum();

            let mut searches = 0;
            while searches < MAX_LINE_SEARCH {
                let mut cond = w_norm_new - w_norm + negsum_xtd - SIGMA * delta;
                for i in 0..l {
                    let exp_xtd = xtd[i].exp();
                    exp_wtx_new[i] = exp_wtx[i] * exp_xtd;
                    cond += c[i] * ((1.0 + exp_wtx_new[i]) / (exp_xtd + exp_wtx_new[i])).ln();
                }

                if cond <= 0.0 {
                    w_norm = w_norm_new;
                    w.copy_from_slice(&wpd);
                    exp_wtx.copy_from_slice(&exp_wtx_new);
                    curvature(&c, &exp_wtx, &mut tau, &mut d);
                    break;
                }

                w_norm_new = 0.0;
                for j in 0..n {
                    wpd[j] = (w[j] + wpd[j]) * 0.5;
                    w_norm_new += wpd[j].abs();
                }
                delta *= 0.5;
                negsum_xtd *= 0.5;
                for t in xtd.iter_mut() {
                    *t *= 0.5;
                }
                searches += 1;
            }

            // exp(wᵀx) accumulated rounding errors, rebuild it from w
            if searches >= MAX_LINE_SEARCH {
                log::debug!("l1r lr: line search failed, recomputing exp(wTx)");
                let mut wtx = vec![0.0; l];
                for (j, &wj) in w.iter().enumerate() {
                    if wj != 0.0 {
                        xt.row(j).axpy(wj, &mut wtx);
                    }
                }
                for (e, t) in exp_wtx.iter_mut().zip(&wtx) {
                    *e = t.exp();
                }
            }

            if qp_step == 1 {
                inner_eps *= 0.25;
            }
            newton_step += 1;
            g_max_old = g_max_new;
            log::debug!(
                "iter {:3} #CD cycles {} violation {:5.3e}",
                newton_step,
                qp_step,
                gnorm1_new
            );
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations");
            status.code = StatusCode::MaxSteps;
        }

        let mut v: f64 = w.iter().map(|wj| wj.abs()).sum();
        for i in 0..l {
            v += if y[i] > 0.0 {
                c[i] * (1.0 + 1.0 / exp_wtx[i]).ln()
            } else {
                c[i] * (1.0 + exp_wtx[i]).ln()
            };
        }
        status.steps = newton_step;
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
