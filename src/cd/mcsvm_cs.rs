use rand::rngs::StdRng;
use std::time::Instant;

use super::{squared_norm, Solver, TINY};
use crate::error::Result;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::status::{Status, StatusCode};

/// Default bound on the number of sweeps of the multiclass solver.
pub const DEFAULT_MAX_CS_STEPS: usize = 100_000;

/// Dual coordinate descent for the multiclass SVM of Crammer and Singer.
///
/// The labels of the problem are class indices `0..nr_class`. Each instance
/// owns one dual variable per class; all of them are updated together by an
/// exactly solved subproblem. The weights are stored feature major, the
/// weight of feature `j` for class `m` sits at `w[j * nr_class + m]`.
#[derive(Debug, Clone)]
pub struct McsvmCs {
    /// Tolerance on the largest gradient gap of a sweep
    pub eps: f64,
    /// Cost of every class, its length is the number of classes
    pub weighted_c: Vec<f64>,
    /// Maximum number of sweeps
    pub max_steps: usize,
}

impl McsvmCs {
    /// Creates a [`McsvmCs`] solver for `weighted_c.len()` classes.
    pub fn new(eps: f64, weighted_c: Vec<f64>) -> Self {
        McsvmCs {
            eps,
            weighted_c,
            max_steps: DEFAULT_MAX_CS_STEPS,
        }
    }

    /// Sets the maximum number of sweeps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Number of classes.
    pub fn nr_class(&self) -> usize {
        self.weighted_c.len()
    }

    /// Solves the problem and additionally returns the dual variables,
    /// `alpha[i * nr_class + m]` belongs to instance `i` and class `m`.
    pub fn solve_dual(
        &self,
        prob: &Problem<'_>,
        w: &mut [f64],
        rng: &mut StdRng,
    ) -> (Status, Vec<f64>) {
        let start = Instant::now();
        let l = prob.l();
        let x = prob.x();
        let nr_class = self.nr_class();
        let class: Vec<usize> = prob.y().iter().map(|&yi| yi as usize).collect();
        let mut status = Status::new();

        let mut alpha = vec![0.0; l * nr_class];
        // per instance permutation of the classes, the active ones come first
        let mut alpha_index: Vec<usize> = (0..l).flat_map(|_| 0..nr_class).collect();
        let mut y_index = class.clone();
        let mut active_size_i = vec![nr_class; l];
        let qd: Vec<f64> = (0..l).map(|i| x.squared_norm(i)).collect();
        let mut index: Vec<usize> = (0..l).collect();
        let mut active_size = l;
        w.fill(0.0);

        let mut g = vec![0.0; nr_class];
        let mut b = vec![0.0; nr_class];
        let mut alpha_new = vec![0.0; nr_class];
        let mut changed: Vec<(usize, f64)> = Vec::with_capacity(nr_class);

        let mut eps_shrink = (10.0 * self.eps).max(1.0);
        let mut start_from_all = true;
        let mut step = 0;
        while step < self.max_steps {
            let mut stopping = f64::NEG_INFINITY;

            shuffle_prefix(&mut index, active_size, rng);

            let mut s = 0;
            while s < active_size {
                let i = index[s];
                let qdi = qd[i];
                if qdi <= 0.0 {
                    s += 1;
                    continue;
                }
                let base = i * nr_class;
                let ci = self.weighted_c[class[i]];
                let mut yi = y_index[i];
                let mut asi = active_size_i[i];

                g[..asi].fill(1.0);
                if yi < asi {
                    g[yi] = 0.0;
                }
                for (j, v) in x.row(i).iter() {
                    let wj = &w[j * nr_class..(j + 1) * nr_class];
                    for m in 0..asi {
                        g[m] += wj[alpha_index[base + m]] * v;
                    }
                }

                let mut min_g = f64::INFINITY;
                let mut max_g = f64::NEG_INFINITY;
                for m in 0..asi {
                    if alpha[base + alpha_index[base + m]] < 0.0 && g[m] < min_g {
                        min_g = g[m];
                    }
                    max_g = max_g.max(g[m]);
                }
                if yi < asi && alpha[base + class[i]] < ci && g[yi] < min_g {
                    min_g = g[yi];
                }

                let shrinkable = |m: usize, yi: usize, alpha_m: f64, g_m: f64| {
                    let bound = if m == yi { ci } else { 0.0 };
                    alpha_m == bound && g_m < min_g
                };
                let mut m = 0;
                while m < asi {
                    if shrinkable(m, yi, alpha[base + alpha_index[base + m]], g[m]) {
                        asi -= 1;
                        while asi > m {
                            if !shrinkable(asi, yi, alpha[base + alpha_index[base + asi]], g[asi]) {
                                alpha_index.swap(base + m, base + asi);
                                g.swap(m, asi);
                                if yi == asi {
                                    yi = m;
                                } else if yi == m {
                                    yi = asi;
                                }
                                break;
                            }
                            asi -= 1;
                        }
                    }
                    m += 1;
                }
                y_index[i] = yi;
                active_size_i[i] = asi;

                if asi <= 1 {
                    active_size -= 1;
                    index.swap(s, active_size);
                    continue;
                }
                s += 1;

                if max_g - min_g <= TINY {
                    continue;
                }
                stopping = stopping.max(max_g - min_g);

                for m in 0..asi {
                    b[m] = g[m] - qdi * alpha[base + alpha_index[base + m]];
                }
                solve_sub_problem(qdi, yi, ci, &b[..asi], &mut alpha_new[..asi]);

                changed.clear();
                for m in 0..asi {
                    let k = alpha_index[base + m];
                    let d = alpha_new[m] - alpha[base + k];
                    alpha[base + k] = alpha_new[m];
                    if d.abs() >= TINY {
                        changed.push((k, d));
                    }
                }
                for (j, v) in x.row(i).iter() {
                    let wj = &mut w[j * nr_class..(j + 1) * nr_class];
                    for &(k, d) in changed.iter() {
                        wj[k] += d * v;
                    }
                }
            }

            step += 1;
            status.violation = stopping;

            if stopping < eps_shrink {
                if stopping < self.eps && start_from_all {
                    status.code = StatusCode::Optimal;
                    break;
                }
                log::trace!("mcsvm cs: resetting shrunk active set");
                active_size = l;
                active_size_i.fill(nr_class);
                eps_shrink = (eps_shrink / 2.0).max(self.eps);
                start_from_all = true;
            } else {
                start_from_all = false;
            }
        }

        if status.code != StatusCode::Optimal {
            log::warn!("reaching max number of iterations");
            status.code = StatusCode::MaxSteps;
        }

        let mut v = 0.5 * squared_norm(w) + alpha.iter().sum::<f64>();
        for i in 0..l {
            v -= alpha[i * nr_class + class[i]];
        }
        status.steps = step;
        status.value = v;
        status.nonzero = alpha.iter().filter(|a| a.abs() > 0.0).count();
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

/// Solves the subproblem of one instance over its `b.len()` active classes.
///
/// `a` is the squared norm of the instance and `yi` the position of its
/// own class, which may lie outside the active ones.
fn solve_sub_problem(a: f64, yi: usize, c_yi: f64, b: &[f64], alpha_new: &mut [f64]) {
    let active = b.len();
    let mut d = b.to_vec();
    if yi < active {
        d[yi] += a * c_yi;
    }
    d.sort_by(|p, q| q.total_cmp(p));

    let mut beta = d[0] - a * c_yi;
    let mut r = 1;
    while r < active && beta < r as f64 * d[r] {
        beta += d[r];
        r += 1;
    }
    beta /= r as f64;

    for (m, (am, bm)) in alpha_new.iter_mut().zip(b).enumerate() {
        let bound = if m == yi { c_yi } else { 0.0 };
        *am = bound.min((beta - bm) / a);
    }
}

impl Solver for McsvmCs {
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status> {
        Ok(self.solve_dual(prob, w, rng).0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{MatrixKind, Node};
    use crate::random::{seeded, DEFAULT_SEED};
    use approx::assert_abs_diff_eq;

    /// Three well separated groups in the plane, labelled `0`, `1` and `2`.
    fn three_groups(l: usize) -> Problem<'static> {
        let centers = [(3.0, 0.0), (0.0, 3.0), (-2.5, -2.5)];
        let mut rows = Vec::with_capacity(l);
        let mut y = Vec::with_capacity(l);
        for i in 0..l {
            let k = i % 3;
            let t = i as f64;
            let (cx, cy) = centers[k];
            rows.push(vec![
                Node::new(0, cx + 0.5 * (t * 1.7).sin()),
                Node::new(1, cy + 0.5 * (t * 2.3).cos()),
            ]);
            y.push(k as f64);
        }
        Problem::from_rows(y, &rows, 2, 1.0, MatrixKind::Nodes).unwrap()
    }

    #[test]
    fn dual_variables_are_feasible() {
        let prob = three_groups(30);
        let c = vec![1.0, 0.5, 2.0];
        let solver = McsvmCs::new(0.01, c.clone());
        let n = prob.n();
        let mut w = vec![0.0; n * 3];
        let (status, alpha) = solver.solve_dual(&prob, &mut w, &mut seeded(DEFAULT_SEED));
        assert!(status.is_optimal());

        let mut w_ref = vec![0.0; n * 3];
        for i in 0..prob.l() {
            let yi = prob.y()[i] as usize;
            let a = &alpha[i * 3..(i + 1) * 3];
            assert_abs_diff_eq!(a.iter().sum::<f64>(), 0.0, epsilon = 1e-8);
            for (m, &am) in a.iter().enumerate() {
                if m == yi {
                    assert!(am <= c[yi] + 1e-12);
                } else {
                    assert!(am <= 0.0);
                }
                for (j, v) in prob.x().row(i).iter() {
                    w_ref[j * 3 + m] += am * v;
                }
            }
        }
        for (wj, rj) in w.iter().zip(&w_ref) {
            assert_abs_diff_eq!(*wj, *rj, epsilon = 1e-9);
        }
    }

    #[test]
    fn classifies_separated_groups() {
        let prob = three_groups(30);
        let solver = McsvmCs::new(0.1, vec![1.0; 3]);
        let mut w = vec![0.0; prob.n() * 3];
        solver.solve(&prob, &mut w, &mut seeded(DEFAULT_SEED)).unwrap();

        for i in 0..prob.l() {
            let mut dec = [0.0; 3];
            for (j, v) in prob.x().row(i).iter() {
                for (m, dm) in dec.iter_mut().enumerate() {
                    *dm += w[j * 3 + m] * v;
                }
            }
            let best = (1..3).fold(0, |best, m| if dec[m] > dec[best] { m } else { best });
            assert_eq!(best, prob.y()[i] as usize);
        }
    }

    #[test]
    fn sub_problem_keeps_sum_zero() {
        let b = [-0.5, 0.3, 1.2];
        let mut alpha = [0.0; 3];
        solve_sub_problem(2.0, 1, 1.0, &b, &mut alpha);
        assert_abs_diff_eq!(alpha.iter().sum::<f64>(), 0.0, epsilon = 1e-12);
        assert!(alpha[1] <= 1.0);
        assert!(alpha[0] <= 0.0 && alpha[2] <= 0.0);
    }
}
