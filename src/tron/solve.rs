use std::time::Instant;

use super::cg::trpcg;
use super::{dot, dot_m, Params};
use crate::objective::Objective;
use crate::status::{Status, StatusCode};

const ETA0: f64 = 1e-4;
const ETA1: f64 = 0.25;
const ETA2: f64 = 0.75;
const SIGMA1: f64 = 0.25;
const SIGMA2: f64 = 0.5;
const SIGMA3: f64 = 4.0;
// weight of the Hessian diagonal in the trust region metric
const PRECONDITIONER_WEIGHT: f64 = 0.01;

fn blend_preconditioner(m: &mut [f64]) {
    for mi in m.iter_mut() {
        *mi = (1.0 - PRECONDITIONER_WEIGHT) + PRECONDITIONER_WEIGHT * *mi;
    }
}

/// Minimizes `obj` starting from (and overwriting) `w`.
///
/// The tolerance is relative: the method stops once `‖∇f(w)‖ ≤ eps ‖∇f(0)‖`.
pub fn minimize(obj: &mut dyn Objective, w: &mut [f64], params: &Params) -> Status {
    let start = Instant::now();
    let n = obj.variable_count();
    let mut status = Status::new();

    let mut g = vec![0.0; n];
    let mut m = vec![0.0; n];
    let mut s = vec![0.0; n];
    let mut r = vec![0.0; n];
    let mut w_new = vec![0.0; n];

    // gradient norm at zero as reference
    let zero = vec![0.0; n];
    obj.value(&zero);
    obj.gradient(&zero, &mut g);
    let gnorm0 = dot(&g, &g).sqrt();

    let mut f = obj.value(w);
    obj.gradient(w, &mut g);
    let mut gnorm = dot(&g, &g).sqrt();
    status.value = f;
    status.violation = gnorm;

    if gnorm <= params.eps * gnorm0 {
        status.code = StatusCode::Optimal;
        status.nonzero = w.iter().filter(|&&wj| wj != 0.0).count();
        status.time = start.elapsed().as_secs_f64();
        return status;
    }

    obj.diagonal_preconditioner(&mut m);
    blend_preconditioner(&mut m);
    let mut delta = dot_m(&g, &m, &g).sqrt();

    let mut step: usize = 1;
    loop {
        if step > params.max_steps {
            log::warn!("reaching max number of Newton iterations");
            status.code = StatusCode::MaxSteps;
            break;
        }

        let cg = trpcg(&*obj, delta, &g, &m, params.eps_cg, &mut s, &mut r);

        for j in 0..n {
            w_new[j] = w[j] + s[j];
        }
        let gs = dot(&g, &s);
        let prered = -0.5 * (gs - dot(&s, &r));
        let fnew = obj.value(&w_new);
        let actred = f - fnew;

        let snorm = dot_m(&s, &m, &s).sqrt();
        if step == 1 {
            delta = delta.min(snorm);
        }

        let alpha = if fnew - f - gs <= 0.0 {
            SIGMA3
        } else {
            SIGMA1.max(-0.5 * (gs / (fnew - f - gs)))
        };

        if actred < ETA0 * prered {
            delta = (alpha * snorm).min(SIGMA2 * delta);
        } else if actred < ETA1 * prered {
            delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA2 * delta));
        } else if actred < ETA2 * prered {
            delta = (SIGMA1 * delta).max((alpha * snorm).min(SIGMA3 * delta));
        } else if cg.reach_boundary {
            delta *= SIGMA3;
        } else {
            delta = delta.max((alpha * snorm).min(SIGMA3 * delta));
        }

        log::debug!(
            "iter {:2} act {:5.3e} pre {:5.3e} delta {:5.3e} f {:5.3e} |g| {:5.3e} CG {:3}",
            step,
            actred,
            prered,
            delta,
            f,
            gnorm,
            cg.iterations
        );

        if actred > ETA0 * prered {
            step += 1;
            w.copy_from_slice(&w_new);
            f = fnew;
            obj.gradient(w, &mut g);
            obj.diagonal_preconditioner(&mut m);
            blend_preconditioner(&mut m);

            gnorm = dot(&g, &g).sqrt();
            if gnorm <= params.eps * gnorm0 {
                status.code = StatusCode::Optimal;
                break;
            }
        }
        if f < -1.0e+32 {
            log::warn!("f < -1.0e+32");
            status.code = StatusCode::Diverged;
            break;
        }
        if prered <= 0.0 {
            log::warn!("prered <= 0");
            status.code = StatusCode::NoStepPossible;
            break;
        }
        if actred.abs() <= 1.0e-12 * f.abs() && prered.abs() <= 1.0e-12 * f.abs() {
            log::warn!("actred and prered too small");
            status.code = StatusCode::Stagnated;
            break;
        }
    }

    status.steps = step - 1;
    status.value = f;
    status.violation = gnorm;
    status.nonzero = w.iter().filter(|&&wj| wj != 0.0).count();
    status.time = start.elapsed().as_secs_f64();
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::prelude::*;

    /// `½ wᵀAw - bᵀw` with a dense symmetric positive definite `A`
    struct Quadratic {
        a: Array2<f64>,
        b: Array1<f64>,
    }

    impl Objective for Quadratic {
        fn variable_count(&self) -> usize {
            self.b.len()
        }

        fn value(&mut self, w: &[f64]) -> f64 {
            let w = ArrayView1::from(w);
            0.5 * w.dot(&self.a.dot(&w)) - self.b.dot(&w)
        }

        fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
            let grad = self.a.dot(&ArrayView1::from(w)) - &self.b;
            g.copy_from_slice(grad.as_slice().unwrap());
        }

        fn hessian_vector_product(&self, s: &[f64], hs: &mut [f64]) {
            let prod = self.a.dot(&ArrayView1::from(s));
            hs.copy_from_slice(prod.as_slice().unwrap());
        }

        fn diagonal_preconditioner(&self, m: &mut [f64]) {
            for (j, mj) in m.iter_mut().enumerate() {
                *mj = self.a[(j, j)];
            }
        }
    }

    fn residual(q: &Quadratic, w: &[f64]) -> f64 {
        let r = q.a.dot(&ArrayView1::from(w)) - &q.b;
        r.dot(&r).sqrt()
    }

    #[test]
    fn solves_spd_quadratic() {
        let n = 6;
        let mut a = Array2::<f64>::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                a[(i, j)] = 1.0 / (1.0 + (i as f64 - j as f64).abs());
            }
            a[(i, i)] += n as f64;
        }
        let b = Array1::from_iter((0..n).map(|i| (i as f64) - 2.5));
        let mut q = Quadratic { a, b };
        let mut w = vec![0.0; n];
        let params = Params::new().with_eps(1e-4);
        let status = minimize(&mut q, &mut w, &params);

        assert_eq!(status.code, StatusCode::Optimal);
        assert!(status.steps < 50);
        let bnorm = q.b.dot(&q.b).sqrt();
        assert!(residual(&q, &w) <= 1e-4 * bnorm);
    }

    #[test]
    fn starts_optimal_at_solution() {
        let a = array![[2.0, 0.0], [0.0, 4.0]];
        let b = array![2.0, 4.0];
        let mut q = Quadratic { a, b };
        let mut w = vec![1.0, 1.0];
        let status = minimize(&mut q, &mut w, &Params::new());
        assert_eq!(status.code, StatusCode::Optimal);
        assert_eq!(status.steps, 0);
        assert_eq!(w, vec![1.0, 1.0]);
    }

    #[test]
    fn ill_conditioned_quadratic() {
        let a = array![[1e3, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1e-2]];
        let b = array![1.0, -1.0, 1.0];
        let mut q = Quadratic { a, b };
        let mut w = vec![0.0; 3];
        let status = minimize(&mut q, &mut w, &Params::new().with_eps(1e-4));
        assert!(status.is_optimal());
        assert!(residual(&q, &w) <= 1e-4 * 3f64.sqrt());
    }
}
