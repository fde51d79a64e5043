//! Twice differentiable objectives minimized by [`crate::tron`]
//!
//! All objectives are L2 regularized empirical risks
//! `f(w) = ½ wᵀw + Σᵢ Cᵢ ℓ(xᵢᵀw, yᵢ)` built from a per-instance [`Loss`].
use crate::matrix::SparseMatrix;

mod logistic;
mod squared_hinge;

pub use logistic::Logistic;
pub use squared_hinge::{SquaredHinge, SquaredInsensitive};

/// Interface of an objective as seen by a second-order solver.
///
/// `gradient` has to be called with the point last passed to `value`, and
/// the Hessian related quantities refer to the point of the last `gradient`
/// call.
pub trait Objective {
    /// Number of variables.
    fn variable_count(&self) -> usize;
    /// Computes the objective value at `w`.
    fn value(&mut self, w: &[f64]) -> f64;
    /// Computes the gradient at `w` into `g`.
    fn gradient(&mut self, w: &[f64], g: &mut [f64]);
    /// Computes the (generalized) Hessian times `s` into `hs`.
    fn hessian_vector_product(&self, s: &[f64], hs: &mut [f64]);
    /// Computes the diagonal of the Hessian into `m`.
    fn diagonal_preconditioner(&self, m: &mut [f64]);
}

/// Loss of one instance in terms of its decision value `t` and target `y`.
pub trait Loss {
    /// Computes the loss function.
    fn loss(&self, t: f64, y: f64) -> f64;
    /// Computes the first derivative of the loss function with respect to `t`.
    fn d_loss(&self, t: f64, y: f64) -> f64;
    /// Computes the (generalized) second derivative of the loss function with respect to `t`.
    fn d2_loss(&self, t: f64, y: f64) -> f64;
}

/// L2 regularized risk of a [`Loss`] over a training set with per-instance costs.
pub struct Regularized<'p, L> {
    loss: L,
    x: &'p dyn SparseMatrix,
    y: &'p [f64],
    c: Vec<f64>,
    // decision values of the last `value` call
    z: Vec<f64>,
    // Cᵢ ℓ''ᵢ of the last `gradient` call
    d: Vec<f64>,
}

impl<'p, L: Loss> Regularized<'p, L> {
    /// Creates the objective for features `x`, targets `y` and costs `c`.
    pub fn new(loss: L, x: &'p dyn SparseMatrix, y: &'p [f64], c: Vec<f64>) -> Self {
        let l = y.len();
        Regularized {
            loss,
            x,
            y,
            c,
            z: vec![0.0; l],
            d: vec![0.0; l],
        }
    }
}

impl<L: Loss> Objective for Regularized<'_, L> {
    fn variable_count(&self) -> usize {
        self.x.col_count()
    }

    fn value(&mut self, w: &[f64]) -> f64 {
        let mut f: f64 = w.iter().map(|wj| wj * wj).sum::<f64>() / 2.0;
        for i in 0..self.y.len() {
            let zi = self.x.dot(i, w);
            self.z[i] = zi;
            f += self.c[i] * self.loss.loss(zi, self.y[i]);
        }
        f
    }

    fn gradient(&mut self, w: &[f64], g: &mut [f64]) {
        g.copy_from_slice(w);
        for i in 0..self.y.len() {
            let (zi, yi, ci) = (self.z[i], self.y[i], self.c[i]);
            self.d[i] = ci * self.loss.d2_loss(zi, yi);
            let gi = ci * self.loss.d_loss(zi, yi);
            if gi != 0.0 {
                self.x.axpy(gi, i, g);
            }
        }
    }

    fn hessian_vector_product(&self, s: &[f64], hs: &mut [f64]) {
        hs.copy_from_slice(s);
        for (i, &di) in self.d.iter().enumerate() {
            if di == 0.0 {
                continue;
            }
            let xs = self.x.dot(i, s);
            self.x.axpy(di * xs, i, hs);
        }
    }

    fn diagonal_preconditioner(&self, m: &mut [f64]) {
        m.fill(1.0);
        for (i, &di) in self.d.iter().enumerate() {
            if di == 0.0 {
                continue;
            }
            for (j, xij) in self.x.row(i) {
                m[j] += di * xij * xij;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{create, MatrixKind};
    use approx::assert_abs_diff_eq;

    fn sample() -> Box<dyn SparseMatrix> {
        let mut x = create(MatrixKind::Compressed, 4, 3);
        x.load_row(0, &[0, 2], &[1.0, 1.0]).unwrap();
        x.load_row(1, &[1, 2], &[-2.0, 1.0]).unwrap();
        x.load_row(2, &[0, 1], &[0.5, 1.5]).unwrap();
        x.load_row(3, &[2], &[1.0]).unwrap();
        x
    }

    // compares the analytic gradient with central differences
    fn check_gradient(obj: &mut dyn Objective, w: &[f64]) {
        let n = obj.variable_count();
        let mut g = vec![0.0; n];
        obj.value(w);
        obj.gradient(w, &mut g);
        let h = 1e-6;
        for j in 0..n {
            let mut wp = w.to_vec();
            let mut wm = w.to_vec();
            wp[j] += h;
            wm[j] -= h;
            let fd = (obj.value(&wp) - obj.value(&wm)) / (2.0 * h);
            assert_abs_diff_eq!(g[j], fd, epsilon = 1e-5);
        }
    }

    #[test]
    fn gradients_match_finite_differences() {
        let x = sample();
        let y = [1.0, -1.0, 1.0, -1.0];
        let c = vec![1.0, 2.0, 0.5, 1.0];
        let w = [0.3, -0.2, 0.1];
        check_gradient(
            &mut Regularized::new(Logistic, x.as_ref(), &y, c.clone()),
            &w,
        );
        check_gradient(
            &mut Regularized::new(SquaredHinge, x.as_ref(), &y, c.clone()),
            &w,
        );
        let t = [0.5, -1.0, 2.0, 0.0];
        check_gradient(
            &mut Regularized::new(SquaredInsensitive { p: 0.1 }, x.as_ref(), &t, c),
            &w,
        );
    }

    #[test]
    fn hessian_product_matches_gradient_change() {
        let x = sample();
        let y = [1.0, -1.0, 1.0, -1.0];
        let mut obj = Regularized::new(Logistic, x.as_ref(), &y, vec![1.0; 4]);
        let w = [0.2, 0.1, -0.3];
        let s = [1.0, -0.5, 0.25];
        let mut g0 = vec![0.0; 3];
        let mut hs = vec![0.0; 3];
        obj.value(&w);
        obj.gradient(&w, &mut g0);
        obj.hessian_vector_product(&s, &mut hs);

        let h = 1e-6;
        let w1: Vec<f64> = w.iter().zip(&s).map(|(wj, sj)| wj + h * sj).collect();
        let mut g1 = vec![0.0; 3];
        obj.value(&w1);
        obj.gradient(&w1, &mut g1);
        for j in 0..3 {
            assert_abs_diff_eq!((g1[j] - g0[j]) / h, hs[j], epsilon = 1e-4);
        }
    }

    #[test]
    fn preconditioner_only_counts_active_instances() {
        let x = sample();
        let y = [1.0, -1.0, 1.0, 1.0];
        let mut obj = Regularized::new(SquaredHinge, x.as_ref(), &y, vec![1.0; 4]);
        // instance 0 has margin 2 and 3 has margin 1, neither incurs loss
        let w = [1.0, 0.0, 1.0];
        let mut g = vec![0.0; 3];
        let mut m = vec![0.0; 3];
        obj.value(&w);
        obj.gradient(&w, &mut g);
        obj.diagonal_preconditioner(&mut m);
        // instance 1: -1 * (0 + 1) = -1 < 1, instance 2: 0.5 < 1
        assert_abs_diff_eq!(m[0], 1.0 + 2.0 * 0.25, epsilon = 1e-12);
        assert_abs_diff_eq!(m[1], 1.0 + 2.0 * (4.0 + 2.25), epsilon = 1e-12);
        assert_abs_diff_eq!(m[2], 1.0 + 2.0 * 1.0, epsilon = 1e-12);
    }
}
