//! Coordinate descent solvers
//!
//! Every solver sweeps its variables in a freshly shuffled order, shrinks
//! variables that sit at a bound without violating optimality and stops once
//! the violation of the sweep drops below the tolerance. A shrunk active set
//! is reset to the full set before the solver is allowed to stop.
use rand::rngs::StdRng;

use crate::error::Result;
use crate::problem::Problem;
use crate::status::Status;

mod l1r_lr;
mod l1r_svc;
mod lr_dual;
mod mcsvm_cs;
mod svc_dual;
mod svr_dual;

pub use l1r_lr::{L1rLr, DEFAULT_MAX_NEWTON_STEPS};
pub use l1r_svc::L1rSvc;
pub use lr_dual::LrDual;
pub use mcsvm_cs::{McsvmCs, DEFAULT_MAX_CS_STEPS};
pub use svc_dual::SvcDual;
pub use svr_dual::SvrDual;

/// Default bound on the number of outer iterations.
pub const DEFAULT_MAX_STEPS: usize = 1000;

// updates smaller than this are skipped
const TINY: f64 = 1e-12;

/// Loss of the dual SVM and SVR solvers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DualLoss {
    /// Hinge (or ε-insensitive) loss, box constrained dual.
    L1,
    /// Squared hinge (or squared ε-insensitive) loss, diagonal shifted dual.
    L2,
}

/// A coordinate descent solver producing primal weights.
pub trait Solver {
    /// Solves the training problem `prob` and writes the weights into `w`.
    ///
    /// `w` is overwritten; its length is the number of weights the solver
    /// produces (`n`, or `n * nr_class` for the multiclass solver). Numerical
    /// trouble is reported through the [`Status`], errors only come from
    /// the matrix layer.
    fn solve(&self, prob: &Problem<'_>, w: &mut [f64], rng: &mut StdRng) -> Result<Status>;
}

fn binary_labels(y: &[f64]) -> Vec<f64> {
    y.iter().map(|&yi| if yi > 0.0 { 1.0 } else { -1.0 }).collect()
}

fn squared_norm(w: &[f64]) -> f64 {
    w.iter().map(|wj| wj * wj).sum()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::matrix::{MatrixKind, Node};
    use crate::problem::Problem;

    /// Two noisy Gaussian-like blobs in three dimensions plus a bias column.
    pub fn blobs(l: usize) -> Problem<'static> {
        let mut rows = Vec::with_capacity(l);
        let mut y = Vec::with_capacity(l);
        for i in 0..l {
            let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
            let t = i as f64;
            let jitter = |k: f64| ((t * 12.9898 + k * 78.233).sin() * 43758.5453).fract();
            rows.push(vec![
                Node::new(0, sign * 1.0 + jitter(1.0)),
                Node::new(1, sign * 0.5 + jitter(2.0)),
                Node::new(2, jitter(3.0)),
            ]);
            // flip a few labels so the data is not separable
            let flip = i % 7 == 3;
            y.push(if flip { -sign } else { sign });
        }
        Problem::from_rows(y, &rows, 3, 1.0, MatrixKind::Compressed).unwrap()
    }

    /// Noisy linear regression targets on the features of [`blobs`].
    pub fn linear_targets(l: usize) -> Problem<'static> {
        let base = blobs(l);
        let mut rows = Vec::with_capacity(l);
        let mut y = Vec::with_capacity(l);
        for i in 0..l {
            let xi: Vec<Node> = base
                .x()
                .row(i)
                .iter()
                .filter(|&(j, _)| j < 3)
                .map(|(j, v)| Node::new(j, v))
                .collect();
            let target = 2.0 * xi[0].value - xi[1].value + 0.5
                + 0.05 * ((i as f64) * 0.37).sin();
            rows.push(xi);
            y.push(target);
        }
        Problem::from_rows(y, &rows, 3, 1.0, MatrixKind::Rows).unwrap()
    }

    /// Recomputes `Σᵢ coefᵢ xᵢ`.
    pub fn combination(prob: &Problem<'_>, coef: &[f64]) -> Vec<f64> {
        let mut w = vec![0.0; prob.n()];
        for (i, &ci) in coef.iter().enumerate() {
            prob.x().axpy(ci, i, &mut w);
        }
        w
    }
}
