//! Training of linear models
//!
//! The [`Trainer`] groups the instances by class, reduces multiclass
//! problems to binary ones (one-vs-rest) unless the Crammer-Singer solver
//! is requested and dispatches every subproblem to the trust region Newton
//! method or one of the coordinate descent solvers.
use rand::rngs::StdRng;

use crate::cd::{DualLoss, L1rLr, L1rSvc, LrDual, McsvmCs, Solver, SvcDual, SvrDual};
use crate::classes::group_classes;
use crate::error::{LinearError, Result};
use crate::model::Model;
use crate::objective::{Logistic, Regularized, SquaredHinge, SquaredInsensitive};
use crate::parameter::{Parameter, SolverType};
use crate::problem::Problem;
use crate::random::{seeded, DEFAULT_SEED};
use crate::status::Status;
use crate::tron;

const EPS_CG: f64 = 0.1;
// the inner solves may be coarse when starting close to the solution
const EPS_CG_WARM: f64 = 0.5;

/// Trains models, owning the random number generator used by all solvers.
///
/// Every shuffle of every solve draws from the same generator, so a
/// sequence of calls on one trainer is reproducible given its seed.
pub struct Trainer {
    pub(crate) rng: StdRng,
}

impl Trainer {
    /// Creates a [`Trainer`] seeded with [`DEFAULT_SEED`].
    pub fn new() -> Self {
        Trainer::with_seed(DEFAULT_SEED)
    }

    /// Creates a [`Trainer`] with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Trainer { rng: seeded(seed) }
    }

    /// Trains a model on `prob`.
    pub fn train(&mut self, prob: &Problem<'_>, param: &Parameter) -> Result<Model> {
        param.validate()?;
        let l = prob.l();
        if l == 0 {
            return Err(LinearError::InvalidParameter("empty training set".into()));
        }
        let n = prob.n();
        let nr_feature = if prob.bias() >= 0.0 { n - 1 } else { n };

        if param.solver.is_regression() {
            let mut w = initial_weights(param, n)?;
            self.train_one(prob, param, &mut w, 0.0, 0.0)?;
            return Ok(Model {
                solver: param.solver,
                nr_class: 2,
                nr_feature,
                bias: prob.bias(),
                w,
                label: Vec::new(),
            });
        }

        let classes = group_classes(prob.y());
        let nr_class = classes.nr_class();

        let mut weighted_c = vec![param.c; nr_class];
        for &(label, weight) in param.weights.iter() {
            match classes.label.iter().position(|&lab| lab == label) {
                Some(k) => weighted_c[k] *= weight,
                None => log::warn!("class label {label} specified in weight is not found"),
            }
        }

        let w = if param.solver == SolverType::McsvmCs {
            let mut y = vec![0.0; l];
            for k in 0..nr_class {
                let start = classes.start[k];
                y[start..start + classes.count[k]].fill(k as f64);
            }
            let sub = prob.view(classes.perm.clone(), y)?;
            let mut w = vec![0.0; n * nr_class];
            McsvmCs::new(param.eps, weighted_c).solve(&sub, &mut w, &mut self.rng)?;
            w
        } else if nr_class == 2 {
            let y: Vec<f64> = (0..l)
                .map(|s| if s < classes.count[0] { 1.0 } else { -1.0 })
                .collect();
            let sub = prob.view(classes.perm.clone(), y)?;
            let mut w = initial_weights(param, n)?;
            self.train_one(&sub, param, &mut w, weighted_c[0], weighted_c[1])?;
            w
        } else {
            let init = match &param.init_sol {
                Some(init) if init.len() != n * nr_class => {
                    return Err(LinearError::ShapeMismatch {
                        expected: n * nr_class,
                        found: init.len(),
                    })
                }
                init => init.as_deref(),
            };
            let mut w = vec![0.0; n * nr_class];
            let mut wk = vec![0.0; n];
            for k in 0..nr_class {
                let (begin, end) = (classes.start[k], classes.start[k] + classes.count[k]);
                let y: Vec<f64> = (0..l)
                    .map(|s| if s >= begin && s < end { 1.0 } else { -1.0 })
                    .collect();
                let sub = prob.view(classes.perm.clone(), y)?;
                match init {
                    Some(init) => {
                        for (j, wkj) in wk.iter_mut().enumerate() {
                            *wkj = init[j * nr_class + k];
                        }
                    }
                    None => wk.fill(0.0),
                }
                self.train_one(&sub, param, &mut wk, weighted_c[k], param.c)?;
                for (j, &wkj) in wk.iter().enumerate() {
                    w[j * nr_class + k] = wkj;
                }
            }
            w
        };

        Ok(Model {
            solver: param.solver,
            nr_class,
            nr_feature,
            bias: prob.bias(),
            w,
            label: classes.label,
        })
    }

    /// Solves a single binary (labels `±1`) or regression problem.
    ///
    /// `cp` and `cn` are the costs of positive and negative instances;
    /// regression solvers use `param.c` instead. `w` is the starting point
    /// of the solvers supporting a warm start and is overwritten with the
    /// solution.
    pub fn train_one(
        &mut self,
        prob: &Problem<'_>,
        param: &Parameter,
        w: &mut [f64],
        cp: f64,
        cn: f64,
    ) -> Result<Status> {
        let eps = param.eps;
        let l = prob.l();
        let pos = prob.y().iter().filter(|&&yi| yi > 0.0).count();
        let neg = l - pos;
        let primal_solver_tol = eps * pos.min(neg).max(1) as f64 / l as f64;
        let eps_cg = if param.init_sol.is_some() {
            EPS_CG_WARM
        } else {
            EPS_CG
        };
        let class_costs = || -> Vec<f64> {
            prob.y()
                .iter()
                .map(|&yi| if yi > 0.0 { cp } else { cn })
                .collect()
        };
        let rng = &mut self.rng;

        let status = match param.solver {
            SolverType::L2rLr => {
                let mut obj = Regularized::new(Logistic, prob.x(), prob.y(), class_costs());
                let params = tron::Params::new()
                    .with_eps(primal_solver_tol)
                    .with_eps_cg(eps_cg);
                tron::minimize(&mut obj, w, &params)
            }
            SolverType::L2rL2LossSvc => {
                let mut obj = Regularized::new(SquaredHinge, prob.x(), prob.y(), class_costs());
                let params = tron::Params::new()
                    .with_eps(primal_solver_tol)
                    .with_eps_cg(eps_cg);
                tron::minimize(&mut obj, w, &params)
            }
            SolverType::L2rL2LossSvr => {
                let loss = SquaredInsensitive { p: param.p };
                let mut obj = Regularized::new(loss, prob.x(), prob.y(), vec![param.c; l]);
                let params = tron::Params::new().with_eps(eps).with_eps_cg(eps_cg);
                tron::minimize(&mut obj, w, &params)
            }
            SolverType::L2rL2LossSvcDual => {
                SvcDual::new(eps, cp, cn, DualLoss::L2).solve(prob, w, rng)?
            }
            SolverType::L2rL1LossSvcDual => {
                SvcDual::new(eps, cp, cn, DualLoss::L1).solve(prob, w, rng)?
            }
            SolverType::L1rL2LossSvc => L1rSvc::new(primal_solver_tol, cp, cn).solve(prob, w, rng)?,
            SolverType::L1rLr => L1rLr::new(primal_solver_tol, cp, cn).solve(prob, w, rng)?,
            SolverType::L2rLrDual => LrDual::new(eps, cp, cn).solve(prob, w, rng)?,
            SolverType::L2rL2LossSvrDual => {
                SvrDual::new(eps, param.c, param.p, DualLoss::L2).solve(prob, w, rng)?
            }
            SolverType::L2rL1LossSvrDual => {
                SvrDual::new(eps, param.c, param.p, DualLoss::L1).solve(prob, w, rng)?
            }
            SolverType::McsvmCs => {
                return Err(LinearError::InvalidParameter(
                    "McsvmCs solves all classes at once and has no binary subproblem".into(),
                ))
            }
        };
        log::debug!(
            "{:?}: {:?} after {} steps in {:.3}s",
            param.solver,
            status.code,
            status.steps,
            status.time
        );
        Ok(status)
    }
}

impl Default for Trainer {
    fn default() -> Self {
        Trainer::new()
    }
}

fn initial_weights(param: &Parameter, n: usize) -> Result<Vec<f64>> {
    match &param.init_sol {
        Some(init) if init.len() != n => Err(LinearError::ShapeMismatch {
            expected: n,
            found: init.len(),
        }),
        Some(init) => Ok(init.clone()),
        None => Ok(vec![0.0; n]),
    }
}
