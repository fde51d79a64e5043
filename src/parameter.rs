//! Training parameters
use serde::{Deserialize, Serialize};

use crate::error::{LinearError, Result};

/// Training problem and the method used to solve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SolverType {
    /// L2 regularized logistic regression, primal (trust region Newton)
    L2rLr,
    /// L2 regularized L2-loss support vector classification, dual
    #[default]
    L2rL2LossSvcDual,
    /// L2 regularized L2-loss support vector classification, primal (trust region Newton)
    L2rL2LossSvc,
    /// L2 regularized L1-loss support vector classification, dual
    L2rL1LossSvcDual,
    /// Multiclass support vector classification by Crammer and Singer
    McsvmCs,
    /// L1 regularized L2-loss support vector classification
    L1rL2LossSvc,
    /// L1 regularized logistic regression
    L1rLr,
    /// L2 regularized logistic regression, dual
    L2rLrDual,
    /// L2 regularized L2-loss support vector regression, primal (trust region Newton)
    L2rL2LossSvr,
    /// L2 regularized L2-loss support vector regression, dual
    L2rL2LossSvrDual,
    /// L2 regularized L1-loss support vector regression, dual
    L2rL1LossSvrDual,
}

impl SolverType {
    /// Returns `true` for the support vector regression solvers.
    pub fn is_regression(self) -> bool {
        matches!(
            self,
            SolverType::L2rL2LossSvr | SolverType::L2rL2LossSvrDual | SolverType::L2rL1LossSvrDual
        )
    }

    /// Returns `true` if the solver can start from a given weight vector.
    pub fn supports_warm_start(self) -> bool {
        matches!(self, SolverType::L2rLr | SolverType::L2rL2LossSvc)
    }

    /// Returns `true` if the decision values are log-odds.
    pub fn is_probability_model(self) -> bool {
        matches!(
            self,
            SolverType::L2rLr | SolverType::L2rLrDual | SolverType::L1rLr
        )
    }

    /// Default stopping tolerance of the solver.
    pub fn default_eps(self) -> f64 {
        match self {
            SolverType::L2rLr | SolverType::L2rL2LossSvc => 0.01,
            SolverType::L1rL2LossSvc | SolverType::L1rLr => 0.01,
            SolverType::L2rL2LossSvr => 0.001,
            SolverType::L2rL2LossSvcDual
            | SolverType::L2rL1LossSvcDual
            | SolverType::McsvmCs
            | SolverType::L2rLrDual
            | SolverType::L2rL2LossSvrDual
            | SolverType::L2rL1LossSvrDual => 0.1,
        }
    }
}

/// Parameters of a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Problem type and solver
    pub solver: SolverType,
    /// Stopping tolerance
    pub eps: f64,
    /// Cost parameter
    pub c: f64,
    /// Width of the insensitive tube of the regression losses
    pub p: f64,
    /// Multipliers of the cost for individual labels
    pub weights: Vec<(i32, f64)>,
    /// Initial weights (only for solvers supporting a warm start)
    pub init_sol: Option<Vec<f64>>,
}

impl Parameter {
    const DEFAULT_C: f64 = 1.0;
    const DEFAULT_P: f64 = 0.1;

    /// Creates a [`Parameter`] with the defaults of `solver`.
    pub fn new(solver: SolverType) -> Self {
        Parameter {
            solver,
            eps: solver.default_eps(),
            c: Self::DEFAULT_C,
            p: Self::DEFAULT_P,
            weights: Vec::new(),
            init_sol: None,
        }
    }

    /// Switches the solver and resets the tolerance to its default.
    pub fn with_solver(mut self, solver: SolverType) -> Self {
        self.solver = solver;
        self.eps = solver.default_eps();
        self
    }

    /// Sets the stopping tolerance.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the cost of constraint violations.
    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    /// Sets the width of the insensitive zone of the SVR losses.
    pub fn with_p(mut self, p: f64) -> Self {
        self.p = p;
        self
    }

    /// Multiplies the cost of instances labelled `label` by `weight`.
    pub fn with_weight(mut self, label: i32, weight: f64) -> Self {
        self.weights.push((label, weight));
        self
    }

    /// Starts the solver from `init_sol` instead of zero.
    pub fn with_init_sol(mut self, init_sol: Vec<f64>) -> Self {
        self.init_sol = Some(init_sol);
        self
    }

    /// Checks the parameters before any training work is done.
    pub fn validate(&self) -> Result<()> {
        if self.eps <= 0.0 {
            return Err(LinearError::InvalidParameter("eps <= 0".into()));
        }
        if self.c <= 0.0 {
            return Err(LinearError::InvalidParameter("C <= 0".into()));
        }
        if self.p < 0.0 {
            return Err(LinearError::InvalidParameter("p < 0".into()));
        }
        if self.init_sol.is_some() && !self.solver.supports_warm_start() {
            return Err(LinearError::InvalidParameter(
                "initial solution is supported only for L2rLr and L2rL2LossSvc".into(),
            ));
        }
        Ok(())
    }
}

impl Default for Parameter {
    fn default() -> Self {
        Parameter::new(SolverType::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_solver() {
        let param = Parameter::default();
        assert_eq!(param.solver, SolverType::L2rL2LossSvcDual);
        assert_eq!(param.eps, 0.1);
        assert_eq!(param.c, 1.0);
        assert_eq!(param.p, 0.1);

        let param = param.with_eps(0.5).with_solver(SolverType::L2rLr);
        assert_eq!(param.eps, 0.01);
    }

    #[test]
    fn validation() {
        assert!(Parameter::default().validate().is_ok());
        for bad in [
            Parameter::default().with_eps(0.0),
            Parameter::default().with_c(-1.0),
            Parameter::default().with_p(-0.1),
            Parameter::new(SolverType::L1rLr).with_init_sol(vec![0.0]),
        ] {
            assert!(matches!(
                bad.validate(),
                Err(LinearError::InvalidParameter(_))
            ));
        }
        assert!(Parameter::new(SolverType::L2rL2LossSvc)
            .with_init_sol(vec![0.0])
            .validate()
            .is_ok());
    }

    #[test]
    fn clone_copies_vectors() {
        let param = Parameter::new(SolverType::L2rLr)
            .with_weight(1, 2.0)
            .with_init_sol(vec![1.0, 2.0]);
        let mut copy = param.clone();
        copy.weights[0].1 = 3.0;
        if let Some(w) = copy.init_sol.as_mut() {
            w[0] = 0.0;
        }
        assert_eq!(param.weights, vec![(1, 2.0)]);
        assert_eq!(param.init_sol, Some(vec![1.0, 2.0]));
    }

    #[test]
    fn solver_classification() {
        assert!(SolverType::L2rL1LossSvrDual.is_regression());
        assert!(!SolverType::McsvmCs.is_regression());
        assert!(SolverType::L1rLr.is_probability_model());
        assert!(!SolverType::L2rL2LossSvcDual.is_probability_model());
    }
}
