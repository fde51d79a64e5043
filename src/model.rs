//! Trained linear models
use serde::{Deserialize, Serialize};

use crate::parameter::SolverType;

/// Weights of a trained linear model.
///
/// The weight of feature `j` for decision function `k` is
/// `w[j * nr_w() + k]`. Binary models other than the Crammer-Singer one
/// store a single decision function which is positive for `label[0]`. If
/// `bias >= 0` the row `j = nr_feature` holds the weights of the bias term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Solver the model was trained with
    pub solver: SolverType,
    /// Number of classes (2 for regression models)
    pub nr_class: usize,
    /// Number of features, excluding the bias column
    pub nr_feature: usize,
    /// Bias value appended to every instance, negative if unused
    pub bias: f64,
    /// Weights
    pub w: Vec<f64>,
    /// External label of each class, empty for regression models
    pub label: Vec<i32>,
}

impl Model {
    /// Number of decision functions.
    pub fn nr_w(&self) -> usize {
        if self.nr_class == 2 && self.solver != SolverType::McsvmCs {
            1
        } else {
            self.nr_class
        }
    }

    /// Returns `true` if the model predicts real-valued targets.
    pub fn is_regression(&self) -> bool {
        self.solver.is_regression()
    }

    /// Returns `true` if the model supports [`Model::predict_probability`].
    pub fn is_probability_model(&self) -> bool {
        self.solver.is_probability_model()
    }

    /// Number of weight rows: the features plus the bias row if present.
    pub(crate) fn weight_rows(&self) -> usize {
        if self.bias >= 0.0 {
            self.nr_feature + 1
        } else {
            self.nr_feature
        }
    }

    fn weight(&self, feature: usize, label_idx: usize) -> f64 {
        if feature >= self.weight_rows() {
            return 0.0;
        }
        if self.is_regression() {
            return self.w[feature];
        }
        if label_idx >= self.nr_class {
            return 0.0;
        }
        if self.nr_w() == 1 {
            if label_idx == 0 {
                self.w[feature]
            } else {
                -self.w[feature]
            }
        } else {
            self.w[feature * self.nr_class + label_idx]
        }
    }

    /// Coefficient of `feature` in the decision function of class `label_idx`.
    ///
    /// For binary models the second class gets the negated coefficient of
    /// the first one. Regression models ignore `label_idx`; out of range
    /// indexes give `0`.
    pub fn decfun_coef(&self, feature: usize, label_idx: usize) -> f64 {
        if feature >= self.nr_feature {
            return 0.0;
        }
        self.weight(feature, label_idx)
    }

    /// Bias term of the decision function of class `label_idx`.
    pub fn decfun_bias(&self, label_idx: usize) -> f64 {
        if self.bias < 0.0 {
            return 0.0;
        }
        self.bias * self.weight(self.nr_feature, label_idx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary() -> Model {
        Model {
            solver: SolverType::L2rLr,
            nr_class: 2,
            nr_feature: 2,
            bias: 1.0,
            w: vec![0.5, -1.0, 0.25],
            label: vec![1, -1],
        }
    }

    #[test]
    fn binary_coefficients() {
        let m = binary();
        assert_eq!(m.nr_w(), 1);
        assert_eq!(m.decfun_coef(1, 0), -1.0);
        assert_eq!(m.decfun_coef(1, 1), 1.0);
        assert_eq!(m.decfun_coef(2, 0), 0.0);
        assert_eq!(m.decfun_coef(0, 2), 0.0);
        assert_eq!(m.decfun_bias(0), 0.25);
        assert_eq!(m.decfun_bias(1), -0.25);
    }

    #[test]
    fn multiclass_layout() {
        let m = Model {
            solver: SolverType::McsvmCs,
            nr_class: 2,
            nr_feature: 1,
            bias: -1.0,
            w: vec![1.0, 2.0],
            label: vec![4, 7],
        };
        assert_eq!(m.nr_w(), 2);
        assert_eq!(m.decfun_coef(0, 1), 2.0);
        assert_eq!(m.decfun_bias(1), 0.0);
    }

    #[test]
    fn regression_ignores_label() {
        let m = Model {
            solver: SolverType::L2rL2LossSvr,
            nr_class: 2,
            nr_feature: 1,
            bias: 2.0,
            w: vec![3.0, 0.5],
            label: Vec::new(),
        };
        assert!(m.is_regression());
        assert_eq!(m.decfun_coef(0, 5), 3.0);
        assert_eq!(m.decfun_bias(1), 1.0);
    }
}
