use crate::matrix::Row;
use crate::model::Model;

impl Model {
    /// Evaluates the decision functions for one instance.
    ///
    /// `dec_values` receives [`Model::nr_w`] values. Features beyond
    /// `nr_feature` (including a bias column stored in the row) are ignored,
    /// the bias term of the model is always added.
    pub fn decision_values(&self, row: Row<'_>, dec_values: &mut [f64]) {
        let nr_w = self.nr_w();
        let dec = &mut dec_values[..nr_w];
        dec.fill(0.0);
        for (j, v) in row.iter() {
            if j >= self.nr_feature {
                continue;
            }
            let wj = &self.w[j * nr_w..(j + 1) * nr_w];
            for (d, wk) in dec.iter_mut().zip(wj) {
                *d += wk * v;
            }
        }
        if self.bias >= 0.0 {
            let j = self.nr_feature;
            let wj = &self.w[j * nr_w..(j + 1) * nr_w];
            for (d, wk) in dec.iter_mut().zip(wj) {
                *d += wk * self.bias;
            }
        }
    }

    fn label_of(&self, dec_values: &[f64]) -> f64 {
        if self.is_regression() {
            return dec_values[0];
        }
        if self.nr_class == 2 && self.nr_w() == 1 {
            return if dec_values[0] > 0.0 {
                self.label[0] as f64
            } else {
                self.label[1] as f64
            };
        }
        let mut best = 0;
        for (k, &d) in dec_values.iter().enumerate().take(self.nr_class).skip(1) {
            if d > dec_values[best] {
                best = k;
            }
        }
        self.label[best] as f64
    }

    /// Predicts the label (or target value) of one instance.
    pub fn predict(&self, row: Row<'_>) -> f64 {
        let mut dec_values = vec![0.0; self.nr_w()];
        self.decision_values(row, &mut dec_values);
        self.label_of(&dec_values)
    }

    /// Predicts the label of one instance and its class probabilities.
    ///
    /// `prob_estimates` receives one probability per class, ordered like
    /// `label`. Returns `None` (and leaves `prob_estimates` untouched) if the
    /// model is not a logistic regression model.
    pub fn predict_probability(&self, row: Row<'_>, prob_estimates: &mut [f64]) -> Option<f64> {
        if !self.is_probability_model() {
            return None;
        }
        let nr_w = self.nr_w();
        let mut dec_values = vec![0.0; nr_w];
        self.decision_values(row, &mut dec_values);
        let label = self.label_of(&dec_values);

        let probs = &mut prob_estimates[..self.nr_class];
        for (p, &d) in probs.iter_mut().zip(&dec_values) {
            *p = 1.0 / (1.0 + (-d).exp());
        }
        if self.nr_class == 2 {
            probs[1] = 1.0 - probs[0];
        } else {
            let sum: f64 = probs.iter().sum();
            for p in probs.iter_mut() {
                *p /= sum;
            }
        }
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::{Node, Row};
    use crate::model::Model;
    use crate::parameter::SolverType;
    use approx::assert_abs_diff_eq;

    fn logistic(nr_class: usize, w: Vec<f64>) -> Model {
        Model {
            solver: SolverType::L2rLr,
            nr_class,
            nr_feature: 2,
            bias: 1.0,
            w,
            label: (1..=nr_class as i32).collect(),
        }
    }

    #[test]
    fn bias_column_in_row_is_ignored() {
        let m = logistic(2, vec![1.0, -2.0, 0.5]);
        let plain = [Node::new(0, 1.0), Node::new(1, 1.0)];
        let with_bias = [Node::new(0, 1.0), Node::new(1, 1.0), Node::new(2, 1.0)];
        let extra = [Node::new(0, 1.0), Node::new(1, 1.0), Node::new(7, 3.0)];
        let mut d = [0.0];
        m.decision_values(Row::from(&plain[..]), &mut d);
        assert_abs_diff_eq!(d[0], -0.5);
        for nodes in [&with_bias[..], &extra[..]] {
            let mut e = [0.0];
            m.decision_values(Row::from(nodes), &mut e);
            assert_eq!(d, e);
        }
    }

    #[test]
    fn binary_sign_selects_label() {
        let m = logistic(2, vec![1.0, 0.0, 0.0]);
        let pos = [Node::new(0, 2.0)];
        let neg = [Node::new(0, -2.0)];
        assert_eq!(m.predict(Row::from(&pos[..])), 1.0);
        assert_eq!(m.predict(Row::from(&neg[..])), 2.0);
        // zero decision value goes to the second label
        assert_eq!(m.predict(Row::EMPTY), 2.0);
    }

    #[test]
    fn multiclass_ties_keep_first() {
        let m = Model {
            solver: SolverType::L2rL2LossSvcDual,
            nr_class: 3,
            nr_feature: 1,
            bias: -1.0,
            w: vec![1.0, 1.0, 0.5],
            label: vec![5, 6, 7],
        };
        let row = [Node::new(0, 1.0)];
        assert_eq!(m.predict(Row::from(&row[..])), 5.0);
        let row = [Node::new(0, -1.0)];
        assert_eq!(m.predict(Row::from(&row[..])), 7.0);
    }

    #[test]
    fn single_class_always_predicts_it() {
        let m = Model {
            solver: SolverType::L2rL2LossSvcDual,
            nr_class: 1,
            nr_feature: 1,
            bias: -1.0,
            w: vec![0.5],
            label: vec![3],
        };
        for x in [1.0, -1.0] {
            let row = [Node::new(0, x)];
            assert_eq!(m.predict(Row::from(&row[..])), 3.0);
        }
    }

    #[test]
    fn probabilities() {
        let m = logistic(2, vec![1.0, 0.0, 0.0]);
        let row = [Node::new(0, 2.0f64.ln())];
        let mut p = [0.0; 2];
        let label = m.predict_probability(Row::from(&row[..]), &mut p);
        assert_eq!(label, Some(1.0));
        assert_abs_diff_eq!(p[0], 2.0 / 3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(p[1], 1.0 / 3.0, epsilon = 1e-12);

        let m = logistic(3, vec![1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let mut p = [0.0; 3];
        m.predict_probability(Row::from(&row[..]), &mut p);
        assert_abs_diff_eq!(p.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(p[0] > p[1] && p[1] > p[2]);

        let svm = Model {
            solver: SolverType::L2rL2LossSvcDual,
            ..logistic(2, vec![1.0, 0.0, 0.0])
        };
        assert_eq!(svm.predict_probability(Row::from(&row[..]), &mut p), None);
    }

    #[test]
    fn regression_returns_decision_value() {
        let m = Model {
            solver: SolverType::L2rL2LossSvrDual,
            nr_class: 2,
            nr_feature: 1,
            bias: 1.0,
            w: vec![2.0, -1.0],
            label: Vec::new(),
        };
        let row = [Node::new(0, 3.0)];
        assert_abs_diff_eq!(m.predict(Row::from(&row[..])), 5.0);
    }
}
