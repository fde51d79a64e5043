//! k-fold cross-validation
use crate::error::{LinearError, Result};
use crate::parameter::Parameter;
use crate::problem::Problem;
use crate::random::shuffle_prefix;
use crate::train::Trainer;

/// Held-out predictions of a cross-validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossValidation {
    /// Prediction for every instance, made by the model of the fold that held it out
    pub target: Vec<f64>,
    /// True labels or targets
    pub y: Vec<f64>,
}

impl CrossValidation {
    /// Fraction of correctly predicted labels.
    pub fn accuracy(&self) -> f64 {
        if self.y.is_empty() {
            return 0.0;
        }
        let correct = self
            .target
            .iter()
            .zip(&self.y)
            .filter(|(t, y)| t == y)
            .count();
        correct as f64 / self.y.len() as f64
    }

    /// Mean squared error and squared correlation coefficient of the predictions.
    pub fn regression_metrics(&self) -> (f64, f64) {
        let n = self.y.len() as f64;
        let mut total_error = 0.0;
        let (mut sumv, mut sumy, mut sumvv, mut sumyy, mut sumvy) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for (&v, &y) in self.target.iter().zip(&self.y) {
            total_error += (v - y) * (v - y);
            sumv += v;
            sumy += y;
            sumvv += v * v;
            sumyy += y * y;
            sumvy += v * y;
        }
        let mse = total_error / n;
        let var_v = n * sumvv - sumv * sumv;
        let var_y = n * sumyy - sumy * sumy;
        let scc = if var_v == 0.0 || var_y == 0.0 {
            0.0
        } else {
            let cov = n * sumvy - sumv * sumy;
            cov * cov / (var_v * var_y)
        };
        (mse, scc)
    }
}

/// Random assignment of the instances to folds.
///
/// Fold `i` holds the instances `perm[start[i]..start[i + 1]]`.
pub(crate) struct Folds {
    pub perm: Vec<usize>,
    pub start: Vec<usize>,
}

impl Folds {
    pub fn count(&self) -> usize {
        self.start.len() - 1
    }

    pub fn held_out(&self, i: usize) -> &[usize] {
        &self.perm[self.start[i]..self.start[i + 1]]
    }

    /// Instances used for training the model of fold `i`.
    pub fn held_in(&self, i: usize) -> Vec<usize> {
        let (begin, end) = (self.start[i], self.start[i + 1]);
        self.perm[..begin]
            .iter()
            .chain(&self.perm[end..])
            .copied()
            .collect()
    }
}

impl Trainer {
    pub(crate) fn folds(&mut self, l: usize, nr_fold: usize) -> Result<Folds> {
        if nr_fold < 2 {
            return Err(LinearError::InvalidParameter(format!(
                "cross-validation needs at least 2 folds, got {nr_fold}"
            )));
        }
        if l == 0 {
            return Err(LinearError::InvalidParameter("empty training set".into()));
        }
        let nr_fold = if nr_fold > l {
            log::warn!(
                "# folds ({nr_fold}) > # data ({l}), using # folds = # data instead (leave-one-out cross validation)"
            );
            l
        } else {
            nr_fold
        };

        let mut perm: Vec<usize> = (0..l).collect();
        shuffle_prefix(&mut perm, l, &mut self.rng);
        let start = (0..=nr_fold).map(|i| i * l / nr_fold).collect();
        Ok(Folds { perm, start })
    }

    /// Runs `nr_fold`-fold cross-validation.
    ///
    /// More folds than instances fall back to leave-one-out. The folds are
    /// views of `prob`, no feature data is copied.
    pub fn cross_validation(
        &mut self,
        prob: &Problem<'_>,
        param: &Parameter,
        nr_fold: usize,
    ) -> Result<CrossValidation> {
        param.validate()?;
        let folds = self.folds(prob.l(), nr_fold)?;
        let mut target = vec![0.0; prob.l()];
        for i in 0..folds.count() {
            let sub = prob.subset(folds.held_in(i))?;
            let model = self.train(&sub, param)?;
            for &j in folds.held_out(i) {
                target[j] = model.predict(prob.x().row(j));
            }
        }

        let cv = CrossValidation {
            target,
            y: prob.y().to_vec(),
        };
        if param.solver.is_regression() {
            let (mse, scc) = cv.regression_metrics();
            log::info!("cross validation mean squared error = {mse}");
            log::info!("cross validation squared correlation coefficient = {scc}");
        } else {
            log::info!("cross validation accuracy = {}%", 100.0 * cv.accuracy());
        }
        Ok(cv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cd::testing::{blobs, linear_targets};
    use crate::parameter::SolverType;
    use approx::assert_abs_diff_eq;

    #[test]
    fn folds_partition_instances() {
        let mut trainer = Trainer::new();
        let folds = trainer.folds(11, 3).unwrap();
        assert_eq!(folds.start, vec![0, 3, 7, 11]);
        let mut all: Vec<usize> = (0..3).flat_map(|i| folds.held_out(i).to_vec()).collect();
        all.sort_unstable();
        assert_eq!(all, (0..11).collect::<Vec<_>>());
        assert_eq!(folds.held_in(1).len(), 7);

        let loo = trainer.folds(4, 10).unwrap();
        assert_eq!(loo.count(), 4);
        assert!(trainer.folds(4, 1).is_err());
    }

    #[test]
    fn same_seed_same_predictions() {
        let prob = blobs(50);
        let param = Parameter::new(SolverType::L2rL2LossSvcDual);
        let a = Trainer::new().cross_validation(&prob, &param, 5).unwrap();
        let b = Trainer::new().cross_validation(&prob, &param, 5).unwrap();
        assert_eq!(a, b);
        assert!(a.accuracy() >= 0.6);
    }

    #[test]
    fn regression_metrics_on_trend() {
        let prob = linear_targets(60);
        let param = Parameter::new(SolverType::L2rL2LossSvrDual)
            .with_c(10.0)
            .with_p(0.05)
            .with_eps(0.001);
        let cv = Trainer::new().cross_validation(&prob, &param, 4).unwrap();
        let (mse, scc) = cv.regression_metrics();
        assert!(mse < 0.1);
        assert!(scc > 0.9);
    }

    #[test]
    fn metrics_by_hand() {
        let cv = CrossValidation {
            target: vec![1.0, 2.0, 3.0, 5.0],
            y: vec![1.0, 2.0, 3.0, 4.0],
        };
        assert_abs_diff_eq!(cv.accuracy(), 0.75);
        let (mse, scc) = cv.regression_metrics();
        assert_abs_diff_eq!(mse, 0.25);
        // (n Σvy - Σv Σy)² / ((n Σv² - (Σv)²) (n Σy² - (Σy)²))
        assert_abs_diff_eq!(scc, 26.0 * 26.0 / (35.0 * 20.0), epsilon = 1e-12);
    }
}
