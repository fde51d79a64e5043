//! Search for the cost parameter by cross-validation
use serde::{Deserialize, Serialize};

use crate::error::{LinearError, Result};
use crate::parameter::{Parameter, SolverType};
use crate::problem::Problem;
use crate::train::Trainer;

const RATIO: f64 = 2.0;
// squared weight change below which a fold counts as converged
const UNCHANGED_W: f64 = 1e-31;
const UNCHANGED_ROUNDS: i32 = 3;

/// Outcome of [`Trainer::find_parameter_c`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Cost with the best cross-validation accuracy (the smallest one on ties)
    pub best_c: f64,
    /// Cross-validation accuracy of `best_c`
    pub best_rate: f64,
    /// Every evaluated cost with its accuracy, in order
    pub trials: Vec<(f64, f64)>,
}

/// Smallest cost worth trying: a power of two below the value at which the
/// solution starts to move away from zero.
fn calc_start_c(prob: &Problem<'_>, solver: SolverType) -> f64 {
    let x = prob.x();
    let max_xtx = (0..prob.l())
        .map(|i| x.squared_norm(i))
        .fold(0.0, f64::max);
    let l = prob.l() as f64;
    let min_c = match solver {
        SolverType::L2rLr => 1.0 / (l * max_xtx),
        SolverType::L2rL2LossSvc => 1.0 / (2.0 * l * max_xtx),
        _ => 1.0,
    };
    2f64.powf(min_c.log2().floor())
}

impl Trainer {
    /// Finds the cost with the best `nr_fold`-fold cross-validation accuracy.
    ///
    /// The costs `start_c, 2 start_c, 4 start_c, ...` up to `max_c` are tried
    /// on one fixed split of the data, each fold warm starting from its
    /// solution for the previous cost. The search ends early once the
    /// weights of all folds stayed unchanged for three rounds. Without
    /// `start_c` a start value is derived from the data. A start value
    /// above `max_c` (or none at all, as for data without features) is an
    /// error, so `best_c` is always one of the trials.
    pub fn find_parameter_c(
        &mut self,
        prob: &Problem<'_>,
        param: &Parameter,
        nr_fold: usize,
        start_c: Option<f64>,
        max_c: f64,
    ) -> Result<SearchResult> {
        param.validate()?;
        if !param.solver.supports_warm_start() {
            return Err(LinearError::InvalidParameter(
                "parameter search is supported only for L2rLr and L2rL2LossSvc".into(),
            ));
        }
        let start_c = match start_c {
            Some(c) if c > 0.0 => c,
            _ => calc_start_c(prob, param.solver),
        };
        if !start_c.is_finite() || start_c > max_c {
            return Err(LinearError::InvalidParameter(format!(
                "start C {start_c} leaves nothing to try below max C {max_c}"
            )));
        }
        let folds = self.folds(prob.l(), nr_fold)?;
        let subprobs = (0..folds.count())
            .map(|i| prob.subset(folds.held_in(i)))
            .collect::<Result<Vec<_>>>()?;
        let mut param1 = param.clone();
        param1.c = start_c;

        let mut prev_w: Vec<Option<Vec<f64>>> = vec![None; folds.count()];
        let mut num_unchanged_w: i32 = 0;
        let mut target = vec![0.0; prob.l()];
        let mut result = SearchResult {
            best_c: start_c,
            best_rate: 0.0,
            trials: Vec::new(),
        };

        while param1.c <= max_c {
            for (i, sub) in subprobs.iter().enumerate() {
                param1.init_sol = prev_w[i].clone();
                let model = self.train(sub, &param1)?;

                match prev_w[i].as_mut() {
                    None => prev_w[i] = Some(model.w.clone()),
                    Some(prev) => {
                        if num_unchanged_w >= 0 {
                            let diff: f64 = model
                                .w
                                .iter()
                                .zip(prev.iter())
                                .map(|(w, p)| (w - p) * (w - p))
                                .sum();
                            if diff > UNCHANGED_W {
                                num_unchanged_w = -1;
                            }
                        }
                        prev.copy_from_slice(&model.w);
                    }
                }

                for &j in folds.held_out(i) {
                    target[j] = model.predict(prob.x().row(j));
                }
            }

            let correct = target
                .iter()
                .zip(prob.y())
                .filter(|(t, y)| t == y)
                .count();
            let rate = correct as f64 / prob.l() as f64;
            if rate > result.best_rate {
                result.best_c = param1.c;
                result.best_rate = rate;
            }
            result.trials.push((param1.c, rate));
            log::info!("log2c={:7.2}\trate={}", param1.c.log2(), 100.0 * rate);

            num_unchanged_w += 1;
            if num_unchanged_w == UNCHANGED_ROUNDS {
                break;
            }
            param1.c *= RATIO;
        }

        if param1.c > max_c && max_c > start_c {
            log::warn!("maximum C reached");
        }
        Ok(result)
    }
}
