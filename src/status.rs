use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
/// Possible outcomes of an optimization routine
pub enum StatusCode {
    /// Optimization not started
    Initialized,
    /// Solution found (up to defined tolerance)
    Optimal,
    /// Maximum number of steps reached
    MaxSteps,
    /// Predicted reduction was not positive, no further step possible
    NoStepPossible,
    /// Actual and predicted reduction both became negligible
    Stagnated,
    /// Objective fell below any meaningful value
    Diverged,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
/// A struct summarizing how an optimization routine ended
pub struct Status {
    /// Reason of termination
    pub code: StatusCode,
    /// Number of conducted (outer) steps
    pub steps: usize,
    /// Objective function value at the returned point
    pub value: f64,
    /// Violation of optimality conditions at the last check
    pub violation: f64,
    /// Number of nonzero variables (dual coefficients or primal weights)
    pub nonzero: usize,
    /// Elapsed time (in seconds)
    pub time: f64,
}

impl Status {
    /// Create a [`Status`] struct for a routine that has not run yet
    pub fn new() -> Status {
        Status {
            code: StatusCode::Initialized,
            steps: 0,
            value: 0.0,
            violation: f64::INFINITY,
            nonzero: 0,
            time: 0.0,
        }
    }

    /// Checks whether the routine ended by meeting its tolerance.
    pub fn is_optimal(&self) -> bool {
        self.code == StatusCode::Optimal
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::new()
    }
}
