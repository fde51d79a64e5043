/// Parameters of the trust-region Newton method
#[derive(Debug, Clone)]
pub struct Params {
    /// Termination tolerance relative to the gradient norm at zero
    pub eps: f64,
    /// Relative tolerance of the inner conjugate gradient iterations
    pub eps_cg: f64,
    /// Maximum number of accepted steps
    pub max_steps: usize,
}

impl Params {
    const DEFAULT_EPS: f64 = 0.1;
    const DEFAULT_EPS_CG: f64 = 0.1;
    const DEFAULT_MAX_STEPS: usize = 1000;

    /// Creates a new [`Params`] struct with default parameter values.
    pub fn new() -> Self {
        Params {
            eps: Self::DEFAULT_EPS,
            eps_cg: Self::DEFAULT_EPS_CG,
            max_steps: Self::DEFAULT_MAX_STEPS,
        }
    }

    /// Sets the termination tolerance.
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    /// Sets the tolerance of the inner conjugate gradient iterations.
    pub fn with_eps_cg(mut self, eps_cg: f64) -> Self {
        self.eps_cg = eps_cg;
        self
    }

    /// Sets the maximum number of accepted steps.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }
}

impl Default for Params {
    fn default() -> Self {
        Self::new()
    }
}
