use super::Loss;

/// Logistic loss `log(1 + exp(-y t))` for labels `y ∈ {-1, +1}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logistic;

fn sigmoid(t: f64) -> f64 {
    1.0 / (1.0 + (-t).exp())
}

impl Loss for Logistic {
    fn loss(&self, t: f64, y: f64) -> f64 {
        let yt = y * t;
        if yt >= 0.0 {
            (-yt).exp().ln_1p()
        } else {
            -yt + yt.exp().ln_1p()
        }
    }

    fn d_loss(&self, t: f64, y: f64) -> f64 {
        (sigmoid(y * t) - 1.0) * y
    }

    fn d2_loss(&self, t: f64, y: f64) -> f64 {
        let s = sigmoid(y * t);
        s * (1.0 - s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn stable_for_large_margins() {
        assert_abs_diff_eq!(Logistic.loss(0.0, 1.0), 2f64.ln(), epsilon = 1e-15);
        assert_abs_diff_eq!(Logistic.loss(-800.0, 1.0), 800.0, epsilon = 1e-9);
        assert!(Logistic.loss(800.0, 1.0) >= 0.0);
        assert_abs_diff_eq!(Logistic.d_loss(800.0, -1.0), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(Logistic.d2_loss(0.0, -1.0), 0.25, epsilon = 1e-15);
    }
}
