use super::Loss;

/// Squared hinge loss `max(0, 1 - y t)²` for labels `y ∈ {-1, +1}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredHinge;

impl Loss for SquaredHinge {
    fn loss(&self, t: f64, y: f64) -> f64 {
        let r = 1.0 - y * t;
        if r > 0.0 {
            r * r
        } else {
            0.0
        }
    }

    fn d_loss(&self, t: f64, y: f64) -> f64 {
        let r = 1.0 - y * t;
        if r > 0.0 {
            -2.0 * y * r
        } else {
            0.0
        }
    }

    fn d2_loss(&self, t: f64, y: f64) -> f64 {
        if y * t < 1.0 {
            2.0
        } else {
            0.0
        }
    }
}

/// Squared ε-insensitive loss `max(0, |t - y| - p)²` for regression targets `y`.
#[derive(Debug, Clone, Copy)]
pub struct SquaredInsensitive {
    /// Width of the insensitive tube.
    pub p: f64,
}

impl Loss for SquaredInsensitive {
    fn loss(&self, t: f64, y: f64) -> f64 {
        let d = t - y;
        if d > self.p {
            (d - self.p).powi(2)
        } else if d < -self.p {
            (d + self.p).powi(2)
        } else {
            0.0
        }
    }

    fn d_loss(&self, t: f64, y: f64) -> f64 {
        let d = t - y;
        if d > self.p {
            2.0 * (d - self.p)
        } else if d < -self.p {
            2.0 * (d + self.p)
        } else {
            0.0
        }
    }

    fn d2_loss(&self, t: f64, y: f64) -> f64 {
        let d = t - y;
        if d > self.p || d < -self.p {
            2.0
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_inside_margin() {
        assert_eq!(SquaredHinge.loss(2.0, 1.0), 0.0);
        assert_eq!(SquaredHinge.d2_loss(1.0, 1.0), 0.0);
        assert_eq!(SquaredHinge.loss(0.0, -1.0), 1.0);
        assert_eq!(SquaredHinge.d_loss(0.5, -1.0), 3.0);

        let svr = SquaredInsensitive { p: 0.5 };
        assert_eq!(svr.loss(1.25, 1.0), 0.0);
        assert_eq!(svr.d2_loss(1.25, 1.0), 0.0);
        assert_eq!(svr.loss(2.5, 1.0), 1.0);
        assert_eq!(svr.d_loss(-0.5, 1.0), -2.0);
    }
}
