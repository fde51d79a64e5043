//! Trust-region Newton method with a preconditioned conjugate gradient inner solver

mod cg;
mod params;
mod solve;

pub use self::params::Params;
pub use solve::minimize;

fn dot(u: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(v).map(|(ui, vi)| ui * vi).sum()
}

// uᵀ diag(m) v
fn dot_m(u: &[f64], m: &[f64], v: &[f64]) -> f64 {
    u.iter().zip(m).zip(v).map(|((ui, mi), vi)| ui * mi * vi).sum()
}

fn axpy(a: f64, x: &[f64], y: &mut [f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += a * xi;
    }
}
