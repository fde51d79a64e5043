use super::{axpy, dot, dot_m};
use crate::objective::Objective;

/// Outcome of the truncated conjugate gradient iterations.
pub struct Step {
    /// Number of Hessian-vector products used.
    pub iterations: usize,
    /// Whether the step was cut at the trust region boundary.
    pub reach_boundary: bool,
}

/// Approximately minimizes `gᵀs + ½ sᵀHs` subject to `‖s‖_M ≤ delta`.
///
/// On return `s` holds the step and `r` the residual `-(g + Hs)`.
pub fn trpcg(
    obj: &dyn Objective,
    delta: f64,
    g: &[f64],
    m: &[f64],
    eps_cg: f64,
    s: &mut [f64],
    r: &mut [f64],
) -> Step {
    let n = g.len();
    let mut d = vec![0.0; n];
    let mut hd = vec![0.0; n];
    let mut z = vec![0.0; n];

    for i in 0..n {
        s[i] = 0.0;
        r[i] = -g[i];
        z[i] = r[i] / m[i];
        d[i] = z[i];
    }
    let mut z_t_r = dot(&z, r);
    let cgtol = eps_cg * z_t_r.sqrt();
    let mut iterations = 0;

    while z_t_r.sqrt() > cgtol {
        iterations += 1;
        obj.hessian_vector_product(&d, &mut hd);

        let alpha = z_t_r / dot(&d, &hd);
        axpy(alpha, &d, s);
        if dot_m(s, m, s).sqrt() > delta {
            log::trace!("cg reaches trust region boundary");
            axpy(-alpha, &d, s);

            let std = dot_m(s, m, &d);
            let sts = dot_m(s, m, s);
            let dtd = dot_m(&d, m, &d);
            let dsq = delta * delta;
            let rad = (std * std + dtd * (dsq - sts)).sqrt();
            let alpha = if std >= 0.0 {
                (dsq - sts) / (std + rad)
            } else {
                (rad - std) / dtd
            };
            axpy(alpha, &d, s);
            axpy(-alpha, &hd, r);
            return Step {
                iterations,
                reach_boundary: true,
            };
        }
        axpy(-alpha, &hd, r);
        for i in 0..n {
            z[i] = r[i] / m[i];
        }
        let z_t_r_new = dot(&z, r);
        let beta = z_t_r_new / z_t_r;
        for i in 0..n {
            d[i] = z[i] + beta * d[i];
        }
        z_t_r = z_t_r_new;
    }
    Step {
        iterations,
        reach_boundary: false,
    }
}
