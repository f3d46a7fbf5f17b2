//! Relaxation parameter with angle-based stabilization.

use crate::error::{Error, Result};
use crate::vector::VectorOps;

/// Compute the relaxation parameter for the residual update `r - omega * t`.
///
/// `omega = (t . s) / (t . t)` minimizes `||s - omega t||`. When the cosine
/// `rho = |t . s| / (||t|| ||s||)` falls below `angle`, omega is enlarged by
/// `angle / rho` so that the next residual keeps a minimum alignment with the
/// current one.
///
/// Returns [`Error::OmegaBreakdown`] when `t` is zero or orthogonal to `s`,
/// where the parameter is undefined.
pub fn omega<V: VectorOps>(t: &V, s: &V, angle: f64) -> Result<f64> {
    let ns = s.norm();
    let nt = t.norm();
    let ts = t.dot(s);

    if nt == 0.0 {
        return Err(Error::OmegaBreakdown("matrix-applied vector has zero norm"));
    }
    if ts == 0.0 || ns == 0.0 {
        return Err(Error::OmegaBreakdown("update direction is orthogonal to residual"));
    }

    let rho = (ts / (nt * ns)).abs();
    let mut om = ts / (nt * nt);
    if rho < angle {
        om *= angle / rho;
    }
    Ok(om)
}
