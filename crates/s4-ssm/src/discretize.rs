//! Bilinear (Tustin) discretization of a continuous SSM.

use s4_core::{CMatrix, Result, S4Error};

use crate::complex_utils::c;
use crate::ssm::Ssm;

/// Discretize (A, B, C) with step Δ:
///
/// - M = (I - Δ/2·A)⁻¹
/// - Ā = M·(I + Δ/2·A)
/// - B̄ = (M·Δ)·B
/// - C̄ = C
///
/// Eigenvalues of A in the open left half-plane land strictly inside the unit
/// disk. `tolerance` is the relative pivot threshold of the inversion.
pub fn discretize(ssm: &Ssm, step: f64, tolerance: f64) -> Result<Ssm> {
    ssm.validate()?;
    if !(step > 0.0) || !step.is_finite() {
        return Err(S4Error::InvalidStep(step));
    }

    let n = ssm.state_size();
    let eye = CMatrix::identity(n);
    let half = ssm.a.scale(c(step / 2.0, 0.0));

    let bl = eye.sub(&half)?.inverse(tolerance).map_err(|e| match e {
        S4Error::SingularMatrix { column, pivot } => S4Error::SingularOperator { step, column, pivot },
        other => other,
    })?;

    let a_bar = bl.matmul(&eye.add(&half)?)?;
    let b_bar = bl.scale(c(step, 0.0)).matmul(&ssm.b)?;

    Ok(Ssm {
        a: a_bar,
        b: b_bar,
        c: ssm.c.clone(),
    })
}
