//! DPLR (Diagonal Plus Low-Rank) form of the HiPPO operator.
//!
//! HiPPO-LegS is not normal, but S = A + P·Pᵀ is a skew-symmetric matrix
//! shifted by -½·I. Diagonalizing S unitarily gives
//!
//!   A = V·(diag(Λ) - p·q*)·V*,   p = q = V*·P,
//!
//! with every Λ on the line Re = -½.

use s4_core::{CMatrix, Result, S4Error, C64};

use crate::complex_utils::{c, to_complex};
use crate::config::EigenConfig;
use crate::hippo::{hermitian_eigen, make_nplr_hippo};

/// HiPPO-LegS expressed in its DPLR basis.
#[derive(Clone, Debug)]
pub struct DplrHippo {
    /// Diagonal Λ, shape (N,); Re(Λ) < 0.
    pub lambda: Vec<C64>,
    /// Low-rank factor p = V*·P, shape (N,).
    pub p: Vec<C64>,
    /// Low-rank factor q = V*·P, shape (N,).
    pub q: Vec<C64>,
    /// HiPPO input vector projected into the DPLR basis, V*·B.
    pub b: Vec<C64>,
    /// Unitary change of basis, shape (N, N).
    pub v: CMatrix,
}

impl DplrHippo {
    pub fn state_size(&self) -> usize {
        self.lambda.len()
    }

    /// Dense DPLR operator diag(Λ) - p·q*.
    pub fn dense_a(&self) -> CMatrix {
        let n = self.state_size();
        CMatrix::from_fn(n, n, |i, j| {
            let low_rank = self.p[i] * self.q[j].conj();
            if i == j {
                self.lambda[i] - low_rank
            } else {
                -low_rank
            }
        })
    }

    /// V·(diag(Λ) - p·q*)·V*, which recovers the HiPPO matrix.
    pub fn reconstruct(&self) -> Result<CMatrix> {
        self.v.matmul(&self.dense_a())?.matmul(&self.v.adjoint())
    }

    /// Map an input vector from the HiPPO basis into the DPLR basis (V*·b).
    pub fn project_input(&self, b: &[C64]) -> Result<Vec<C64>> {
        self.v.adjoint().mul_vec(b)
    }

    /// Map an output row vector from the HiPPO basis into the DPLR basis (c·V).
    pub fn project_output(&self, c_row: &[C64]) -> Result<Vec<C64>> {
        self.v.vec_mul(c_row)
    }
}

/// Factor HiPPO-LegS of size `n` into DPLR form.
///
/// Computed once per state size; the result is reused for every kernel.
pub fn make_dplr(n: usize, eigen: &EigenConfig) -> Result<DplrHippo> {
    if n == 0 {
        return Err(S4Error::DecompositionFailed {
            n,
            reason: "state size must be positive".to_string(),
        });
    }
    let (hippo, p_real, b_real) = make_nplr_hippo(n);

    // S = A + P Pᵀ, then check S + ½I is skew-symmetric.
    let s = CMatrix::from_fn(n, n, |i, j| hippo[(i, j)] + c(p_real[i] * p_real[j], 0.0));
    let shifted = s.add(&CMatrix::identity(n).scale(c(0.5, 0.0)))?;
    let skew_residual = shifted.add(&shifted.transpose())?.max_abs();
    if skew_residual > 1e-9 * shifted.max_abs().max(1.0) {
        return Err(S4Error::DecompositionFailed {
            n,
            reason: format!("S + I/2 is not skew-symmetric (residual {:e})", skew_residual),
        });
    }

    // S + ½I = i·H with H Hermitian.
    let h = shifted.scale(c(0.0, -1.0));
    let (mu, v_raw) = hermitian_eigen(&h, eigen)?;

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| mu[a].total_cmp(&mu[b]));
    let v = CMatrix::from_fn(n, n, |row, col| v_raw[(row, order[col])]);
    let lambda: Vec<C64> = order.iter().map(|&i| c(-0.5, mu[i])).collect();

    if let Some((i, bad)) = lambda.iter().enumerate().find(|(_, l)| !(l.re < 0.0)) {
        return Err(S4Error::DecompositionFailed {
            n,
            reason: format!("eigenvalue {} has non-negative real part {}", i, bad.re),
        });
    }

    let vh = v.adjoint();
    let p = vh.mul_vec(&to_complex(&p_real))?;
    let b = vh.mul_vec(&to_complex(&b_real))?;

    log::debug!(
        "DPLR HiPPO N={}: Im(Λ) in [{:.3}, {:.3}]",
        n,
        lambda.first().map_or(0.0, |l| l.im),
        lambda.last().map_or(0.0, |l| l.im)
    );

    Ok(DplrHippo {
        lambda,
        q: p.clone(),
        p,
        b,
        v,
    })
}
