//! HiPPO (High-order Polynomial Projection Operators) transition matrix.
//!
//! Constructs the LegS operator, its normal-plus-low-rank split, and the
//! Hermitian eigensolver used to diagonalize the normal part.

use s4_core::{CMatrix, Result, S4Error, C64};

use crate::complex_utils::c;
use crate::config::EigenConfig;

/// HiPPO-LegS transition matrix (N, N), real.
///
/// A[n, k] = -√(2n+1)·√(2k+1) for n > k, -(n+1) on the diagonal, 0 above it.
pub fn make_hippo(n: usize) -> CMatrix {
    CMatrix::from_fn(n, n, |row, col| {
        let val = if row > col {
            -((2 * row + 1) as f64).sqrt() * ((2 * col + 1) as f64).sqrt()
        } else if row == col {
            -((row + 1) as f64)
        } else {
            0.0
        };
        c(val, 0.0)
    })
}

/// Rank-1 correction P[n] = √(n + ½) such that A + P·Pᵀ is normal.
pub fn rank_correction(n: usize) -> Vec<f64> {
    (0..n).map(|i| (i as f64 + 0.5).sqrt()).collect()
}

/// HiPPO input vector B[n] = √(2n + 1).
pub fn hippo_b(n: usize) -> Vec<f64> {
    (0..n).map(|i| (2.0 * i as f64 + 1.0).sqrt()).collect()
}

/// Normal-plus-low-rank form of HiPPO-LegS: returns (A, P, B).
pub fn make_nplr_hippo(n: usize) -> (CMatrix, Vec<f64>, Vec<f64>) {
    (make_hippo(n), rank_correction(n), hippo_b(n))
}

/// Eigendecomposition of a Hermitian matrix by cyclic complex Jacobi rotations.
///
/// Returns real eigenvalues (unsorted) and the unitary matrix whose columns
/// are the matching eigenvectors, so that `h = V·diag(w)·V*`.
pub fn hermitian_eigen(h: &CMatrix, cfg: &EigenConfig) -> Result<(Vec<f64>, CMatrix)> {
    let n = h.rows();
    if !h.is_square() {
        return Err(S4Error::DecompositionFailed {
            n,
            reason: format!("matrix is not square: {}", h.shape()),
        });
    }
    let scale = h.frobenius_norm().max(f64::MIN_POSITIVE);
    let asym = h.max_abs_diff(&h.adjoint());
    if asym > 1e-10 * scale {
        return Err(S4Error::DecompositionFailed {
            n,
            reason: format!("matrix is not Hermitian (asymmetry {:e})", asym),
        });
    }

    let mut a = h.clone();
    let mut v = CMatrix::identity(n);

    for sweep in 0..cfg.max_sweeps {
        let off = off_diagonal_norm(&a);
        if off <= cfg.tolerance * scale {
            log::debug!("Jacobi converged for N={} after {} sweeps (off-norm {:e})", n, sweep, off);
            return Ok(((0..n).map(|i| a[(i, i)].re).collect(), v));
        }

        for p in 0..n {
            for q in (p + 1)..n {
                rotate(&mut a, &mut v, p, q);
            }
        }
    }

    let off = off_diagonal_norm(&a);
    if off <= cfg.tolerance * scale {
        return Ok(((0..n).map(|i| a[(i, i)].re).collect(), v));
    }
    Err(S4Error::DecompositionFailed {
        n,
        reason: format!(
            "Jacobi did not converge in {} sweeps (off-diagonal norm {:e})",
            cfg.max_sweeps, off
        ),
    })
}

/// Annihilate a[p, q] with a unitary rotation; accumulate it into `v`.
fn rotate(a: &mut CMatrix, v: &mut CMatrix, p: usize, q: usize) {
    let n = a.rows();
    let apq = a[(p, q)];
    let mag = apq.norm();
    if mag == 0.0 {
        return;
    }

    // Phase: scale column q by d and row q by conj(d) so a[p, q] becomes |a[p, q]|.
    let d = (apq / mag).conj();
    for k in 0..n {
        a[(k, q)] *= d;
        v[(k, q)] *= d;
    }
    for k in 0..n {
        a[(q, k)] *= d.conj();
    }

    // Real Givens rotation on the (p, q) plane.
    let app = a[(p, p)].re;
    let aqq = a[(q, q)].re;
    let theta = (aqq - app) / (2.0 * mag);
    let t = if theta == 0.0 {
        1.0
    } else {
        theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
    };
    let cs = 1.0 / (t * t + 1.0).sqrt();
    let sn = t * cs;

    for k in 0..n {
        if k == p || k == q {
            continue;
        }
        let akp = a[(k, p)];
        let akq = a[(k, q)];
        a[(k, p)] = akp * cs - akq * sn;
        a[(k, q)] = akp * sn + akq * cs;
        a[(p, k)] = a[(k, p)].conj();
        a[(q, k)] = a[(k, q)].conj();
    }
    a[(p, p)] = c(app - t * mag, 0.0);
    a[(q, q)] = c(aqq + t * mag, 0.0);
    a[(p, q)] = C64::new(0.0, 0.0);
    a[(q, p)] = C64::new(0.0, 0.0);

    for k in 0..n {
        let vkp = v[(k, p)];
        let vkq = v[(k, q)];
        v[(k, p)] = vkp * cs - vkq * sn;
        v[(k, q)] = vkp * sn + vkq * cs;
    }
}

fn off_diagonal_norm(a: &CMatrix) -> f64 {
    let n = a.rows();
    let mut sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                sum += a[(i, j)].norm_sqr();
            }
        }
    }
    sum.sqrt()
}
