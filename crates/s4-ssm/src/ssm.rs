//! Linear state-space model triple (A, B, C) and its discrete recurrence.
//!
//! The same struct holds the continuous operators and, after
//! [`crate::discretize::discretize`], the discrete ones.

use s4_core::{CMatrix, Result, Shape, C64};

use crate::complex_utils::c;
use crate::discretize::discretize;

/// State-space operators: A is N×N, B is N×1, C is 1×N.
#[derive(Clone, Debug, PartialEq)]
pub struct Ssm {
    pub a: CMatrix,
    pub b: CMatrix,
    pub c: CMatrix,
}

impl Ssm {
    /// Build an SSM, rejecting operators whose shapes disagree.
    pub fn new(a: CMatrix, b: CMatrix, c: CMatrix) -> Result<Self> {
        let ssm = Self { a, b, c };
        ssm.validate()?;
        Ok(ssm)
    }

    /// Real-valued SSM from row-major A (N×N), B (N) and C (N).
    pub fn from_real(n: usize, a: &[f64], b: &[f64], c: &[f64]) -> Result<Self> {
        Self::new(
            CMatrix::from_real(n, n, a)?,
            CMatrix::from_real(b.len(), 1, b)?,
            CMatrix::from_real(1, c.len(), c)?,
        )
    }

    /// State size N.
    pub fn state_size(&self) -> usize {
        self.a.rows()
    }

    /// Check A square, B N×1 and C 1×N.
    pub fn validate(&self) -> Result<()> {
        let n = self.a.rows();
        Shape::matrix(n, n).ensure("A", self.a.shape())?;
        Shape::matrix(n, 1).ensure("B", self.b.shape())?;
        Shape::matrix(1, n).ensure("C", self.c.shape())
    }

    /// One recurrence step on a discrete SSM: x' = Ā x + B̄ u, y = C̄ x'.
    pub fn step(&self, x: &[C64], u: f64) -> Result<(Vec<C64>, C64)> {
        let mut next = self.a.mul_vec(x)?;
        for (xi, bi) in next.iter_mut().zip(self.b.as_slice()) {
            *xi += *bi * u;
        }
        let y = self.c.mul_vec(&next)?[0];
        Ok((next, y))
    }
}

/// Mass on a spring: m·y'' = u - b·y' - k·y, observed through the velocity.
pub fn mass_spring(k: f64, b: f64, m: f64) -> Ssm {
    Ssm {
        a: CMatrix::from_fn(2, 2, |i, j| match (i, j) {
            (0, 1) => c(1.0, 0.0),
            (1, 0) => c(-k / m, 0.0),
            (1, 1) => c(-b / m, 0.0),
            _ => c(0.0, 0.0),
        }),
        b: CMatrix::column(&[c(0.0, 0.0), c(1.0 / m, 0.0)]),
        c: CMatrix::row(&[c(0.0, 0.0), c(1.0, 0.0)]),
    }
}

/// Run a discrete SSM over `u` starting from state `x0`.
///
/// Returns the complex outputs; real systems produce zero imaginary parts.
pub fn scan_ssm(discrete: &Ssm, u: &[f64], x0: &[C64]) -> Result<Vec<C64>> {
    discrete.validate()?;
    let mut x = x0.to_vec();
    let mut ys = Vec::with_capacity(u.len());
    for &ut in u {
        let (next, y) = discrete.step(&x, ut)?;
        x = next;
        ys.push(y);
    }
    Ok(ys)
}

/// Discretize with step 1/len(u) and run the recurrence from a zero state.
pub fn run_ssm(continuous: &Ssm, u: &[f64], tolerance: f64) -> Result<Vec<f64>> {
    let step = 1.0 / u.len().max(1) as f64;
    let discrete = discretize(continuous, step, tolerance)?;
    let x0 = vec![c(0.0, 0.0); discrete.state_size()];
    Ok(scan_ssm(&discrete, u, &x0)?.iter().map(|y| y.re).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use s4_core::S4Error;

    #[test]
    fn test_mass_spring_shapes() {
        let ssm = mass_spring(5.0, 1.0, 1.0);
        assert!(ssm.validate().is_ok());
        assert_eq!(ssm.a[(1, 0)], c(-5.0, 0.0));
        assert_eq!(ssm.state_size(), 2);
    }

    #[test]
    fn test_new_rejects_bad_b() {
        let a = CMatrix::identity(3);
        let b = CMatrix::zeros(2, 1);
        let cm = CMatrix::zeros(1, 3);
        match Ssm::new(a, b, cm) {
            Err(S4Error::DimensionMismatch { context, expected, got }) => {
                assert_eq!(context, "B");
                assert_eq!(expected, Shape::matrix(3, 1));
                assert_eq!(got, Shape::matrix(2, 1));
            }
            other => panic!("expected dimension mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_scan_identity_accumulates() {
        // Ā = I, B̄ = 1, C̄ = 1 → running sum.
        let ssm = Ssm::from_real(1, &[1.0], &[1.0], &[1.0]).unwrap();
        let y = scan_ssm(&ssm, &[1.0, 2.0, 3.0], &[c(0.0, 0.0)]).unwrap();
        let re: Vec<f64> = y.iter().map(|v| v.re).collect();
        assert_eq!(re, vec![1.0, 3.0, 6.0]);
    }

    #[test]
    fn test_run_ssm_zero_input() {
        let y = run_ssm(&mass_spring(1.0, 1.0, 1.0), &[0.0; 8], 1e-12).unwrap();
        assert!(y.iter().all(|&v| v == 0.0));
    }
}
