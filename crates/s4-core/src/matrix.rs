use std::fmt;
use std::ops::{Index, IndexMut};

use num_complex::Complex;

use crate::error::S4Error;
use crate::shape::Shape;
use crate::Result;

/// Complex f64 scalar used throughout the pipeline.
pub type C64 = Complex<f64>;

const ZERO: C64 = C64::new(0.0, 0.0);
const ONE: C64 = C64::new(1.0, 0.0);

/// Dense complex matrix in row-major storage.
///
/// Sizes here are small (N up to a few hundred), so every operation is a
/// straightforward loop nest. Column vectors are `N x 1`, row vectors `1 x N`.
#[derive(Clone, PartialEq)]
pub struct CMatrix {
    rows: usize,
    cols: usize,
    data: Vec<C64>,
}

impl CMatrix {
    // =========================================================================
    // Constructors
    // =========================================================================

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![ZERO; rows * cols],
        }
    }

    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m.data[i * n + i] = ONE;
        }
        m
    }

    /// Build from row-major complex data.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<C64>) -> Result<Self> {
        Shape::vector(rows * cols).ensure("matrix data", Shape::vector(data.len()))?;
        Ok(Self { rows, cols, data })
    }

    /// Build from row-major real data.
    pub fn from_real(rows: usize, cols: usize, data: &[f64]) -> Result<Self> {
        Self::from_vec(rows, cols, data.iter().map(|&x| C64::new(x, 0.0)).collect())
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> C64) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Self { rows, cols, data }
    }

    /// `N x 1` column vector.
    pub fn column(v: &[C64]) -> Self {
        Self {
            rows: v.len(),
            cols: 1,
            data: v.to_vec(),
        }
    }

    /// `1 x N` row vector.
    pub fn row(v: &[C64]) -> Self {
        Self {
            rows: 1,
            cols: v.len(),
            data: v.to_vec(),
        }
    }

    pub fn diag(v: &[C64]) -> Self {
        let n = v.len();
        let mut m = Self::zeros(n, n);
        for (i, &x) in v.iter().enumerate() {
            m.data[i * n + i] = x;
        }
        m
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> Shape {
        Shape::matrix(self.rows, self.cols)
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn as_slice(&self) -> &[C64] {
        &self.data
    }


    // =========================================================================
    // Arithmetic
    // =========================================================================

    pub fn scale(&self, s: C64) -> Self {
        Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| x * s).collect(),
        }
    }

    pub fn add(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "matrix add", |a, b| a + b)
    }

    pub fn sub(&self, other: &Self) -> Result<Self> {
        self.zip_with(other, "matrix sub", |a, b| a - b)
    }

    fn zip_with(&self, other: &Self, context: &'static str, f: impl Fn(C64, C64) -> C64) -> Result<Self> {
        self.shape().ensure(context, other.shape())?;
        Ok(Self {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().zip(&other.data).map(|(&a, &b)| f(a, b)).collect(),
        })
    }

    pub fn matmul(&self, other: &Self) -> Result<Self> {
        Shape::matrix(self.cols, other.cols).ensure("matmul", other.shape())?;
        let (m, k, n) = (self.rows, self.cols, other.cols);
        let mut out = Self::zeros(m, n);
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                if a == ZERO {
                    continue;
                }
                for j in 0..n {
                    out.data[i * n + j] += a * other.data[p * n + j];
                }
            }
        }
        Ok(out)
    }

    /// `self @ v` for a plain vector `v`.
    pub fn mul_vec(&self, v: &[C64]) -> Result<Vec<C64>> {
        Shape::vector(self.cols).ensure("matrix-vector product", Shape::vector(v.len()))?;
        Ok((0..self.rows)
            .map(|i| {
                self.data[i * self.cols..(i + 1) * self.cols]
                    .iter()
                    .zip(v)
                    .map(|(&a, &x)| a * x)
                    .sum()
            })
            .collect())
    }

    /// `v @ self` for a row vector `v`.
    pub fn vec_mul(&self, v: &[C64]) -> Result<Vec<C64>> {
        Shape::vector(self.rows).ensure("vector-matrix product", Shape::vector(v.len()))?;
        let mut out = vec![ZERO; self.cols];
        for (i, &x) in v.iter().enumerate() {
            for j in 0..self.cols {
                out[j] += x * self.data[i * self.cols + j];
            }
        }
        Ok(out)
    }

    /// Conjugate transpose (A*).
    pub fn adjoint(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)].conj())
    }

    pub fn transpose(&self) -> Self {
        Self::from_fn(self.cols, self.rows, |i, j| self[(j, i)])
    }

    /// Inverse by Gauss-Jordan elimination with partial pivoting.
    ///
    /// Fails with [`S4Error::SingularMatrix`] when the best available pivot is
    /// at most `tolerance` times the largest entry magnitude.
    pub fn inverse(&self, tolerance: f64) -> Result<Self> {
        Shape::matrix(self.rows, self.rows).ensure("matrix inverse", self.shape())?;
        let n = self.rows;
        let scale = self.max_abs().max(f64::MIN_POSITIVE);
        let mut a = self.clone();
        let mut inv = Self::identity(n);

        for col in 0..n {
            let (pivot_row, pivot_mag) = (col..n)
                .map(|r| (r, a[(r, col)].norm()))
                .fold((col, -1.0), |best, cur| if cur.1 > best.1 { cur } else { best });
            if !(pivot_mag > tolerance * scale) {
                return Err(S4Error::SingularMatrix {
                    column: col,
                    pivot: pivot_mag,
                });
            }
            if pivot_row != col {
                a.swap_rows(pivot_row, col);
                inv.swap_rows(pivot_row, col);
            }

            let pivot_inv = a[(col, col)].inv();
            for j in 0..n {
                a.data[col * n + j] *= pivot_inv;
                inv.data[col * n + j] *= pivot_inv;
            }

            for r in 0..n {
                if r == col {
                    continue;
                }
                let factor = a[(r, col)];
                if factor == ZERO {
                    continue;
                }
                for j in 0..n {
                    let av = a.data[col * n + j];
                    let iv = inv.data[col * n + j];
                    a.data[r * n + j] -= factor * av;
                    inv.data[r * n + j] -= factor * iv;
                }
            }
        }

        Ok(inv)
    }

    /// Integer matrix power by repeated squaring.
    pub fn pow(&self, mut exp: usize) -> Result<Self> {
        Shape::matrix(self.rows, self.rows).ensure("matrix power", self.shape())?;
        let mut result = Self::identity(self.rows);
        let mut base = self.clone();
        while exp > 0 {
            if exp & 1 == 1 {
                result = result.matmul(&base)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = base.matmul(&base)?;
            }
        }
        Ok(result)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for j in 0..self.cols {
            self.data.swap(a * self.cols + j, b * self.cols + j);
        }
    }

    // =========================================================================
    // Norms
    // =========================================================================

    pub fn max_abs(&self) -> f64 {
        self.data.iter().map(|x| x.norm()).fold(0.0, f64::max)
    }

    pub fn frobenius_norm(&self) -> f64 {
        self.data.iter().map(|x| x.norm_sqr()).sum::<f64>().sqrt()
    }

    /// Largest elementwise distance to `other` (infinite on shape mismatch).
    pub fn max_abs_diff(&self, other: &Self) -> f64 {
        if self.rows != other.rows || self.cols != other.cols {
            return f64::INFINITY;
        }
        self.data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }
}

impl Index<(usize, usize)> for CMatrix {
    type Output = C64;

    fn index(&self, (i, j): (usize, usize)) -> &C64 {
        &self.data[i * self.cols + j]
    }
}

impl IndexMut<(usize, usize)> for CMatrix {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut C64 {
        &mut self.data[i * self.cols + j]
    }
}

impl fmt::Debug for CMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CMatrix({}x{}) [", self.rows, self.cols)?;
        for i in 0..self.rows {
            write!(f, "  ")?;
            for j in 0..self.cols {
                let x = self[(i, j)];
                write!(f, "{:.4}{:+.4}i ", x.re, x.im)?;
            }
            writeln!(f)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: f64) -> C64 {
        C64::new(x, 0.0)
    }

    #[test]
    fn test_matmul_identity() {
        let a = CMatrix::from_real(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let i = CMatrix::identity(2);
        assert_eq!(a.matmul(&i).unwrap(), a);
        assert_eq!(i.matmul(&a).unwrap(), a);
    }

    #[test]
    fn test_matmul_shape_mismatch() {
        let a = CMatrix::zeros(2, 3);
        let b = CMatrix::zeros(2, 3);
        assert!(matches!(a.matmul(&b), Err(S4Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_inverse_2x2() {
        let a = CMatrix::from_real(2, 2, &[4.0, 7.0, 2.0, 6.0]).unwrap();
        let inv = a.inverse(1e-12).unwrap();
        let prod = a.matmul(&inv).unwrap();
        assert!(prod.max_abs_diff(&CMatrix::identity(2)) < 1e-12);
        assert!((inv[(0, 0)].re - 0.6).abs() < 1e-12);
        assert!((inv[(0, 1)].re + 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_inverse_complex_needs_pivot() {
        let a = CMatrix::from_vec(2, 2, vec![r(0.0), C64::new(0.0, 1.0), r(2.0), r(1.0)]).unwrap();
        let inv = a.inverse(1e-12).unwrap();
        assert!(a.matmul(&inv).unwrap().max_abs_diff(&CMatrix::identity(2)) < 1e-12);
    }

    #[test]
    fn test_inverse_singular() {
        let a = CMatrix::from_real(2, 2, &[1.0, 2.0, 2.0, 4.0]).unwrap();
        assert!(matches!(a.inverse(1e-12), Err(S4Error::SingularMatrix { column: 1, .. })));
    }

    #[test]
    fn test_pow_matches_repeated_product() {
        let a = CMatrix::from_real(2, 2, &[0.9, 0.1, -0.2, 0.8]).unwrap();
        let mut expected = CMatrix::identity(2);
        for _ in 0..7 {
            expected = expected.matmul(&a).unwrap();
        }
        assert!(a.pow(7).unwrap().max_abs_diff(&expected) < 1e-12);
        assert_eq!(a.pow(0).unwrap(), CMatrix::identity(2));
    }

    #[test]
    fn test_vector_products() {
        let a = CMatrix::from_real(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let y = a.mul_vec(&[r(1.0), r(0.0), r(-1.0)]).unwrap();
        assert_eq!(y, vec![r(-2.0), r(-2.0)]);
        let z = a.vec_mul(&[r(1.0), r(1.0)]).unwrap();
        assert_eq!(z, vec![r(5.0), r(7.0), r(9.0)]);
        assert!(a.mul_vec(&[r(1.0)]).is_err());
    }

    #[test]
    fn test_adjoint() {
        let a = CMatrix::from_vec(1, 2, vec![C64::new(1.0, 2.0), C64::new(3.0, -4.0)]).unwrap();
        let h = a.adjoint();
        assert_eq!(h.shape(), Shape::matrix(2, 1));
        assert_eq!(h[(0, 0)], C64::new(1.0, -2.0));
        assert_eq!(h[(1, 0)], C64::new(3.0, 4.0));
    }
}
