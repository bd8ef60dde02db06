//! Complex number utilities for S4 kernels.
//!
//! Provides the Cauchy dot product, roots of unity, the bilinear change of
//! variable used by the generating function, and tolerance comparisons.

use std::f64::consts::PI;

use s4_core::{Result, Shape, C64};

/// Create a complex number from real and imaginary parts.
#[inline]
pub fn c(re: f64, im: f64) -> C64 {
    C64::new(re, im)
}

/// Lift a real slice into complex numbers.
pub fn to_complex(v: &[f64]) -> Vec<C64> {
    v.iter().map(|&x| c(x, 0.0)).collect()
}

/// Elementwise conjugate.
pub fn conj(v: &[C64]) -> Vec<C64> {
    v.iter().map(|x| x.conj()).collect()
}

/// Element-wise complex multiply two slices of the same length.
pub fn cmul(a: &[C64], b: &[C64]) -> Vec<C64> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).collect()
}

/// The L-th roots of unity exp(2πi·k/L) for k = 0..L.
pub fn roots_of_unity(l_len: usize) -> Vec<C64> {
    (0..l_len)
        .map(|k| C64::from_polar(1.0, 2.0 * PI * k as f64 / l_len as f64))
        .collect()
}

/// Bilinear change of variable for the generating function at `z`:
/// returns `(g, c)` with g = (2/step)(1 - z)/(1 + z) and c = 2/(1 + z).
///
/// Returns `None` when 1 + z is exactly zero.
#[inline]
pub fn bilinear_nodes(z: C64, step: f64) -> Option<(C64, C64)> {
    let one = c(1.0, 0.0);
    let denom = one + z;
    if denom.norm_sqr() == 0.0 {
        return None;
    }
    let g = (one - z) / denom * (2.0 / step);
    let cz = c(2.0, 0.0) / denom;
    Some((g, cz))
}

/// Cauchy dot product: Σ_i v[i] / (g - lambda[i]).
///
/// Fails with the index of the first pole within `tolerance` of `g`.
pub fn cauchy_dot(v: &[C64], g: C64, lambda: &[C64], tolerance: f64) -> std::result::Result<C64, (usize, f64)> {
    let mut sum = c(0.0, 0.0);
    for (i, (&vi, &li)) in v.iter().zip(lambda).enumerate() {
        let denom = g - li;
        let dist = denom.norm();
        if !(dist > tolerance) {
            return Err((i, dist));
        }
        sum += vi / denom;
    }
    Ok(sum)
}

/// Require `v.len() == n`.
pub fn check_len(context: &'static str, v: &[C64], n: usize) -> Result<()> {
    Shape::vector(n).ensure(context, Shape::vector(v.len()))
}

/// numpy-style `allclose`: |a - b| <= atol + rtol * |b| for every pair.
pub fn all_close(a: &[f64], b: &[f64], rtol: f64, atol: f64) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(&x, &y)| (x - y).abs() <= atol + rtol * y.abs())
}

/// Largest absolute value in a real slice (0 for empty input).
pub fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0f64, |m, &x| m.max(x.abs()))
}
