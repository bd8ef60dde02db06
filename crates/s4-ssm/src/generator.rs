//! Generating-function kernels.
//!
//! The length-L kernel K is recovered from its truncated generating function
//! K̂(z) = Σ_{l<L} K[l]·z^l sampled at the L-th roots of unity followed by an
//! inverse FFT. For a DPLR operator A = diag(Λ) - p·q* every sample costs
//! four Cauchy dot products (O(N)) instead of an N×N inverse.
//!
//! Three generators are provided:
//! - [`DplrGenerator`]: the Cauchy + Woodbury form used by the layer
//! - [`InverseGenerator`]: dense C̃·(I - Ā·z)⁻¹·B̄, for cross-checks
//! - [`TruncatedGenerator`]: the polynomial with explicit coefficients

use rustfft::FftPlanner;

use s4_core::{CMatrix, Result, S4Error, C64};

use crate::complex_utils::{bilinear_nodes, c, cauchy_dot, check_len, cmul, conj, max_abs, roots_of_unity};
use crate::config::PolePolicy;
use crate::ssm::Ssm;

/// A scalar function of a complex argument whose samples at the roots of
/// unity determine a kernel.
pub trait GeneratingFunction {
    fn eval(&self, z: C64) -> Result<C64>;
}

/// Generating function of a bilinear-discretized DPLR SSM.
///
/// K̂(z) = c(z)·[k(C̃,B) - k(C̃,p)·(1 + k(q*,p))⁻¹·k(q*,B)]
/// with k(u, v) = Σ u_i·v_i / (g(z) - Λ_i).
#[derive(Clone, Debug)]
pub struct DplrGenerator {
    lambda: Vec<C64>,
    // Pairwise weights {C̃, q*} × {B, p}.
    w_cb: Vec<C64>,
    w_cp: Vec<C64>,
    w_qb: Vec<C64>,
    w_qp: Vec<C64>,
    step: f64,
    pole_tolerance: f64,
    pole_policy: PolePolicy,
}

/// Build the DPLR generating function.
///
/// `b` is the continuous input vector and `c_tilde` the output vector with
/// the boundary term absorbed (see [`c_tilde`]), both in the DPLR basis.
pub fn build_generator(
    lambda: &[C64],
    p: &[C64],
    q: &[C64],
    b: &[C64],
    c_tilde: &[C64],
    step: f64,
) -> Result<DplrGenerator> {
    let n = lambda.len();
    check_len("p", p, n)?;
    check_len("q", q, n)?;
    check_len("B", b, n)?;
    check_len("C~", c_tilde, n)?;
    if !(step > 0.0) || !step.is_finite() {
        return Err(S4Error::InvalidStep(step));
    }

    let q_conj = conj(q);
    Ok(DplrGenerator {
        lambda: lambda.to_vec(),
        w_cb: cmul(c_tilde, b),
        w_cp: cmul(c_tilde, p),
        w_qb: cmul(&q_conj, b),
        w_qp: cmul(&q_conj, p),
        step,
        pole_tolerance: 1e-12,
        pole_policy: PolePolicy::Reject,
    })
}

impl DplrGenerator {
    /// Override how poles close to an evaluation point are handled.
    pub fn with_pole_policy(mut self, tolerance: f64, policy: PolePolicy) -> Self {
        self.pole_tolerance = tolerance;
        self.pole_policy = policy;
        self
    }

    fn cauchy(&self, w: &[C64], g: C64) -> Result<C64> {
        match cauchy_dot(w, g, &self.lambda, self.pole_tolerance) {
            Ok(v) => Ok(v),
            Err((pole, distance)) => match self.pole_policy {
                PolePolicy::Reject => Err(S4Error::DegeneratePole { point: 0, pole, distance }),
                PolePolicy::Perturb { epsilon } => {
                    log::warn!(
                        "perturbing Cauchy pole {} by {:e} (distance {:e}); kernel is approximate",
                        pole, epsilon, distance
                    );
                    Ok(w
                        .iter()
                        .zip(&self.lambda)
                        .map(|(&wi, &li)| {
                            let mut denom = g - li;
                            if !(denom.norm() > self.pole_tolerance) {
                                denom += epsilon;
                            }
                            wi / denom
                        })
                        .sum())
                }
            },
        }
    }
}

impl GeneratingFunction for DplrGenerator {
    fn eval(&self, z: C64) -> Result<C64> {
        let Some((g, cz)) = bilinear_nodes(z, self.step) else {
            // z = -1: g → ∞ and c·k(u, v) → (step/2)·Σ u_i v_i; the low-rank term vanishes.
            return Ok(self.w_cb.iter().sum::<C64>() * (self.step / 2.0));
        };

        let k00 = self.cauchy(&self.w_cb, g)?;
        let k01 = self.cauchy(&self.w_cp, g)?;
        let k10 = self.cauchy(&self.w_qb, g)?;
        let k11 = self.cauchy(&self.w_qp, g)?;

        let denom = c(1.0, 0.0) + k11;
        if denom.norm() <= self.pole_tolerance {
            return Err(S4Error::WoodburySingular { point: 0, magnitude: denom.norm() });
        }
        Ok(cz * (k00 - k01 * k10 / denom))
    }
}

/// Generating function from explicit kernel coefficients.
#[derive(Clone, Debug)]
pub struct TruncatedGenerator {
    coeffs: Vec<C64>,
}

impl TruncatedGenerator {
    pub fn new(kernel: &[f64]) -> Self {
        Self { coeffs: kernel.iter().map(|&k| c(k, 0.0)).collect() }
    }

    pub fn from_complex(kernel: &[C64]) -> Self {
        Self { coeffs: kernel.to_vec() }
    }
}

impl GeneratingFunction for TruncatedGenerator {
    fn eval(&self, z: C64) -> Result<C64> {
        // Horner
        Ok(self.coeffs.iter().rev().fold(c(0.0, 0.0), |acc, &k| acc * z + k))
    }
}

/// Dense generating function C̃·(I - Ā·z)⁻¹·B̄, one N×N inverse per sample.
#[derive(Clone, Debug)]
pub struct InverseGenerator {
    a_bar: CMatrix,
    b_bar: Vec<C64>,
    c_tilde: Vec<C64>,
    tolerance: f64,
}

impl InverseGenerator {
    /// Build from a discrete SSM for kernel length `l_len`.
    pub fn new(discrete: &Ssm, l_len: usize, tolerance: f64) -> Result<Self> {
        discrete.validate()?;
        let correction = boundary_correction(&discrete.a, l_len)?;
        Ok(Self {
            c_tilde: c_tilde(discrete.c.as_slice(), &correction)?,
            a_bar: discrete.a.clone(),
            b_bar: discrete.b.as_slice().to_vec(),
            tolerance,
        })
    }
}

impl GeneratingFunction for InverseGenerator {
    fn eval(&self, z: C64) -> Result<C64> {
        let n = self.a_bar.rows();
        let resolvent = CMatrix::identity(n).sub(&self.a_bar.scale(z))?.inverse(self.tolerance)?;
        let x = resolvent.mul_vec(&self.b_bar)?;
        Ok(self.c_tilde.iter().zip(&x).map(|(&ci, &xi)| ci * xi).sum())
    }
}

/// Boundary correction I - Ā^L.
pub fn boundary_correction(a_bar: &CMatrix, l_len: usize) -> Result<CMatrix> {
    CMatrix::identity(a_bar.rows()).sub(&a_bar.pow(l_len)?)
}

/// C̃ = C̄·(I - Ā^L) for an output row vector C̄.
pub fn c_tilde(c_bar: &[C64], correction: &CMatrix) -> Result<Vec<C64>> {
    correction.vec_mul(c_bar)
}

/// Sample `gen` at the L-th roots of unity and invert, keeping complex values.
pub fn evaluate_kernel_complex<G: GeneratingFunction + ?Sized>(gen: &G, l_len: usize) -> Result<Vec<C64>> {
    if l_len == 0 {
        return Ok(Vec::new());
    }

    let mut buf = roots_of_unity(l_len)
        .into_iter()
        .enumerate()
        .map(|(k, z)| gen.eval(z).map_err(|e| at_point(e, k)))
        .collect::<Result<Vec<C64>>>()?;

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(l_len).process(&mut buf);

    // K̂ uses z^l where the DFT uses z^-l, so slot k > 0 holds K[L - k].
    let scale = 1.0 / l_len as f64;
    Ok((0..l_len)
        .map(|j| buf[if j == 0 { 0 } else { l_len - j }] * scale)
        .collect())
}

/// Recover the real kernel K[0..L) from its generating function.
///
/// The imaginary part is discarded after checking it stays within
/// `imag_tolerance · max(1, max|K|)`; otherwise [`S4Error::ComplexKernel`].
pub fn evaluate_kernel<G: GeneratingFunction + ?Sized>(gen: &G, l_len: usize, imag_tolerance: f64) -> Result<Vec<f64>> {
    let kernel = evaluate_kernel_complex(gen, l_len)?;
    let re: Vec<f64> = kernel.iter().map(|k| k.re).collect();
    let max_imag = kernel.iter().fold(0.0f64, |m, k| m.max(k.im.abs()));
    let bound = imag_tolerance * max_abs(&re).max(1.0);

    log::debug!("kernel L={}: max |Im| = {:e} (bound {:e})", l_len, max_imag, bound);
    if max_imag > bound {
        return Err(S4Error::ComplexKernel { max_imag, tolerance: bound });
    }
    Ok(re)
}

/// Build the DPLR generator and evaluate a kernel of length `l_len`.
#[allow(clippy::too_many_arguments)]
pub fn kernel_dplr(
    lambda: &[C64],
    p: &[C64],
    q: &[C64],
    b: &[C64],
    c_tilde: &[C64],
    step: f64,
    l_len: usize,
    imag_tolerance: f64,
) -> Result<Vec<f64>> {
    let gen = build_generator(lambda, p, q, b, c_tilde, step)?;
    evaluate_kernel(&gen, l_len, imag_tolerance)
}

fn at_point(err: S4Error, point: usize) -> S4Error {
    match err {
        S4Error::DegeneratePole { pole, distance, .. } => S4Error::DegeneratePole { point, pole, distance },
        S4Error::WoodburySingular { magnitude, .. } => S4Error::WoodburySingular { point, magnitude },
        other => other,
    }
}
