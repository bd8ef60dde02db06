//! S4Layer: H independent SSM channels sharing one HiPPO/DPLR structure.
//!
//! Structure (Λ, p, q, V, I - Ā^L) depends only on N, L and Δ, so it is
//! built once and shared read-only through an `Arc`. Learned parameters
//! (B, C, D per channel) live in [`S4Params`] and are passed to every call.
//!
//! Architecture: per-channel kernel (generating function) → causal conv → D skip
//! Supports both full-sequence convolution and the step-by-step recurrence.

use std::sync::Arc;

use rand::Rng;

use s4_core::{CMatrix, Result, S4Error, Shape, C64};

use crate::complex_utils::{all_close, check_len, to_complex};
use crate::config::{KernelPath, S4Config};
use crate::conv::convolve;
use crate::discretize::discretize;
use crate::dplr::{make_dplr, DplrHippo};
use crate::generator::{boundary_correction, build_generator, c_tilde, evaluate_kernel};
use crate::naive::kernel_conv_real;
use crate::ssm::{scan_ssm, Ssm};

/// Structural constants for one (N, L, Δ).
#[derive(Debug)]
pub struct S4Structure {
    pub config: S4Config,
    pub dplr: DplrHippo,
    /// diag(Λ) - p·q*
    pub a_dplr: CMatrix,
    /// I - Ā^L
    pub correction: CMatrix,
}

impl S4Structure {
    pub fn new(config: &S4Config) -> Result<Self> {
        config.validate()?;
        let n = config.d_state;
        let step = config.step();

        let dplr = make_dplr(n, &config.eigen)?;
        let a_dplr = dplr.dense_a();

        // Ā does not depend on B or C.
        let probe = Ssm::new(a_dplr.clone(), CMatrix::zeros(n, 1), CMatrix::zeros(1, n))?;
        let a_bar = discretize(&probe, step, config.singular_tolerance)?.a;
        let correction = boundary_correction(&a_bar, config.l_max)?;

        log::debug!(
            "S4 structure N={} L={} step={:e}: |I - A^L| = {:.3e}",
            n,
            config.l_max,
            step,
            correction.max_abs()
        );

        Ok(Self {
            config: config.clone(),
            dplr,
            a_dplr,
            correction,
        })
    }

    pub fn state_size(&self) -> usize {
        self.config.d_state
    }
}

/// Learned parameters of one channel, in the DPLR basis.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelParams {
    pub b: Vec<C64>,
    pub c: Vec<C64>,
    pub d: f64,
}

impl ChannelParams {
    pub fn new(b: Vec<C64>, c: Vec<C64>, d: f64) -> Self {
        Self { b, c, d }
    }

    /// Project real vectors given in the HiPPO basis (B = V*·b, C = c·V).
    ///
    /// Parameters built this way describe a real SSM, so their kernels are real.
    pub fn from_hippo_basis(structure: &S4Structure, b_real: &[f64], c_real: &[f64], d: f64) -> Result<Self> {
        let n = structure.state_size();
        check_real_len("B", b_real, n)?;
        check_real_len("C", c_real, n)?;
        Ok(Self {
            b: structure.dplr.project_input(&to_complex(b_real))?,
            c: structure.dplr.project_output(&to_complex(c_real))?,
            d,
        })
    }
}

/// Parameters for every channel of a layer.
#[derive(Clone, Debug, PartialEq)]
pub struct S4Params {
    pub channels: Vec<ChannelParams>,
}

impl S4Params {
    /// Lecun-normal B (fan-in N) and C (fan-in 1) in the HiPPO basis, D = 1.
    pub fn init<R: Rng + ?Sized>(structure: &S4Structure, rng: &mut R) -> Result<Self> {
        let n = structure.state_size();
        let b_std = 1.0 / (n as f64).sqrt();
        let channels = (0..structure.config.channels)
            .map(|_| {
                let b: Vec<f64> = (0..n).map(|_| normal(rng) * b_std).collect();
                let c: Vec<f64> = (0..n).map(|_| normal(rng)).collect();
                ChannelParams::from_hippo_basis(structure, &b, &c, 1.0)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { channels })
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }
}

/// Multi-channel S4 sequence layer.
#[derive(Clone, Debug)]
pub struct S4Layer {
    structure: Arc<S4Structure>,
}

impl S4Layer {
    pub fn new(config: &S4Config) -> Result<Self> {
        Ok(Self::with_structure(Arc::new(S4Structure::new(config)?)))
    }

    /// Layer over an existing structure; several layers may share one.
    pub fn with_structure(structure: Arc<S4Structure>) -> Self {
        Self { structure }
    }

    pub fn structure(&self) -> &Arc<S4Structure> {
        &self.structure
    }

    pub fn config(&self) -> &S4Config {
        &self.structure.config
    }

    /// Kernel K[0..l_max) for one channel.
    pub fn kernel(&self, ch: &ChannelParams) -> Result<Vec<f64>> {
        self.check_channel(ch)?;
        match self.config().kernel_path {
            KernelPath::Dplr => self.kernel_dplr(ch),
            KernelPath::Naive => self.kernel_naive(ch),
        }
    }

    /// Kernels of every channel, in channel order.
    pub fn kernels(&self, params: &S4Params) -> Result<Vec<Vec<f64>>> {
        self.check_params(params)?;
        params.channels.iter().map(|ch| self.kernel(ch)).collect()
    }

    /// Convolutional forward pass.
    ///
    /// `u`: shape (H, seq_len), channel-major
    /// Returns: shape (H, seq_len)
    pub fn forward(&self, params: &S4Params, u: &[f64], seq_len: usize) -> Result<Vec<f64>> {
        self.check_input(params, u, seq_len)?;
        let kernels = self.kernels(params)?;

        let mut output = Vec::with_capacity(u.len());
        for ((ch, k), u_ch) in params.channels.iter().zip(&kernels).zip(u.chunks(seq_len.max(1))) {
            output.extend(convolve(k, u_ch, ch.d, &self.config().conv_mode));
        }
        Ok(output)
    }

    /// Recurrent forward pass: steps the discrete SSM of every channel from a
    /// zero state. Matches [`S4Layer::forward`] while `seq_len <= l_max`.
    ///
    /// `u`: shape (H, seq_len), channel-major
    pub fn forward_recurrent(&self, params: &S4Params, u: &[f64], seq_len: usize) -> Result<Vec<f64>> {
        self.check_input(params, u, seq_len)?;
        let x0 = vec![C64::new(0.0, 0.0); self.structure.state_size()];

        let mut output = Vec::with_capacity(u.len());
        for (ch, u_ch) in params.channels.iter().zip(u.chunks(seq_len.max(1))) {
            let discrete = self.discrete_ssm(ch)?;
            let y = scan_ssm(&discrete, u_ch, &x0)?;
            output.extend(y.iter().zip(u_ch).map(|(yi, &ui)| yi.re + ch.d * ui));
        }
        Ok(output)
    }

    /// Compare the DPLR kernel of `ch` against the matrix-power oracle.
    pub fn cross_validate(&self, ch: &ChannelParams, rtol: f64, atol: f64) -> Result<bool> {
        self.check_channel(ch)?;
        let fast = self.kernel_dplr(ch)?;
        let oracle = self.kernel_naive(ch)?;
        let max_diff = fast
            .iter()
            .zip(&oracle)
            .fold(0.0f64, |m, (a, b)| m.max((a - b).abs()));
        log::debug!("cross-validation: max |K_dplr - K_naive| = {:e}", max_diff);
        Ok(all_close(&fast, &oracle, rtol, atol))
    }

    fn kernel_dplr(&self, ch: &ChannelParams) -> Result<Vec<f64>> {
        let s = &self.structure;
        let cfg = &s.config;
        let ct = c_tilde(&ch.c, &s.correction)?;
        let gen = build_generator(&s.dplr.lambda, &s.dplr.p, &s.dplr.q, &ch.b, &ct, cfg.step())?
            .with_pole_policy(cfg.pole_tolerance, cfg.pole_policy.clone());
        evaluate_kernel(&gen, cfg.l_max, cfg.imag_tolerance)
    }

    fn kernel_naive(&self, ch: &ChannelParams) -> Result<Vec<f64>> {
        kernel_conv_real(&self.discrete_ssm(ch)?, self.config().l_max)
    }

    fn discrete_ssm(&self, ch: &ChannelParams) -> Result<Ssm> {
        let s = &self.structure;
        let ssm = Ssm::new(s.a_dplr.clone(), CMatrix::column(&ch.b), CMatrix::row(&ch.c))?;
        discretize(&ssm, s.config.step(), s.config.singular_tolerance)
    }

    fn check_channel(&self, ch: &ChannelParams) -> Result<()> {
        let n = self.structure.state_size();
        check_len("B", &ch.b, n)?;
        check_len("C", &ch.c, n)
    }

    fn check_params(&self, params: &S4Params) -> Result<()> {
        let h = self.config().channels;
        Shape::vector(h).ensure("channels", Shape::vector(params.num_channels()))
    }

    fn check_input(&self, params: &S4Params, u: &[f64], seq_len: usize) -> Result<()> {
        self.check_params(params)?;
        let h = self.config().channels;
        if u.len() == h * seq_len {
            return Ok(());
        }
        Err(S4Error::DimensionMismatch {
            context: "input",
            expected: Shape::matrix(h, seq_len),
            got: Shape::vector(u.len()),
        })
    }
}

fn check_real_len(context: &'static str, v: &[f64], n: usize) -> Result<()> {
    Shape::vector(n).ensure(context, Shape::vector(v.len()))
}

/// Standard normal sample (Box-Muller).
fn normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny_layer() -> (S4Layer, S4Params) {
        let layer = S4Layer::new(&S4Config::tiny()).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let params = S4Params::init(layer.structure(), &mut rng).unwrap();
        (layer, params)
    }

    #[test]
    fn test_structure_shapes() {
        let s = S4Structure::new(&S4Config::tiny()).unwrap();
        assert_eq!(s.a_dplr.shape(), Shape::matrix(4, 4));
        assert_eq!(s.correction.shape(), Shape::matrix(4, 4));
        assert!(s.dplr.lambda.iter().all(|l| l.re < 0.0));
    }

    #[test]
    fn test_structure_rejects_bad_config() {
        let mut cfg = S4Config::tiny();
        cfg.d_state = 0;
        assert!(matches!(S4Structure::new(&cfg), Err(S4Error::InvalidConfig(_))));
    }

    #[test]
    fn test_init_shapes() {
        let (layer, params) = tiny_layer();
        assert_eq!(params.num_channels(), 2);
        assert!(params.channels.iter().all(|ch| ch.b.len() == 4 && ch.c.len() == 4 && ch.d == 1.0));
        assert_eq!(layer.kernels(&params).unwrap().len(), 2);
    }

    #[test]
    fn test_kernel_matches_oracle() {
        let (layer, params) = tiny_layer();
        for ch in &params.channels {
            assert!(layer.cross_validate(ch, 1e-2, 1e-4).unwrap());
        }
    }

    #[test]
    fn test_naive_path_selected() {
        let mut cfg = S4Config::tiny();
        cfg.kernel_path = KernelPath::Naive;
        let naive = S4Layer::new(&cfg).unwrap();
        let (fast, params) = tiny_layer();
        let ch = &params.channels[0];
        let a = naive.kernel(ch).unwrap();
        let b = fast.kernel(ch).unwrap();
        assert!(all_close(&b, &a, 1e-2, 1e-4));
    }

    #[test]
    fn test_forward_matches_recurrence() {
        let (layer, params) = tiny_layer();
        let seq_len = 16;
        let u: Vec<f64> = (0..2 * seq_len).map(|i| ((i % 5) as f64 - 2.0) * 0.5).collect();
        let conv = layer.forward(&params, &u, seq_len).unwrap();
        let rec = layer.forward_recurrent(&params, &u, seq_len).unwrap();
        assert_eq!(conv.len(), u.len());
        assert!(all_close(&conv, &rec, 1e-2, 1e-4));
    }

    #[test]
    fn test_forward_rejects_bad_input() {
        let (layer, params) = tiny_layer();
        assert!(matches!(
            layer.forward(&params, &[0.0; 15], 8),
            Err(S4Error::DimensionMismatch { context: "input", .. })
        ));
        let one = S4Params { channels: params.channels[..1].to_vec() };
        assert!(matches!(
            layer.forward(&one, &[0.0; 16], 8),
            Err(S4Error::DimensionMismatch { context: "channels", .. })
        ));
    }

    #[test]
    fn test_channel_params_checked() {
        let (layer, _) = tiny_layer();
        let bad = ChannelParams::new(vec![C64::new(1.0, 0.0); 3], vec![C64::new(1.0, 0.0); 4], 0.0);
        assert!(matches!(layer.kernel(&bad), Err(S4Error::DimensionMismatch { context: "B", .. })));
        assert!(ChannelParams::from_hippo_basis(layer.structure(), &[1.0; 4], &[1.0; 5], 0.0).is_err());
    }

    #[test]
    fn test_structure_shared_across_threads() {
        let (layer, params) = tiny_layer();
        let other = S4Layer::with_structure(Arc::clone(layer.structure()));
        let expected = layer.kernels(&params).unwrap();
        let got = std::thread::spawn(move || other.kernels(&params).unwrap())
            .join()
            .unwrap();
        assert_eq!(got, expected);
    }
}
