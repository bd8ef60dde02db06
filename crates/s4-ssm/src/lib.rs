//! # s4-ssm
//!
//! Structured State Space (S4) convolution kernels.
//!
//! Implements the kernel pipeline from
//! "Efficiently Modeling Long Sequences with Structured State Spaces" (Gu, Goel & Ré, 2021):
//! - bilinear discretization of a continuous SSM
//! - HiPPO-LegS and its diagonal-plus-low-rank (DPLR) factorization
//! - kernel evaluation through the truncated generating function at the roots
//!   of unity (Cauchy kernel + Woodbury identity + inverse FFT)
//! - causal convolution with the kernel, plus a multi-channel layer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rand::SeedableRng;
//! use s4_ssm::{S4Config, S4Layer, S4Params};
//!
//! let layer = S4Layer::new(&S4Config::new(64, 1024, 4)).unwrap();
//! let mut rng = rand::rngs::StdRng::seed_from_u64(0);
//! let params = S4Params::init(layer.structure(), &mut rng).unwrap();
//!
//! let u = vec![0.1; 4 * 1024]; // (H, L), channel-major
//! let y = layer.forward(&params, &u, 1024).unwrap();
//! assert_eq!(y.len(), u.len());
//! ```

pub mod complex_utils;
pub mod config;
pub mod conv;
pub mod discretize;
pub mod dplr;
pub mod generator;
pub mod hippo;
pub mod layer;
pub mod naive;
pub mod ssm;

pub use config::{load_config, ConvMode, EigenConfig, KernelPath, PolePolicy, S4Config};
pub use conv::{apply, apply_fft, convolve, non_circular_convolution};
pub use discretize::discretize;
pub use dplr::{make_dplr, DplrHippo};
pub use generator::{
    boundary_correction, build_generator, c_tilde, evaluate_kernel, evaluate_kernel_complex, kernel_dplr,
    DplrGenerator, GeneratingFunction, InverseGenerator, TruncatedGenerator,
};
pub use hippo::{make_hippo, make_nplr_hippo};
pub use layer::{ChannelParams, S4Layer, S4Params, S4Structure};
pub use naive::{kernel_conv, kernel_conv_real};
pub use ssm::{mass_spring, run_ssm, scan_ssm, Ssm};

pub use s4_core::{CMatrix, Result, S4Error, Shape, C64};
