//! S4 kernel configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use s4_core::{Result, S4Error};

/// Jacobi eigensolver settings for the HiPPO → DPLR transform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EigenConfig {
    /// Maximum number of full cyclic sweeps
    #[serde(default = "default_max_sweeps")]
    pub max_sweeps: usize,
    /// Convergence threshold on ‖offdiag‖ / ‖H‖
    #[serde(default = "default_eigen_tolerance")]
    pub tolerance: f64,
}

fn default_max_sweeps() -> usize { 64 }
fn default_eigen_tolerance() -> f64 { 1e-12 }

impl Default for EigenConfig {
    fn default() -> Self {
        Self {
            max_sweeps: default_max_sweeps(),
            tolerance: default_eigen_tolerance(),
        }
    }
}

/// What to do when a Cauchy pole lands on an evaluation point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolePolicy {
    /// Report [`S4Error::DegeneratePole`].
    Reject,
    /// Shift the offending denominator by `epsilon`. This is an approximation.
    Perturb { epsilon: f64 },
}

/// How the sequence transformer convolves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvMode {
    Direct,
    Fft,
    /// FFT once the sequence reaches `threshold` samples.
    Auto { threshold: usize },
}

/// Which kernel builder the layer uses.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelPath {
    /// Generating function over the DPLR structure, O(L·N).
    Dplr,
    /// Explicit matrix powers, O(L·N²). Reference only.
    Naive,
}

/// Configuration of one S4 layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct S4Config {
    /// SSM state size N
    pub d_state: usize,
    /// Kernel length L
    pub l_max: usize,
    /// Number of independent channels H
    #[serde(default = "default_channels")]
    pub channels: usize,
    /// Discretization step; defaults to 1 / l_max
    #[serde(default)]
    pub step: Option<f64>,
    /// Allowed imaginary residual of the kernel, relative to max(1, max|K|)
    #[serde(default = "default_imag_tolerance")]
    pub imag_tolerance: f64,
    /// Minimum |g(z) - Λ_i| before a pole is considered degenerate
    #[serde(default = "default_pole_tolerance")]
    pub pole_tolerance: f64,
    /// Relative pivot threshold for the bilinear transform inverse
    #[serde(default = "default_singular_tolerance")]
    pub singular_tolerance: f64,
    #[serde(default = "default_pole_policy")]
    pub pole_policy: PolePolicy,
    #[serde(default = "default_conv_mode")]
    pub conv_mode: ConvMode,
    #[serde(default = "default_kernel_path")]
    pub kernel_path: KernelPath,
    #[serde(default)]
    pub eigen: EigenConfig,
}

fn default_channels() -> usize { 1 }
fn default_imag_tolerance() -> f64 { 1e-4 }
fn default_pole_tolerance() -> f64 { 1e-12 }
fn default_singular_tolerance() -> f64 { 1e-12 }
fn default_pole_policy() -> PolePolicy { PolePolicy::Reject }
fn default_conv_mode() -> ConvMode { ConvMode::Auto { threshold: 256 } }
fn default_kernel_path() -> KernelPath { KernelPath::Dplr }

impl S4Config {
    pub fn new(d_state: usize, l_max: usize, channels: usize) -> Self {
        Self {
            d_state,
            l_max,
            channels,
            step: None,
            imag_tolerance: default_imag_tolerance(),
            pole_tolerance: default_pole_tolerance(),
            singular_tolerance: default_singular_tolerance(),
            pole_policy: default_pole_policy(),
            conv_mode: default_conv_mode(),
            kernel_path: default_kernel_path(),
            eigen: EigenConfig::default(),
        }
    }

    /// Small configuration for tests.
    pub fn tiny() -> Self {
        Self::new(4, 16, 2)
    }

    /// Effective step Δ.
    pub fn step(&self) -> f64 {
        self.step.unwrap_or(1.0 / self.l_max as f64)
    }

    pub fn validate(&self) -> Result<()> {
        if self.d_state == 0 {
            return Err(S4Error::InvalidConfig("d_state must be positive".to_string()));
        }
        if self.l_max == 0 {
            return Err(S4Error::InvalidConfig("l_max must be positive".to_string()));
        }
        if self.channels == 0 {
            return Err(S4Error::InvalidConfig("channels must be positive".to_string()));
        }
        let step = self.step();
        if !(step > 0.0) || !step.is_finite() {
            return Err(S4Error::InvalidStep(step));
        }
        for (name, tol) in [
            ("imag_tolerance", self.imag_tolerance),
            ("pole_tolerance", self.pole_tolerance),
            ("singular_tolerance", self.singular_tolerance),
            ("eigen.tolerance", self.eigen.tolerance),
        ] {
            if !(tol >= 0.0) || !tol.is_finite() {
                return Err(S4Error::InvalidConfig(format!("{} must be finite and non-negative, got {}", name, tol)));
            }
        }
        if let PolePolicy::Perturb { epsilon } = self.pole_policy {
            if !(epsilon > 0.0) || !epsilon.is_finite() {
                return Err(S4Error::InvalidConfig(format!("pole epsilon must be positive, got {}", epsilon)));
            }
        }
        Ok(())
    }
}

/// Load an [`S4Config`] from a JSON file and validate it.
pub fn load_config(path: &Path) -> Result<S4Config> {
    let text = std::fs::read_to_string(path)?;
    let config: S4Config =
        serde_json::from_str(&text).map_err(|e| S4Error::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_minimal_json() {
        let cfg: S4Config = serde_json::from_str(r#"{"d_state": 8, "l_max": 32}"#).unwrap();
        assert_eq!(cfg.channels, 1);
        assert_eq!(cfg.step(), 1.0 / 32.0);
        assert_eq!(cfg.pole_policy, PolePolicy::Reject);
        assert_eq!(cfg.kernel_path, KernelPath::Dplr);
        assert_eq!(cfg.eigen, EigenConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_enum_spelling() {
        let cfg: S4Config = serde_json::from_str(
            r#"{"d_state": 4, "l_max": 8, "pole_policy": {"perturb": {"epsilon": 1e-9}},
                "conv_mode": "fft", "kernel_path": "naive"}"#,
        )
        .unwrap();
        assert_eq!(cfg.pole_policy, PolePolicy::Perturb { epsilon: 1e-9 });
        assert_eq!(cfg.conv_mode, ConvMode::Fft);
        assert_eq!(cfg.kernel_path, KernelPath::Naive);
    }

    #[test]
    fn test_json_round_trip() {
        let mut cfg = S4Config::tiny();
        cfg.step = Some(0.01);
        let text = serde_json::to_string(&cfg).unwrap();
        let back: S4Config = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_validate_rejects() {
        let mut cfg = S4Config::tiny();
        cfg.step = Some(-1.0);
        assert!(matches!(cfg.validate(), Err(S4Error::InvalidStep(_))));

        let mut cfg = S4Config::tiny();
        cfg.channels = 0;
        assert!(matches!(cfg.validate(), Err(S4Error::InvalidConfig(_))));

        let mut cfg = S4Config::tiny();
        cfg.pole_policy = PolePolicy::Perturb { epsilon: 0.0 };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/s4.json")).unwrap_err();
        assert!(matches!(err, S4Error::Io(_)));
    }
}
