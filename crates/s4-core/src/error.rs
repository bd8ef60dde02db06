use thiserror::Error;

use crate::Shape;

#[derive(Error, Debug)]
pub enum S4Error {
    #[error("Dimension mismatch for {context}: expected {expected}, got {got}")]
    DimensionMismatch {
        context: &'static str,
        expected: Shape,
        got: Shape,
    },

    #[error("Matrix is singular: pivot {pivot:e} in column {column}")]
    SingularMatrix { column: usize, pivot: f64 },

    #[error("Bilinear transform is singular for step {step}: (I - step/2 * A) has pivot {pivot:e} in column {column}")]
    SingularOperator { step: f64, column: usize, pivot: f64 },

    #[error("Step size must be positive and finite, got {0}")]
    InvalidStep(f64),

    #[error("Cauchy pole {pole} coincides with evaluation point {point} (distance {distance:e})")]
    DegeneratePole {
        point: usize,
        pole: usize,
        distance: f64,
    },

    #[error("Woodbury term 1 + q*(g - Λ)⁻¹p vanishes at evaluation point {point} (|value| {magnitude:e})")]
    WoodburySingular { point: usize, magnitude: f64 },

    #[error("Kernel has imaginary residual {max_imag:e} above tolerance {tolerance:e}")]
    ComplexKernel { max_imag: f64, tolerance: f64 },

    #[error("Eigendecomposition failed for N={n}: {reason}")]
    DecompositionFailed { n: usize, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
