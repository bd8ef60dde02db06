//! # s4-core
//!
//! Shapes, the error taxonomy and a small dense complex matrix for the
//! S4 kernel pipeline. CPU-only, f64 throughout.

pub mod error;
pub mod matrix;
pub mod shape;

pub use error::S4Error;
pub use matrix::{CMatrix, C64};
pub use shape::Shape;

pub type Result<T> = std::result::Result<T, S4Error>;
