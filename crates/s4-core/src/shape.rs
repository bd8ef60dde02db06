use smallvec::SmallVec;
use std::fmt;

use crate::{Result, S4Error};

/// Dimensions of a vector or matrix operand.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: SmallVec<[usize; 2]>,
}

impl Shape {
    /// Shape of a length-`len` vector.
    pub fn vector(len: usize) -> Self {
        Self { dims: SmallVec::from_slice(&[len]) }
    }

    /// Shape of a `rows x cols` matrix.
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self { dims: SmallVec::from_slice(&[rows, cols]) }
    }

    /// `Ok` if `got` equals `self`, otherwise a dimension mismatch for `context`.
    pub fn ensure(&self, context: &'static str, got: Shape) -> Result<()> {
        if *self == got {
            return Ok(());
        }
        Err(S4Error::DimensionMismatch {
            context,
            expected: self.clone(),
            got,
        })
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shape({:?})", self.dims.as_slice())
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dims: Vec<String> = self.dims.iter().map(|d| d.to_string()).collect();
        write!(f, "[{}]", dims.join(", "))
    }
}
