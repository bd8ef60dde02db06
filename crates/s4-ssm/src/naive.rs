//! Naive convolution kernel K[l] = C̄·Ā^l·B̄ (reference oracle).

use s4_core::{Result, C64};

use crate::ssm::Ssm;

/// Kernel of length `l_len` by iterated matrix-vector products, O(L·N²).
pub fn kernel_conv(discrete: &Ssm, l_len: usize) -> Result<Vec<C64>> {
    discrete.validate()?;
    let mut x = discrete.b.as_slice().to_vec();
    let mut kernel = Vec::with_capacity(l_len);
    for l in 0..l_len {
        kernel.push(discrete.c.mul_vec(&x)?[0]);
        if l + 1 < l_len {
            x = discrete.a.mul_vec(&x)?;
        }
    }
    Ok(kernel)
}

/// Real part of [`kernel_conv`].
pub fn kernel_conv_real(discrete: &Ssm, l_len: usize) -> Result<Vec<f64>> {
    Ok(kernel_conv(discrete, l_len)?.iter().map(|k| k.re).collect())
}
