//! Sequence transformer: causal convolution with a kernel plus the D skip.
//!
//! y[l] = Σ_{t ≤ l} K[t]·u[l - t] + D·u[l]
//!
//! The direct form costs O(L·|K|); [`apply_fft`] zero-pads both sequences to
//! |u| + |K| so the FFT product is a linear (not circular) convolution.

use rustfft::FftPlanner;

use s4_core::C64;

use crate::config::ConvMode;

/// Causal linear convolution of `u` with `k`, truncated to `u.len()` samples.
///
/// A kernel shorter than `u` is treated as zero-padded; taps past `u.len()`
/// never contribute.
pub fn non_circular_convolution(u: &[f64], k: &[f64]) -> Vec<f64> {
    (0..u.len())
        .map(|l| {
            let taps = k.len().min(l + 1);
            (0..taps).map(|t| k[t] * u[l - t]).sum()
        })
        .collect()
}

/// y = (K * u)[..L] + D·u, computed directly.
pub fn apply(k: &[f64], u: &[f64], d: f64) -> Vec<f64> {
    let mut y = non_circular_convolution(u, k);
    add_skip(&mut y, u, d);
    y
}

/// Same result as [`apply`] through a zero-padded FFT convolution.
pub fn apply_fft(k: &[f64], u: &[f64], d: f64) -> Vec<f64> {
    let seq_len = u.len();
    if seq_len == 0 {
        return Vec::new();
    }
    let taps = k.len().min(seq_len);
    let conv_len = seq_len + taps;

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(conv_len);
    let ifft = planner.plan_fft_inverse(conv_len);

    let mut k_buf = vec![C64::new(0.0, 0.0); conv_len];
    for (slot, &kv) in k_buf.iter_mut().zip(&k[..taps]) {
        *slot = C64::new(kv, 0.0);
    }
    fft.process(&mut k_buf);

    let mut u_buf = vec![C64::new(0.0, 0.0); conv_len];
    for (slot, &uv) in u_buf.iter_mut().zip(u) {
        *slot = C64::new(uv, 0.0);
    }
    fft.process(&mut u_buf);

    let mut y_buf: Vec<C64> = k_buf.iter().zip(&u_buf).map(|(&a, &b)| a * b).collect();
    ifft.process(&mut y_buf);

    let norm = 1.0 / conv_len as f64;
    let mut y: Vec<f64> = y_buf[..seq_len].iter().map(|v| v.re * norm).collect();
    add_skip(&mut y, u, d);
    y
}

/// Dispatch between [`apply`] and [`apply_fft`].
pub fn convolve(k: &[f64], u: &[f64], d: f64, mode: &ConvMode) -> Vec<f64> {
    let use_fft = match *mode {
        ConvMode::Direct => false,
        ConvMode::Fft => true,
        ConvMode::Auto { threshold } => u.len() >= threshold,
    };
    if use_fft {
        apply_fft(k, u, d)
    } else {
        apply(k, u, d)
    }
}

fn add_skip(y: &mut [f64], u: &[f64], d: f64) {
    for (yi, &ui) in y.iter_mut().zip(u) {
        *yi += d * ui;
    }
}
