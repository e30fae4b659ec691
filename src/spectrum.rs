//! Matérn and heat spectra over Laplacian eigenvalues.
//!
//! Everything is computed as a log-spectrum first. Large finite `ν` would otherwise underflow
//! `(2ν/κ² + λ)^{-ν - d/2}` to zero before normalization gets a chance to rescale it.

use crate::params::{KernelParams, Nu};
use crate::{Error, Result};
use ndarray::{Array1, ArrayView1};

/// Log of the (unnormalized) spectral weight for each eigenvalue.
///
/// Matérn: `−(ν + d/2)·ln(2ν/κ² + λ)`. Heat (`Nu::Infinite`): `−κ²λ/2`.
pub fn log_spectrum(
    eigenvalues: &ArrayView1<f64>,
    params: &KernelParams,
    dim: usize,
) -> Result<Array1<f64>> {
    params.validate()?;
    if eigenvalues.iter().any(|l| !l.is_finite() || *l < 0.0) {
        return Err(Error::Domain("eigenvalues must be finite and >= 0"));
    }
    let kappa = params.lengthscale;
    Ok(match params.nu {
        Nu::Infinite => eigenvalues.mapv(|l| -0.5 * kappa * kappa * l),
        Nu::Finite(nu) => {
            let exponent = nu + dim as f64 / 2.0;
            let shift = 2.0 * nu / (kappa * kappa);
            eigenvalues.mapv(|l| -exponent * (shift + l).ln())
        }
    })
}

/// Spectral weights `s_i`, optionally rescaled so that `Σ s_i · mean_sq_i = 1`.
///
/// `mean_squares[i]` is the average of `φ_i²` over the space, so with `normalize` the kernel
/// has unit variance on average.
pub fn spectrum(
    eigenvalues: &ArrayView1<f64>,
    mean_squares: &ArrayView1<f64>,
    params: &KernelParams,
    dim: usize,
    normalize: bool,
) -> Result<Array1<f64>> {
    if eigenvalues.len() != mean_squares.len() {
        return Err(Error::Shape("eigenvalues and mean_squares must have equal length"));
    }
    let log_s = log_spectrum(eigenvalues, params, dim)?;
    if !normalize {
        return Ok(log_s.mapv(f64::exp));
    }
    let weighted: Array1<f64> = log_s
        .iter()
        .zip(mean_squares.iter())
        .map(|(ls, m)| if *m > 0.0 { ls + m.ln() } else { f64::NEG_INFINITY })
        .collect();
    let max = weighted.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !max.is_finite() {
        return Err(Error::Numerical("spectrum has no mass to normalize"));
    }
    let log_total = max + weighted.iter().map(|w| (w - max).exp()).sum::<f64>().ln();
    Ok(log_s.mapv(|ls| (ls - log_total).exp()))
}
