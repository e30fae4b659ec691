//! Spectral densities for the non-compact Monte-Carlo feature maps.
//!
//! The Matérn spectral measure on a symmetric space of dimension `d` and rank `r` is
//! `(2ν/κ² + |ρ|² + |λ|²)^{-ν - d/2}`, which is exactly a multivariate Student-t in `λ ∈ ℝ^r`
//! with `2ν + d − r` degrees of freedom. The heat limit is a Gaussian with variance `κ^{-2}`.

use crate::key::Key;
use crate::linalg::cholesky_lower;
use crate::params::{KernelParams, Nu};
use crate::space::NoncompactSymmetricSpace;
use crate::{Error, Result};
use ndarray::{Array1, Array2};
use rand_distr::{ChiSquared, Distribution};

/// `n` draws from a multivariate Student-t with location `loc`, scale matrix `shape` and `df`
/// degrees of freedom. Output `[n, d]`.
pub fn student_t_sample(
    key: Key,
    loc: &Array1<f64>,
    shape: &Array2<f64>,
    df: f64,
    n: usize,
) -> Result<(Key, Array2<f64>)> {
    let d = loc.len();
    if shape.nrows() != d || shape.ncols() != d {
        return Err(Error::Shape("shape must be [d, d] with d = loc.len()"));
    }
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "df",
            value: df,
        });
    }
    let chol = cholesky_lower(&shape.view())?;
    let chi2 = ChiSquared::new(df).map_err(|_| Error::Domain("invalid chi-square parameters"))?;

    let (mut key, z) = key.standard_normal(n, d);
    let mut out = z.dot(&chol.t());
    for mut row in out.outer_iter_mut() {
        let w: f64 = chi2.sample(key.rng_mut());
        let scale = (df / w).sqrt();
        row.mapv_inplace(|v| v * scale);
        row += loc;
    }
    Ok((key, out))
}

/// `n` spectral parameters `λ` (`[n, rank]`) from the Matérn or heat base density of `space`.
pub fn base_density_sample<S: NoncompactSymmetricSpace>(
    key: Key,
    n: usize,
    params: &KernelParams,
    space: &S,
) -> Result<(Key, Array2<f64>)> {
    params.validate()?;
    let r = space.rank();
    let kappa = params.lengthscale;
    match params.nu {
        Nu::Infinite => {
            let (key, g) = key.standard_normal(n, r);
            Ok((key, g / kappa))
        }
        Nu::Finite(nu) => {
            let rho = space.rho();
            let rho_sq = rho.dot(&rho);
            let df = 2.0 * nu + space.dimension() as f64 - r as f64;
            let scale_sq = (2.0 * nu / (kappa * kappa) + rho_sq) / df;
            let shape = Array2::<f64>::eye(r) * scale_sq;
            student_t_sample(key, &Array1::zeros(r), &shape, df, n)
        }
    }
}
