//! The circle `S¹` with its Fourier eigenbasis.
//!
//! Points are angles in radians. Level `0` is the constant function; level `l ≥ 1` holds
//! `√2 cos(lθ)` and `√2 sin(lθ)`, both with Laplacian eigenvalue `l²`.

use crate::key::Key;
use crate::space::{AdditionTheorem, DiscreteSpectrumSpace, Eigenfunctions, Space};
use crate::utils::chain;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Array3};
use std::f64::consts::{PI, SQRT_2};

/// Default number of levels for analytic compact spaces.
pub const DEFAULT_NUM_LEVELS: usize = 35;

#[derive(Debug, Clone, Copy, Default)]
pub struct Circle;

impl Circle {
    pub fn new() -> Self {
        Self
    }
}

/// Number of eigenfunctions on each level: `[1, 2, 2, …]`.
fn per_level(levels: usize) -> Vec<usize> {
    (0..levels).map(|l| if l == 0 { 1 } else { 2 }).collect()
}

#[derive(Debug, Clone)]
pub struct SinCosEigenfunctions {
    num_levels: usize,
}

impl Eigenfunctions<Array1<f64>> for SinCosEigenfunctions {
    fn num_eigenfunctions(&self) -> usize {
        2 * self.num_levels - 1
    }

    fn evaluate(&self, points: &Array1<f64>) -> Result<Array2<f64>> {
        let m = self.num_eigenfunctions();
        let mut out = Array2::<f64>::zeros((points.len(), m));
        for (r, &theta) in points.iter().enumerate() {
            if !theta.is_finite() {
                return Err(Error::Domain("angles must be finite"));
            }
            out[[r, 0]] = 1.0;
            for l in 1..self.num_levels {
                let f = l as f64 * theta;
                out[[r, 2 * l - 1]] = SQRT_2 * f.cos();
                out[[r, 2 * l]] = SQRT_2 * f.sin();
            }
        }
        Ok(out)
    }

    fn mean_squares(&self) -> Array1<f64> {
        Array1::ones(self.num_eigenfunctions())
    }
}

/// `A_0 = 1`, `A_l(θ, φ) = 2 cos(l(θ − φ))`.
impl AdditionTheorem<Array1<f64>> for SinCosEigenfunctions {
    fn level_sizes(&self) -> Vec<usize> {
        per_level(self.num_levels)
    }

    fn phi_product(&self, x: &Array1<f64>, y: &Array1<f64>) -> Result<Array3<f64>> {
        if x.iter().chain(y.iter()).any(|t| !t.is_finite()) {
            return Err(Error::Domain("angles must be finite"));
        }
        let mut out = Array3::<f64>::zeros((x.len(), y.len(), self.num_levels));
        for (i, &a) in x.iter().enumerate() {
            for (j, &b) in y.iter().enumerate() {
                out[[i, j, 0]] = 1.0;
                for l in 1..self.num_levels {
                    out[[i, j, l]] = 2.0 * (l as f64 * (a - b)).cos();
                }
            }
        }
        Ok(out)
    }
}

impl Space for Circle {
    type Points = Array1<f64>;

    fn dimension(&self) -> usize {
        1
    }

    fn num_points(&self, points: &Array1<f64>) -> usize {
        points.len()
    }

    fn validate_points(&self, points: &Array1<f64>) -> Result<()> {
        if points.iter().any(|t| !t.is_finite()) {
            return Err(Error::Domain("angles must be finite"));
        }
        Ok(())
    }

    fn random_points(&self, key: Key, n: usize) -> Result<(Key, Array1<f64>)> {
        Ok(key.uniform(n, 0.0, 2.0 * PI))
    }
}

impl DiscreteSpectrumSpace for Circle {
    type Eigenfunctions = SinCosEigenfunctions;

    fn default_levels(&self) -> usize {
        DEFAULT_NUM_LEVELS
    }

    fn num_eigenfunctions(&self, levels: usize) -> Result<usize> {
        if levels == 0 {
            return Err(Error::Domain("number of levels must be >= 1"));
        }
        Ok(2 * levels - 1)
    }

    fn eigenvalues(&self, levels: usize) -> Result<Array1<f64>> {
        self.num_eigenfunctions(levels)?;
        let per_level_values = Array1::from_iter((0..levels).map(|l| (l * l) as f64));
        chain(&per_level_values.view(), &per_level(levels))
    }

    fn eigenfunctions(&self, levels: usize) -> Result<SinCosEigenfunctions> {
        self.num_eigenfunctions(levels)?;
        Ok(SinCosEigenfunctions { num_levels: levels })
    }
}
