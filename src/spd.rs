//! Symmetric positive-definite matrices `SPD(n) = GL(n, ℝ) / O(n)`.
//!
//! Points are `[N, n, n]` stacks. The horocyclic projection of `x` towards a rotation `k` is
//! `ln diag(chol(kᵀ x k))`: the diagonal part of the Iwasawa decomposition with lower
//! unitriangular `N`, whose roots give `ρ_j = j − (n + 1)/2`.

use crate::key::Key;
use crate::linalg::{cholesky_lower, qr, spd_inv_sqrt, spd_logm, sym_expm};
use crate::space::{NoncompactSymmetricSpace, Space};
use crate::utils::ordered_pairwise_differences;
use crate::{Error, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView2};
use std::f64::consts::PI;

const SYMMETRY_TOL: f64 = 1e-8;

#[derive(Debug, Clone, Copy)]
pub struct SymmetricPositiveDefiniteMatrices {
    n: usize,
}

impl SymmetricPositiveDefiniteMatrices {
    pub fn new(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::Domain("matrix size must be >= 1"));
        }
        Ok(Self { n })
    }

    /// Matrix size `n`.
    pub fn degree(&self) -> usize {
        self.n
    }

    /// Affine-invariant distance `‖log(A^{-1/2} B A^{-1/2})‖_F`, pairwise `[N1, N2]`.
    pub fn distance(&self, x1: &Array3<f64>, x2: &Array3<f64>) -> Result<Array2<f64>> {
        self.validate_points(x1)?;
        self.validate_points(x2)?;
        let mut out = Array2::<f64>::zeros((x1.shape()[0], x2.shape()[0]));
        for (i, a) in x1.outer_iter().enumerate() {
            let a_inv_sqrt = spd_inv_sqrt(&a)?;
            for (j, b) in x2.outer_iter().enumerate() {
                let m = a_inv_sqrt.dot(&b).dot(&a_inv_sqrt);
                let m = (&m + &m.t()) * 0.5;
                let l = spd_logm(&m.view())?;
                out[[i, j]] = l.iter().map(|v| v * v).sum::<f64>().sqrt();
            }
        }
        Ok(out)
    }

    fn check_matrix(&self, a: &ArrayView2<f64>) -> Result<()> {
        if a.iter().any(|v| !v.is_finite()) {
            return Err(Error::Domain("matrix entries must be finite"));
        }
        let scale = a.iter().fold(0.0f64, |m, v| m.max(v.abs())).max(1.0);
        for i in 0..self.n {
            for j in (i + 1)..self.n {
                if (a[[i, j]] - a[[j, i]]).abs() > SYMMETRY_TOL * scale {
                    return Err(Error::Domain("matrix is not symmetric"));
                }
            }
        }
        cholesky_lower(a).map_err(|_| Error::Domain("matrix is not positive definite"))?;
        Ok(())
    }
}

impl Space for SymmetricPositiveDefiniteMatrices {
    type Points = Array3<f64>;

    /// `n(n + 1)/2`.
    fn dimension(&self) -> usize {
        self.n * (self.n + 1) / 2
    }

    fn num_points(&self, points: &Array3<f64>) -> usize {
        points.shape()[0]
    }

    fn validate_points(&self, points: &Array3<f64>) -> Result<()> {
        let sh = points.shape();
        if sh[1] != self.n || sh[2] != self.n {
            return Err(Error::Shape("SPD points must be [N, n, n]"));
        }
        for p in points.outer_iter() {
            self.check_matrix(&p)?;
        }
        Ok(())
    }

    /// `expm(S)` for symmetric Gaussian `S = (G + Gᵀ)/2`.
    fn random_points(&self, mut key: Key, num: usize) -> Result<(Key, Array3<f64>)> {
        let n = self.n;
        let mut out = Array3::<f64>::zeros((num, n, n));
        for i in 0..num {
            let (next, g) = key.standard_normal(n, n);
            key = next;
            let sym = (&g + &g.t()) * 0.5;
            out.slice_mut(s![i, .., ..]).assign(&sym_expm(&sym.view())?);
        }
        Ok((key, out))
    }
}

impl NoncompactSymmetricSpace for SymmetricPositiveDefiniteMatrices {
    /// Haar-random orthogonal matrices, `[O, n, n]`.
    type Phases = Array3<f64>;

    fn rank(&self) -> usize {
        self.n
    }

    fn rho(&self) -> Array1<f64> {
        let n = self.n as f64;
        Array1::from_iter((1..=self.n).map(|j| j as f64 - (n + 1.0) / 2.0))
    }

    fn random_phases(&self, mut key: Key, num: usize) -> Result<(Key, Array3<f64>)> {
        let n = self.n;
        let mut out = Array3::<f64>::zeros((num, n, n));
        for o in 0..num {
            let (next, g) = key.standard_normal(n, n);
            key = next;
            let (mut q, r) = qr(&g.view());
            // sign fix makes Q Haar-distributed
            for j in 0..n {
                if r[[j, j]] < 0.0 {
                    q.column_mut(j).mapv_inplace(|v| -v);
                }
            }
            out.slice_mut(s![o, .., ..]).assign(&q);
        }
        Ok((key, out))
    }

    fn horocyclic_projection(&self, points: &Array3<f64>, phases: &Array3<f64>) -> Result<Array3<f64>> {
        self.validate_points(points)?;
        let sh = phases.shape();
        if sh[1] != self.n || sh[2] != self.n {
            return Err(Error::Shape("phases must be [O, n, n]"));
        }
        let (num_x, num_o) = (points.shape()[0], sh[0]);
        let mut out = Array3::<f64>::zeros((num_x, num_o, self.n));
        for (i, x) in points.outer_iter().enumerate() {
            for (o, k) in phases.outer_iter().enumerate() {
                let y = k.t().dot(&x).dot(&k);
                let y = (&y + &y.t()) * 0.5;
                let l = cholesky_lower(&y.view())?;
                for j in 0..self.n {
                    out[[i, o, j]] = l[[j, j]].ln();
                }
            }
        }
        Ok(out)
    }

    /// `√∏_{i<j} π|d| tanh(π|d|)` with `d = λ_i − λ_j`.
    fn inv_harish_chandra(&self, lambda: &Array2<f64>) -> Array1<f64> {
        let diffs = ordered_pairwise_differences(&lambda.view());
        diffs
            .outer_iter()
            .map(|row| {
                let log_prod: f64 = row
                    .iter()
                    .map(|d| {
                        let a = PI * d.abs();
                        a.ln() + a.tanh().ln()
                    })
                    .sum();
                (0.5 * log_prod).exp()
            })
            .collect()
    }
}
