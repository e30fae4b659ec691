//! Dense factorizations on top of `nalgebra`.
//!
//! The public surface of the crate is `ndarray`; this module is the only place that converts to
//! `nalgebra` matrices for eigendecompositions, Cholesky and QR.

use crate::{Error, Result};
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::{Array1, Array2, ArrayView2};

pub(crate) fn to_dmatrix(a: &ArrayView2<f64>) -> DMatrix<f64> {
    DMatrix::from_fn(a.nrows(), a.ncols(), |i, j| a[[i, j]])
}

pub(crate) fn from_dmatrix(m: &DMatrix<f64>) -> Array2<f64> {
    Array2::from_shape_fn((m.nrows(), m.ncols()), |(i, j)| m[(i, j)])
}

/// Eigenpairs of a symmetric matrix, eigenvalues ascending, eigenvectors as columns.
pub fn symmetric_eigen(a: &ArrayView2<f64>) -> Result<(Array1<f64>, Array2<f64>)> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(Error::Shape("matrix must be square"));
    }
    if a.iter().any(|x| !x.is_finite()) {
        return Err(Error::Numerical("matrix contains non-finite values"));
    }
    let eig = SymmetricEigen::new(to_dmatrix(a));

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| eig.eigenvalues[i].total_cmp(&eig.eigenvalues[j]));

    let mut vals = Array1::<f64>::zeros(n);
    let mut vecs = Array2::<f64>::zeros((n, n));
    for (dst, &src) in order.iter().enumerate() {
        vals[dst] = eig.eigenvalues[src];
        for i in 0..n {
            vecs[[i, dst]] = eig.eigenvectors[(i, src)];
        }
    }
    Ok((vals, vecs))
}

/// `V f(Λ) Vᵀ` for a symmetric matrix.
fn symmetric_apply(a: &ArrayView2<f64>, f: impl Fn(f64) -> f64) -> Result<Array2<f64>> {
    let (vals, vecs) = symmetric_eigen(a)?;
    let n = vals.len();
    let mut scaled = vecs.clone();
    for j in 0..n {
        let fj = f(vals[j]);
        for i in 0..n {
            scaled[[i, j]] *= fj;
        }
    }
    Ok(scaled.dot(&vecs.t()))
}

/// Matrix exponential of a symmetric matrix.
pub fn sym_expm(a: &ArrayView2<f64>) -> Result<Array2<f64>> {
    symmetric_apply(a, f64::exp)
}

/// Principal logarithm of a symmetric positive-definite matrix.
pub fn spd_logm(a: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let (vals, _) = symmetric_eigen(a)?;
    if vals.iter().any(|&v| v <= 0.0) {
        return Err(Error::Domain("matrix is not positive definite"));
    }
    symmetric_apply(a, f64::ln)
}

/// `A^{-1/2}` of a symmetric positive-definite matrix.
pub fn spd_inv_sqrt(a: &ArrayView2<f64>) -> Result<Array2<f64>> {
    let (vals, _) = symmetric_eigen(a)?;
    if vals.iter().any(|&v| v <= 0.0) {
        return Err(Error::Domain("matrix is not positive definite"));
    }
    symmetric_apply(a, |v| 1.0 / v.sqrt())
}

/// Lower Cholesky factor `L` with `A = L Lᵀ`.
pub fn cholesky_lower(a: &ArrayView2<f64>) -> Result<Array2<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::Shape("matrix must be square"));
    }
    let chol = to_dmatrix(a)
        .cholesky()
        .ok_or(Error::Numerical("cholesky factorization failed"))?;
    Ok(from_dmatrix(&chol.l()))
}

/// QR factorization `A = Q R` of a square matrix.
pub fn qr(a: &ArrayView2<f64>) -> (Array2<f64>, Array2<f64>) {
    let qr = to_dmatrix(a).qr();
    (from_dmatrix(&qr.q()), from_dmatrix(&qr.r()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn eigen_sorted_and_reconstructs() {
        let a = array![[2.0, 1.0, 0.0], [1.0, 3.0, 0.5], [0.0, 0.5, 1.0]];
        let (vals, vecs) = symmetric_eigen(&a.view()).unwrap();
        for i in 1..3 {
            assert!(vals[i - 1] <= vals[i]);
        }
        let mut d = Array2::<f64>::zeros((3, 3));
        for i in 0..3 {
            d[[i, i]] = vals[i];
        }
        let back = vecs.dot(&d).dot(&vecs.t());
        for (x, y) in back.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn expm_logm_inverse() {
        let s = array![[0.3, -0.2], [-0.2, 0.1]];
        let e = sym_expm(&s.view()).unwrap();
        let l = spd_logm(&e.view()).unwrap();
        for (x, y) in l.iter().zip(s.iter()) {
            assert!((x - y).abs() < 1e-10);
        }
    }

    #[test]
    fn cholesky_rejects_indefinite() {
        let a = array![[1.0, 2.0], [2.0, 1.0]];
        assert!(cholesky_lower(&a.view()).is_err());
        let b = array![[4.0, 2.0], [2.0, 3.0]];
        let l = cholesky_lower(&b.view()).unwrap();
        let back = l.dot(&l.t());
        for (x, y) in back.iter().zip(b.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn qr_reconstructs() {
        let a = array![[1.0, 2.0, 0.0], [0.5, -1.0, 3.0], [2.0, 0.0, 1.0]];
        let (q, r) = qr(&a.view());
        let back = q.dot(&r);
        for (x, y) in back.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }
}
