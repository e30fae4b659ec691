//! Hyperbolic space `Hⁿ` in the hyperboloid model.
//!
//! Points are rows `[x0, x1, …, xn]` with `x0² − Σ xi² = 1` and `x0 > 0`. The spectral side
//! works in the Poincaré ball, where the horocyclic projection towards a boundary point `b` is
//! `ln((1 − |x|²) / |x − b|²)` and `ρ = (n − 1)/2`.

use crate::key::Key;
use crate::space::{NoncompactSymmetricSpace, Space};
use crate::utils::{logspace, trapz};
use crate::{Error, Result};
use ndarray::{s, Array1, Array2, Array3, ArrayView1};
use std::f64::consts::PI;

const POINT_TOL: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
pub struct Hyperbolic {
    dim: usize,
}

impl Hyperbolic {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(Error::Domain("hyperbolic dimension must be >= 1"));
        }
        Ok(Self { dim })
    }

    /// Minkowski inner product `−a0 b0 + Σ ai bi`.
    pub fn inner_product(&self, a: &ArrayView1<f64>, b: &ArrayView1<f64>) -> f64 {
        let mut s = -a[0] * b[0];
        for i in 1..a.len() {
            s += a[i] * b[i];
        }
        s
    }

    /// Pairwise geodesic distances `[N1, N2]`.
    pub fn distance(&self, x1: &Array2<f64>, x2: &Array2<f64>) -> Result<Array2<f64>> {
        self.validate_points(x1)?;
        self.validate_points(x2)?;
        let mut out = Array2::<f64>::zeros((x1.nrows(), x2.nrows()));
        for (i, a) in x1.outer_iter().enumerate() {
            let sq_a = self.inner_product(&a, &a);
            for (j, b) in x2.outer_iter().enumerate() {
                let sq_b = self.inner_product(&b, &b);
                let cosh = (-self.inner_product(&a, &b) / (sq_a * sq_b).sqrt()).clamp(1.0, 1e24);
                out[[i, j]] = (cosh + (cosh * cosh - 1.0).sqrt()).ln();
            }
        }
        Ok(out)
    }

    /// Lift intrinsic coordinates `[N, n]` onto the hyperboloid `[N, n + 1]`.
    pub fn from_intrinsic(&self, coords: &Array2<f64>) -> Result<Array2<f64>> {
        if coords.ncols() != self.dim {
            return Err(Error::Shape("intrinsic coordinates must be [N, dim]"));
        }
        let mut out = Array2::<f64>::zeros((coords.nrows(), self.dim + 1));
        for (i, c) in coords.outer_iter().enumerate() {
            out[[i, 0]] = (1.0 + c.dot(&c)).sqrt();
            out.slice_mut(s![i, 1..]).assign(&c);
        }
        Ok(out)
    }

    /// Poincaré-ball coordinates of one hyperboloid point.
    pub fn to_ball(&self, x: &ArrayView1<f64>) -> Array1<f64> {
        x.slice(s![1..]).mapv(|v| v / (1.0 + x[0]))
    }

    /// Heat kernel as a function of distance, for dimensions 1, 2 and 3.
    ///
    /// Dimension 2 has no elementary closed form and is integrated with the trapezoidal rule on
    /// `num_points` log-spaced nodes; it is least accurate near zero distance.
    pub fn heat_kernel(&self, distance: f64, t: f64, num_points: usize) -> Result<f64> {
        if !distance.is_finite() || distance < 0.0 {
            return Err(Error::Domain("distance must be finite and >= 0"));
        }
        if !t.is_finite() || t <= 0.0 {
            return Err(Error::Domain("t must be positive and finite"));
        }
        let gauss = (-distance * distance / (4.0 * t)).exp();
        match self.dim {
            1 => Ok(gauss),
            2 => {
                if num_points < 2 {
                    return Err(Error::Domain("num_points must be >= 2"));
                }
                let s_vals = logspace(1e-2f64.ln(), 100.0f64.ln(), num_points) + distance;
                let ch = distance.cosh();
                let integrand =
                    s_vals.mapv(|s| s * (-s * s / (4.0 * t)).exp() / (s.cosh() - ch).sqrt());
                trapz(&integrand.view(), &s_vals.view())
            }
            3 => {
                let d = distance + 1e-8;
                Ok(gauss * d / d.sinh())
            }
            _ => Err(Error::Domain("heat kernel is only available for dimensions 1, 2, 3")),
        }
    }
}

impl Space for Hyperbolic {
    type Points = Array2<f64>;

    fn dimension(&self) -> usize {
        self.dim
    }

    fn num_points(&self, points: &Array2<f64>) -> usize {
        points.nrows()
    }

    fn validate_points(&self, points: &Array2<f64>) -> Result<()> {
        if points.ncols() != self.dim + 1 {
            return Err(Error::Shape("hyperboloid points must be [N, dim + 1]"));
        }
        for p in points.outer_iter() {
            if p.iter().any(|v| !v.is_finite()) {
                return Err(Error::Domain("hyperboloid points must be finite"));
            }
            if p[0] <= 0.0 {
                return Err(Error::Domain("hyperboloid points must have x0 > 0"));
            }
            let q = self.inner_product(&p, &p);
            if (q + 1.0).abs() > POINT_TOL * (1.0 + p[0] * p[0]) {
                return Err(Error::Domain("point is not on the hyperboloid"));
            }
        }
        Ok(())
    }

    /// Gaussian tangent vector at the origin pushed through the exponential map.
    fn random_points(&self, key: Key, n: usize) -> Result<(Key, Array2<f64>)> {
        let (key, v) = key.standard_normal(n, self.dim);
        let mut out = Array2::<f64>::zeros((n, self.dim + 1));
        for (i, vi) in v.outer_iter().enumerate() {
            let r = vi.dot(&vi).sqrt();
            out[[i, 0]] = r.cosh();
            if r > 0.0 {
                let scale = r.sinh() / r;
                for k in 0..self.dim {
                    out[[i, k + 1]] = scale * vi[k];
                }
            }
        }
        Ok((key, out))
    }
}

impl NoncompactSymmetricSpace for Hyperbolic {
    /// Unit vectors on the boundary sphere, `[O, n]`.
    type Phases = Array2<f64>;

    fn rank(&self) -> usize {
        1
    }

    fn rho(&self) -> Array1<f64> {
        Array1::from_elem(1, (self.dim as f64 - 1.0) / 2.0)
    }

    fn random_phases(&self, key: Key, num: usize) -> Result<(Key, Array2<f64>)> {
        let (key, mut g) = key.standard_normal(num, self.dim);
        for mut row in g.outer_iter_mut() {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|v| v / norm);
            } else {
                row[0] = 1.0;
            }
        }
        Ok((key, g))
    }

    fn horocyclic_projection(&self, points: &Array2<f64>, phases: &Array2<f64>) -> Result<Array3<f64>> {
        self.validate_points(points)?;
        if phases.ncols() != self.dim {
            return Err(Error::Shape("phases must be [O, dim]"));
        }
        let mut out = Array3::<f64>::zeros((points.nrows(), phases.nrows(), 1));
        for (i, x) in points.outer_iter().enumerate() {
            let xb = self.to_ball(&x);
            // 1 - |x_ball|² = 2 / (1 + x0), without cancellation
            let log_num = (2.0 / (1.0 + x[0])).ln();
            for (o, b) in phases.outer_iter().enumerate() {
                let diff = &xb - &b;
                out[[i, o, 0]] = log_num - diff.dot(&diff).ln();
            }
        }
        Ok(out)
    }

    /// `|Γ(iλ + ρ) / Γ(iλ)|`, via the product formulas for integer and half-integer `ρ`.
    fn inv_harish_chandra(&self, lambda: &Array2<f64>) -> Array1<f64> {
        let n = self.dim;
        lambda
            .outer_iter()
            .map(|row| {
                let lam = row[0].abs();
                let l2 = lam * lam;
                let c2 = if n % 2 == 1 {
                    (0..(n - 1) / 2).map(|k| l2 + (k * k) as f64).product::<f64>()
                } else {
                    let base = lam * (PI * lam).tanh();
                    base * (0..(n - 2) / 2)
                        .map(|k| l2 + (k as f64 + 0.5).powi(2))
                        .product::<f64>()
                };
                c2.sqrt()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn zero_dimension_rejected() {
        assert!(Hyperbolic::new(0).is_err());
    }

    #[test]
    fn random_points_lie_on_hyperboloid() {
        let h = Hyperbolic::new(3).unwrap();
        let (_, x) = h.random_points(Key::new(5), 64).unwrap();
        h.validate_points(&x).unwrap();
    }

    #[test]
    fn distance_from_origin_matches_intrinsic_radius() {
        let h = Hyperbolic::new(2).unwrap();
        let origin = h.from_intrinsic(&array![[0.0, 0.0]]).unwrap();
        let r: f64 = 1.3;
        let p = array![[r.cosh(), r.sinh(), 0.0]];
        let d = h.distance(&origin, &p).unwrap();
        assert!((d[[0, 0]] - r).abs() < 1e-10);
        let self_d = h.distance(&p, &p).unwrap();
        assert!(self_d[[0, 0]].abs() < 1e-6);
    }

    #[test]
    fn off_manifold_points_rejected() {
        let h = Hyperbolic::new(2).unwrap();
        assert!(h.validate_points(&array![[1.0, 1.0, 0.0]]).is_err());
        assert!(h.validate_points(&array![[-1.0, 0.0, 0.0]]).is_err());
        assert!(h.validate_points(&array![[1.0, 0.0]]).is_err());
    }

    #[test]
    fn horocyclic_projection_is_distance_along_the_ray() {
        // Moving towards boundary point b, the Busemann coordinate equals the distance.
        let h = Hyperbolic::new(2).unwrap();
        let r: f64 = 0.8;
        let x = array![[r.cosh(), r.sinh(), 0.0]];
        let b = array![[1.0, 0.0], [-1.0, 0.0]];
        let a = h.horocyclic_projection(&x, &b).unwrap();
        assert!((a[[0, 0, 0]] - r).abs() < 1e-10);
        assert!((a[[0, 1, 0]] + r).abs() < 1e-10);
    }

    #[test]
    fn harish_chandra_closed_forms() {
        let lam = array![[0.7], [-2.0]];
        let h2 = Hyperbolic::new(2).unwrap().inv_harish_chandra(&lam);
        assert!((h2[0] - (0.7 * (PI * 0.7).tanh()).sqrt()).abs() < 1e-12);
        let h3 = Hyperbolic::new(3).unwrap().inv_harish_chandra(&lam);
        assert!((h3[1] - 2.0).abs() < 1e-12);
        let h1 = Hyperbolic::new(1).unwrap().inv_harish_chandra(&lam);
        assert_eq!(h1, array![1.0, 1.0]);
        let h5 = Hyperbolic::new(5).unwrap().inv_harish_chandra(&lam);
        assert!((h5[1] - (4.0f64 * 5.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn heat_kernel_decreases_with_distance() {
        for dim in 1..=3 {
            let h = Hyperbolic::new(dim).unwrap();
            let near = h.heat_kernel(0.1, 0.5, 500).unwrap();
            let far = h.heat_kernel(2.0, 0.5, 500).unwrap();
            assert!(near > far, "dim {dim}: {near} <= {far}");
        }
        assert!(Hyperbolic::new(4).unwrap().heat_kernel(1.0, 0.5, 10).is_err());
        assert!(Hyperbolic::new(3).unwrap().heat_kernel(1.0, 0.0, 10).is_err());
        assert!(Hyperbolic::new(3).unwrap().heat_kernel(f64::NAN, 0.5, 10).is_err());
        assert!(Hyperbolic::new(3).unwrap().heat_kernel(1.0, f64::NAN, 10).is_err());
        assert!(Hyperbolic::new(1).unwrap().heat_kernel(-0.1, 0.5, 10).is_err());
    }

    #[test]
    fn phases_are_unit_vectors() {
        let h = Hyperbolic::new(4).unwrap();
        let (_, b) = h.random_phases(Key::new(9), 32).unwrap();
        for row in b.outer_iter() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-12);
        }
    }
}
