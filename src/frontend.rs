//! Adapter for Gaussian-process front-ends.
//!
//! A front-end wants a plain covariance callable with an amplitude. [`ScaledKernel`] freezes a
//! geometric kernel's hyperparameters and multiplies by a variance.

use crate::kernel::{GeometricKernel, PointsOf};
use crate::params::KernelParams;
use crate::{Error, Result};
use ndarray::{Array1, Array2};

/// `variance · k(params, x, y)`.
#[derive(Debug, Clone)]
pub struct ScaledKernel<K> {
    kernel: K,
    params: KernelParams,
    variance: f64,
}

fn check_variance(variance: f64) -> Result<()> {
    if !variance.is_finite() || variance <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "variance",
            value: variance,
        });
    }
    Ok(())
}

impl<K: GeometricKernel> ScaledKernel<K> {
    /// Wrap `kernel` with its default parameters and the given variance.
    pub fn new(kernel: K, variance: f64) -> Result<Self> {
        check_variance(variance)?;
        let params = kernel.init_params();
        Ok(Self {
            kernel,
            params,
            variance,
        })
    }

    pub fn with_params(self, params: KernelParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, ..self })
    }

    pub fn with_variance(self, variance: f64) -> Result<Self> {
        check_variance(variance)?;
        Ok(Self { variance, ..self })
    }

    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    pub fn cross_covariance(&self, x: &PointsOf<K>, y: Option<&PointsOf<K>>) -> Result<Array2<f64>> {
        Ok(self.kernel.k(&self.params, x, y)? * self.variance)
    }

    pub fn variance_diag(&self, x: &PointsOf<K>) -> Result<Array1<f64>> {
        Ok(self.kernel.k_diag(&self.params, x)? * self.variance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::Circle;
    use crate::kernel::MaternKarhunenLoeveKernel;
    use ndarray::array;
    use std::sync::Arc;

    fn circle_kernel() -> MaternKarhunenLoeveKernel<Circle> {
        MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 10, true).unwrap()
    }

    #[test]
    fn scales_the_gram_matrix() {
        let x = array![0.0, 1.0];
        let params = KernelParams::new(0.5, 1.5);
        let base = circle_kernel().k(&params, &x, None).unwrap();
        let scaled = ScaledKernel::new(circle_kernel(), 2.5)
            .unwrap()
            .with_params(params)
            .unwrap();
        let k = scaled.cross_covariance(&x, None).unwrap();
        for (a, b) in k.iter().zip(base.iter()) {
            assert!((a - 2.5 * b).abs() < 1e-12);
        }
        let d = scaled.variance_diag(&x).unwrap();
        assert!((d[0] - 2.5).abs() < 1e-10);
    }

    #[test]
    fn rejects_bad_variance_and_params() {
        assert!(ScaledKernel::new(circle_kernel(), 0.0).is_err());
        assert!(ScaledKernel::new(circle_kernel(), f64::NAN).is_err());
        let ok = ScaledKernel::new(circle_kernel(), 1.0).unwrap();
        assert!(ok.with_params(KernelParams::new(-2.0, 1.5)).is_err());
    }
}
