//! Gaussian-process sample paths from a feature map.
//!
//! `f(x) = Φ(x)·w` with `w ~ N(0, I)` has covariance `Φ(x)·Φ(y)ᵀ ≈ k(x, y)`. Drawing `s` paths
//! at `N` points costs `O(N·M·s)` and never forms or factorizes the `N × N` Gram matrix.

use crate::feature_map::FeatureMap;
use crate::key::Key;
use crate::params::KernelParams;
use crate::Result;
use ndarray::Array2;

/// Draws `num_samples` sample paths per call.
#[derive(Debug, Clone)]
pub struct Sampler<F> {
    feature_map: F,
    num_samples: usize,
}

/// Sampler over `feature_map` producing `num_samples` paths at a time.
pub fn sampler<F: FeatureMap>(feature_map: F, num_samples: usize) -> Sampler<F> {
    Sampler {
        feature_map,
        num_samples,
    }
}

impl<F: FeatureMap> Sampler<F> {
    pub fn num_samples(&self) -> usize {
        self.num_samples
    }

    pub fn feature_map(&self) -> &F {
        &self.feature_map
    }

    /// `[N, num_samples]` sample values at `x`, plus the advanced key.
    ///
    /// The key first goes through the feature map, then the weights are drawn from whatever key
    /// it returns.
    pub fn sample(&self, x: &F::Points, params: &KernelParams, key: Key) -> Result<(Key, Array2<f64>)> {
        let (embedding, key) = self.feature_map.map(x, params, key)?;
        let (key, weights) = key.standard_normal(embedding.ncols(), self.num_samples);
        Ok((key, embedding.dot(&weights)))
    }
}
