//! Finite-dimensional feature maps `Φ` with `Φ(x)·Φ(y)ᵀ ≈ k(x, y)`.
//!
//! Every map takes a [`Key`] and returns one. Deterministic maps hand the input key back
//! untouched; randomized maps return the advanced key.

use std::sync::Arc;

use crate::density::base_density_sample;
use crate::kernel::{GeometricKernel, MaternFeatureMapKernel, MaternKarhunenLoeveKernel, PointsOf};
use crate::key::Key;
use crate::params::KernelParams;
use crate::space::{AdditionTheorem, DiscreteSpectrumSpace, NoncompactSymmetricSpace};
use crate::{Error, Result};
use ndarray::{s, Array1, Array2};

/// An embedding of point batches into `ℝ^M`.
pub trait FeatureMap {
    type Points;

    /// Embedding width `M`.
    fn output_dim(&self) -> usize;

    /// `[N, M]` embedding of `x` and the key to use next.
    fn map(&self, x: &Self::Points, params: &KernelParams, key: Key) -> Result<(Array2<f64>, Key)>;
}

/// `Φ(x) = φ(x)·diag(√s)` from a Karhunen–Loève kernel. Reproduces that kernel exactly.
#[derive(Debug)]
pub struct DeterministicCompactFeatureMap<S: DiscreteSpectrumSpace> {
    kernel: MaternKarhunenLoeveKernel<S>,
}

impl<S: DiscreteSpectrumSpace> Clone for DeterministicCompactFeatureMap<S> {
    fn clone(&self) -> Self {
        Self {
            kernel: self.kernel.clone(),
        }
    }
}

impl<S: DiscreteSpectrumSpace> DeterministicCompactFeatureMap<S> {
    pub fn new(kernel: MaternKarhunenLoeveKernel<S>) -> Self {
        Self { kernel }
    }

    pub fn num_levels(&self) -> usize {
        self.kernel.num_levels()
    }
}

impl<S: DiscreteSpectrumSpace> FeatureMap for DeterministicCompactFeatureMap<S> {
    type Points = S::Points;

    fn output_dim(&self) -> usize {
        self.kernel.eigenvalues().len()
    }

    fn map(&self, x: &S::Points, params: &KernelParams, key: Key) -> Result<(Array2<f64>, Key)> {
        Ok((self.kernel.weighted_eigenfunctions(params, x)?, key))
    }
}

/// Random-phase features on a compact space.
///
/// Draws `O` uniform points `b_o` and emits `√(s_l / O)·A_l(x, b_o)` for every phase and level,
/// with `A_l` the per-level addition theorem. `O·L` columns; `Φ(x)·Φ(y)ᵀ` is an unbiased
/// estimate of the underlying Karhunen–Loève kernel.
#[derive(Debug)]
pub struct RandomPhaseCompactFeatureMap<S: DiscreteSpectrumSpace> {
    kernel: MaternKarhunenLoeveKernel<S>,
    num_phases: usize,
}

impl<S: DiscreteSpectrumSpace> Clone for RandomPhaseCompactFeatureMap<S> {
    fn clone(&self) -> Self {
        Self {
            kernel: self.kernel.clone(),
            num_phases: self.num_phases,
        }
    }
}

impl<S> RandomPhaseCompactFeatureMap<S>
where
    S: DiscreteSpectrumSpace,
    S::Eigenfunctions: AdditionTheorem<S::Points>,
{
    pub fn new(kernel: MaternKarhunenLoeveKernel<S>, num_phases: usize) -> Result<Self> {
        if num_phases == 0 {
            return Err(Error::Domain("number of random phases must be >= 1"));
        }
        Ok(Self { kernel, num_phases })
    }

    pub fn num_phases(&self) -> usize {
        self.num_phases
    }

    fn num_levels(&self) -> usize {
        self.kernel.eigenfunctions().level_sizes().len()
    }
}

impl<S> FeatureMap for RandomPhaseCompactFeatureMap<S>
where
    S: DiscreteSpectrumSpace,
    S::Eigenfunctions: AdditionTheorem<S::Points>,
{
    type Points = S::Points;

    fn output_dim(&self) -> usize {
        self.num_phases * self.num_levels()
    }

    fn map(&self, x: &S::Points, params: &KernelParams, key: Key) -> Result<(Array2<f64>, Key)> {
        let spectrum = self.kernel.spectrum(params)?;
        let space = self.kernel.space();
        space.validate_points(x)?;
        let o = self.num_phases;
        let (key, phases) = space.random_points(key, o)?;

        let eigenfunctions = self.kernel.eigenfunctions();
        let sizes = eigenfunctions.level_sizes();
        let scale = 1.0 / (o as f64).sqrt();
        let mut weights = Vec::with_capacity(sizes.len());
        let mut start = 0;
        for size in &sizes {
            weights.push(spectrum[start].sqrt() * scale);
            start += size;
        }

        let products = eigenfunctions.phi_product(x, &phases)?;
        let (n, _, levels) = products.dim();
        log::trace!("compact random-phase features: {n} points, {o} phases, {levels} levels");
        let mut out = Array2::<f64>::zeros((n, o * levels));
        for i in 0..n {
            for j in 0..o {
                for (l, w) in weights.iter().enumerate() {
                    out[[i, j * levels + l]] = w * products[[i, j, l]];
                }
            }
        }
        Ok((out, key))
    }
}

/// Random-phase Monte-Carlo features on a non-compact symmetric space.
///
/// Each call draws `O` phases `b_o` and spectral samples `λ_o`, then emits
/// `[Re p, Im p]·|c(λ_o)|^{-1}` with `p = exp((ρ + iλ_o)·a(x, b_o))`, giving `2·O` columns.
/// With `normalize`, every row is rescaled to unit norm, so the approximate Gram matrix has an
/// exact unit diagonal; otherwise rows are scaled by `1/√O`.
#[derive(Debug)]
pub struct RandomPhaseFeatureMap<S: NoncompactSymmetricSpace> {
    space: Arc<S>,
    num_phases: usize,
    normalize: bool,
}

impl<S: NoncompactSymmetricSpace> Clone for RandomPhaseFeatureMap<S> {
    fn clone(&self) -> Self {
        Self {
            space: Arc::clone(&self.space),
            num_phases: self.num_phases,
            normalize: self.normalize,
        }
    }
}

impl<S: NoncompactSymmetricSpace> RandomPhaseFeatureMap<S> {
    pub fn new(space: Arc<S>, num_phases: usize, normalize: bool) -> Result<Self> {
        if num_phases == 0 {
            return Err(Error::Domain("number of random phases must be >= 1"));
        }
        Ok(Self {
            space,
            num_phases,
            normalize,
        })
    }

    pub fn num_phases(&self) -> usize {
        self.num_phases
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }
}

impl<S: NoncompactSymmetricSpace> FeatureMap for RandomPhaseFeatureMap<S> {
    type Points = S::Points;

    fn output_dim(&self) -> usize {
        2 * self.num_phases
    }

    fn map(&self, x: &S::Points, params: &KernelParams, key: Key) -> Result<(Array2<f64>, Key)> {
        params.validate()?;
        let o = self.num_phases;
        let (key, phases) = self.space.random_phases(key, o)?;
        let (key, lambda) = base_density_sample(key, o, params, self.space.as_ref())?;
        let a = self.space.horocyclic_projection(x, &phases)?;
        let c_inv = self.space.inv_harish_chandra(&lambda);
        let rho = self.space.rho();

        let n = self.space.num_points(x);
        log::trace!("random-phase features: {n} points, {o} phases");
        // log-moduli: far from the origin every exp(ρ·a) falls below the f64 range
        let log_c_inv = c_inv.mapv(f64::ln);
        let mut out = Array2::<f64>::zeros((n, 2 * o));
        for i in 0..n {
            let mut log_modulus = Array1::<f64>::zeros(o);
            let mut angle = Array1::<f64>::zeros(o);
            for j in 0..o {
                let a_ij = a.slice(s![i, j, ..]);
                log_modulus[j] = rho.dot(&a_ij) + log_c_inv[j];
                angle[j] = lambda.row(j).dot(&a_ij);
            }
            let shift = if self.normalize {
                let max = log_modulus.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
                if !max.is_finite() {
                    return Err(Error::Numerical("random-phase features vanish at a point"));
                }
                max
            } else {
                0.0
            };
            for j in 0..o {
                let modulus = (log_modulus[j] - shift).exp();
                out[[i, j]] = modulus * angle[j].cos();
                out[[i, o + j]] = modulus * angle[j].sin();
            }
        }
        if out.iter().any(|v| !v.is_finite()) {
            return Err(Error::Numerical("random-phase features overflowed"));
        }

        if self.normalize {
            for mut row in out.outer_iter_mut() {
                let norm = row.dot(&row).sqrt();
                if norm == 0.0 {
                    return Err(Error::Numerical("random-phase features vanish at a point"));
                }
                row.mapv_inplace(|v| v / norm);
            }
        } else {
            out.mapv_inplace(|v| v / (o as f64).sqrt());
        }
        Ok((out, key))
    }
}

/// A randomized feature map frozen to one key: every call replays the same random draws.
#[derive(Debug)]
pub struct DeterministicFeatureMap<F> {
    inner: F,
    key: Key,
}

impl<F: Clone> Clone for DeterministicFeatureMap<F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            key: self.key.snapshot(),
        }
    }
}

/// Freeze `feature_map` to `key`.
pub fn make_deterministic<F: FeatureMap>(feature_map: F, key: Key) -> DeterministicFeatureMap<F> {
    DeterministicFeatureMap {
        inner: feature_map,
        key,
    }
}

impl<F: FeatureMap> DeterministicFeatureMap<F> {
    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Embedding from the frozen key; no key is consumed.
    pub fn embed(&self, x: &F::Points, params: &KernelParams) -> Result<Array2<f64>> {
        let (embedding, _) = self.inner.map(x, params, self.key.snapshot())?;
        Ok(embedding)
    }

    pub(crate) fn key_snapshot(&self) -> Key {
        self.key.snapshot()
    }
}

impl<F: FeatureMap> FeatureMap for DeterministicFeatureMap<F> {
    type Points = F::Points;

    fn output_dim(&self) -> usize {
        self.inner.output_dim()
    }

    /// Ignores the draws from `key` and returns it unchanged.
    fn map(&self, x: &F::Points, params: &KernelParams, key: Key) -> Result<(Array2<f64>, Key)> {
        Ok((self.embed(x, params)?, key))
    }
}

/// Kernels with a canonical feature map.
pub trait DefaultFeatureMap: GeometricKernel {
    type Map: FeatureMap<Points = PointsOf<Self>>;

    /// `num` overrides the number of levels (compact) or random phases (non-compact).
    fn default_feature_map(&self, num: Option<usize>) -> Result<Self::Map>;
}

/// The canonical feature map of `kernel`, see [`DefaultFeatureMap`].
pub fn default_feature_map<K: DefaultFeatureMap>(kernel: &K, num: Option<usize>) -> Result<K::Map> {
    kernel.default_feature_map(num)
}

impl<S: DiscreteSpectrumSpace> DefaultFeatureMap for MaternKarhunenLoeveKernel<S> {
    type Map = DeterministicCompactFeatureMap<S>;

    /// `num` may only shrink the kernel's truncation; the kernel's own levels by default.
    fn default_feature_map(&self, num: Option<usize>) -> Result<Self::Map> {
        match num {
            None => Ok(DeterministicCompactFeatureMap::new(self.clone())),
            Some(levels) if levels == self.num_levels() => {
                Ok(DeterministicCompactFeatureMap::new(self.clone()))
            }
            Some(levels) if levels > self.num_levels() => Err(Error::Domain(
                "feature map cannot use more levels than its kernel",
            )),
            Some(levels) => {
                let truncated = MaternKarhunenLoeveKernel::new(
                    Arc::clone(self.space_arc()),
                    levels,
                    self.normalize(),
                )?;
                Ok(DeterministicCompactFeatureMap::new(truncated))
            }
        }
    }
}

impl<S: NoncompactSymmetricSpace> DefaultFeatureMap for MaternFeatureMapKernel<S> {
    type Map = DeterministicFeatureMap<RandomPhaseFeatureMap<S>>;

    /// The kernel's own frozen features; `num` changes the phase count but keeps the key.
    fn default_feature_map(&self, num: Option<usize>) -> Result<Self::Map> {
        match num {
            Some(n) if n != self.num_phases() => self.resized_feature_map(n),
            _ => Ok(self.feature_map().clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circle::Circle;
    use crate::hyperbolic::Hyperbolic;
    use crate::space::Space;
    use crate::spd::SymmetricPositiveDefiniteMatrices;
    use crate::utils::gram_approximation_error;
    use ndarray::array;

    #[test]
    fn compact_map_reproduces_kernel() {
        let kernel = MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 12, true).unwrap();
        let fm = default_feature_map(&kernel, None).unwrap();
        assert_eq!(fm.output_dim(), 23);
        let x = array![0.2, 1.7, 3.3, 5.9];
        let params = KernelParams::new(0.8, 1.5);
        let k = kernel.k(&params, &x, None).unwrap();
        let (phi, _) = fm.map(&x, &params, Key::new(0)).unwrap();
        assert!(gram_approximation_error(&k.view(), &phi.view()).unwrap() < 1e-12);
    }

    #[test]
    fn compact_map_truncation_rules() {
        let kernel = MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 8, true).unwrap();
        assert_eq!(default_feature_map(&kernel, Some(3)).unwrap().output_dim(), 5);
        assert!(default_feature_map(&kernel, Some(9)).is_err());
    }

    #[test]
    fn compact_random_phase_map_converges_to_kernel() {
        let kernel = MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 10, true).unwrap();
        let params = KernelParams::new(0.7, 1.5);
        let x = array![0.1, 1.2, 2.9, 4.0, 5.5];
        let k = kernel.k(&params, &x, None).unwrap();
        let errors: Vec<f64> = [8, 2000]
            .iter()
            .map(|&o| {
                let fm = RandomPhaseCompactFeatureMap::new(kernel.clone(), o).unwrap();
                assert_eq!(fm.output_dim(), 10 * o);
                let (phi, _) = fm.map(&x, &params, Key::new(21)).unwrap();
                gram_approximation_error(&k.view(), &phi.view()).unwrap()
            })
            .collect();
        assert!(errors[1] < errors[0] / 4.0, "{errors:?}");
        assert!(errors[1] < 0.3, "{errors:?}");
    }

    #[test]
    fn compact_random_phase_map_threads_key() {
        let kernel = MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 6, true).unwrap();
        assert!(RandomPhaseCompactFeatureMap::new(kernel.clone(), 0).is_err());
        let fm = RandomPhaseCompactFeatureMap::new(kernel, 16).unwrap();
        let x = array![0.3, 2.0];
        let params = KernelParams::default();
        let (a, next) = fm.map(&x, &params, Key::new(4)).unwrap();
        let (b, _) = fm.map(&x, &params, Key::new(4)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), (2, 96));
        let (c, _) = fm.map(&x, &params, next).unwrap();
        assert_ne!(a, c);
        assert!(fm.map(&array![f64::NAN], &params, Key::new(4)).is_err());
    }

    #[test]
    fn random_phase_map_is_reproducible_and_advances_key() {
        let h = Arc::new(Hyperbolic::new(2).unwrap());
        let fm = RandomPhaseFeatureMap::new(Arc::clone(&h), 64, true).unwrap();
        let (_, x) = h.random_points(Key::new(1), 5).unwrap();
        let params = KernelParams::new(1.0, 1.5);
        let (a, k1) = fm.map(&x, &params, Key::new(42)).unwrap();
        let (b, _) = fm.map(&x, &params, Key::new(42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dim(), (5, 128));
        let (c, _) = fm.map(&x, &params, k1).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn unnormalized_scale_is_inverse_sqrt_phases() {
        let h = Arc::new(Hyperbolic::new(3).unwrap());
        let fm = RandomPhaseFeatureMap::new(Arc::clone(&h), 10, false).unwrap();
        // at the origin every projection is 0, so each feature pair is (c⁻¹ cos 0, c⁻¹ sin 0)
        let origin = h.from_intrinsic(&array![[0.0, 0.0, 0.0]]).unwrap();
        let params = KernelParams::default();
        let (phi, _) = fm.map(&origin, &params, Key::new(3)).unwrap();
        assert!(phi.slice(s![0, 10..]).iter().all(|v| v.abs() < 1e-12));
        assert!(phi.slice(s![0, ..10]).iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn normalized_rows_stay_unit_far_from_the_origin() {
        let h = Arc::new(Hyperbolic::new(7).unwrap());
        let fm = RandomPhaseFeatureMap::new(Arc::clone(&h), 256, true).unwrap();
        let mut coords = Array2::<f64>::zeros((3, 7));
        coords[[1, 0]] = 150.0f64.sinh();
        coords[[2, 3]] = -(300.0f64.sinh());
        let x = h.from_intrinsic(&coords).unwrap();
        let (phi, _) = fm.map(&x, &KernelParams::new(1.0, 1.5), Key::new(17)).unwrap();
        for row in phi.outer_iter() {
            assert!((row.dot(&row) - 1.0).abs() < 1e-12, "row norm² {}", row.dot(&row));
        }
    }

    #[test]
    fn deterministic_wrapper_ignores_input_key() {
        let spd = Arc::new(SymmetricPositiveDefiniteMatrices::new(2).unwrap());
        let fm = make_deterministic(
            RandomPhaseFeatureMap::new(Arc::clone(&spd), 32, true).unwrap(),
            Key::new(9),
        );
        let (_, x) = spd.random_points(Key::new(2), 4).unwrap();
        let params = KernelParams::new(0.5, 1.5);
        let (a, _) = fm.map(&x, &params, Key::new(100)).unwrap();
        let (b, _) = fm.map(&x, &params, Key::new(200)).unwrap();
        assert_eq!(a, b);
        let copy = fm.clone();
        assert_eq!(copy.embed(&x, &params).unwrap(), a);
    }

    #[test]
    fn kernel_default_map_matches_kernel() {
        let spd = Arc::new(SymmetricPositiveDefiniteMatrices::new(2).unwrap());
        let kernel = MaternFeatureMapKernel::new(Arc::clone(&spd), 100, Key::new(1234), true).unwrap();
        let (_, x) = spd.random_points(Key::new(5), 6).unwrap();
        let params = KernelParams::new(0.5, 1.5);
        let k = kernel.k(&params, &x, None).unwrap();
        let fm = default_feature_map(&kernel, None).unwrap();
        let phi = fm.embed(&x, &params).unwrap();
        assert!(gram_approximation_error(&k.view(), &phi.view()).unwrap() < 1e-10);
        assert_eq!(default_feature_map(&kernel, Some(50)).unwrap().output_dim(), 100);
    }

    #[test]
    fn zero_phases_rejected() {
        let h = Arc::new(Hyperbolic::new(2).unwrap());
        assert!(RandomPhaseFeatureMap::new(h, 0, true).is_err());
    }
}
