//! Geometric kernels.
//!
//! Two families, matching the two spectral views in [`crate::space`]:
//!
//! - [`MaternKarhunenLoeveKernel`]: truncated eigenexpansion `Σ s_i φ_i(x) φ_i(y)` on compact
//!   spaces. Exact up to truncation, deterministic.
//! - [`MaternFeatureMapKernel`]: Monte-Carlo kernel `Φ(x)·Φ(y)ᵀ` from random-phase features on
//!   non-compact spaces. The random features are fixed at construction by a stored key, so
//!   every evaluation sees the same features.
//! - [`MaternIntegratedKernel`]: deterministic Matérn kernel on low-dimensional hyperbolic
//!   space, integrating the heat kernel over diffusion time.

use std::sync::Arc;

use crate::feature_map::{make_deterministic, DeterministicFeatureMap, RandomPhaseFeatureMap};
use crate::hyperbolic::Hyperbolic;
use crate::key::Key;
use crate::params::{KernelParams, Nu};
use crate::space::{DiscreteSpectrumSpace, Eigenfunctions, NoncompactSymmetricSpace, Space};
use crate::spectrum::spectrum;
use crate::utils::trapz;
use crate::{Error, Result};
use ndarray::{Array1, Array2, Axis};

/// A covariance function on a [`Space`].
pub trait GeometricKernel {
    type Space: Space;

    fn space(&self) -> &Self::Space;

    /// Default hyperparameters: `lengthscale = 1`, `nu = ∞` (heat kernel).
    fn init_params(&self) -> KernelParams {
        KernelParams::default()
    }

    /// Gram matrix `[N, N']` between `x` and `y`; `y = None` means `x` against itself, and the
    /// result is then exactly symmetric.
    fn k(
        &self,
        params: &KernelParams,
        x: &<Self::Space as Space>::Points,
        y: Option<&<Self::Space as Space>::Points>,
    ) -> Result<Array2<f64>>;

    /// Diagonal of `k(params, x, None)`.
    fn k_diag(&self, params: &KernelParams, x: &<Self::Space as Space>::Points) -> Result<Array1<f64>>;
}

/// Point batch type of a kernel's space.
pub type PointsOf<K> = <<K as GeometricKernel>::Space as Space>::Points;

fn symmetrize(k: Array2<f64>) -> Array2<f64> {
    (&k + &k.t()) * 0.5
}

/// Truncated Karhunen–Loève (eigenexpansion) Matérn kernel on a compact space.
#[derive(Debug)]
pub struct MaternKarhunenLoeveKernel<S: DiscreteSpectrumSpace> {
    space: Arc<S>,
    num_levels: usize,
    eigenvalues: Array1<f64>,
    eigenfunctions: Arc<S::Eigenfunctions>,
    mean_squares: Array1<f64>,
    normalize: bool,
}

impl<S: DiscreteSpectrumSpace> Clone for MaternKarhunenLoeveKernel<S> {
    fn clone(&self) -> Self {
        Self {
            space: Arc::clone(&self.space),
            num_levels: self.num_levels,
            eigenvalues: self.eigenvalues.clone(),
            eigenfunctions: Arc::clone(&self.eigenfunctions),
            mean_squares: self.mean_squares.clone(),
            normalize: self.normalize,
        }
    }
}

impl<S: DiscreteSpectrumSpace> MaternKarhunenLoeveKernel<S> {
    /// Precompute the first `num_levels` levels of the spectrum of `space`.
    pub fn new(space: Arc<S>, num_levels: usize, normalize: bool) -> Result<Self> {
        let eigenvalues = space.eigenvalues(num_levels)?;
        let eigenfunctions = space.eigenfunctions(num_levels)?;
        let mean_squares = eigenfunctions.mean_squares();
        log::debug!(
            "karhunen-loeve kernel: {num_levels} levels, {} eigenfunctions",
            eigenvalues.len()
        );
        Ok(Self {
            space,
            num_levels,
            eigenvalues,
            eigenfunctions: Arc::new(eigenfunctions),
            mean_squares,
            normalize,
        })
    }

    pub fn num_levels(&self) -> usize {
        self.num_levels
    }

    pub fn eigenvalues(&self) -> &Array1<f64> {
        &self.eigenvalues
    }

    pub fn eigenfunctions(&self) -> &S::Eigenfunctions {
        &self.eigenfunctions
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn space_arc(&self) -> &Arc<S> {
        &self.space
    }

    /// Spectral weights `s_i` for `params` (normalized if the kernel normalizes).
    pub fn spectrum(&self, params: &KernelParams) -> Result<Array1<f64>> {
        spectrum(
            &self.eigenvalues.view(),
            &self.mean_squares.view(),
            params,
            self.space.dimension(),
            self.normalize,
        )
    }

    /// Eigenfunctions at `x`, scaled column-wise by `√s`. `embed(x)·embed(y)ᵀ` is the kernel.
    pub(crate) fn weighted_eigenfunctions(
        &self,
        params: &KernelParams,
        x: &S::Points,
    ) -> Result<Array2<f64>> {
        let s = self.spectrum(params)?;
        self.space.validate_points(x)?;
        let phi = self.eigenfunctions.evaluate(x)?;
        Ok(phi * &s.mapv(f64::sqrt))
    }
}

impl<S: DiscreteSpectrumSpace> GeometricKernel for MaternKarhunenLoeveKernel<S> {
    type Space = S;

    fn space(&self) -> &S {
        &self.space
    }

    fn k(&self, params: &KernelParams, x: &S::Points, y: Option<&S::Points>) -> Result<Array2<f64>> {
        let s = self.spectrum(params)?;
        self.space.validate_points(x)?;
        let phi_x = self.eigenfunctions.evaluate(x)?;
        match y {
            None => Ok(symmetrize((&phi_x * &s).dot(&phi_x.t()))),
            Some(y) => {
                self.space.validate_points(y)?;
                let phi_y = self.eigenfunctions.evaluate(y)?;
                Ok((&phi_x * &s).dot(&phi_y.t()))
            }
        }
    }

    fn k_diag(&self, params: &KernelParams, x: &S::Points) -> Result<Array1<f64>> {
        let s = self.spectrum(params)?;
        self.space.validate_points(x)?;
        let phi = self.eigenfunctions.evaluate(x)?;
        Ok((&phi * &phi * &s).sum_axis(Axis(1)))
    }
}

/// Monte-Carlo Matérn kernel on a non-compact symmetric space.
#[derive(Debug)]
pub struct MaternFeatureMapKernel<S: NoncompactSymmetricSpace> {
    space: Arc<S>,
    feature_map: DeterministicFeatureMap<RandomPhaseFeatureMap<S>>,
}

impl<S: NoncompactSymmetricSpace> MaternFeatureMapKernel<S> {
    /// Fix `num_phases` random phases (and spectral samples) with `key`.
    pub fn new(space: Arc<S>, num_phases: usize, key: Key, normalize: bool) -> Result<Self> {
        let random = RandomPhaseFeatureMap::new(Arc::clone(&space), num_phases, normalize)?;
        log::debug!("feature-map kernel: {num_phases} random phases, normalize = {normalize}");
        Ok(Self {
            space,
            feature_map: make_deterministic(random, key),
        })
    }

    pub fn num_phases(&self) -> usize {
        self.feature_map.inner().num_phases()
    }

    pub fn normalize(&self) -> bool {
        self.feature_map.inner().normalize()
    }

    pub fn space_arc(&self) -> &Arc<S> {
        &self.space
    }

    /// The fixed feature map this kernel evaluates.
    pub fn feature_map(&self) -> &DeterministicFeatureMap<RandomPhaseFeatureMap<S>> {
        &self.feature_map
    }

    /// Replay the stored key with a different number of phases.
    pub(crate) fn resized_feature_map(
        &self,
        num_phases: usize,
    ) -> Result<DeterministicFeatureMap<RandomPhaseFeatureMap<S>>> {
        let random = RandomPhaseFeatureMap::new(Arc::clone(&self.space), num_phases, self.normalize())?;
        Ok(make_deterministic(random, self.feature_map.key_snapshot()))
    }
}

impl<S: NoncompactSymmetricSpace> GeometricKernel for MaternFeatureMapKernel<S> {
    type Space = S;

    fn space(&self) -> &S {
        &self.space
    }

    fn k(&self, params: &KernelParams, x: &S::Points, y: Option<&S::Points>) -> Result<Array2<f64>> {
        let phi_x = self.feature_map.embed(x, params)?;
        match y {
            None => Ok(symmetrize(phi_x.dot(&phi_x.t()))),
            Some(y) => {
                let phi_y = self.feature_map.embed(y, params)?;
                Ok(phi_x.dot(&phi_y.t()))
            }
        }
    }

    fn k_diag(&self, params: &KernelParams, x: &S::Points) -> Result<Array1<f64>> {
        let phi = self.feature_map.embed(x, params)?;
        Ok((&phi * &phi).sum_axis(Axis(1)))
    }
}

/// Diffusion-time window of [`MaternIntegratedKernel`], in units of `κ²/2ν`.
const MIN_DIFFUSION_TIME: f64 = 1e-8;
const MAX_DIFFUSION_TIME: f64 = 1e2;

/// Deterministic Matérn kernel on `Hⁿ`, `n ≤ 3`.
///
/// From `(a + Δ)^{-ν-n/2} ∝ ∫ t^{ν+n/2-1} e^{-at} e^{-tΔ} dt` with `a = 2ν/κ²`: the heat kernel
/// `P_t(d)` averaged over diffusion times, normalized to `k(x, x) = 1`. The time integral (and
/// the distance integral of the `n = 2` heat kernel) use `num_points` trapezoidal nodes.
/// `nu = ∞` is the normalized heat kernel at `t = κ²/2`.
#[derive(Debug, Clone)]
pub struct MaternIntegratedKernel {
    space: Arc<Hyperbolic>,
    num_points: usize,
}

impl MaternIntegratedKernel {
    pub fn new(space: Arc<Hyperbolic>, num_points: usize) -> Result<Self> {
        if space.dimension() > 3 {
            return Err(Error::Domain("integrated Matérn kernel needs dimension <= 3"));
        }
        if num_points < 2 {
            return Err(Error::Domain("num_points must be >= 2"));
        }
        Ok(Self { space, num_points })
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    /// Kernel value for every entry of a matrix of geodesic distances.
    pub fn profile(&self, params: &KernelParams, distances: &Array2<f64>) -> Result<Array2<f64>> {
        params.validate()?;
        let kappa = params.lengthscale;
        let values: Vec<f64> = match params.nu {
            Nu::Infinite => {
                let t = 0.5 * kappa * kappa;
                let at_zero = self.space.heat_kernel(0.0, t, self.num_points)?;
                distances
                    .iter()
                    .map(|&d| -> Result<f64> {
                        Ok(self.space.heat_kernel(d, t, self.num_points)? / at_zero)
                    })
                    .collect::<Result<Vec<f64>>>()?
            }
            Nu::Finite(nu) => {
                let integral = self.time_integral(nu, kappa)?;
                let at_zero = integral(0.0)?;
                if !at_zero.is_finite() || at_zero <= 0.0 {
                    return Err(Error::Numerical("integrated kernel vanishes at distance 0"));
                }
                distances
                    .iter()
                    .map(|&d| -> Result<f64> { Ok(integral(d)? / at_zero) })
                    .collect::<Result<Vec<f64>>>()?
            }
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::Numerical("integrated kernel is not finite"));
        }
        Array2::from_shape_vec(distances.raw_dim(), values)
            .map_err(|_| Error::Shape("distance matrix must be contiguous"))
    }

    /// `d ↦ ∫ t^{ν+n/2-1} e^{-at} P_t(d) dt` up to a constant, on a log-time grid.
    fn time_integral(&self, nu: f64, kappa: f64) -> Result<impl Fn(f64) -> Result<f64> + '_> {
        let n = self.space.dimension() as f64;
        let rho = (n - 1.0) / 2.0;
        // heat_kernel drops the t^{-p} e^{-ρ²t} factor of P_t
        let p = if self.space.dimension() == 2 { 1.5 } else { n / 2.0 };
        let scale = kappa * kappa / (2.0 * nu);
        let u = Array1::linspace(
            (MIN_DIFFUSION_TIME * scale).ln(),
            (MAX_DIFFUSION_TIME * scale).ln(),
            self.num_points,
        );
        let log_w = u.mapv(|u| {
            let t = u.exp();
            (nu + n / 2.0 - p) * u - t / scale - rho * rho * t
        });
        let max = log_w.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
        if !max.is_finite() {
            return Err(Error::Numerical("diffusion-time weights are not finite"));
        }
        let w = log_w.mapv(|v| (v - max).exp());
        let times = u.mapv(f64::exp);
        Ok(move |d: f64| -> Result<f64> {
            let mut y = Array1::<f64>::zeros(times.len());
            for (k, &t) in times.iter().enumerate() {
                y[k] = w[k] * self.space.heat_kernel(d, t, self.num_points)?;
            }
            trapz(&y.view(), &u.view())
        })
    }
}

impl GeometricKernel for MaternIntegratedKernel {
    type Space = Hyperbolic;

    fn space(&self) -> &Hyperbolic {
        &self.space
    }

    fn k(&self, params: &KernelParams, x: &Array2<f64>, y: Option<&Array2<f64>>) -> Result<Array2<f64>> {
        match y {
            None => {
                let d = self.space.distance(x, x)?;
                Ok(symmetrize(self.profile(params, &d)?))
            }
            Some(y) => {
                let d = self.space.distance(x, y)?;
                self.profile(params, &d)
            }
        }
    }

    fn k_diag(&self, params: &KernelParams, x: &Array2<f64>) -> Result<Array1<f64>> {
        params.validate()?;
        self.space.validate_points(x)?;
        Ok(Array1::ones(x.nrows()))
    }
}
