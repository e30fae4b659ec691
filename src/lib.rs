//! # geokernels
//!
//! Matérn and heat kernels on non-Euclidean domains, their finite feature maps, and
//! Gaussian-process sampling built on those feature maps.
//!
//! This crate is intentionally small:
//!
//! - it evaluates **Gram matrices** on meshes and analytic spaces (eigenexpansions) and on
//!   non-compact symmetric spaces (Monte-Carlo random-phase features),
//! - it draws **sample paths** from feature maps without forming or factorizing a Gram matrix,
//! - it does not fit Gaussian processes (likelihoods and posteriors belong to a front-end;
//!   [`frontend::ScaledKernel`] is the callable such a front-end consumes).
//!
//! ## Public invariants (must not change)
//!
//! - **Randomness is explicit**: every randomized call takes a [`key::Key`] by value and returns
//!   the advanced key. There is no global generator. Same key in, same bits out.
//! - **Parameters are values**: [`params::KernelParams`] is `Copy`; variants are derived with
//!   `with_*`, never mutated in place.
//! - **`nu = ∞` is its own branch**: the heat kernel is evaluated in closed form, not as a large
//!   finite `ν`.
//! - **Validation before arithmetic**: bad lengthscales, smoothness, points or mesh indices are
//!   [`Error`]s, never NaNs.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use geokernels::feature_map::FeatureMap;
//! use geokernels::kernel::GeometricKernel;
//! use geokernels::key::Key;
//! use geokernels::matern::{matern_geometric_kernel, MaternConfig};
//! use geokernels::space::Space;
//! use geokernels::spd::SymmetricPositiveDefiniteMatrices;
//! use geokernels::utils::gram_approximation_error;
//!
//! let space = Arc::new(SymmetricPositiveDefiniteMatrices::new(2).unwrap());
//! let (_, xs) = space.random_points(Key::new(1234), 5).unwrap();
//! let config = MaternConfig { num: Some(200), ..Default::default() };
//! let (kernel, feature_map) =
//!     matern_geometric_kernel(Arc::clone(&space), config, Some(Key::new(1234))).unwrap();
//!
//! let params = kernel.init_params().with_nu(1.5).with_lengthscale(0.5);
//! let k = kernel.k(&params, &xs, None).unwrap();
//! let (phi, _) = feature_map.map(&xs, &params, Key::new(0)).unwrap();
//! assert!(gram_approximation_error(&k.view(), &phi.view()).unwrap() < 1e-8);
//! ```
//!
//! ## Module map
//!
//! - `key`: explicit randomness state
//! - `params`: `KernelParams`, `Nu`
//! - `space`: `Space`, `DiscreteSpectrumSpace`, `NoncompactSymmetricSpace`
//! - `mesh`, `circle`: compact spaces; `hyperbolic`, `spd`: non-compact symmetric spaces
//! - `spectrum`, `density`: Matérn/heat spectra and spectral sampling
//! - `kernel`: `GeometricKernel`, Karhunen–Loève, feature-map and integrated hyperbolic kernels
//! - `feature_map`: `FeatureMap`, `default_feature_map`, `make_deterministic`
//! - `matern`: `matern_geometric_kernel` (construction by space type)
//! - `sampler`: GP sample paths from a feature map
//! - `frontend`: variance-scaled covariance callable
//! - `linalg`, `utils`: small dense helpers

pub mod circle;
pub mod density;
pub mod feature_map;
pub mod frontend;
pub mod hyperbolic;
pub mod kernel;
pub mod key;
pub mod linalg;
pub mod matern;
pub mod mesh;
pub mod params;
pub mod sampler;
pub mod space;
pub mod spd;
pub mod spectrum;
pub mod utils;

/// geokernels error variants.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: {0}")]
    Shape(&'static str),
    #[error("domain error: {0}")]
    Domain(&'static str),
    #[error("invalid parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
    #[error("missing key: {0}")]
    MissingKey(&'static str),
    #[error("numerical failure: {0}")]
    Numerical(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
