//! Space abstractions.
//!
//! A space is an immutable geometric domain plus a point representation. Kernels never look
//! inside a space directly; they go through one of two spectral views:
//!
//! - [`DiscreteSpectrumSpace`]: compact domains with a Laplace–Beltrami eigenbasis
//!   (Karhunen–Loève expansion).
//! - [`NoncompactSymmetricSpace`]: non-compact symmetric spaces, where kernels are Monte-Carlo
//!   averages of spherical functions built from random phases.

use crate::key::Key;
use crate::Result;
use ndarray::{Array1, Array2, Array3};

/// A geometric domain with its own point representation.
pub trait Space: std::fmt::Debug + Send + Sync {
    /// A batch of points on this space (indices, angles, embedded vectors, matrices, …).
    type Points: Clone + std::fmt::Debug;

    /// Intrinsic dimension.
    fn dimension(&self) -> usize;

    /// Number of points in a batch.
    fn num_points(&self, points: &Self::Points) -> usize;

    /// Reject batches that do not belong to this space (wrong shape, out-of-range index).
    fn validate_points(&self, points: &Self::Points) -> Result<()>;

    /// `n` random points, deterministic given `key`.
    fn random_points(&self, key: Key, n: usize) -> Result<(Key, Self::Points)>;
}

/// Laplace–Beltrami eigenfunctions evaluated on point batches.
pub trait Eigenfunctions<P>: std::fmt::Debug + Send + Sync {
    /// Number of eigenfunctions `M`.
    fn num_eigenfunctions(&self) -> usize;

    /// `[N, M]` matrix of eigenfunction values.
    fn evaluate(&self, points: &P) -> Result<Array2<f64>>;

    /// Mean of `φ_i²` over the whole space, per eigenfunction (length `M`).
    fn mean_squares(&self) -> Array1<f64>;
}

/// Eigenfunctions whose per-level sums `A_l(x, y) = Σ_{j ∈ l} φ_j(x) φ_j(y)` have a closed form.
///
/// `A_l` reproduces itself under averaging over the space: `E_b[A_l(x, b) A_l(b, y)] = A_l(x, y)`
/// for `b` uniform, which is what random-phase features on compact spaces rely on.
pub trait AdditionTheorem<P>: Eigenfunctions<P> {
    /// Eigenfunctions per level; sums to `num_eigenfunctions`.
    fn level_sizes(&self) -> Vec<usize>;

    /// `[N, N', L]` per-level sums between every point of `x` and every point of `y`.
    fn phi_product(&self, x: &P, y: &P) -> Result<Array3<f64>>;
}

/// Compact space with a discrete Laplacian spectrum.
///
/// "Levels" are the truncation unit: for a mesh one level is one eigenfunction, for analytic
/// spaces one level groups all eigenfunctions sharing an eigenvalue.
pub trait DiscreteSpectrumSpace: Space {
    type Eigenfunctions: Eigenfunctions<Self::Points> + 'static;

    /// Default number of levels when the caller does not choose one.
    fn default_levels(&self) -> usize;

    fn num_eigenfunctions(&self, levels: usize) -> Result<usize>;

    /// Eigenvalues repeated once per eigenfunction, ascending, length `num_eigenfunctions`.
    fn eigenvalues(&self, levels: usize) -> Result<Array1<f64>>;

    fn eigenfunctions(&self, levels: usize) -> Result<Self::Eigenfunctions>;
}

/// Non-compact symmetric space `G/K`.
///
/// The spherical function with spectral parameter `λ` is the average over random phases `b` of
/// the power function `exp((ρ + iλ)·a(x, b))`, where `a` is the horocyclic projection.
pub trait NoncompactSymmetricSpace: Space {
    /// Random phases (boundary points, rotations, …).
    type Phases: std::fmt::Debug;

    /// Dimension of the spectral parameter `λ`.
    fn rank(&self) -> usize;

    /// Half-sum of positive roots, length `rank`.
    fn rho(&self) -> Array1<f64>;

    fn random_phases(&self, key: Key, num: usize) -> Result<(Key, Self::Phases)>;

    /// Horocyclic projection `a(x_i, b_o)`, shape `[N, O, rank]`.
    fn horocyclic_projection(
        &self,
        points: &Self::Points,
        phases: &Self::Phases,
    ) -> Result<Array3<f64>>;

    /// `|c(λ)|^{-1}` for each row of `lambda` (`[O, rank]` → `[O]`).
    fn inv_harish_chandra(&self, lambda: &Array2<f64>) -> Array1<f64>;
}
