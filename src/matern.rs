//! A Matérn kernel that "just works" for any supported space.
//!
//! [`matern_geometric_kernel`] picks the right construction from the space type: an
//! eigenexpansion for compact spaces, a Monte-Carlo feature-map kernel for non-compact ones.
//! It returns the kernel together with its canonical feature map.

use std::sync::Arc;

use crate::circle::Circle;
use crate::feature_map::{
    DefaultFeatureMap, DeterministicCompactFeatureMap, DeterministicFeatureMap, RandomPhaseFeatureMap,
};
use crate::hyperbolic::Hyperbolic;
use crate::kernel::{MaternFeatureMapKernel, MaternKarhunenLoeveKernel};
use crate::key::Key;
use crate::mesh::Mesh;
use crate::space::{DiscreteSpectrumSpace, NoncompactSymmetricSpace, Space};
use crate::spd::SymmetricPositiveDefiniteMatrices;
use crate::{Error, Result};

/// Default number of random phases for non-compact spaces.
pub const DEFAULT_NUM_RANDOM_PHASES: usize = 3000;

/// Construction options for [`matern_geometric_kernel`].
#[derive(Debug, Clone, Copy)]
pub struct MaternConfig {
    /// Levels (compact) or random phases (non-compact). `None` uses the space default.
    pub num: Option<usize>,
    /// Unit mean variance (compact) or unit-norm features (non-compact).
    pub normalize: bool,
}

impl Default for MaternConfig {
    fn default() -> Self {
        Self {
            num: None,
            normalize: true,
        }
    }
}

/// Spaces [`matern_geometric_kernel`] knows how to build a kernel for.
pub trait MaternSpace: Space + Sized {
    type Kernel: DefaultFeatureMap<Space = Self, Map = Self::FeatureMap>;
    type FeatureMap;

    /// `num` used when the config leaves it unset.
    fn default_num(&self) -> usize;

    fn build_matern(
        space: Arc<Self>,
        config: &MaternConfig,
        key: Option<Key>,
    ) -> Result<(Self::Kernel, Self::FeatureMap)>;
}

/// Build the Matérn kernel and default feature map for `space`.
///
/// `key` is mandatory for non-compact spaces (their kernels are random) and ignored otherwise.
pub fn matern_geometric_kernel<S: MaternSpace>(
    space: Arc<S>,
    config: MaternConfig,
    key: Option<Key>,
) -> Result<(S::Kernel, S::FeatureMap)> {
    S::build_matern(space, &config, key)
}

fn compact<S>(
    space: Arc<S>,
    config: &MaternConfig,
    default_num: usize,
) -> Result<(MaternKarhunenLoeveKernel<S>, DeterministicCompactFeatureMap<S>)>
where
    S: DiscreteSpectrumSpace,
{
    let levels = config.num.unwrap_or(default_num);
    let kernel = MaternKarhunenLoeveKernel::new(space, levels, config.normalize)?;
    let feature_map = kernel.default_feature_map(None)?;
    Ok((kernel, feature_map))
}

type NoncompactPair<S> = (
    MaternFeatureMapKernel<S>,
    DeterministicFeatureMap<RandomPhaseFeatureMap<S>>,
);

fn noncompact<S>(
    space: Arc<S>,
    config: &MaternConfig,
    key: Option<Key>,
    default_num: usize,
) -> Result<NoncompactPair<S>>
where
    S: NoncompactSymmetricSpace,
{
    let key = key.ok_or(Error::MissingKey(
        "non-compact spaces need a key to fix their random features",
    ))?;
    let num_phases = config.num.unwrap_or(default_num);
    let kernel = MaternFeatureMapKernel::new(space, num_phases, key, config.normalize)?;
    let feature_map = kernel.default_feature_map(None)?;
    Ok((kernel, feature_map))
}

impl MaternSpace for Mesh {
    type Kernel = MaternKarhunenLoeveKernel<Mesh>;
    type FeatureMap = DeterministicCompactFeatureMap<Mesh>;

    /// One eigenfunction per level, capped at the vertex count.
    fn default_num(&self) -> usize {
        self.default_levels()
    }

    fn build_matern(
        space: Arc<Self>,
        config: &MaternConfig,
        _key: Option<Key>,
    ) -> Result<(Self::Kernel, Self::FeatureMap)> {
        let default_num = space.default_num();
        compact(space, config, default_num)
    }
}

impl MaternSpace for Circle {
    type Kernel = MaternKarhunenLoeveKernel<Circle>;
    type FeatureMap = DeterministicCompactFeatureMap<Circle>;

    fn default_num(&self) -> usize {
        self.default_levels()
    }

    fn build_matern(
        space: Arc<Self>,
        config: &MaternConfig,
        _key: Option<Key>,
    ) -> Result<(Self::Kernel, Self::FeatureMap)> {
        let default_num = space.default_num();
        compact(space, config, default_num)
    }
}

impl MaternSpace for Hyperbolic {
    type Kernel = MaternFeatureMapKernel<Hyperbolic>;
    type FeatureMap = DeterministicFeatureMap<RandomPhaseFeatureMap<Hyperbolic>>;

    fn default_num(&self) -> usize {
        DEFAULT_NUM_RANDOM_PHASES
    }

    fn build_matern(
        space: Arc<Self>,
        config: &MaternConfig,
        key: Option<Key>,
    ) -> Result<(Self::Kernel, Self::FeatureMap)> {
        let default_num = space.default_num();
        noncompact(space, config, key, default_num)
    }
}

impl MaternSpace for SymmetricPositiveDefiniteMatrices {
    type Kernel = MaternFeatureMapKernel<SymmetricPositiveDefiniteMatrices>;
    type FeatureMap = DeterministicFeatureMap<RandomPhaseFeatureMap<SymmetricPositiveDefiniteMatrices>>;

    fn default_num(&self) -> usize {
        DEFAULT_NUM_RANDOM_PHASES
    }

    fn build_matern(
        space: Arc<Self>,
        config: &MaternConfig,
        key: Option<Key>,
    ) -> Result<(Self::Kernel, Self::FeatureMap)> {
        let default_num = space.default_num();
        noncompact(space, config, key, default_num)
    }
}
