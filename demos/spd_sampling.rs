//! Monte-Carlo Matérn kernel on 2×2 SPD matrices and GP sample paths from its feature map.

use std::sync::Arc;

use geokernels::feature_map::FeatureMap;
use geokernels::kernel::GeometricKernel;
use geokernels::key::Key;
use geokernels::matern::{matern_geometric_kernel, MaternConfig};
use geokernels::sampler::sampler;
use geokernels::space::Space;
use geokernels::spd::SymmetricPositiveDefiniteMatrices;
use geokernels::utils::gram_approximation_error;

fn main() -> geokernels::Result<()> {
    let space = Arc::new(SymmetricPositiveDefiniteMatrices::new(2)?);
    let (_, xs) = space.random_points(Key::new(1234), 10)?;

    let (kernel, feature_map) =
        matern_geometric_kernel(Arc::clone(&space), MaternConfig::default(), Some(Key::new(1234)))?;
    let params = kernel.init_params().with_nu(1.5).with_lengthscale(0.5);

    let k = kernel.k(&params, &xs, None)?;
    let (embedding, _) = feature_map.map(&xs, &params, Key::new(1234))?;
    println!(
        "feature map: {} features, ‖K − ΦΦᵀ‖ = {:.2e}",
        feature_map.output_dim(),
        gram_approximation_error(&k.view(), &embedding.view())?
    );

    let d = space.distance(&xs, &xs)?;
    println!("K[0, j] vs distance:");
    for j in 0..xs.shape()[0] {
        println!("  d = {:.3}  k = {:.4}", d[[0, j]], k[[0, j]]);
    }

    let paths = sampler(feature_map, 2);
    let (_, samples) = paths.sample(&xs, &params, Key::new(1234))?;
    println!("samples:\n{samples:.4}");
    Ok(())
}
