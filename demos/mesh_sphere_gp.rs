//! Matérn kernel on an icosahedral sphere mesh: Gram matrix, Cholesky, and sample paths.

use std::sync::Arc;

use geokernels::feature_map::default_feature_map;
use geokernels::kernel::GeometricKernel;
use geokernels::key::Key;
use geokernels::matern::{matern_geometric_kernel, MaternConfig};
use geokernels::mesh::Mesh;
use geokernels::sampler::sampler;
use geokernels::space::Space;
use nalgebra::DMatrix;

fn main() -> geokernels::Result<()> {
    let mesh = Arc::new(Mesh::icosphere(3)?);
    println!("mesh: {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces());

    let config = MaternConfig {
        num: Some(20),
        ..Default::default()
    };
    let (kernel, _) = matern_geometric_kernel(Arc::clone(&mesh), config, None)?;
    let params = kernel.init_params().with_nu(1.5).with_lengthscale(0.5);

    let (key, xs) = mesh.random_points(Key::new(1234), 25)?;
    let k = kernel.k(&params, &xs, None)?;
    let n = k.nrows();
    let jittered = DMatrix::from_fn(n, n, |i, j| k[[i, j]] + if i == j { 1e-6 } else { 0.0 });
    println!("cholesky of K + 1e-6 I succeeded: {}", jittered.cholesky().is_some());

    let all: Vec<usize> = (0..mesh.num_vertices()).collect();
    let paths = sampler(default_feature_map(&kernel, None)?, 3);
    let (_, samples) = paths.sample(&all, &params, key)?;
    for (s, col) in samples.columns().into_iter().enumerate() {
        let mean = col.sum() / col.len() as f64;
        let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / col.len() as f64;
        println!("sample {s}: mean {mean:+.3}, variance {var:.3}");
    }
    Ok(())
}
