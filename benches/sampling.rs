use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use geokernels::feature_map::{default_feature_map, RandomPhaseFeatureMap};
use geokernels::hyperbolic::Hyperbolic;
use geokernels::kernel::MaternKarhunenLoeveKernel;
use geokernels::key::Key;
use geokernels::mesh::Mesh;
use geokernels::params::KernelParams;
use geokernels::sampler::sampler;
use geokernels::space::Space;

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("gp_sampling");
    group.sample_size(20);
    let params = KernelParams::new(0.5, 2.5);

    let mesh = Arc::new(Mesh::icosphere(4).expect("mesh"));
    let all: Vec<usize> = (0..mesh.num_vertices()).collect();
    for &levels in &[50usize, 150] {
        let kernel = MaternKarhunenLoeveKernel::new(Arc::clone(&mesh), levels, true).expect("kernel");
        let paths = sampler(default_feature_map(&kernel, None).expect("feature map"), 8);
        group.bench_with_input(
            BenchmarkId::new("icosphere4_all_vertices", format!("l{levels}")),
            &levels,
            |b, _| b.iter(|| paths.sample(&all, &params, Key::new(0)).unwrap()),
        );
    }

    let h = Arc::new(Hyperbolic::new(2).expect("space"));
    for &n in &[100usize, 1000] {
        let (_, xs) = h.random_points(Key::new(5), n).expect("points");
        let paths = sampler(RandomPhaseFeatureMap::new(Arc::clone(&h), 512, true).expect("map"), 4);
        group.bench_with_input(BenchmarkId::new("hyperbolic2_o512", format!("n{n}")), &n, |b, _| {
            b.iter(|| paths.sample(&xs, &params, Key::new(0)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_sampling);
criterion_main!(benches);
