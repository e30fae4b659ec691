use std::sync::Arc;

use geokernels::circle::Circle;
use geokernels::hyperbolic::Hyperbolic;
use geokernels::key::Key;
use geokernels::kernel::GeometricKernel;
use geokernels::linalg::symmetric_eigen;
use geokernels::matern::{matern_geometric_kernel, MaternConfig, MaternSpace};
use geokernels::mesh::Mesh;
use geokernels::params::KernelParams;
use geokernels::space::Space;
use geokernels::spd::SymmetricPositiveDefiniteMatrices;
use geokernels::Error;
use ndarray::Array2;
use proptest::prelude::*;

fn check_psd(k: &Array2<f64>) {
    assert_eq!(k, k.t());
    assert!(k.iter().all(|v| v.is_finite()));
    assert!(k.diag().iter().all(|&v| v >= 0.0));
    let (evals, _) = symmetric_eigen(&k.view()).expect("eigen");
    let scale = evals[evals.len() - 1].abs().max(1.0);
    assert!(evals[0] > -1e-9 * scale, "min eigenvalue {}", evals[0]);
}

fn gram<S: MaternSpace>(space: S, num: usize, params: &KernelParams, key: Option<Key>) -> Array2<f64> {
    let space = Arc::new(space);
    let (_, xs) = space.random_points(Key::new(21), 12).expect("points");
    let config = MaternConfig {
        num: Some(num),
        ..Default::default()
    };
    let (kernel, _) = matern_geometric_kernel(space, config, key).expect("kernel");
    kernel.k(params, &xs, None).expect("gram")
}

#[test]
fn every_space_gives_symmetric_psd_grams() {
    for params in [
        KernelParams::default(),
        KernelParams::new(0.5, 0.5),
        KernelParams::new(2.0, 2.5),
    ] {
        check_psd(&gram(Circle::new(), 20, &params, None));
        check_psd(&gram(Mesh::icosphere(2).expect("mesh"), 50, &params, None));
        check_psd(&gram(Hyperbolic::new(2).expect("h2"), 200, &params, Some(Key::new(1))));
        check_psd(&gram(
            SymmetricPositiveDefiniteMatrices::new(3).expect("spd"),
            200,
            &params,
            Some(Key::new(1)),
        ));
    }
}

#[test]
fn smoothness_changes_every_kernel() {
    let heat = KernelParams::new(0.8, f64::INFINITY);
    let matern = KernelParams::new(0.8, 1.5);
    let differs = |a: Array2<f64>, b: Array2<f64>| (&a - &b).iter().map(|v| v.abs()).sum::<f64>() > 1e-3;
    assert!(differs(gram(Circle::new(), 20, &heat, None), gram(Circle::new(), 20, &matern, None)));
    let h = || Hyperbolic::new(2).expect("h2");
    assert!(differs(
        gram(h(), 500, &heat, Some(Key::new(3))),
        gram(h(), 500, &matern, Some(Key::new(3)))
    ));
}

#[test]
fn invalid_parameters_are_rejected_everywhere() {
    let bad = [
        KernelParams::new(0.0, 1.5),
        KernelParams::new(-1.0, f64::INFINITY),
        KernelParams::new(f64::NAN, 1.5),
        KernelParams::new(1.0, -0.5),
        KernelParams::new(1.0, f64::NAN),
    ];
    let circle = Arc::new(Circle::new());
    let (ck, _) = matern_geometric_kernel(Arc::clone(&circle), MaternConfig::default(), None).expect("kernel");
    let h = Arc::new(Hyperbolic::new(2).expect("h2"));
    let (_, hx) = h.random_points(Key::new(0), 3).expect("points");
    let (hk, _) = matern_geometric_kernel(Arc::clone(&h), MaternConfig::default(), Some(Key::new(0)))
        .expect("kernel");
    for p in &bad {
        let e = ck.k(p, &ndarray::array![0.0, 1.0], None).unwrap_err();
        assert!(matches!(e, Error::InvalidParameter { .. }), "{e}");
        assert!(matches!(hk.k(p, &hx, None), Err(Error::InvalidParameter { .. })));
    }
}

#[test]
fn invalid_spaces_fail_at_construction() {
    assert!(Hyperbolic::new(0).is_err());
    assert!(SymmetricPositiveDefiniteMatrices::new(0).is_err());
    assert!(Mesh::icosphere(0).is_err());
    let vertices = ndarray::array![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    assert!(Mesh::new(vertices, ndarray::array![[0usize, 1, 3]]).is_err());
}

#[test]
fn noncompact_kernels_demand_a_key() {
    let spd = Arc::new(SymmetricPositiveDefiniteMatrices::new(2).expect("spd"));
    let err = matern_geometric_kernel(spd, MaternConfig::default(), None).unwrap_err();
    assert!(matches!(err, Error::MissingKey(_)));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_hyperbolic_gram_psd(seed in 0u64..1000, lengthscale in 0.2f64..3.0, nu in 0.5f64..5.0) {
        let k = gram(
            Hyperbolic::new(3).expect("h3"),
            64,
            &KernelParams::new(lengthscale, nu),
            Some(Key::new(seed)),
        );
        let (evals, _) = symmetric_eigen(&k.view()).expect("eigen");
        prop_assert!(evals[0] > -1e-9);
        prop_assert_eq!(k.clone(), k.t().to_owned());
    }
}
