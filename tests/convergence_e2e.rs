//! Monte-Carlo error against closed forms, as a function of the number of random phases.

use std::sync::Arc;

use geokernels::circle::Circle;
use geokernels::hyperbolic::Hyperbolic;
use geokernels::kernel::{
    GeometricKernel, MaternFeatureMapKernel, MaternIntegratedKernel, MaternKarhunenLoeveKernel,
};
use geokernels::key::Key;
use geokernels::params::KernelParams;
use ndarray::{Array1, Array2};

/// Heat kernel on H³ normalized to 1 at distance 0.
fn exact_h3_heat(d: &Array2<f64>, lengthscale: f64) -> Array2<f64> {
    d.mapv(|r| {
        let shape = if r < 1e-10 { 1.0 } else { r / r.sinh() };
        shape * (-r * r / (2.0 * lengthscale * lengthscale)).exp()
    })
}

fn frobenius(a: &Array2<f64>) -> f64 {
    a.iter().map(|v| v * v).sum::<f64>().sqrt()
}

#[test]
fn h3_heat_error_shrinks_with_more_phases() {
    let space = Arc::new(Hyperbolic::new(3).expect("space"));
    // close to the origin, where the importance weights stay tame
    let (_, v) = Key::new(11).standard_normal(6, 3);
    let xs = space.from_intrinsic(&(v * 0.4)).expect("points");
    let d = space.distance(&xs, &xs).expect("distances");
    let params = KernelParams::new(1.0, f64::INFINITY);
    let exact = exact_h3_heat(&d, 1.0);

    let seeds = [1u64, 2, 3, 4, 5];
    let mut mean_errors = Vec::new();
    for num_phases in [16usize, 256, 4096] {
        let mut total = 0.0;
        for &seed in &seeds {
            let kernel = MaternFeatureMapKernel::new(Arc::clone(&space), num_phases, Key::new(seed), true)
                .expect("kernel");
            let k = kernel.k(&params, &xs, None).expect("gram");
            total += frobenius(&(&k - &exact));
        }
        mean_errors.push(total / seeds.len() as f64);
    }
    for w in mean_errors.windows(2) {
        assert!(w[1] < w[0], "errors not decreasing: {mean_errors:?}");
    }
    assert!(mean_errors[2] < mean_errors[0] / 4.0, "errors: {mean_errors:?}");
}

#[test]
fn h3_matern_features_approach_the_integrated_kernel() {
    let space = Arc::new(Hyperbolic::new(3).expect("space"));
    let (_, v) = Key::new(12).standard_normal(6, 3);
    let xs = space.from_intrinsic(&(v * 0.4)).expect("points");
    let params = KernelParams::new(1.0, 1.5);
    let exact = MaternIntegratedKernel::new(Arc::clone(&space), 300)
        .expect("integrated")
        .k(&params, &xs, None)
        .expect("exact gram");

    let seeds = [1u64, 2, 3, 4, 5];
    let mut mean_errors = Vec::new();
    for num_phases in [16usize, 256, 4096] {
        let mut total = 0.0;
        for &seed in &seeds {
            let kernel = MaternFeatureMapKernel::new(Arc::clone(&space), num_phases, Key::new(seed), true)
                .expect("kernel");
            let k = kernel.k(&params, &xs, None).expect("gram");
            total += frobenius(&(&k - &exact));
        }
        mean_errors.push(total / seeds.len() as f64);
    }
    assert!(mean_errors[1] < mean_errors[0], "errors: {mean_errors:?}");
    assert!(mean_errors[2] < mean_errors[0] / 3.0, "errors: {mean_errors:?}");
}

#[test]
fn h3_heat_kernel_closed_form_agrees_with_space_helper() {
    let space = Hyperbolic::new(3).expect("space");
    // heat_kernel(d, t) uses exp(-d²/4t): t = κ²/2
    for &r in &[0.2, 0.7, 1.5] {
        let helper = space.heat_kernel(r, 0.5, 10).expect("heat");
        let exact = exact_h3_heat(&Array2::from_elem((1, 1), r), 1.0)[[0, 0]];
        assert!((helper - exact).abs() < 1e-6);
    }
}

#[test]
fn large_nu_approaches_the_heat_branch() {
    let kernel = MaternKarhunenLoeveKernel::new(Arc::new(Circle::new()), 35, true).expect("kernel");
    let xs = Array1::linspace(0.0, 6.0, 9);
    let heat = kernel
        .k(&KernelParams::new(0.5, f64::INFINITY), &xs, None)
        .expect("heat");
    let mut previous = f64::INFINITY;
    for nu in [10.0, 1e3, 1e6] {
        let matern = kernel.k(&KernelParams::new(0.5, nu), &xs, None).expect("matern");
        let err = (&matern - &heat).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(err < previous);
        previous = err;
    }
    assert!(previous < 1e-3, "ν = 1e6 still differs by {previous}");
}
