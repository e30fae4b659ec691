//! Heat and Matérn kernels on H³: random-phase estimates against deterministic references, for
//! growing phase counts.

use std::sync::Arc;

use geokernels::hyperbolic::Hyperbolic;
use geokernels::kernel::{GeometricKernel, MaternFeatureMapKernel, MaternIntegratedKernel};
use geokernels::key::Key;
use geokernels::params::KernelParams;

fn main() -> geokernels::Result<()> {
    let space = Arc::new(Hyperbolic::new(3)?);
    let (_, v) = Key::new(7).standard_normal(8, 3);
    let xs = space.from_intrinsic(&(v * 0.4))?;
    let d = space.distance(&xs, &xs)?;

    let lengthscale = 1.0;
    let t = lengthscale * lengthscale / 2.0;
    let mut exact = d.clone();
    for v in exact.iter_mut() {
        *v = space.heat_kernel(*v, t, 2)?;
    }

    let params = KernelParams::new(lengthscale, f64::INFINITY);
    for num_phases in [16usize, 128, 1024, 8192] {
        let kernel = MaternFeatureMapKernel::new(Arc::clone(&space), num_phases, Key::new(1), true)?;
        let k = kernel.k(&params, &xs, None)?;
        let err = (&k - &exact).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        println!("{num_phases:>5} phases: max |K − K_exact| = {err:.4}");
    }

    let matern = KernelParams::new(lengthscale, 1.5);
    let integrated = MaternIntegratedKernel::new(Arc::clone(&space), 300)?.k(&matern, &xs, None)?;
    for num_phases in [16usize, 128, 1024, 8192] {
        let kernel = MaternFeatureMapKernel::new(Arc::clone(&space), num_phases, Key::new(1), true)?;
        let k = kernel.k(&matern, &xs, None)?;
        let err = (&k - &integrated).iter().fold(0.0f64, |m, v| m.max(v.abs()));
        println!("{num_phases:>5} phases: max |K_ν=3/2 − K_integrated| = {err:.4}");
    }
    Ok(())
}
