//! Small array helpers shared by spaces and kernels.

use crate::{Error, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};

/// Repeat `elements[i]` exactly `repetitions[i]` times, in order.
///
/// `chain([a, b, c], [2, 1, 3]) == [a, a, b, c, c, c]`.
pub fn chain(elements: &ArrayView1<f64>, repetitions: &[usize]) -> Result<Array1<f64>> {
    if elements.len() != repetitions.len() {
        return Err(Error::Shape("elements and repetitions must have the same length"));
    }
    let total: usize = repetitions.iter().sum();
    let mut out = Vec::with_capacity(total);
    for (&e, &r) in elements.iter().zip(repetitions) {
        out.extend(std::iter::repeat(e).take(r));
    }
    Ok(Array1::from_vec(out))
}

/// Differences `x[i] - x[j]` for all `i < j`, row by row.
///
/// Input `[B, D]`, output `[B, D(D-1)/2]`, ordered `(0,1), (0,2), …, (1,2), …`.
pub fn ordered_pairwise_differences(x: &ArrayView2<f64>) -> Array2<f64> {
    let d = x.ncols();
    let c = d * d.saturating_sub(1) / 2;
    let mut out = Array2::<f64>::zeros((x.nrows(), c));
    for (b, row) in x.outer_iter().enumerate() {
        let mut k = 0;
        for i in 0..d {
            for j in (i + 1)..d {
                out[[b, k]] = row[i] - row[j];
                k += 1;
            }
        }
    }
    out
}

/// `num` points spaced evenly on a natural-log scale from `e^start` to `e^stop`.
pub fn logspace(start: f64, stop: f64, num: usize) -> Array1<f64> {
    Array1::linspace(start, stop, num).mapv(f64::exp)
}

/// Composite trapezoidal rule for samples `y` at abscissae `x`.
pub fn trapz(y: &ArrayView1<f64>, x: &ArrayView1<f64>) -> Result<f64> {
    if y.len() != x.len() {
        return Err(Error::Shape("y and x must have the same length"));
    }
    let mut s = 0.0;
    for i in 1..x.len() {
        s += 0.5 * (x[i] - x[i - 1]) * (y[i] + y[i - 1]);
    }
    Ok(s)
}

/// Frobenius norm of `k - φ φᵀ`.
///
/// The "glass box" scalar for judging a feature map against its kernel: no normalization by
/// size, no relative scaling.
pub fn gram_approximation_error(k: &ArrayView2<f64>, features: &ArrayView2<f64>) -> Result<f64> {
    let n = k.nrows();
    if k.ncols() != n {
        return Err(Error::Shape("gram matrix must be square"));
    }
    if features.nrows() != n {
        return Err(Error::Shape("features must have one row per gram row"));
    }
    let approx = features.dot(&features.t());
    let mut s = 0.0f64;
    for (a, b) in k.iter().zip(approx.iter()) {
        let r = a - b;
        s += r * r;
    }
    Ok(s.sqrt())
}
