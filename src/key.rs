//! Explicit randomness state.
//!
//! Every randomized operation in this crate takes a [`Key`] **by value** and hands back the
//! advanced key next to its result. There is no global or thread-local generator: if you want
//! the same draw twice, build a fresh `Key::new(seed)` twice.
//!
//! `Key` is deliberately not `Clone`. A key that was passed into a call is gone; the compiler
//! rejects a second use instead of silently replaying (or silently diverging from) a stream.

use crate::{Error, Result};
use ndarray::{Array1, Array2};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

/// Pseudo-random state threaded through randomized operations.
#[derive(Debug)]
pub struct Key {
    rng: ChaCha8Rng,
}

impl Key {
    /// Seed a new stream.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Duplicate the exact stream position.
    ///
    /// Crate-internal: only components that must replay one fixed stream on every call
    /// (feature-map kernels, deterministic wrappers) use this.
    pub(crate) fn snapshot(&self) -> Key {
        Key {
            rng: self.rng.clone(),
        }
    }

    /// Mutable access for samplers that need a `rand::Rng` (e.g. `rand_distr` distributions).
    pub(crate) fn rng_mut(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// `[rows, cols]` i.i.d. standard normals.
    pub fn standard_normal(mut self, rows: usize, cols: usize) -> (Key, Array2<f64>) {
        let mut out = Array2::<f64>::zeros((rows, cols));
        for v in out.iter_mut() {
            *v = StandardNormal.sample(&mut self.rng);
        }
        (self, out)
    }

    /// `n` i.i.d. uniforms on `[lo, hi)`.
    pub fn uniform(mut self, n: usize, lo: f64, hi: f64) -> (Key, Array1<f64>) {
        let mut out = Array1::<f64>::zeros(n);
        for v in out.iter_mut() {
            let u: f64 = self.rng.random();
            *v = lo + (hi - lo) * u;
        }
        (self, out)
    }

    /// `n` i.i.d. uniform indices in `0..upper`.
    pub fn indices(mut self, n: usize, upper: usize) -> Result<(Key, Vec<usize>)> {
        if upper == 0 {
            return Err(Error::Domain("index range must be non-empty"));
        }
        let out = (0..n).map(|_| self.rng.random_range(0..upper)).collect();
        Ok((self, out))
    }
}
