//! Kernel hyperparameters as an immutable value object.
//!
//! Deriving a variant never touches the original:
//!
//! ```
//! use geokernels::params::{KernelParams, Nu};
//!
//! let heat = KernelParams::default();
//! let matern = heat.with_nu(1.5).with_lengthscale(0.5);
//! assert_eq!(heat.nu, Nu::Infinite);
//! assert_eq!(matern.nu, Nu::Finite(1.5));
//! ```

use crate::{Error, Result};

/// Smoothness order of a Matérn kernel.
///
/// `Infinite` is the heat (squared-exponential-like) limit and is evaluated through its own
/// closed form, never as a large finite exponent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Nu {
    Finite(f64),
    Infinite,
}

impl Nu {
    pub fn is_infinite(self) -> bool {
        matches!(self, Nu::Infinite)
    }
}

impl From<f64> for Nu {
    fn from(v: f64) -> Self {
        if v == f64::INFINITY {
            Nu::Infinite
        } else {
            Nu::Finite(v)
        }
    }
}

/// Lengthscale and smoothness of a Matérn-family kernel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelParams {
    pub lengthscale: f64,
    pub nu: Nu,
}

impl Default for KernelParams {
    /// `lengthscale = 1`, `nu = ∞` (heat kernel).
    fn default() -> Self {
        Self {
            lengthscale: 1.0,
            nu: Nu::Infinite,
        }
    }
}

impl KernelParams {
    pub fn new(lengthscale: f64, nu: impl Into<Nu>) -> Self {
        Self {
            lengthscale,
            nu: nu.into(),
        }
    }

    pub fn with_lengthscale(self, lengthscale: f64) -> Self {
        Self {
            lengthscale,
            ..self
        }
    }

    pub fn with_nu(self, nu: impl Into<Nu>) -> Self {
        Self {
            nu: nu.into(),
            ..self
        }
    }

    /// Check the kernel domain constraints: `lengthscale > 0` and, if finite, `nu > 0`.
    pub fn validate(&self) -> Result<()> {
        if !self.lengthscale.is_finite() || self.lengthscale <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "lengthscale",
                value: self.lengthscale,
            });
        }
        if let Nu::Finite(nu) = self.nu {
            if !nu.is_finite() || nu <= 0.0 {
                return Err(Error::InvalidParameter { name: "nu", value: nu });
            }
        }
        Ok(())
    }
}
