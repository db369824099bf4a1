//! Standard normal distribution functions, expressed through the `statrs`
//! error-function implementations.

use hmc_core::Real;
use std::f64::consts::{PI, SQRT_2};

/// The standard normal probability density function.
///
/// `φ(x) = exp(-x²/2) / √(2π)`
#[inline]
pub fn normal_pdf(x: Real) -> Real {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// The standard normal cumulative distribution function Φ(x).
///
/// `Φ(x) = erfc(-x/√2) / 2` — accurate in both tails.
#[inline]
pub fn normal_cdf(x: Real) -> Real {
    0.5 * statrs::function::erf::erfc(-x / SQRT_2)
}

/// The inverse standard normal CDF (probit function).
///
/// `Φ⁻¹(p) = -√2 · erfc⁻¹(2p)`
///
/// # Panics
/// Panics if `p` is outside the open interval (0, 1).
#[inline]
pub fn normal_cdf_inverse(p: Real) -> Real {
    assert!(p > 0.0 && p < 1.0, "p must be in (0, 1), got {p}");
    -SQRT_2 * statrs::function::erf::erfc_inv(2.0 * p)
}
