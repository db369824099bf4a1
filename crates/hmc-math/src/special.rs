//! Special functions.
//!
//! Γ and ln Γ delegate to the `statrs` crate.  The modified Bessel function
//! of the first kind `I_ν` has no `statrs` implementation, so it is computed
//! here from its ascending power series, switching to the large-argument
//! asymptotic expansion where the series would overflow.

use hmc_core::Real;
use std::f64::consts::PI;

/// The Gamma function Γ(z).
///
/// Uses the Lanczos approximation via `statrs`.
pub fn gamma_function(z: Real) -> Real {
    statrs::function::gamma::gamma(z)
}

/// The natural logarithm of the Gamma function: ln Γ(z).
pub fn ln_gamma(z: Real) -> Real {
    statrs::function::gamma::ln_gamma(z)
}

// Above this the asymptotic expansion is both accurate and cheap; below it
// the ascending series converges without overflow.
const SERIES_CUTOFF: Real = 300.0;

/// Natural logarithm of the modified Bessel function of the first kind,
/// `ln I_ν(x)`, for order `ν > −1` and argument `x ≥ 0`.
///
/// Orders in `(−1, 0)` arise from noncentral chi-square densities with
/// fractional degrees of freedom.  Working in logs keeps the Bessel-ratio
/// computations stable for arguments where `I_ν(x)` itself would overflow.
///
/// # Panics
/// Panics if `ν ≤ −1` or `x < 0`.
pub fn ln_modified_bessel_i(nu: Real, x: Real) -> Real {
    assert!(nu > -1.0, "order must be > -1, got {nu}");
    assert!(x >= 0.0, "argument must be non-negative, got {x}");

    if x == 0.0 {
        // I_0(0) = 1; I_ν(0) = 0 for ν > 0 and diverges for ν ∈ (−1, 0)
        return if nu == 0.0 {
            0.0
        } else if nu > 0.0 {
            Real::NEG_INFINITY
        } else {
            Real::INFINITY
        };
    }

    if x <= SERIES_CUTOFF {
        ln_bessel_i_series(nu, x)
    } else {
        x + ln_bessel_i_scaled_asymp(nu, x)
    }
}

/// The modified Bessel function of the first kind `I_ν(x)`.
///
/// Overflows to `+∞` for very large arguments; use
/// [`ln_modified_bessel_i`] when ratios or tail magnitudes are needed.
pub fn modified_bessel_i(nu: Real, x: Real) -> Real {
    ln_modified_bessel_i(nu, x).exp()
}

/// Ascending series: `I_ν(x) = (x/2)^ν / Γ(ν+1) · Σ_k s_k` with
/// `s_0 = 1`, `s_{k+1} = s_k · (x²/4) / ((k+1)(ν+k+1))`.
///
/// All terms are positive, so there is no cancellation; the sum is kept
/// relative to the leading term to avoid overflow.
fn ln_bessel_i_series(nu: Real, x: Real) -> Real {
    let q = 0.25 * x * x;
    let mut sum = 1.0_f64;
    let mut term = 1.0_f64;
    for k in 0..1000 {
        let kf = k as Real;
        term *= q / ((kf + 1.0) * (nu + kf + 1.0));
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }
    nu * (0.5 * x).ln() - ln_gamma(nu + 1.0) + sum.ln()
}

/// Large-argument expansion of the scaled function `ln(e^{-x} I_ν(x))`:
///
/// `e^{-x} I_ν(x) ≈ (2πx)^{-1/2} · Σ_k (-1)^k a_k(ν) / x^k`,
/// `a_k(ν) = (μ-1)(μ-9)···(μ-(2k-1)²) / (k! 8^k)`, `μ = 4ν²`.
///
/// The series is asymptotic: summation stops at the smallest term.
fn ln_bessel_i_scaled_asymp(nu: Real, x: Real) -> Real {
    let mu = 4.0 * nu * nu;
    let mut sum = 1.0_f64;
    let mut term = 1.0_f64;
    for k in 1..=12u32 {
        let kf = k as Real;
        let next = term * -(mu - (2.0 * kf - 1.0).powi(2)) / (8.0 * kf * x);
        if next.abs() >= term.abs() {
            break;
        }
        term = next;
        sum += term;
    }
    -0.5 * (2.0 * PI * x).ln() + sum.ln()
}
