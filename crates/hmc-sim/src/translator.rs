//! Conditional spot / volatility translation.
//!
//! Conditional on a realized variance path summarized by its endpoints and
//! its time average, the log-price is Gaussian.  The correlated part of
//! the price shock is then known in closed form, leaving a multiplicative
//! price adjustment and the residual volatility orthogonal to the variance
//! path — exactly the two inputs an outer Black–Scholes-style formula
//! needs.

use crate::params::HestonParams;
use hmc_core::{Real, Time};

/// Map per-path `(var_final, var_avg)` statistics to the conditional price
/// multiplier and residual volatility:
///
/// ```text
/// spot_cond  = exp( ρ·( ((v_T − v₀) − κ·T·(θ − v̄)) / σ − ρ·v̄·T/2 ) )
/// sigma_cond = sqrt( (1 − ρ²) · v̄ / v₀ )
/// ```
///
/// `sigma_cond` is normalized by the initial variance, so the outer pricer
/// scales it back with its own base volatility.
pub fn cond_spot_sigma(
    p: &HestonParams,
    var_0: Real,
    texp: Time,
    var_final: &[Real],
    var_avg: &[Real],
) -> (Vec<Real>, Vec<Real>) {
    debug_assert_eq!(var_final.len(), var_avg.len());

    let spot_cond = var_final
        .iter()
        .zip(var_avg)
        .map(|(&v_t, &v_bar)| {
            let drift = ((v_t - var_0) - p.kappa * texp * (p.theta - v_bar)) / p.sigma
                - 0.5 * p.rho * v_bar * texp;
            (p.rho * drift).exp()
        })
        .collect();

    let sigma_cond = var_avg
        .iter()
        .map(|&v_bar| ((1.0 - p.rho * p.rho) * v_bar / var_0).sqrt())
        .collect();

    (spot_cond, sigma_cond)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn zero_correlation_leaves_spot_untouched() {
        let p = HestonParams::new(0.04, 0.5, 0.04, 1.0, 0.0).unwrap();
        let (spot, sigma) = cond_spot_sigma(&p, 0.04, 2.0, &[0.05, 0.03], &[0.045, 0.035]);
        assert_abs_diff_eq!(spot[0], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(spot[1], 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(sigma[0], (0.045f64 / 0.04).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(sigma[1], (0.035f64 / 0.04).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn hand_computed_value() {
        let p = HestonParams::new(0.04, 0.5, 0.04, 1.0, -0.9).unwrap();
        let (v_t, v_bar, texp): (f64, f64, f64) = (0.06, 0.05, 2.0);
        let drift = ((v_t - 0.04) - 0.5 * texp * (0.04 - v_bar)) / 1.0
            - 0.5 * (-0.9) * v_bar * texp;
        let expected_spot = (-0.9 * drift).exp();
        let expected_sigma = ((1.0 - 0.81) * v_bar / 0.04_f64).sqrt();

        let (spot, sigma) = cond_spot_sigma(&p, 0.04, texp, &[v_t], &[v_bar]);
        assert_abs_diff_eq!(spot[0], expected_spot, epsilon = 1e-14);
        assert_abs_diff_eq!(sigma[0], expected_sigma, epsilon = 1e-14);
    }

    #[test]
    fn perfect_correlation_kills_residual_vol() {
        let p = HestonParams::new(0.04, 0.5, 0.04, 1.0, 1.0).unwrap();
        let (_, sigma) = cond_spot_sigma(&p, 0.04, 1.0, &[0.05], &[0.045]);
        assert_abs_diff_eq!(sigma[0], 0.0, epsilon = 1e-15);
    }
}
