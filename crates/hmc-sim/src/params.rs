//! Model parameters and closed-form transition moments of the CIR variance
//! process
//!
//! ```text
//! dv = κ(θ − v) dt + σ √v dW
//! ```
//!
//! Over a finite step the process has a known noncentral chi-square
//! transition law; the shape quantities of that law (`chi_dim`,
//! `chi_lambda`, `phi_exp`) and its exact first two moments (`var_mv`) are
//! what every exact and near-exact sampler in this crate is built from.

use hmc_core::{ensure, Real, Result, Time};

/// Parameters of the Heston variance (CIR) process.
///
/// * `v0`    — initial variance
/// * `kappa` — mean-reversion speed
/// * `theta` — long-run variance level
/// * `sigma` — vol-of-vol
/// * `rho`   — correlation between price and variance shocks
///
/// Immutable for the life of a pricing call; all validation happens in
/// [`HestonParams::new`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonParams {
    /// Initial variance (v₀ > 0).
    pub v0: Real,
    /// Mean-reversion speed (κ > 0).
    pub kappa: Real,
    /// Long-run variance (θ > 0).
    pub theta: Real,
    /// Volatility of variance (σ > 0).
    pub sigma: Real,
    /// Correlation ρ ∈ [-1, 1].
    pub rho: Real,
}

impl HestonParams {
    /// Create a validated parameter set.
    pub fn new(v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real) -> Result<Self> {
        ensure!(v0 > 0.0, "initial variance must be positive, got {v0}");
        ensure!(kappa > 0.0, "mean-reversion speed must be positive, got {kappa}");
        ensure!(theta > 0.0, "long-run variance must be positive, got {theta}");
        ensure!(sigma > 0.0, "vol-of-vol must be positive, got {sigma}");
        ensure!(
            (-1.0..=1.0).contains(&rho),
            "correlation must be in [-1, 1], got {rho}"
        );
        Ok(Self {
            v0,
            kappa,
            theta,
            sigma,
            rho,
        })
    }

    /// Degrees of freedom of the transition law:
    /// `df = 4 θ κ / σ²` (need not be an integer).
    pub fn chi_dim(&self) -> Real {
        4.0 * self.theta * self.kappa / (self.sigma * self.sigma)
    }

    /// Noncentrality parameter of the transition over a step `dt`,
    /// seen from the initial variance `v0`:
    /// `λ = 4 v₀ κ / σ² / (e^{κ dt} − 1)`.
    pub fn chi_lambda(&self, dt: Time) -> Real {
        4.0 * self.v0 * self.kappa / (self.sigma * self.sigma)
            / ((self.kappa * dt).exp() - 1.0)
    }

    /// The pair `(phi, exp)` with `exp = e^{−κ dt/2}` and
    /// `phi = (4 κ / σ²) / (1/exp − exp)`.
    ///
    /// `var_prev · exp · phi` is the noncentrality of the one-step law and
    /// `exp / phi` its scale; every exact sampler reuses this pair.
    pub fn phi_exp(&self, dt: Time) -> (Real, Real) {
        let exp = (-self.kappa * dt / 2.0).exp();
        let phi = 4.0 * self.kappa / (self.sigma * self.sigma) / (1.0 / exp - exp);
        (phi, exp)
    }

    /// Exact mean and variance of `v(t+dt)` given `v(t) = var_0`.
    ///
    /// Closed form, no simulation — used both as the moment input of the
    /// QE sampler and as the validation oracle for every scheme.
    pub fn var_mv(&self, var_0: Real, dt: Time) -> (Real, Real) {
        let expo = (-self.kappa * dt).exp();
        let m = self.theta + (var_0 - self.theta) * expo;
        let s2 = (var_0 * expo + self.theta * (1.0 - expo) / 2.0)
            * self.sigma * self.sigma * (1.0 - expo) / self.kappa;
        (m, s2)
    }

    /// Feller ratio `2 κ θ / σ²`; at least 1 when the variance stays
    /// strictly positive.
    pub fn feller_ratio(&self) -> Real {
        2.0 * self.kappa * self.theta / (self.sigma * self.sigma)
    }

    /// Whether the Feller condition `2 κ θ > σ²` holds.
    pub fn satisfies_feller(&self) -> bool {
        self.feller_ratio() > 1.0
    }
}
