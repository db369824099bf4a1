//! One-step variance-advance samplers.
//!
//! Every scheme implements the same one-capability interface: advance a
//! batch of per-path variances over one time step, optionally yielding the
//! latent Poisson count of the transition.  Which scheme runs is purely a
//! configuration choice; the walking of a time grid lives in
//! [`crate::engine`].

use crate::config::Scheme;
use crate::params::HestonParams;
use hmc_core::{Real, Time};
use hmc_math::{normal_cdf, RandomStreamSet};

/// Critical ψ separating the QE sampler's quadratic and exponential
/// regimes.
pub const PSI_C: Real = 1.5;

/// A one-step variance sampler, vectorized over paths.
///
/// The returned vector has one entry per element of `var_prev`, every
/// entry ≥ 0.  Schemes built on a latent Poisson count also return that
/// count so callers can reuse it.
pub trait VarianceStep {
    /// Advance all paths by one step of size `dt`.
    fn advance(
        &self,
        p: &HestonParams,
        var_prev: &[Real],
        dt: Time,
        streams: &mut RandomStreamSet,
    ) -> (Vec<Real>, Option<Vec<u32>>);
}

/// Build the sampler selected by a [`Scheme`].
pub fn make_step(scheme: Scheme, antithetic: bool) -> Box<dyn VarianceStep> {
    match scheme {
        Scheme::Euler => Box::new(EulerStep {
            milstein: false,
            antithetic,
        }),
        Scheme::Milstein => Box::new(EulerStep {
            milstein: true,
            antithetic,
        }),
        Scheme::Ncx2 => Box::new(Ncx2Step),
        Scheme::PoissonGamma => Box::new(PoissonGammaStep),
        Scheme::Qe => Box::new(QeStep {
            psi_c: PSI_C,
            antithetic,
        }),
    }
}

// ── Euler / Milstein ──────────────────────────────────────────────────────────

/// Euler discretization, optionally with the Milstein correction; negative
/// draws are floored at zero.
pub struct EulerStep {
    /// Add the Milstein correction term.
    pub milstein: bool,
    /// Draw the normal shocks in antithetic pairs.
    pub antithetic: bool,
}

impl VarianceStep for EulerStep {
    fn advance(
        &self,
        p: &HestonParams,
        var_prev: &[Real],
        dt: Time,
        streams: &mut RandomStreamSet,
    ) -> (Vec<Real>, Option<Vec<u32>>) {
        let zz = streams.normal_shocks(var_prev.len(), self.antithetic);
        let sqrt_dt = dt.sqrt();
        let var_t = var_prev
            .iter()
            .zip(&zz)
            .map(|(&v, &z)| {
                let dw = z * sqrt_dt;
                let mut v_t = v + p.kappa * (p.theta - v) * dt + p.sigma * v.sqrt() * dw;
                if self.milstein {
                    v_t += 0.25 * p.sigma * p.sigma * (dw * dw - dt);
                }
                v_t.max(0.0)
            })
            .collect();
        (var_t, None)
    }
}

// ── Exact noncentral chi-square ───────────────────────────────────────────────

/// Exact transition draw from the noncentral chi-square law.
///
/// For `df > 1` the draw splits into a squared shifted normal plus a
/// central chi-square with `df − 1` degrees of freedom; otherwise it falls
/// back to the Poisson-gamma mixture.  Either way the step carries no
/// discretization bias.
pub struct Ncx2Step;

impl VarianceStep for Ncx2Step {
    fn advance(
        &self,
        p: &HestonParams,
        var_prev: &[Real],
        dt: Time,
        streams: &mut RandomStreamSet,
    ) -> (Vec<Real>, Option<Vec<u32>>) {
        let df = p.chi_dim();
        let (phi, exp) = p.phi_exp(dt);
        let scale = exp / phi;
        let n = var_prev.len();

        let var_t = if df > 1.0 {
            let zz = streams.normal().normals(n);
            let chi2: Vec<Real> = (0..n)
                .map(|_| 2.0 * streams.gamma_magnitude().standard_gamma((df - 1.0) / 2.0))
                .collect();
            var_prev
                .iter()
                .zip(zz.iter().zip(&chi2))
                .map(|(&v, (&z, &c))| {
                    let nonc = v * exp * phi;
                    let shifted = z + nonc.sqrt();
                    scale * (shifted * shifted + c)
                })
                .collect()
        } else {
            var_prev
                .iter()
                .map(|&v| {
                    let nonc = v * exp * phi;
                    let eta = streams.poisson_count().poisson(nonc / 2.0);
                    scale * 2.0 * streams.gamma_magnitude().standard_gamma(df / 2.0 + eta as Real)
                })
                .collect()
        };
        (var_t, None)
    }
}

// ── Poisson-mixture gamma ─────────────────────────────────────────────────────

/// Exact transition draw through the latent Poisson count:
/// `η ~ Poisson(nonc/2)`, then `gamma(df/2 + η)` scaled.  Returns the
/// count for reuse by the gamma-series machinery.
pub struct PoissonGammaStep;

impl VarianceStep for PoissonGammaStep {
    fn advance(
        &self,
        p: &HestonParams,
        var_prev: &[Real],
        dt: Time,
        streams: &mut RandomStreamSet,
    ) -> (Vec<Real>, Option<Vec<u32>>) {
        let df = p.chi_dim();
        let (phi, exp) = p.phi_exp(dt);
        let scale = exp / phi;

        let eta: Vec<u32> = var_prev
            .iter()
            .map(|&v| streams.poisson_count().poisson(v * exp * phi / 2.0))
            .collect();
        let var_t = eta
            .iter()
            .map(|&k| scale * 2.0 * streams.gamma_magnitude().standard_gamma(df / 2.0 + k as Real))
            .collect();
        (var_t, Some(eta))
    }
}

// ── Andersen QE ───────────────────────────────────────────────────────────────

/// Andersen's quadratic-exponential sampler: match the exact one-step mean
/// and variance with either a squared shifted normal (`ψ ≤ ψ_c`) or a
/// zero-inflated exponential (`ψ > ψ_c`), the regime chosen per path.
///
/// A single normal draw per path drives both regimes — in the exponential
/// branch it enters through its CDF value, so the regimes stay coupled to
/// one underlying uniform.
pub struct QeStep {
    /// Regime boundary (1.5 in Andersen's formulation).
    pub psi_c: Real,
    /// Draw the normal shocks in antithetic pairs.
    pub antithetic: bool,
}

impl QeStep {
    // Quadratic regime: v' = a (b + z)², with b², a solved from (m, s2).
    fn quadratic(m: Real, psi: Real, z: Real) -> Real {
        let ins = 2.0 / psi;
        let b2 = (ins - 1.0) + (ins * (ins - 1.0)).sqrt();
        let a = m / (1.0 + b2);
        let shifted = b2.sqrt() + z;
        a * shifted * shifted
    }

    // Exponential regime: an atom at zero of mass p, else an exponential
    // tail, inverted from the same normal's CDF value 1 − U.
    fn exponential(m: Real, psi: Real, z: Real) -> Real {
        let one_m_u = normal_cdf(z);
        let one_m_p = 2.0 / (psi + 1.0);
        if one_m_u <= one_m_p {
            let beta = one_m_p / m;
            (one_m_p / one_m_u).ln() / beta
        } else {
            0.0
        }
    }
}

impl VarianceStep for QeStep {
    fn advance(
        &self,
        p: &HestonParams,
        var_prev: &[Real],
        dt: Time,
        streams: &mut RandomStreamSet,
    ) -> (Vec<Real>, Option<Vec<u32>>) {
        let zz = streams.normal_shocks(var_prev.len(), self.antithetic);
        let var_t = var_prev
            .iter()
            .zip(&zz)
            .map(|(&v, &z)| {
                let (m, s2) = p.var_mv(v, dt);
                let psi = s2 / (m * m);
                if psi <= self.psi_c {
                    Self::quadratic(m, psi, z)
                } else {
                    Self::exponential(m, psi, z)
                }
            })
            .collect();
        (var_t, None)
    }
}
