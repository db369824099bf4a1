//! Gamma-series sampling of the integrated variance conditional on its
//! endpoints.
//!
//! Conditional on `(v₀, v_T)` the time-integrated variance decomposes into
//! three independent pieces, each an infinite sum of gamma variates:
//!
//! * **X1** — driven by `v₀ + v_T`, with a latent Poisson count per series
//!   term,
//! * **X2** — a series draw of fixed shape `df/2`,
//! * **X3** — `η` further series draws of shape 2 each, where `η` is the
//!   Bessel-distributed latent count coupling terminal and integrated
//!   variance.
//!
//! The series are truncated at `kk` terms; the omitted tail has known mean
//! and variance and is replaced by a single moment-matched gamma variate,
//! so the truncation bias vanishes as `kk` grows.  All series constants are
//! scaled so the draws directly represent the variance *averaged* over the
//! step.
//!
//! A conditional moment-generating function in closed form (a ratio of
//! modified Bessel functions) is kept as a validation oracle; it never
//! participates in sampling.

use crate::config::McConfig;
use crate::engine::{CondMcEngine, CondStates};
use crate::params::HestonParams;
use crate::step::{PoissonGammaStep, VarianceStep};
use hmc_core::{Real, Result, Size, Time};
use hmc_math::special::{ln_gamma, ln_modified_bessel_i};
use hmc_math::{MersenneTwisterRng, RandomStreamSet};
use std::f64::consts::PI;

// ── Series constants ──────────────────────────────────────────────────────────

/// Per-term constants `(γ_n, λ_n)` of the gamma expansion for a step `dt`,
/// `n = 1..=kk`:
///
/// ```text
/// γ_n = ((κ dt)² + (2πn)²) / (2 σ² dt)
/// λ_n = 4 (2πn)² / (σ² dt ((κ dt)² + (2πn)²))
/// ```
///
/// `γ_n` grows like `n²`, `λ_n` decays like `1/n²`; the extra factor of
/// `dt` in `γ_n` makes the series sum the step-averaged variance.
pub fn gamma_lambda(p: &HestonParams, dt: Time, kk: Size) -> (Vec<Real>, Vec<Real>) {
    let mrt2 = (p.kappa * dt) * (p.kappa * dt);
    let vov2dt = p.sigma * p.sigma * dt;
    let mut gamma_n = Vec::with_capacity(kk);
    let mut lambda_n = Vec::with_capacity(kk);
    for n in 1..=kk {
        let n_2pi_2 = (n as Real * 2.0 * PI).powi(2);
        gamma_n.push((mrt2 + n_2pi_2) / (2.0 * vov2dt));
        lambda_n.push(4.0 * n_2pi_2 / (vov2dt * (mrt2 + n_2pi_2)));
    }
    (gamma_n, lambda_n)
}

// ── Truncated-tail moments ────────────────────────────────────────────────────

/// Mean and variance of the truncated tail of X1 (per unit of `v₀ + v_T`)
/// after keeping `kk` series terms.  `kk = 0` returns the full untruncated
/// moments.
pub fn x1star_avgvar_mv(p: &HestonParams, dt: Time, kk: Size) -> (Real, Real) {
    let h = p.kappa * dt / 2.0;
    let vov2dt = p.sigma * p.sigma * dt;
    let csch = 1.0 / h.sinh();
    let coth = h.cosh() * csch;

    let mut mean = (coth / h - csch * csch) / 2.0;
    let mut var = vov2dt * (coth / h.powi(3) + csch * csch / (h * h) - 2.0 * coth * csch * csch / h)
        / 8.0;

    if kk > 0 {
        let (gamma_n, lambda_n) = gamma_lambda(p, dt, kk);
        for (g, l) in gamma_n.iter().zip(&lambda_n) {
            mean -= l / g;
            var -= 2.0 * l / (g * g);
        }
    }
    (mean, var)
}

/// Mean and variance of the truncated tail of X2 (per unit of gamma
/// shape) after keeping `kk` series terms.  `kk = 0` returns the full
/// untruncated moments.
pub fn x2star_avgvar_mv(p: &HestonParams, dt: Time, kk: Size) -> (Real, Real) {
    let h = p.kappa * dt / 2.0;
    let vov2dt = p.sigma * p.sigma * dt;
    let csch = 1.0 / h.sinh();
    let coth = h.cosh() * csch;

    let mut mean = vov2dt * (h * coth - 1.0) / (4.0 * h * h);
    let mut var = vov2dt * vov2dt * (h * coth + h * h * csch * csch - 2.0) / (16.0 * h.powi(4));

    if kk > 0 {
        let (gamma_n, _) = gamma_lambda(p, dt, kk);
        for g in &gamma_n {
            mean -= 1.0 / g;
            var -= 1.0 / (g * g);
        }
    }
    (mean, var)
}

/// Large-`kk` asymptotics of the X1 tail moments (validation only).
pub fn x1star_avgvar_mv_asymp(p: &HestonParams, dt: Time, kk: Size) -> (Real, Real) {
    assert!(kk > 0, "asymptotic tail needs kk > 0");
    let vov2dt = p.sigma * p.sigma * dt;
    let k = kk as Real;
    (
        2.0 / (PI * PI * k),
        2.0 * vov2dt / (3.0 * PI.powi(4) * k.powi(3)),
    )
}

/// Large-`kk` asymptotics of the X2 tail moments (validation only).
pub fn x2star_avgvar_mv_asymp(p: &HestonParams, dt: Time, kk: Size) -> (Real, Real) {
    assert!(kk > 0, "asymptotic tail needs kk > 0");
    let vov2dt = p.sigma * p.sigma * dt;
    let k = kk as Real;
    (
        vov2dt / (2.0 * PI * PI * k),
        vov2dt * vov2dt / (12.0 * PI.powi(4) * k.powi(3)),
    )
}

// ── Series draws ──────────────────────────────────────────────────────────────

/// Sample X1 (step-averaged) for every path: `kk` series terms with a
/// Poisson count of mean `(v₀ + v_T)·λ_n` each, plus one moment-matched
/// gamma variate for the truncated tail.
pub fn draw_x1(
    p: &HestonParams,
    var_0: Real,
    var_t: &[Real],
    dt: Time,
    kk: Size,
    streams: &mut RandomStreamSet,
) -> Vec<Real> {
    let n_path = var_t.len();
    let (gamma_n, lambda_n) = gamma_lambda(p, dt, kk);

    let mut x1 = vec![0.0; n_path];
    for n in 0..kk {
        for (x, &v_t) in x1.iter_mut().zip(var_t) {
            let pois = streams.series_coeff().poisson((var_0 + v_t) * lambda_n[n]);
            *x += streams.gamma_magnitude().standard_gamma(pois as Real) / gamma_n[n];
        }
    }

    let (trunc_mean, trunc_var) = x1star_avgvar_mv(p, dt, kk);
    let trunc_scale = trunc_var / trunc_mean;
    for (x, &v_t) in x1.iter_mut().zip(var_t) {
        let trunc_shape = trunc_mean / trunc_scale * (var_0 + v_t);
        *x += trunc_scale * streams.gamma_magnitude().standard_gamma(trunc_shape);
    }
    x1
}

/// Sample `size` draws of a step-averaged series of constant gamma shape
/// (`df/2` for X2, `2` for each unit of latent count), plus the
/// moment-matched gamma tail.
pub fn draw_x2(
    p: &HestonParams,
    shape: Real,
    dt: Time,
    kk: Size,
    size: Size,
    streams: &mut RandomStreamSet,
) -> Vec<Real> {
    let (gamma_n, _) = gamma_lambda(p, dt, kk);

    let mut x2 = vec![0.0; size];
    for g in &gamma_n {
        for x in x2.iter_mut() {
            *x += streams.gamma_magnitude().standard_gamma(shape) / g;
        }
    }

    let (trunc_mean, trunc_var) = x2star_avgvar_mv(p, dt, kk);
    let trunc_scale = trunc_var / trunc_mean;
    let trunc_shape = trunc_mean / trunc_scale * shape;
    for x in x2.iter_mut() {
        *x += trunc_scale * streams.gamma_magnitude().standard_gamma(trunc_shape);
    }
    x2
}

// ── The latent count η ────────────────────────────────────────────────────────

/// Mean and variance of the latent count η conditional on the endpoints,
/// from ratios of modified Bessel functions at `z = √(v₀·v_T)·phi`:
///
/// ```text
/// E[η]   = (z/2)·I_{ν+1}(z)/I_ν(z)
/// Var[η] = (z/2)²·I_{ν+2}(z)/I_ν(z) + E[η] − E[η]²
/// ```
///
/// `var_0` and `var_t` are paired per path.
pub fn eta_mv(
    p: &HestonParams,
    var_0: &[Real],
    var_t: &[Real],
    dt: Time,
) -> (Vec<Real>, Vec<Real>) {
    debug_assert_eq!(var_0.len(), var_t.len());
    let (phi, _) = p.phi_exp(dt);
    let nu = 0.5 * p.chi_dim() - 1.0;

    let mut mean = Vec::with_capacity(var_t.len());
    let mut var = Vec::with_capacity(var_t.len());
    for (&v_0, &v_t) in var_0.iter().zip(var_t) {
        let z = (v_0 * v_t).sqrt() * phi;
        if z == 0.0 {
            mean.push(0.0);
            var.push(0.0);
            continue;
        }
        let ln_iv0 = ln_modified_bessel_i(nu, z);
        let r1 = (ln_modified_bessel_i(nu + 1.0, z) - ln_iv0).exp();
        let r2 = (ln_modified_bessel_i(nu + 2.0, z) - ln_iv0).exp();
        let m = 0.5 * z * r1;
        mean.push(m);
        var.push(0.25 * z * z * r2 + m - m * m);
    }
    (mean, var)
}

/// Cumulative probability table of the Bessel count distribution with
/// order `ν` and argument `z`, for counts `0..=n_max`:
///
/// `p_0 = (z/2)^ν / (I_ν(z)·Γ(ν+1))`, `p_k = p_{k−1} · z² / (4k(k+ν))`.
///
/// The tail decays super-exponentially, so a short table suffices.
pub fn eta_cum_table(nu: Real, z: Real, n_max: Size) -> Vec<Real> {
    let ln_p0 = nu * (0.5 * z).ln() - ln_modified_bessel_i(nu, z) - ln_gamma(nu + 1.0);
    let mut cum = Vec::with_capacity(n_max + 1);
    let mut p = ln_p0.exp();
    let mut acc = p;
    cum.push(acc);
    for k in 1..=n_max {
        let kf = k as Real;
        p *= z * z / (4.0 * kf * (kf + nu));
        acc += p;
        cum.push(acc);
    }
    cum
}

// The Bessel count tail beyond this is below f64 resolution for every
// parameter regime the samplers see.
const ETA_TABLE_LEN: Size = 15;

/// Draw the latent count η per path by inverting a uniform against the
/// cumulative Bessel table.
pub fn draw_eta(
    p: &HestonParams,
    var_0: Real,
    var_t: &[Real],
    dt: Time,
    rng: &mut MersenneTwisterRng,
) -> Vec<u32> {
    let (phi, _) = p.phi_exp(dt);
    let nu = 0.5 * p.chi_dim() - 1.0;

    var_t
        .iter()
        .map(|&v_t| {
            let z = (var_0 * v_t).sqrt() * phi;
            if z == 0.0 {
                return 0;
            }
            let cum = eta_cum_table(nu, z, ETA_TABLE_LEN);
            let u = rng.next_uniform();
            cum.iter().filter(|&&c| c < u).count() as u32
        })
        .collect()
}

// ── Conditional moments of the averaged variance ──────────────────────────────

/// Mean and variance of the step-averaged variance conditional on the
/// endpoints — and on η when a drawn count is supplied; otherwise η is
/// marginalized through its Bessel moments.
///
/// With `kk > 0` the moments cover only the truncated tail beyond the
/// first `kk` series terms.  `var_0` and `var_t` are paired per path.
pub fn cond_avgvar_mv(
    p: &HestonParams,
    var_0: &[Real],
    var_t: &[Real],
    dt: Time,
    eta: Option<&[u32]>,
    kk: Size,
) -> (Vec<Real>, Vec<Real>) {
    debug_assert_eq!(var_0.len(), var_t.len());
    let (eta_mean, eta_var) = match eta {
        Some(counts) => (
            counts.iter().map(|&k| k as Real).collect::<Vec<_>>(),
            vec![0.0; var_t.len()],
        ),
        None => eta_mv(p, var_0, var_t, dt),
    };

    let (x1_mean, x1_var) = x1star_avgvar_mv(p, dt, kk);
    let (x2_mean, x2_var) = x2star_avgvar_mv(p, dt, kk);
    let half_df = 0.5 * p.chi_dim();

    let mut mean = Vec::with_capacity(var_t.len());
    let mut var = Vec::with_capacity(var_t.len());
    for i in 0..var_t.len() {
        let shape = 2.0 * eta_mean[i] + half_df;
        let m = x1_mean * (var_0[i] + var_t[i]) + shape * x2_mean;
        let v = x1_var * (var_0[i] + var_t[i])
            + shape * x2_var
            + eta_var[i] * (2.0 * x2_mean) * (2.0 * x2_mean);
        mean.push(m);
        var.push(v);
    }
    (mean, var)
}

// ── Validation oracle ─────────────────────────────────────────────────────────

/// Conditional moment-generating function of the step-averaged variance
/// given the endpoints, evaluated at `aa`.
///
/// Validation oracle only — a ratio of modified Bessel functions, never
/// used on the sampling path.
pub fn laplace(p: &HestonParams, aa: Real, var_0: Real, var_t: Real, dt: Time) -> Real {
    let vov2dt = p.sigma * p.sigma * dt;
    let mrt = p.kappa * dt;
    let nu = 0.5 * p.chi_dim() - 1.0;

    let gamma = (mrt * mrt + 2.0 * vov2dt * aa).sqrt();
    let var_mean = (var_0 * var_t).sqrt();
    let (phi_mr, _) = p.phi_exp(dt);
    let cosh_mr = (mrt / 2.0).cosh();

    let phi_gamma = 2.0 * gamma / (vov2dt * (gamma / 2.0).sinh());
    let cosh_gamma = (gamma / 2.0).cosh();

    let part1 = phi_gamma / phi_mr;
    let part2 =
        ((var_0 + var_t) * (cosh_mr * phi_mr - cosh_gamma * phi_gamma) / 2.0).exp();
    let part3 = (ln_modified_bessel_i(nu, var_mean * phi_gamma)
        - ln_modified_bessel_i(nu, var_mean * phi_mr))
    .exp();

    part1 * part2 * part3
}

/// Conditional mean and variance of the step-averaged variance from
/// central finite differences of the cumulant generating function
/// `ln laplace(−aa)` — the numeric cross-check for [`cond_avgvar_mv`].
pub fn cond_avgvar_mv_numeric(
    p: &HestonParams,
    var_0: Real,
    var_t: Real,
    dt: Time,
) -> (Real, Real) {
    // large enough a step that the second difference stays above the
    // floating-point noise floor of the MGF evaluation
    let dx = 1e-4;
    let cgf = |aa: Real| laplace(p, -aa, var_0, var_t, dt).ln();
    let up = cgf(dx);
    let mid = cgf(0.0);
    let down = cgf(-dx);
    ((up - down) / (2.0 * dx), (up - 2.0 * mid + down) / (dx * dx))
}

// ── Engine ────────────────────────────────────────────────────────────────────

/// Exact conditional engine: one bias-free jump of the variance to expiry,
/// then the gamma-series draw of the averaged variance conditional on the
/// endpoints.
///
/// The configured time grid is irrelevant here — the expansion covers the
/// whole horizon in a single step, and antithetic pairing does not apply
/// to gamma draws.
pub struct GammaSeriesEngine {
    params: HestonParams,
    config: McConfig,
}

impl GammaSeriesEngine {
    /// Create a new engine; the configuration is validated here.
    pub fn new(params: HestonParams, config: McConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { params, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &McConfig {
        &self.config
    }
}

impl CondMcEngine for GammaSeriesEngine {
    fn params(&self) -> &HestonParams {
        &self.params
    }

    fn cond_states(&self, var_0: Real, texp: Time) -> Result<CondStates> {
        let p = &self.params;
        let kk = self.config.kk;
        let mut streams = RandomStreamSet::derive(self.config.seed);

        // terminal variance via the exact Poisson-gamma transition
        let var_prev = vec![var_0; self.config.n_path];
        let (var_t, _) = PoissonGammaStep.advance(p, &var_prev, texp, &mut streams);

        // X1 and X2 pieces of the averaged variance
        let mut var_avg = draw_x1(p, var_0, &var_t, texp, kk, &mut streams);
        let x2 = draw_x2(p, 0.5 * p.chi_dim(), texp, kk, var_t.len(), &mut streams);
        for (avg, x) in var_avg.iter_mut().zip(&x2) {
            *avg += x;
        }

        // X3: η series draws of shape 2, pooled then redistributed.  The
        // pooled draws are handed back level by level — at level i every
        // path with η > i takes the next draw in path order — so the
        // scatter is pure bookkeeping and consumes no randomness.
        let eta = draw_eta(p, var_0, &var_t, texp, streams.poisson_count());
        let total: Size = eta.iter().map(|&k| k as Size).sum();
        let zz = draw_x2(p, 2.0, texp, kk, total, &mut streams);

        let max_eta = eta.iter().copied().max().unwrap_or(0);
        let mut cursor = 0;
        for level in 0..max_eta {
            for (avg, &k) in var_avg.iter_mut().zip(&eta) {
                if k > level {
                    *avg += zz[cursor];
                    cursor += 1;
                }
            }
        }
        debug_assert_eq!(cursor, total);

        Ok(CondStates {
            var_final: var_t,
            var_avg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use hmc_math::Statistics;

    fn params() -> HestonParams {
        HestonParams::new(0.04, 0.5, 0.04, 1.0, -0.9).unwrap()
    }

    #[test]
    fn gamma_lambda_growth_and_decay() {
        let p = params();
        let (gamma_n, lambda_n) = gamma_lambda(&p, 1.0, 8);
        // hand value at n = 1: γ₁ = (κ² + 4π²)/(2σ²), λ₁ = 16π²/(σ²(κ²+4π²))
        let n2pi2 = 4.0 * PI * PI;
        assert_relative_eq!(gamma_n[0], (0.25 + n2pi2) / 2.0, max_relative = 1e-12);
        assert_relative_eq!(
            lambda_n[0],
            4.0 * n2pi2 / (0.25 + n2pi2),
            max_relative = 1e-12
        );
        // γ_n ~ n² growth, λ_n ~ 1/n² decay
        assert!(gamma_n[7] / gamma_n[0] > 50.0);
        assert!(lambda_n[7] < lambda_n[0]);
    }

    #[test]
    fn tail_moments_decrease_monotonically_to_zero() {
        let p = params();
        let dt = 1.0;
        let mut prev_x1 = x1star_avgvar_mv(&p, dt, 0);
        let mut prev_x2 = x2star_avgvar_mv(&p, dt, 0);
        for kk in [1, 2, 4, 8, 16, 32, 64] {
            let x1 = x1star_avgvar_mv(&p, dt, kk);
            let x2 = x2star_avgvar_mv(&p, dt, kk);
            assert!(x1.0 > 0.0 && x1.1 > 0.0 && x2.0 > 0.0 && x2.1 > 0.0);
            assert!(x1.0 < prev_x1.0 && x1.1 < prev_x1.1, "X1 tail not shrinking at kk={kk}");
            assert!(x2.0 < prev_x2.0 && x2.1 < prev_x2.1, "X2 tail not shrinking at kk={kk}");
            prev_x1 = x1;
            prev_x2 = x2;
        }
        // by kk = 64 the tail is a tiny fraction of the untruncated moments
        assert!(prev_x1.0 < 0.01 * x1star_avgvar_mv(&p, dt, 0).0);
        assert!(prev_x2.0 < 0.01 * x2star_avgvar_mv(&p, dt, 0).0);
    }

    #[test]
    fn tail_moments_approach_asymptotics() {
        let p = params();
        let dt = 0.5;
        let kk = 64;
        let exact = x1star_avgvar_mv(&p, dt, kk);
        let asymp = x1star_avgvar_mv_asymp(&p, dt, kk);
        assert_relative_eq!(exact.0, asymp.0, max_relative = 0.05);
        assert_relative_eq!(exact.1, asymp.1, max_relative = 0.05);

        let exact = x2star_avgvar_mv(&p, dt, kk);
        let asymp = x2star_avgvar_mv_asymp(&p, dt, kk);
        assert_relative_eq!(exact.0, asymp.0, max_relative = 0.05);
        assert_relative_eq!(exact.1, asymp.1, max_relative = 0.05);
    }

    #[test]
    fn eta_table_is_a_distribution() {
        let p = params();
        let nu = 0.5 * p.chi_dim() - 1.0;
        let (phi, _) = p.phi_exp(1.0);
        for &v_t in &[0.01, 0.04, 0.2] {
            let z = (p.v0 * v_t).sqrt() * phi;
            let cum = eta_cum_table(nu, z, 40);
            assert_abs_diff_eq!(*cum.last().unwrap(), 1.0, epsilon = 1e-9);
            // cumulative and bounded by 1
            for w in cum.windows(2) {
                assert!(w[0] <= w[1] && w[1] <= 1.0 + 1e-12);
            }
        }
        // a larger-df parameter set as well
        let p2 = HestonParams::new(0.04, 2.0, 0.09, 0.3, -0.5).unwrap();
        let nu2 = 0.5 * p2.chi_dim() - 1.0;
        let (phi2, _) = p2.phi_exp(0.25);
        let z2 = (0.04_f64 * 0.05).sqrt() * phi2;
        let cum = eta_cum_table(nu2, z2, 40);
        assert_abs_diff_eq!(*cum.last().unwrap(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn drawn_eta_matches_bessel_moments() {
        let p = params();
        let dt = 1.0;
        let var_t = vec![0.06; 50_000];
        let (mean, var) = eta_mv(&p, &[p.v0], &var_t[..1], dt);

        let mut rng = MersenneTwisterRng::new(42);
        let eta = draw_eta(&p, p.v0, &var_t, dt, &mut rng);
        let emp: Vec<Real> = eta.iter().map(|&k| k as Real).collect();
        let stats = Statistics::from_slice(&emp);
        let se = stats.error_estimate().unwrap();
        assert!(
            (stats.mean().unwrap() - mean[0]).abs() < 3.0 * se,
            "η mean {} vs Bessel {}",
            stats.mean().unwrap(),
            mean[0]
        );
        assert_relative_eq!(stats.variance().unwrap(), var[0], max_relative = 0.1);
    }

    #[test]
    fn conditional_moments_match_numeric_oracle() {
        let p = params();
        for &(var_t, dt) in &[(0.05, 1.0), (0.02, 0.25), (0.1, 2.0)] {
            let (mean, var) = cond_avgvar_mv(&p, &[p.v0], &[var_t], dt, None, 0);
            let (m_num, v_num) = cond_avgvar_mv_numeric(&p, p.v0, var_t, dt);
            assert_relative_eq!(mean[0], m_num, max_relative = 1e-4);
            assert_relative_eq!(var[0], v_num, max_relative = 1e-3);
        }
    }

    #[test]
    fn mgf_is_one_at_zero() {
        let p = params();
        assert_abs_diff_eq!(laplace(&p, 0.0, 0.04, 0.05, 1.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn engine_reproduces_terminal_and_average_moments() {
        let p = params();
        let texp = 2.0;
        let cfg = McConfig::new(100_000, 9).with_kk(2).with_antithetic(false);
        let engine = GammaSeriesEngine::new(p, cfg).unwrap();
        let states = engine.cond_states(p.v0, texp).unwrap();

        // terminal law is exact
        let (m, s2) = p.var_mv(p.v0, texp);
        let stats = Statistics::from_slice(&states.var_final);
        let se = stats.error_estimate().unwrap();
        assert!((stats.mean().unwrap() - m).abs() < 3.0 * se);
        assert!((stats.variance().unwrap() - s2).abs() / s2 < 0.1);

        // unconditional mean of the average variance in closed form:
        // E[v̄] = θ + (v₀ − θ)(1 − e^{−κT})/(κT)
        let expected = p.theta
            + (p.v0 - p.theta) * (1.0 - (-p.kappa * texp).exp()) / (p.kappa * texp);
        let stats = Statistics::from_slice(&states.var_avg);
        let se = stats.error_estimate().unwrap();
        assert!(
            (stats.mean().unwrap() - expected).abs() < 3.0 * se,
            "avg mean {} vs closed form {expected}",
            stats.mean().unwrap()
        );
        // every draw non-negative
        assert!(states.var_avg.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn truncation_order_zero_is_pure_moment_matching() {
        // kk = 0 must still give the right average-variance mean
        let p = params();
        let texp = 1.0;
        let cfg = McConfig::new(100_000, 13).with_kk(0).with_antithetic(false);
        let engine = GammaSeriesEngine::new(p, cfg).unwrap();
        let states = engine.cond_states(p.v0, texp).unwrap();
        let expected = p.theta
            + (p.v0 - p.theta) * (1.0 - (-p.kappa * texp).exp()) / (p.kappa * texp);
        let stats = Statistics::from_slice(&states.var_avg);
        let se = stats.error_estimate().unwrap();
        assert!((stats.mean().unwrap() - expected).abs() < 3.0 * se);
    }

    #[test]
    fn engine_is_reproducible() {
        let p = params();
        let cfg = McConfig::new(1_000, 55).with_kk(1).with_antithetic(false);
        let a = GammaSeriesEngine::new(p, cfg).unwrap();
        let b = GammaSeriesEngine::new(p, cfg).unwrap();
        let sa = a.cond_states(p.v0, 2.0).unwrap();
        let sb = b.cond_states(p.v0, 2.0).unwrap();
        assert_eq!(sa.var_final, sb.var_final);
        assert_eq!(sa.var_avg, sb.var_avg);
    }
}
