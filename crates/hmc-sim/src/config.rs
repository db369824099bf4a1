//! Simulation configuration: path count, time grid, seed, scheme and
//! tail-distribution selectors.
//!
//! All validation is fail-fast — a bad configuration is rejected before any
//! sampling begins, and unknown scheme / distribution names are reported
//! with the offending value in the message.

use hmc_core::{errors::Error, Real, Result, Size, Time};
use std::fmt;
use std::str::FromStr;

// ── Scheme selector ───────────────────────────────────────────────────────────

/// One-step variance-advance scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// Euler discretization, floored at zero.  Biased, O(dt).
    Euler,
    /// Euler plus the Milstein correction term.  Reduced bias, O(dt).
    Milstein,
    /// Exact noncentral chi-square transition draw.  No discretization bias.
    Ncx2,
    /// Exact transition via a latent Poisson count and a gamma draw; the
    /// count is exposed for reuse by the gamma-series machinery.
    PoissonGamma,
    /// Andersen's quadratic-exponential moment-matched approximation.
    Qe,
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "euler" => Ok(Self::Euler),
            "milstein" => Ok(Self::Milstein),
            "ncx2" => Ok(Self::Ncx2),
            "poisson-gamma" | "poisson_gamma" => Ok(Self::PoissonGamma),
            "qe" => Ok(Self::Qe),
            _ => Err(Error::Configuration(format!("unknown scheme: '{s}'"))),
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Euler => "euler",
            Self::Milstein => "milstein",
            Self::Ncx2 => "ncx2",
            Self::PoissonGamma => "poisson-gamma",
            Self::Qe => "qe",
        };
        f.write_str(name)
    }
}

// ── Tail distribution selector ────────────────────────────────────────────────

/// Parametric family used for moment-matched single draws (series tails and
/// whole-step approximations).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailDist {
    /// Inverse Gaussian, `μ = m₁`, `λ = m₁³/var`.
    InverseGaussian,
    /// Gamma, `shape = m₁²/var`, `scale = var/m₁`.
    Gamma,
    /// Log-normal with both moments matched.
    LogNormal,
}

impl FromStr for TailDist {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ig" | "inverse-gaussian" | "invgauss" => Ok(Self::InverseGaussian),
            "ga" | "gamma" => Ok(Self::Gamma),
            "ln" | "log-normal" | "lognormal" => Ok(Self::LogNormal),
            _ => Err(Error::Configuration(format!(
                "unknown distribution family: '{s}'"
            ))),
        }
    }
}

impl fmt::Display for TailDist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InverseGaussian => "inverse-gaussian",
            Self::Gamma => "gamma",
            Self::LogNormal => "log-normal",
        };
        f.write_str(name)
    }
}

// ── Monte-Carlo configuration ─────────────────────────────────────────────────

/// Monte-Carlo configuration, set once per engine instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct McConfig {
    /// Number of simulation paths.
    pub n_path: Size,
    /// Time-step resolution.  `None` means a single exact step over the
    /// whole horizon (only meaningful for bias-free samplers).
    pub dt: Option<Time>,
    /// Root seed for the random stream set.
    pub seed: u64,
    /// Antithetic variates for normal-shock-driven schemes (requires an
    /// even `n_path`).
    pub antithetic: bool,
    /// One-step variance-advance scheme.
    pub scheme: Scheme,
    /// Series truncation order (`0` = pure moment matching, no series
    /// terms).
    pub kk: Size,
    /// Tail approximating distribution family.
    pub dist: TailDist,
}

impl McConfig {
    /// Create a configuration with the given path count and seed; other
    /// fields start from the defaults (`dt = 0.05`, antithetic, QE scheme,
    /// `kk = 1`, inverse-Gaussian tail) and can be adjusted with the
    /// `with_*` builders.
    pub fn new(n_path: Size, seed: u64) -> Self {
        Self {
            n_path,
            dt: Some(0.05),
            seed,
            antithetic: true,
            scheme: Scheme::Qe,
            kk: 1,
            dist: TailDist::InverseGaussian,
        }
    }

    /// Set the time-step resolution (`None` = one step over the horizon).
    pub fn with_dt(mut self, dt: Option<Time>) -> Self {
        self.dt = dt;
        self
    }

    /// Select the variance-advance scheme.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Enable or disable antithetic variates.
    pub fn with_antithetic(mut self, antithetic: bool) -> Self {
        self.antithetic = antithetic;
        self
    }

    /// Set the series truncation order.
    pub fn with_kk(mut self, kk: Size) -> Self {
        self.kk = kk;
        self
    }

    /// Select the tail approximating distribution family.
    pub fn with_dist(mut self, dist: TailDist) -> Self {
        self.dist = dist;
        self
    }

    /// Validate the configuration; called by every engine constructor.
    pub fn validate(&self) -> Result<()> {
        if self.n_path == 0 {
            return Err(Error::Configuration("n_path must be positive".into()));
        }
        if let Some(dt) = self.dt {
            if !(dt > 0.0) {
                return Err(Error::Configuration(format!(
                    "dt must be positive, got {dt}"
                )));
            }
        }
        if self.antithetic && self.n_path % 2 != 0 {
            return Err(Error::Configuration(format!(
                "antithetic variates require an even n_path, got {}",
                self.n_path
            )));
        }
        Ok(())
    }

    /// The observation grid for a horizon `texp`: `ceil(texp/dt)` equal
    /// steps (one single step when `dt` is `None`).  Returns the times of
    /// the observations, excluding `t = 0`.
    pub fn time_grid(&self, texp: Time) -> Vec<Time> {
        let n_dt = match self.dt {
            Some(dt) => (texp / dt).ceil().max(1.0) as Size,
            None => 1,
        };
        (1..=n_dt).map(|i| i as Real / n_dt as Real * texp).collect()
    }
}
