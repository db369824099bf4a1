//! # hmc-sim
//!
//! Conditional Monte-Carlo engines for the Heston / CIR stochastic
//! variance process.
//!
//! The variance follows the square-root diffusion
//!
//! ```text
//! dv = κ(θ − v) dt + σ √v dW
//! ```
//!
//! and each engine reduces every simulated path to the pair
//! `(terminal variance, time-averaged variance)` — the sufficient
//! statistics an outer conditional pricer mixes over — and translates it
//! to a conditional price multiplier and residual volatility.
//!
//! Three engines are provided:
//!
//! * [`StepEngine`] — walks a time grid with a configurable one-step
//!   scheme (Euler, Milstein, exact noncentral chi-square, Poisson-gamma,
//!   or Andersen QE) and accumulates the weighted average incrementally,
//! * [`GammaSeriesEngine`] — exact sampling of the integrated variance
//!   conditional on the endpoints through a truncated gamma expansion with
//!   analytic tail compensation,
//! * [`MomentMatchEngine`] — single moment-matched draws (inverse
//!   Gaussian / gamma / log-normal) per step or pooled over the horizon.
//!
//! ## Example
//!
//! ```
//! use hmc_sim::{CondMcEngine, HestonParams, McConfig, Scheme, StepEngine};
//!
//! let params = HestonParams::new(0.04, 0.5, 0.04, 1.0, -0.9).unwrap();
//! let config = McConfig::new(10_000, 123456)
//!     .with_dt(Some(0.125))
//!     .with_scheme(Scheme::Qe);
//! let engine = StepEngine::new(params, config).unwrap();
//!
//! let (spot_cond, sigma_cond) = engine.cond_spot_sigma(params.v0, 1.0).unwrap();
//! assert_eq!(spot_cond.len(), 10_000);
//! assert!(sigma_cond.iter().all(|&s| s >= 0.0));
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Simulation configuration and selectors.
pub mod config;

/// Engine interface and the grid-stepping engine.
pub mod engine;

/// Moment-matched single-draw approximations.
pub mod moment_match;

/// Model parameters and closed-form transition moments.
pub mod params;

/// Gamma-series expansion of the conditional integrated variance.
pub mod series;

/// One-step variance-advance samplers.
pub mod step;

/// Conditional spot / volatility translation.
pub mod translator;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use config::{McConfig, Scheme, TailDist};
pub use engine::{CondMcEngine, CondStates, StepEngine, VariancePaths};
pub use moment_match::{Aggregation, MomentMatchEngine};
pub use params::HestonParams;
pub use series::GammaSeriesEngine;
pub use step::{make_step, VarianceStep};
