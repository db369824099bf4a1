//! # hestmc
//!
//! Conditional Monte-Carlo simulation of the Heston / CIR stochastic
//! variance process.
//!
//! This crate is a **façade** that re-exports the public items of the
//! underlying workspace crates.  Application code should depend on this
//! crate rather than the individual `hmc-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use hestmc::sim::{CondMcEngine, HestonParams, McConfig, Scheme, StepEngine};
//!
//! let params = HestonParams::new(0.04, 0.5, 0.04, 1.0, -0.9).unwrap();
//! let config = McConfig::new(2_000, 42).with_dt(Some(0.25)).with_scheme(Scheme::Qe);
//! let engine = StepEngine::new(params, config).unwrap();
//! let states = engine.cond_states(params.v0, 1.0).unwrap();
//! assert_eq!(states.var_final.len(), 2_000);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types and error definitions.
pub use hmc_core as core;

/// Special functions, distributions, random streams, statistics.
pub use hmc_math as math;

/// The conditional Monte-Carlo engines.
pub use hmc_sim as sim;
