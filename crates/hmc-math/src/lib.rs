//! # hmc-math
//!
//! Mathematical support for hestmc-rs: special functions (Γ, modified
//! Bessel I), normal-distribution helpers (via `statrs`), seeded random
//! streams (MT19937-64 via `rand_mt`, variate transforms via `rand_distr`),
//! and a small statistics accumulator.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Probability distribution helpers.
pub mod distributions;

/// Seeded random number streams.
pub mod random_numbers;

/// Special functions: Γ, ln Γ, modified Bessel I.
pub mod special;

/// Statistics accumulator.
pub mod statistics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use distributions::{normal_cdf, normal_cdf_inverse, normal_pdf};
pub use random_numbers::{MersenneTwisterRng, RandomStreamSet};
pub use special::{gamma_function, ln_gamma, ln_modified_bessel_i, modified_bessel_i};
pub use statistics::Statistics;
