//! Probability distribution helpers.
//!
//! Only the standard normal is needed in closed form — every other
//! distribution is sampled, not evaluated, and lives in
//! [`crate::random_numbers`].

pub mod normal;

pub use normal::{normal_cdf, normal_cdf_inverse, normal_pdf};
