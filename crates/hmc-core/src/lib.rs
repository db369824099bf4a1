//! # hmc-core
//!
//! Core types and error definitions for hestmc-rs.
//!
//! This crate provides the foundational building blocks shared across the
//! workspace – primitive type aliases, the error type, and the `ensure!` /
//! `fail!` convenience macros.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Error types and the `ensure!` / `fail!` macros.
pub mod errors;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// A time measurement in years.
pub type Time = Real;

/// Alias used for array sizes / indices.
pub type Size = usize;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
