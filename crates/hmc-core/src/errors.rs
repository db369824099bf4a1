//! Error types for hestmc-rs.
//!
//! A single `thiserror`-derived enum covers the whole workspace.  All
//! validation happens up front — once a simulation is running no error can
//! occur, so the variants describe configuration problems, not runtime ones.

use thiserror::Error;

/// The top-level error type used throughout hestmc-rs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error (maps to `fail!`).
    #[error("{0}")]
    Runtime(String),

    /// Precondition violated (maps to `ensure!`).
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// A configuration value (scheme name, distribution family, parameter)
    /// was rejected.  The message names the offending value.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

/// Shorthand `Result` type used throughout hestmc-rs.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Return `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use hmc_core::ensure;
/// fn positive(x: f64) -> hmc_core::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(positive(-1.0).is_err());
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Return `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use hmc_core::fail;
/// fn always_err() -> hmc_core::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(x: f64) -> Result<f64> {
        ensure!(x.is_finite(), "x must be finite, got {x}");
        Ok(x)
    }

    #[test]
    fn ensure_passes_and_fails() {
        assert_eq!(check(2.0), Ok(2.0));
        let err = check(f64::NAN).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn configuration_error_names_value() {
        let err = Error::Configuration("unknown scheme: 'qqe'".into());
        assert!(err.to_string().contains("qqe"));
    }
}
