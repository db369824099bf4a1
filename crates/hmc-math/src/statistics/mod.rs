//! Incremental statistics accumulator.
//!
//! Used by the validation tests to compare empirical Monte-Carlo moments
//! against closed-form targets with an attached standard-error estimate.

use hmc_core::Real;

/// Accumulates samples and computes mean, variance, and the standard error
/// of the mean.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    count: usize,
    sum_x: Real,
    sum_x2: Real,
}

impl Statistics {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate every value of a slice.
    pub fn from_slice(values: &[Real]) -> Self {
        let mut stats = Self::new();
        for &x in values {
            stats.add(x);
        }
        stats
    }

    /// Add a single sample.
    pub fn add(&mut self, x: Real) {
        self.count += 1;
        self.sum_x += x;
        self.sum_x2 += x * x;
    }

    /// Number of samples.
    pub fn samples(&self) -> usize {
        self.count
    }

    /// Sample mean.  Returns `None` if no samples have been added.
    pub fn mean(&self) -> Option<Real> {
        (self.count > 0).then(|| self.sum_x / self.count as Real)
    }

    /// Unbiased sample variance.  Returns `None` for fewer than 2 samples.
    pub fn variance(&self) -> Option<Real> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as Real;
        let m = self.sum_x / n;
        Some((self.sum_x2 / n - m * m) * n / (n - 1.0))
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> Option<Real> {
        self.variance().map(Real::sqrt)
    }

    /// Standard error of the mean, `s / √n`.
    pub fn error_estimate(&self) -> Option<Real> {
        self.std_dev().map(|s| s / (self.count as Real).sqrt())
    }
}
