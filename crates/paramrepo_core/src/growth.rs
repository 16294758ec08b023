//! Compound annual growth rate (CAGR) coefficients over a monthly span.
//!
//! The growth multiplier for month `m` relative to a reference month `r` is
//! `(1 + alpha)^((m - r) / 12)` after the reference and
//! `(1 - alpha)^((r - m) / 12)` before it, so the reference month is exactly 1.
//!
//! A reference date outside `[start, end]` is handled by computing the span
//! that covers both the reference and the requested range, then trimming the
//! rows that fall outside the requested range. The result always has one row
//! per month of `[start, end]`.

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::months_between;
use crate::error::ConfigError;

/// Row-major `(months, samples)` matrix of growth multipliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMatrix {
    months: usize,
    samples: usize,
    data: Vec<f64>,
}

impl GrowthMatrix {
    fn from_factors(factors: &[f64], samples: usize) -> Self {
        let mut data = Vec::with_capacity(factors.len() * samples);
        for &factor in factors {
            data.extend(std::iter::repeat_n(factor, samples));
        }
        Self {
            months: factors.len(),
            samples,
            data,
        }
    }

    /// Number of month rows
    #[must_use]
    pub fn months(&self) -> usize {
        self.months
    }

    /// Number of replicate columns
    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.months, self.samples)
    }

    #[must_use]
    pub fn get(&self, month: usize, sample: usize) -> Option<f64> {
        if month >= self.months || sample >= self.samples {
            return None;
        }
        self.data.get(month * self.samples + sample).copied()
    }

    /// All replicate multipliers for one month.
    #[must_use]
    pub fn row(&self, month: usize) -> Option<&[f64]> {
        if month >= self.months {
            return None;
        }
        let start = month * self.samples;
        self.data.get(start..start + self.samples)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Multiply `values` (laid out as `(months, samples)`, row-major) element-wise.
    ///
    /// Extra trailing values are left untouched.
    pub fn apply(&self, values: &mut [f64]) {
        for (value, factor) in values.iter_mut().zip(&self.data) {
            *value *= factor;
        }
    }
}

/// Build the growth multiplier matrix for `[start_date, end_date]` around `ref_date`.
///
/// All dates are truncated to the first of their month. `alpha` is the annual
/// growth rate; negative values describe decline.
///
/// # Errors
///
/// - `alpha >= 1` while the reference month differs from the start month
///   (the backward factor `1 - alpha` is not positive).
/// - `alpha <= -1` while there are months after the reference month.
/// - `end_date` earlier than `start_date`.
pub fn growth_coefficients(
    start_date: Date,
    end_date: Date,
    ref_date: Date,
    alpha: f64,
    samples: usize,
) -> Result<GrowthMatrix, ConfigError> {
    let start = start_date.first_of_month();
    let end = end_date.first_of_month();
    let reference = ref_date.first_of_month();

    if end < start {
        return Err(ConfigError::InvalidDate(format!(
            "end date {end} is before start date {start}"
        )));
    }
    if !alpha.is_finite() {
        return Err(ConfigError::GrowthRateOutOfRange {
            alpha,
            reason: "growth rate must be finite",
        });
    }
    if alpha >= 1.0 && reference != start {
        return Err(ConfigError::GrowthRateOutOfRange {
            alpha,
            reason: "for a CAGR >= 1 the reference date must equal the start date",
        });
    }

    let lo = start.min(reference);
    let hi = end.max(reference);

    // Whole months before (and including) the reference, and after it.
    let before = months_between(lo, reference) as usize;
    let after = months_between(reference, hi) as usize;

    if alpha <= -1.0 && after > 0 {
        return Err(ConfigError::GrowthRateOutOfRange {
            alpha,
            reason: "a CAGR <= -1 leaves no value after the reference date",
        });
    }

    let start_offset = months_between(lo, start) as usize;
    let end_offset = months_between(end, hi) as usize;
    let total = before + 1 + after;

    let factors: Vec<f64> = (start_offset..total - end_offset)
        .map(|k| {
            if k <= before {
                (1.0 - alpha).powf((before - k) as f64 / 12.0)
            } else {
                (1.0 + alpha).powf((k - before) as f64 / 12.0)
            }
        })
        .collect();

    Ok(GrowthMatrix::from_factors(&factors, samples))
}
