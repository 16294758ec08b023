//! Monthly multi-replicate time series built from a distribution and a growth model.
//!
//! Two growth models are supported:
//!
//! - **Exponential CAGR**: draw `months * replicates` values from the
//!   distribution and scale each month by its CAGR coefficient.
//! - **Mean/variability**: a deterministic mean curve `mu(t)` (constant with a
//!   CAGR, or interpolated between dated points) plus symmetric triangular
//!   noise whose width is a proportion of the reference-month mean and grows
//!   with its own coefficient matrix. In mean-value mode the noise is zero.

use std::iter;

use jiff::civil::Date;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::date_math::months_between;
use crate::diagnostics::{Diagnostic, DiagnosticsSink, WarningKind};
use crate::distribution::{
    BuiltinDistribution, DistributionParams, DistributionSampler, DistributionSpec,
};
use crate::error::ConfigError;
use crate::growth::growth_coefficients;
use crate::settings::TimeAxis;

/// Values for every (month, replicate) pair, month-major.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    times: Vec<Date>,
    replicates: usize,
    values: Vec<f64>,
}

impl TimeSeries {
    /// `values.len()` must equal `times.len() * replicates`.
    pub fn new(times: Vec<Date>, replicates: usize, values: Vec<f64>) -> Option<Self> {
        (values.len() == times.len() * replicates).then_some(Self {
            times,
            replicates,
            values,
        })
    }

    #[must_use]
    pub fn times(&self) -> &[Date] {
        &self.times
    }

    #[must_use]
    pub fn replicates(&self) -> usize {
        self.replicates
    }

    /// Flat values, `len(times) * replicates` long
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at (`month`, `sample`), addressed by date.
    #[must_use]
    pub fn get(&self, month: Date, sample: usize) -> Option<f64> {
        let idx = self.times.binary_search(&month).ok()?;
        self.at(idx, sample)
    }

    /// Value at (`month_index`, `sample`).
    #[must_use]
    pub fn at(&self, month_index: usize, sample: usize) -> Option<f64> {
        if sample >= self.replicates {
            return None;
        }
        self.values
            .get(month_index * self.replicates + sample)
            .copied()
    }

    /// All replicates of one month, addressed by date.
    #[must_use]
    pub fn month(&self, month: Date) -> Option<&[f64]> {
        let idx = self.times.binary_search(&month).ok()?;
        self.row(idx)
    }

    /// All replicates of one month, addressed by index.
    #[must_use]
    pub fn row(&self, month_index: usize) -> Option<&[f64]> {
        if month_index >= self.times.len() {
            return None;
        }
        let start = month_index * self.replicates;
        self.values.get(start..start + self.replicates)
    }

    /// `((month, sample), value)` in storage order
    pub fn iter(&self) -> impl Iterator<Item = ((Date, usize), f64)> + '_ {
        self.values.iter().enumerate().map(|(i, &v)| {
            let month = self.times[i / self.replicates];
            ((month, i % self.replicates), v)
        })
    }

    /// Replicate average for each month.
    #[must_use]
    pub fn mean_by_month(&self) -> Vec<f64> {
        if self.replicates == 0 {
            return vec![0.0; self.times.len()];
        }
        self.values
            .chunks(self.replicates)
            .map(|row| row.iter().sum::<f64>() / self.replicates as f64)
            .collect()
    }

    /// First negative value in storage order, as `(month, sample, value)`.
    #[must_use]
    pub fn first_negative(&self) -> Option<(Date, usize, f64)> {
        self.iter()
            .find(|(_, v)| *v < 0.0)
            .map(|((month, sample), v)| (month, sample, v))
    }
}

/// Deterministic mean curve of the mean/variability model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MeanCurve {
    /// `ref_value` at the reference date, growing at `growth` per year
    Exponential { ref_value: f64, growth: f64 },
    /// Linear interpolation between dated points, held flat outside them.
    /// Points are sorted by date with no duplicates.
    Interpolated(Vec<(Date, f64)>),
}

impl MeanCurve {
    /// Sorted, de-duplicated interpolation points.
    pub fn interpolated(name: &str, mut points: Vec<(Date, f64)>) -> Result<Self, ConfigError> {
        if points.is_empty() {
            return Err(ConfigError::InvalidGrowthCurve {
                name: name.to_string(),
                reason: "curve has no points".to_string(),
            });
        }
        points.sort_by_key(|(d, _)| *d);
        if let Some(pair) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(ConfigError::InvalidGrowthCurve {
                name: name.to_string(),
                reason: format!("duplicate date {}", pair[0].0),
            });
        }
        if let Some((d, v)) = points.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::InvalidGrowthCurve {
                name: name.to_string(),
                reason: format!("value {v} at {d} is not finite"),
            });
        }
        Ok(MeanCurve::Interpolated(points))
    }

    fn interpolate(points: &[(Date, f64)], at: Date) -> Result<f64, ConfigError> {
        let (Some(&first), Some(&last)) = (points.first(), points.last()) else {
            return Err(ConfigError::EmptyMeanCurve);
        };
        if at <= first.0 {
            return Ok(first.1);
        }
        if at >= last.0 {
            return Ok(last.1);
        }
        let origin = first.0;
        let x = f64::from(months_between(origin, at));
        for pair in points.windows(2) {
            let (d0, v0) = pair[0];
            let (d1, v1) = pair[1];
            if at <= d1 {
                let x0 = f64::from(months_between(origin, d0));
                let x1 = f64::from(months_between(origin, d1));
                if x1 == x0 {
                    return Ok(v1);
                }
                return Ok(v0 + (v1 - v0) * (x - x0) / (x1 - x0));
            }
        }
        Ok(last.1)
    }

    /// Mean value at the reference date.
    pub fn reference_value(&self, ref_date: Date) -> Result<f64, ConfigError> {
        match self {
            MeanCurve::Exponential { ref_value, .. } => Ok(*ref_value),
            MeanCurve::Interpolated(points) => Self::interpolate(points, ref_date),
        }
    }

    /// Mean value for every month of `times`.
    pub fn evaluate(&self, times: &TimeAxis, ref_date: Date) -> Result<Vec<f64>, ConfigError> {
        match self {
            MeanCurve::Exponential { ref_value, growth } => {
                let g = growth_coefficients(times.start(), times.end(), ref_date, *growth, 1)?;
                Ok(g.as_slice().iter().map(|f| ref_value * f).collect())
            }
            MeanCurve::Interpolated(points) => times
                .dates()
                .iter()
                .map(|&d| Self::interpolate(points, d))
                .collect(),
        }
    }
}

/// Configuration of the mean/variability growth model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanVariability {
    pub mean: MeanCurve,
    /// Noise half-width as a proportion of the reference-month mean
    pub variability: f64,
    /// Annual growth of the noise width (`ef_growth_factor`)
    pub variability_growth: f64,
    pub ref_date: Date,
}

impl MeanVariability {
    fn noise_spec(&self, base: f64) -> Result<DistributionSpec, ConfigError> {
        let half_width = (base * self.variability).abs();
        DistributionSpec::builtin(
            BuiltinDistribution::Triangular,
            DistributionParams::new(vec![-half_width, 0.0, half_width]),
        )
    }

    /// Values at the reference date only, for runs without a time axis.
    pub fn sample_at_reference(
        &self,
        size: usize,
        sample_mean_value: bool,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, ConfigError> {
        let base = self.mean.reference_value(self.ref_date)?;
        if sample_mean_value {
            return Ok(vec![base; size]);
        }
        let noise = DistributionSampler::new(self.noise_spec(base)?, size).generate_values(None, rng)?;
        Ok(noise.into_iter().map(|n| base + n).collect())
    }
}

/// The typed per-parameter generator configuration.
#[derive(Debug, Clone)]
pub enum ValueModel {
    /// Plain distribution, flat over time
    Distribution(DistributionSpec),
    /// Distribution draws scaled by CAGR coefficients around `ref_date`
    ExponentialGrowth {
        distribution: DistributionSpec,
        cagr: f64,
        ref_date: Date,
    },
    MeanVariability(MeanVariability),
}

impl ValueModel {
    #[must_use]
    pub fn ref_date(&self) -> Option<Date> {
        match self {
            ValueModel::Distribution(_) => None,
            ValueModel::ExponentialGrowth { ref_date, .. } => Some(*ref_date),
            ValueModel::MeanVariability(mv) => Some(mv.ref_date),
        }
    }

    #[must_use]
    pub fn distribution(&self) -> Option<&DistributionSpec> {
        match self {
            ValueModel::Distribution(d) | ValueModel::ExponentialGrowth { distribution: d, .. } => {
                Some(d)
            }
            ValueModel::MeanVariability(_) => None,
        }
    }
}

/// Samples a [`ValueModel`] over a monthly time axis.
#[derive(Debug, Clone)]
pub struct GrowthTimeSeriesSampler {
    name: String,
    scenario: Option<String>,
    model: ValueModel,
    times: TimeAxis,
    replicates: usize,
    sample_mean_value: bool,
}

impl GrowthTimeSeriesSampler {
    #[must_use]
    pub fn new(name: &str, model: ValueModel, times: TimeAxis, replicates: usize) -> Self {
        Self {
            name: name.to_string(),
            scenario: None,
            model,
            times,
            replicates,
            sample_mean_value: false,
        }
    }

    /// Scenario label attached to diagnostics
    #[must_use]
    pub fn with_scenario(mut self, scenario: Option<String>) -> Self {
        self.scenario = scenario;
        self
    }

    #[must_use]
    pub fn with_mean_value(mut self, sample_mean_value: bool) -> Self {
        self.sample_mean_value = sample_mean_value;
        self
    }

    #[must_use]
    pub fn times(&self) -> &TimeAxis {
        &self.times
    }

    fn report(&self, diagnostics: &dyn DiagnosticsSink, kind: WarningKind) {
        diagnostics.report(Diagnostic::new(&self.name, self.scenario.as_deref(), kind));
    }

    fn check_ref_date(&self, ref_date: Date, diagnostics: &dyn DiagnosticsSink) {
        let ref_month = ref_date.first_of_month();
        if !self.times.contains(ref_month) {
            self.report(
                diagnostics,
                WarningKind::RefDateOutOfBounds {
                    ref_date,
                    start: self.times.start(),
                    end: self.times.end(),
                },
            );
        }
    }

    /// One value per (month, replicate).
    ///
    /// Negative results are reported to `diagnostics` but still returned.
    pub fn generate_values(
        &self,
        rng: &mut dyn RngCore,
        diagnostics: &dyn DiagnosticsSink,
    ) -> Result<TimeSeries, ConfigError> {
        let n = self.times.len() * self.replicates;

        let values = match &self.model {
            ValueModel::Distribution(spec) => DistributionSampler::new(spec.clone(), n)
                .with_mean_value(self.sample_mean_value)
                .generate_values(None, rng)?,
            ValueModel::ExponentialGrowth {
                distribution,
                cagr,
                ref_date,
            } => {
                self.check_ref_date(*ref_date, diagnostics);
                let mut values = DistributionSampler::new(distribution.clone(), n)
                    .with_mean_value(self.sample_mean_value)
                    .generate_values(None, rng)?;
                let coefficients = growth_coefficients(
                    self.times.start(),
                    self.times.end(),
                    *ref_date,
                    *cagr,
                    self.replicates,
                )?;
                coefficients.apply(&mut values);
                values
            }
            ValueModel::MeanVariability(mv) => {
                self.check_ref_date(mv.ref_date, diagnostics);
                self.mean_variability_values(mv, rng)?
            }
        };

        let series = TimeSeries {
            times: self.times.dates().to_vec(),
            replicates: self.replicates,
            values,
        };

        if let Some((month, sample, value)) = series.first_negative() {
            self.report(
                diagnostics,
                WarningKind::NegativeValues {
                    month,
                    sample,
                    value,
                },
            );
        }

        tracing::trace!(
            parameter = %self.name,
            months = self.times.len(),
            replicates = self.replicates,
            "generated time series"
        );
        Ok(series)
    }

    fn mean_variability_values(
        &self,
        mv: &MeanVariability,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, ConfigError> {
        let mu = mv.mean.evaluate(&self.times, mv.ref_date)?;
        let mut values: Vec<f64> = mu
            .iter()
            .flat_map(|&m| iter::repeat_n(m, self.replicates))
            .collect();

        if self.sample_mean_value {
            return Ok(values);
        }

        let base = mv.mean.reference_value(mv.ref_date)?;
        let noise = DistributionSampler::new(mv.noise_spec(base)?, values.len())
            .generate_values(None, rng)?;
        let spread = growth_coefficients(
            self.times.start(),
            self.times.end(),
            mv.ref_date,
            mv.variability_growth,
            self.replicates,
        )?;

        for ((value, sigma), factor) in values.iter_mut().zip(noise).zip(spread.as_slice()) {
            *value += sigma * factor;
        }
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::distribution::DistributionRegistry;
    use jiff::civil::date;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn spec(name: &str, params: &[f64]) -> DistributionSpec {
        DistributionRegistry::new()
            .resolve(None, name, DistributionParams::new(params.to_vec()))
            .unwrap()
    }

    fn axis(start: Date, end: Date) -> TimeAxis {
        TimeAxis::monthly(start, end).unwrap()
    }

    #[test]
    fn test_exponential_cagr_model() {
        let model = ValueModel::ExponentialGrowth {
            distribution: spec("choice", &[1.0]),
            cagr: 0.1,
            ref_date: date(2009, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "a",
            model,
            axis(date(2009, 1, 1), date(2009, 4, 1)),
            2,
        );
        let sink = CollectingDiagnostics::new();
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(1), &sink)
            .unwrap();

        assert_eq!(series.len(), 8);
        assert_eq!(series.get(date(2009, 1, 1), 0), Some(1.0));
        assert_eq!(series.get(date(2009, 1, 1), 1), Some(1.0));
        let april = series.get(date(2009, 4, 1), 1).unwrap();
        assert!((april - 1.1f64.powf(3.0 / 12.0)).abs() < 1e-5);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_flat_distribution_over_time() {
        let sampler = GrowthTimeSeriesSampler::new(
            "b",
            ValueModel::Distribution(spec("uniform", &[2.0, 4.0])),
            axis(date(2009, 1, 1), date(2015, 5, 1)),
            10,
        );
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(2), &CollectingDiagnostics::new())
            .unwrap();

        assert_eq!(series.times().len(), 77);
        assert_eq!(series.len(), 770);
        assert!(series.values().iter().all(|v| (2.0..=4.0).contains(v)));
    }

    #[test]
    fn test_mean_value_mode_is_deterministic() {
        let model = ValueModel::ExponentialGrowth {
            distribution: spec("uniform", &[2.0, 4.0]),
            cagr: 0.0,
            ref_date: date(2009, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "b",
            model,
            axis(date(2009, 1, 1), date(2009, 4, 1)),
            10,
        )
        .with_mean_value(true);
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(3), &CollectingDiagnostics::new())
            .unwrap();

        assert!(series.values().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_ref_date_outside_axis_warns_and_extrapolates() {
        let model = ValueModel::ExponentialGrowth {
            distribution: spec("choice", &[1.0]),
            cagr: 0.1,
            ref_date: date(2008, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "late",
            model,
            axis(date(2009, 1, 1), date(2009, 2, 1)),
            1,
        );
        let sink = CollectingDiagnostics::new();
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(4), &sink)
            .unwrap();

        assert!((series.at(0, 0).unwrap() - 1.1).abs() < 1e-12);
        let diagnostics = sink.take();
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0].kind,
            WarningKind::RefDateOutOfBounds { .. }
        ));
    }

    #[test]
    fn test_negative_values_are_flagged_not_fatal() {
        let model = ValueModel::ExponentialGrowth {
            distribution: spec("choice", &[-2.0]),
            cagr: 0.05,
            ref_date: date(2009, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "neg",
            model,
            axis(date(2009, 1, 1), date(2009, 3, 1)),
            2,
        )
        .with_scenario(Some("s1".to_string()));
        let sink = CollectingDiagnostics::new();
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(5), &sink)
            .unwrap();

        assert_eq!(series.len(), 6);
        let diagnostics = sink.take();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].parameter, "neg");
        assert_eq!(diagnostics[0].scenario.as_deref(), Some("s1"));
        assert!(matches!(
            diagnostics[0].kind,
            WarningKind::NegativeValues { month, sample: 0, .. } if month == date(2009, 1, 1)
        ));
    }

    #[test]
    fn test_mean_variability_mean_mode_follows_curve() {
        let mv = MeanVariability {
            mean: MeanCurve::Exponential {
                ref_value: 100.0,
                growth: 0.2,
            },
            variability: 0.1,
            variability_growth: 0.05,
            ref_date: date(2010, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "mv",
            ValueModel::MeanVariability(mv),
            axis(date(2009, 1, 1), date(2011, 1, 1)),
            3,
        )
        .with_mean_value(true);
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(6), &CollectingDiagnostics::new())
            .unwrap();

        assert_eq!(series.month(date(2010, 1, 1)).unwrap(), &[100.0, 100.0, 100.0]);
        let start = series.at(0, 0).unwrap();
        assert!((start - 100.0 * 0.8).abs() < 1e-9);
        let end = series.at(24, 2).unwrap();
        assert!((end - 100.0 * 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_mean_variability_noise_bounds() {
        let mv = MeanVariability {
            mean: MeanCurve::Exponential {
                ref_value: 50.0,
                growth: 0.0,
            },
            variability: 0.1,
            variability_growth: 0.0,
            ref_date: date(2009, 1, 1),
        };
        let sampler = GrowthTimeSeriesSampler::new(
            "mv",
            ValueModel::MeanVariability(mv),
            axis(date(2009, 1, 1), date(2009, 12, 1)),
            50,
        );
        let series = sampler
            .generate_values(&mut SmallRng::seed_from_u64(7), &CollectingDiagnostics::new())
            .unwrap();

        assert!(series.values().iter().all(|&v| (45.0..=55.0).contains(&v)));
        assert!(series.values().iter().any(|&v| v != 50.0));
    }

    #[test]
    fn test_interpolated_curve() {
        let curve = MeanCurve::interpolated(
            "c",
            vec![(date(2010, 1, 1), 20.0), (date(2009, 1, 1), 10.0)],
        )
        .unwrap();
        let times = axis(date(2008, 11, 1), date(2010, 3, 1));
        let mu = curve.evaluate(&times, date(2009, 1, 1)).unwrap();

        // held flat before the first and after the last point
        assert_eq!(mu[0], 10.0);
        assert_eq!(mu[2], 10.0);
        assert!((mu[8] - 15.0).abs() < 1e-12);
        assert_eq!(mu[14], 20.0);
        assert_eq!(mu[16], 20.0);
        assert!((curve.reference_value(date(2009, 7, 1)).unwrap() - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_curve_is_an_error() {
        let curve = MeanCurve::Interpolated(vec![]);
        let times = axis(date(2009, 1, 1), date(2009, 3, 1));

        assert!(matches!(
            curve.evaluate(&times, date(2009, 1, 1)),
            Err(ConfigError::EmptyMeanCurve)
        ));
        assert!(matches!(
            curve.reference_value(date(2009, 1, 1)),
            Err(ConfigError::EmptyMeanCurve)
        ));
        assert!(MeanCurve::interpolated("c", vec![]).is_err());
    }

    #[test]
    fn test_interpolated_curve_rejects_duplicates() {
        let err = MeanCurve::interpolated(
            "c",
            vec![(date(2009, 1, 1), 1.0), (date(2009, 1, 1), 2.0)],
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGrowthCurve { .. }));
    }

    #[test]
    fn test_sample_at_reference() {
        let mv = MeanVariability {
            mean: MeanCurve::Exponential {
                ref_value: 10.0,
                growth: 0.1,
            },
            variability: 0.2,
            variability_growth: 0.0,
            ref_date: date(2009, 1, 1),
        };
        let mut rng = SmallRng::seed_from_u64(8);
        assert_eq!(mv.sample_at_reference(3, true, &mut rng).unwrap(), vec![10.0; 3]);
        let values = mv.sample_at_reference(100, false, &mut rng).unwrap();
        assert!(values.iter().all(|&v| (8.0..=12.0).contains(&v)));
    }

    #[test]
    fn test_series_accessors() {
        let series = TimeSeries::new(
            vec![date(2009, 1, 1), date(2009, 2, 1)],
            2,
            vec![1.0, 2.0, 3.0, 4.0],
        )
        .unwrap();

        assert_eq!(series.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(series.row(2), None);
        assert_eq!(series.row(usize::MAX), None);
        assert_eq!(series.month(date(2009, 2, 1)), Some(&[3.0, 4.0][..]));
        assert_eq!(series.month(date(2009, 3, 1)), None);
        assert_eq!(series.at(0, 2), None);
        assert_eq!(series.mean_by_month(), vec![1.5, 3.5]);
        let keys: Vec<_> = series.iter().map(|(k, _)| k).collect();
        assert_eq!(keys[3], (date(2009, 2, 1), 1));
        assert!(TimeSeries::new(vec![date(2009, 1, 1)], 2, vec![1.0]).is_none());
    }
}
