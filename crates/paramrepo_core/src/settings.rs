//! Run settings supplied when a parameter is first invoked.

use jiff::ToSpan;
use jiff::civil::Date;
use serde::{Deserialize, Serialize};

use crate::date_math::{add_months, is_month_start};
use crate::error::ConfigError;

fn default_sample_size() -> usize {
    1
}

/// Non-empty sequence of consecutive month-start dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Date>", into = "Vec<Date>")]
pub struct TimeAxis {
    dates: Vec<Date>,
}

impl TimeAxis {
    /// Every month start from `start` through `end`, inclusive.
    pub fn monthly(start: Date, end: Date) -> Result<Self, ConfigError> {
        if !is_month_start(start) {
            return Err(ConfigError::TimeAxisNotMonthly {
                index: 0,
                date: start,
            });
        }
        let dates: Vec<Date> = start
            .series(1.month())
            .take_while(|d| *d <= end)
            .collect();
        Self::from_dates(dates)
    }

    /// Validate an explicit list of dates.
    pub fn from_dates(dates: Vec<Date>) -> Result<Self, ConfigError> {
        let Some(&first) = dates.first() else {
            return Err(ConfigError::EmptyTimeAxis);
        };
        if !is_month_start(first) {
            return Err(ConfigError::TimeAxisNotMonthly {
                index: 0,
                date: first,
            });
        }
        for (index, pair) in dates.windows(2).enumerate() {
            if add_months(pair[0], 1) != Some(pair[1]) {
                return Err(ConfigError::TimeAxisNotMonthly {
                    index: index + 1,
                    date: pair[1],
                });
            }
        }
        Ok(Self { dates })
    }

    #[must_use]
    pub fn start(&self) -> Date {
        self.dates[0]
    }

    #[must_use]
    pub fn end(&self) -> Date {
        self.dates[self.dates.len() - 1]
    }

    /// Number of months
    #[must_use]
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    #[must_use]
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    #[must_use]
    pub fn contains(&self, date: Date) -> bool {
        self.start() <= date && date <= self.end()
    }

    #[must_use]
    pub fn index_of(&self, date: Date) -> Option<usize> {
        self.dates.binary_search(&date).ok()
    }
}

impl TryFrom<Vec<Date>> for TimeAxis {
    type Error = ConfigError;

    fn try_from(dates: Vec<Date>) -> Result<Self, Self::Error> {
        Self::from_dates(dates)
    }
}

impl From<TimeAxis> for Vec<Date> {
    fn from(axis: TimeAxis) -> Self {
        axis.dates
    }
}

/// Generic knobs applied when a parameter builds its sampler.
///
/// A present `time_axis` switches parameters to time-series sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Draws per call, or replicates per month for time series
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Replace random draws by distribution means
    #[serde(default)]
    pub sample_mean_value: bool,

    #[serde(default)]
    pub time_axis: Option<TimeAxis>,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            sample_mean_value: false,
            time_axis: None,
        }
    }
}

impl RunSettings {
    #[must_use]
    pub fn new(sample_size: usize) -> Self {
        Self {
            sample_size,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_mean_value(mut self, sample_mean_value: bool) -> Self {
        self.sample_mean_value = sample_mean_value;
        self
    }

    #[must_use]
    pub fn with_time_axis(mut self, time_axis: TimeAxis) -> Self {
        self.time_axis = Some(time_axis);
        self
    }

    #[must_use]
    pub fn uses_time_series(&self) -> bool {
        self.time_axis.is_some()
    }
}
