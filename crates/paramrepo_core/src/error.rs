use std::fmt;

use jiff::civil::Date;

/// Errors in parameter definitions, run settings or distribution setup.
///
/// All of these are fatal for the parameter in question and surface before
/// (or instead of) any sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A row without a parameter name
    MissingName,
    /// A row that needs a distribution but names none
    MissingDistribution { name: String },
    UnknownDistribution {
        module: Option<String>,
        distribution: String,
    },
    /// A `choice` parameter string with a non-numeric token
    MalformedChoice { value: String, token: String },
    InvalidDistributionParameters {
        distribution: String,
        params: Vec<f64>,
        reason: &'static str,
    },
    /// A growth model configured without a reference date
    MissingRefDate { name: String },
    /// A mean/variability model with neither a reference value nor a curve
    MissingRefValue { name: String },
    RefDateNotMonthStart(Date),
    InvalidDate(String),
    InvalidGrowthCurve { name: String, reason: String },
    /// An interpolated mean curve without points
    EmptyMeanCurve,
    InvalidCell { field: &'static str, value: String },
    /// The discrete monthly growth formula is undefined for this rate
    GrowthRateOutOfRange { alpha: f64, reason: &'static str },
    EmptyTimeAxis,
    TimeAxisNotMonthly { index: usize, date: Date },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingName => write!(f, "parameter row has no name"),
            ConfigError::MissingDistribution { name } => {
                write!(f, "parameter '{name}' has no distribution")
            }
            ConfigError::UnknownDistribution {
                module: Some(module),
                distribution,
            } => write!(f, "unknown distribution '{module}.{distribution}'"),
            ConfigError::UnknownDistribution {
                module: None,
                distribution,
            } => write!(f, "unknown distribution '{distribution}'"),
            ConfigError::MalformedChoice { value, token } => {
                write!(f, "malformed choice values '{value}': '{token}' is not a number")
            }
            ConfigError::InvalidDistributionParameters {
                distribution,
                params,
                reason,
            } => write!(
                f,
                "invalid {distribution} parameters {params:?}: {reason}"
            ),
            ConfigError::MissingRefDate { name } => {
                write!(f, "growth variable '{name}' has no reference date")
            }
            ConfigError::MissingRefValue { name } => {
                write!(f, "variable '{name}' has neither a reference value nor a mean curve")
            }
            ConfigError::RefDateNotMonthStart(d) => {
                write!(f, "reference date {d} is not the first day of a month")
            }
            ConfigError::InvalidDate(value) => write!(f, "cannot read '{value}' as a date"),
            ConfigError::EmptyMeanCurve => write!(f, "mean curve has no points"),
            ConfigError::InvalidGrowthCurve { name, reason } => {
                write!(f, "invalid growth curve for '{name}': {reason}")
            }
            ConfigError::InvalidCell { field, value } => {
                write!(f, "invalid value '{value}' for field '{field}'")
            }
            ConfigError::GrowthRateOutOfRange { alpha, reason } => {
                write!(f, "growth rate {alpha} out of range: {reason}")
            }
            ConfigError::EmptyTimeAxis => write!(f, "time axis is empty"),
            ConfigError::TimeAxisNotMonthly { index, date } => write!(
                f,
                "time axis is not month-start frequency at position {index} ({date})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors related to parameter lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    ParameterNotFound { name: String, scenario: String },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::ParameterNotFound { name, scenario } => write!(
                f,
                "parameter '{name}' not found for scenario '{scenario}' or the default scenario"
            ),
        }
    }
}

impl std::error::Error for LookupError {}

#[derive(Debug)]
pub enum RepositoryError {
    /// The (name, scenario) slot is already taken
    DuplicateParameter { name: String, scenario: String },
    Config(ConfigError),
    Lookup(LookupError),
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepositoryError::DuplicateParameter { name, scenario } => write!(
                f,
                "parameter '{name}' is already registered for scenario '{scenario}'"
            ),
            RepositoryError::Config(e) => write!(f, "{e}"),
            RepositoryError::Lookup(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for RepositoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RepositoryError::Config(e) => Some(e),
            RepositoryError::Lookup(e) => Some(e),
            RepositoryError::DuplicateParameter { .. } => None,
        }
    }
}

impl From<ConfigError> for RepositoryError {
    fn from(err: ConfigError) -> Self {
        RepositoryError::Config(err)
    }
}

impl From<LookupError> for RepositoryError {
    fn from(err: LookupError) -> Self {
        RepositoryError::Lookup(err)
    }
}
