//! Scenario-aware parameter repository for Monte Carlo models
//!
//! This crate turns tabular parameter definitions into reusable random-variable
//! generators. It supports:
//! - Named distributions resolved through an explicit registry
//! - Scenario variants with fallback to a `"default"` scenario
//! - Tag lookups across parameters and scenarios
//! - Monthly time series with CAGR or mean/variability growth
//! - Memoized sampling: a parameter samples once and keeps its value
//!
//! # Example
//!
//! ```ignore
//! use paramrepo_core::{DistributionRegistry, ParameterRepository, ParameterRow, RunSettings};
//! use rand::SeedableRng;
//!
//! let rows: Vec<ParameterRow> = serde_json::from_str(
//!     r#"[{"name": "b", "module": "numpy.random", "distribution": "uniform",
//!          "param_a": 2, "param_b": 4}]"#,
//! )?;
//! let mut repo = ParameterRepository::new();
//! repo.load_rows(rows, &DistributionRegistry::new())?;
//!
//! let mut rng = rand::rngs::SmallRng::seed_from_u64(0);
//! let value = repo.sample("b", None, &RunSettings::new(1).with_mean_value(true), &mut rng)?;
//! assert_eq!(value.values(), &[3.0]);
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod date_math;
pub mod diagnostics;
pub mod distribution;
pub mod error;
pub mod growth;
pub mod parameter;
pub mod repository;
pub mod time_series;

// ============================================================================
// Configuration modules
// ============================================================================

pub mod rows;
pub mod settings;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use diagnostics::{
    CollectingDiagnostics, Diagnostic, DiagnosticsSink, Severity, TracingDiagnostics, WarningKind,
};
pub use distribution::{
    BuiltinDistribution, DistributionFamily, DistributionParams, DistributionRegistry,
    DistributionSampler, DistributionSpec,
};
pub use error::{ConfigError, LookupError, RepositoryError};
pub use growth::{GrowthMatrix, growth_coefficients};
pub use parameter::{DEFAULT_SCENARIO, Parameter, ParameterAttributes, ParameterValue};
pub use repository::{ParameterRepository, ParameterScenarioSet};
pub use rows::{CellValue, ParameterRow};
pub use settings::{RunSettings, TimeAxis};
pub use time_series::{GrowthTimeSeriesSampler, MeanCurve, MeanVariability, TimeSeries, ValueModel};
