//! Per-parameter summaries printed by the command line.

use std::fmt;

use paramrepo_core::{Parameter, ParameterRepository, ParameterValue};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub name: String,
    pub label: String,
    pub unit: Option<String>,
    /// Scenarios the resolved instance is registered under
    pub scenarios: Vec<String>,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// `(months, replicates)` for time series
    pub shape: Option<(usize, usize)>,
}

impl ParameterSummary {
    #[must_use]
    pub fn new(parameter: &Parameter, value: &ParameterValue) -> Self {
        let values = value.values();
        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self {
            name: parameter.name().to_string(),
            label: parameter.label_or_name().to_string(),
            unit: parameter.attributes().unit.clone(),
            scenarios: parameter.scenarios().to_vec(),
            count: values.len(),
            mean: value.mean().unwrap_or(f64::NAN),
            min,
            max,
            shape: value
                .as_series()
                .map(|series| (series.times().len(), series.replicates())),
        }
    }
}

impl fmt::Display for ParameterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label, self.scenarios.join(", "))?;
        if let Some((months, replicates)) = self.shape {
            write!(f, " {months} months x {replicates} samples:")?;
        } else {
            write!(f, " {} samples:", self.count)?;
        }
        write!(
            f,
            " mean {:.4}, min {:.4}, max {:.4}",
            self.mean, self.min, self.max
        )?;
        if let Some(unit) = &self.unit {
            write!(f, " {unit}")?;
        }
        Ok(())
    }
}

/// Names to sample: explicit names, else everything carrying `tag`, else all names.
#[must_use]
pub fn select_names(
    repo: &ParameterRepository,
    tag: Option<&str>,
    names: &[String],
) -> Vec<String> {
    if !names.is_empty() {
        return names.to_vec();
    }
    match tag {
        Some(tag) => repo.find_by_tag(tag).into_keys().collect(),
        None => repo.names().into_iter().map(str::to_string).collect(),
    }
}
