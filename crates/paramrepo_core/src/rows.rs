//! Typed rows produced by the ingestion layer, and their conversion to parameters.
//!
//! Field aliases accept the usual spreadsheet headers (`variable`, `scenario`,
//! `param 1`, `CAGR`, `ref date`, ...). Blank text cells count as missing.

use std::collections::BTreeMap;

use jiff::civil::{Date, DateTime};
use serde::{Deserialize, Serialize};

use crate::date_math::{from_spreadsheet_serial, is_month_start};
use crate::distribution::{DistributionParams, DistributionRegistry};
use crate::error::ConfigError;
use crate::parameter::{Parameter, ParameterAttributes};
use crate::time_series::{MeanCurve, MeanVariability, ValueModel};

/// A spreadsheet cell that may hold a number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

impl CellValue {
    fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.trim().is_empty())
    }

    /// Numeric value, parsing text cells.
    pub fn as_number(&self, field: &'static str) -> Result<f64, ConfigError> {
        match self {
            CellValue::Number(n) => Ok(*n),
            CellValue::Text(s) => s.trim().parse().map_err(|_| ConfigError::InvalidCell {
                field,
                value: s.clone(),
            }),
        }
    }

    /// Date from ISO date text, ISO datetime text, or a spreadsheet serial.
    pub fn as_date(&self) -> Result<Date, ConfigError> {
        match self {
            CellValue::Number(serial) => from_spreadsheet_serial(*serial)
                .ok_or_else(|| ConfigError::InvalidDate(serial.to_string())),
            CellValue::Text(s) => parse_date(s),
        }
    }
}

fn parse_date(value: &str) -> Result<Date, ConfigError> {
    let value = value.trim();
    value
        .parse::<Date>()
        .or_else(|_| value.parse::<DateTime>().map(|dt| dt.date()))
        .map_err(|_| ConfigError::InvalidDate(value.to_string()))
}

fn cell(value: &Option<CellValue>) -> Option<&CellValue> {
    value.as_ref().filter(|c| !c.is_blank())
}

fn text(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn owned_text(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// One normalized input row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterRow {
    #[serde(alias = "variable")]
    pub name: Option<String>,
    /// Comma-separated scenario list
    #[serde(alias = "scenario", alias = "scenarios")]
    pub source_scenarios_string: Option<String>,
    #[serde(alias = "module")]
    pub module_name: Option<String>,
    #[serde(alias = "distribution", alias = "function")]
    pub distribution_name: Option<String>,
    #[serde(alias = "param 1")]
    pub param_a: Option<CellValue>,
    #[serde(alias = "param 2")]
    pub param_b: Option<CellValue>,
    #[serde(alias = "param 3")]
    pub param_c: Option<CellValue>,

    #[serde(alias = "CAGR")]
    pub cagr: Option<CellValue>,
    #[serde(alias = "ref date")]
    pub ref_date: Option<CellValue>,
    #[serde(alias = "ref value")]
    pub ref_value: Option<CellValue>,
    /// A number, or a JSON object mapping dates to values
    #[serde(alias = "mean growth")]
    pub mean_growth: Option<CellValue>,
    #[serde(alias = "initial_value_proportional_variation")]
    pub variability: Option<CellValue>,
    #[serde(alias = "variability growth")]
    pub variability_growth: Option<CellValue>,

    pub unit: Option<String>,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub source: Option<String>,
    pub tags: Option<String>,
}

impl ParameterRow {
    /// Validate the row and build its parameter.
    ///
    /// The distribution is resolved through `registry` here, so unknown names
    /// and bad parameters fail before any sampling.
    pub fn into_parameter(self, registry: &DistributionRegistry) -> Result<Parameter, ConfigError> {
        let name = text(&self.name).ok_or(ConfigError::MissingName)?.to_string();
        let model = self.value_model(&name, registry)?;

        let mut parameter = Parameter::new(&name, model).with_attributes(ParameterAttributes {
            unit: owned_text(self.unit),
            label: owned_text(self.label),
            comment: owned_text(self.comment),
            source: owned_text(self.source),
            tags: owned_text(self.tags),
        });
        if let Some(scenarios) = owned_text(self.source_scenarios_string) {
            parameter = parameter.with_scenarios(&scenarios);
        }
        Ok(parameter)
    }

    fn is_mean_variability(&self) -> bool {
        cell(&self.ref_value).is_some()
            || cell(&self.mean_growth).is_some()
            || cell(&self.variability).is_some()
    }

    fn ref_date(&self, name: &str) -> Result<Date, ConfigError> {
        let date = cell(&self.ref_date)
            .ok_or_else(|| ConfigError::MissingRefDate {
                name: name.to_string(),
            })?
            .as_date()?;
        if !is_month_start(date) {
            return Err(ConfigError::RefDateNotMonthStart(date));
        }
        Ok(date)
    }

    fn value_model(
        &self,
        name: &str,
        registry: &DistributionRegistry,
    ) -> Result<ValueModel, ConfigError> {
        if self.is_mean_variability() {
            return self.mean_variability(name).map(ValueModel::MeanVariability);
        }

        let distribution_name =
            text(&self.distribution_name).ok_or_else(|| ConfigError::MissingDistribution {
                name: name.to_string(),
            })?;
        let distribution = registry.resolve(
            text(&self.module_name),
            distribution_name,
            self.distribution_params(distribution_name)?,
        )?;

        match cell(&self.cagr) {
            Some(cagr) => Ok(ValueModel::ExponentialGrowth {
                distribution,
                cagr: cagr.as_number("cagr")?,
                ref_date: self.ref_date(name)?,
            }),
            None => Ok(ValueModel::Distribution(distribution)),
        }
    }

    /// `choice` takes its candidates from a comma-separated `param_a` string or
    /// from the numeric cells; everything else reads the numeric cells in order.
    fn distribution_params(&self, distribution: &str) -> Result<DistributionParams, ConfigError> {
        if distribution == "choice"
            && let Some(CellValue::Text(list)) = cell(&self.param_a)
            && list.contains(',')
        {
            return DistributionParams::parse_list(list);
        }

        let fields: [(&'static str, &Option<CellValue>); 3] = [
            ("param_a", &self.param_a),
            ("param_b", &self.param_b),
            ("param_c", &self.param_c),
        ];
        let mut values = Vec::with_capacity(3);
        for (field, value) in fields {
            if let Some(value) = cell(value) {
                values.push(value.as_number(field)?);
            }
        }
        Ok(DistributionParams::new(values))
    }

    fn mean_variability(&self, name: &str) -> Result<MeanVariability, ConfigError> {
        let ref_date = self.ref_date(name)?;

        let mean = match cell(&self.mean_growth) {
            Some(CellValue::Text(curve)) if curve.trim_start().starts_with('{') => {
                parse_growth_curve(name, curve)?
            }
            growth => {
                let ref_value = cell(&self.ref_value)
                    .ok_or_else(|| ConfigError::MissingRefValue {
                        name: name.to_string(),
                    })?
                    .as_number("ref_value")?;
                let growth = growth.map(|g| g.as_number("mean_growth")).transpose()?;
                MeanCurve::Exponential {
                    ref_value,
                    growth: growth.unwrap_or(0.0),
                }
            }
        };

        let number = |value: &Option<CellValue>, field| {
            cell(value)
                .map(|c| c.as_number(field))
                .transpose()
                .map(Option::unwrap_or_default)
        };

        Ok(MeanVariability {
            mean,
            variability: number(&self.variability, "variability")?,
            variability_growth: number(&self.variability_growth, "variability_growth")?,
            ref_date,
        })
    }
}

/// Parse a JSON object of `date -> value` points.
fn parse_growth_curve(name: &str, curve: &str) -> Result<MeanCurve, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidGrowthCurve {
        name: name.to_string(),
        reason,
    };
    let raw: BTreeMap<String, f64> =
        serde_json::from_str(curve).map_err(|e| invalid(e.to_string()))?;
    let points = raw
        .iter()
        .map(|(date, value)| {
            parse_date(date)
                .map(|d| (d, *value))
                .map_err(|_| invalid(format!("'{date}' is not a date")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    MeanCurve::interpolated(name, points)
}
