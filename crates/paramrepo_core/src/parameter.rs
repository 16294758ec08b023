//! Named, memoizing handle over one value generator.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::RngCore;

use crate::diagnostics::DiagnosticsSink;
use crate::distribution::DistributionSampler;
use crate::error::ConfigError;
use crate::settings::RunSettings;
use crate::time_series::{GrowthTimeSeriesSampler, TimeSeries, ValueModel};

/// Name of the fallback scenario.
pub const DEFAULT_SCENARIO: &str = "default";

/// What a parameter produces when invoked.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Flat draws, no time axis
    Samples(Vec<f64>),
    /// One value per (month, replicate)
    Series(TimeSeries),
}

impl ParameterValue {
    #[must_use]
    pub fn values(&self) -> &[f64] {
        match self {
            ParameterValue::Samples(values) => values,
            ParameterValue::Series(series) => series.values(),
        }
    }

    #[must_use]
    pub fn as_series(&self) -> Option<&TimeSeries> {
        match self {
            ParameterValue::Samples(_) => None,
            ParameterValue::Series(series) => Some(series),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().is_empty()
    }

    /// Average over every value; `None` when empty.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        let values = self.values();
        (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Descriptive attributes. Scenario variants inherit blanks from the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterAttributes {
    pub unit: Option<String>,
    pub label: Option<String>,
    pub comment: Option<String>,
    pub source: Option<String>,
    /// Comma-separated tag list
    pub tags: Option<String>,
}

/// Split a comma-separated list, dropping blanks and repeats.
pub(crate) fn split_list(value: &str) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for item in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !items.iter().any(|existing| existing == item) {
            items.push(item.to_string());
        }
    }
    items
}

#[derive(Debug)]
pub struct Parameter {
    name: String,
    attributes: ParameterAttributes,
    source_scenarios: Option<String>,
    scenarios: Vec<String>,
    model: ValueModel,
    cache: RefCell<Option<Rc<ParameterValue>>>,
    usage: RefCell<BTreeMap<String, Vec<String>>>,
}

impl Parameter {
    #[must_use]
    pub fn new(name: &str, model: ValueModel) -> Self {
        Self {
            name: name.to_string(),
            attributes: ParameterAttributes::default(),
            source_scenarios: None,
            scenarios: Vec::new(),
            model,
            cache: RefCell::new(None),
            usage: RefCell::new(BTreeMap::new()),
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: ParameterAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    /// Comma-separated scenario list, e.g. `"s1, s2"`.
    #[must_use]
    pub fn with_scenarios(mut self, source_scenarios: &str) -> Self {
        self.source_scenarios = Some(source_scenarios.to_string());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn attributes(&self) -> &ParameterAttributes {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut ParameterAttributes {
        &mut self.attributes
    }

    #[must_use]
    pub fn model(&self) -> &ValueModel {
        &self.model
    }

    #[must_use]
    pub fn source_scenarios(&self) -> Option<&str> {
        self.source_scenarios.as_deref()
    }

    /// Requested scenarios; `["default"]` when none were given.
    #[must_use]
    pub fn scenario_list(&self) -> Vec<String> {
        let scenarios = self
            .source_scenarios
            .as_deref()
            .map(split_list)
            .unwrap_or_default();
        if scenarios.is_empty() {
            vec![DEFAULT_SCENARIO.to_string()]
        } else {
            scenarios
        }
    }

    /// Scenarios this instance is registered under. Empty until inserted.
    #[must_use]
    pub fn scenarios(&self) -> &[String] {
        &self.scenarios
    }

    pub(crate) fn set_scenarios(&mut self, scenarios: Vec<String>) {
        self.scenarios = scenarios;
    }

    #[must_use]
    pub fn tags(&self) -> Vec<String> {
        self.attributes
            .tags
            .as_deref()
            .map(split_list)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn label_or_name(&self) -> &str {
        self.attributes.label.as_deref().unwrap_or(&self.name)
    }

    /// Record that `variable_name` in `process_name` is bound to this parameter.
    pub fn add_usage(&self, process_name: &str, variable_name: &str) {
        self.usage
            .borrow_mut()
            .entry(process_name.to_string())
            .or_default()
            .push(variable_name.to_string());
    }

    #[must_use]
    pub fn usage(&self) -> BTreeMap<String, Vec<String>> {
        self.usage.borrow().clone()
    }

    #[must_use]
    pub fn is_cached(&self) -> bool {
        self.cache.borrow().is_some()
    }

    /// Drop the memoized value; the next call samples again.
    pub fn clear_cache(&self) {
        self.cache.borrow_mut().take();
    }

    fn diagnostic_scenario(&self) -> Option<String> {
        match self.scenarios.as_slice() {
            [] => None,
            [only] if only == DEFAULT_SCENARIO => None,
            scenarios => Some(scenarios.join(", ")),
        }
    }

    /// Produce this parameter's value, sampling only on the first call.
    ///
    /// Later calls return the same `Rc` whatever `settings` they pass, until
    /// [`Parameter::clear_cache`] is called.
    pub fn call(
        &self,
        settings: &RunSettings,
        rng: &mut dyn RngCore,
        diagnostics: &dyn DiagnosticsSink,
    ) -> Result<Rc<ParameterValue>, ConfigError> {
        if let Some(value) = self.cache.borrow().as_ref() {
            return Ok(Rc::clone(value));
        }

        let value = Rc::new(self.generate(settings, rng, diagnostics)?);
        *self.cache.borrow_mut() = Some(Rc::clone(&value));
        Ok(value)
    }

    fn generate(
        &self,
        settings: &RunSettings,
        rng: &mut dyn RngCore,
        diagnostics: &dyn DiagnosticsSink,
    ) -> Result<ParameterValue, ConfigError> {
        tracing::debug!(
            parameter = %self.name,
            size = settings.sample_size,
            mean = settings.sample_mean_value,
            time_series = settings.uses_time_series(),
            "building sampler"
        );

        if let Some(times) = &settings.time_axis {
            let sampler = GrowthTimeSeriesSampler::new(
                &self.name,
                self.model.clone(),
                times.clone(),
                settings.sample_size,
            )
            .with_mean_value(settings.sample_mean_value)
            .with_scenario(self.diagnostic_scenario());
            return sampler
                .generate_values(rng, diagnostics)
                .map(ParameterValue::Series);
        }

        let values = match &self.model {
            ValueModel::Distribution(spec) | ValueModel::ExponentialGrowth { distribution: spec, .. } => {
                DistributionSampler::new(spec.clone(), settings.sample_size)
                    .with_mean_value(settings.sample_mean_value)
                    .generate_values(None, rng)?
            }
            ValueModel::MeanVariability(mv) => {
                mv.sample_at_reference(settings.sample_size, settings.sample_mean_value, rng)?
            }
        };
        Ok(ParameterValue::Samples(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::distribution::{BuiltinDistribution, DistributionParams, DistributionSpec};
    use crate::settings::TimeAxis;
    use jiff::civil::date;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn uniform(name: &str) -> Parameter {
        let spec = DistributionSpec::builtin(
            BuiltinDistribution::Uniform,
            DistributionParams::new(vec![2.0, 4.0]),
        )
        .unwrap();
        Parameter::new(name, ValueModel::Distribution(spec))
    }

    #[test]
    fn test_call_is_memoized() {
        let p = uniform("b");
        let sink = CollectingDiagnostics::new();
        let mut rng = SmallRng::seed_from_u64(1);

        let first = p.call(&RunSettings::new(5), &mut rng, &sink).unwrap();
        let second = p
            .call(&RunSettings::new(50).with_mean_value(true), &mut rng, &sink)
            .unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 5);
    }

    #[test]
    fn test_clear_cache_resamples() {
        let p = uniform("b");
        let sink = CollectingDiagnostics::new();
        let mut rng = SmallRng::seed_from_u64(2);

        let first = p.call(&RunSettings::new(1), &mut rng, &sink).unwrap();
        assert!(p.is_cached());
        p.clear_cache();
        assert!(!p.is_cached());

        let second = p
            .call(&RunSettings::new(2).with_mean_value(true), &mut rng, &sink)
            .unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert_eq!(second.values(), &[3.0, 3.0]);
    }

    #[test]
    fn test_distinct_instances_do_not_share_cache() {
        let a = uniform("b");
        let b = uniform("b");
        let sink = CollectingDiagnostics::new();
        let mut rng = SmallRng::seed_from_u64(3);

        a.call(&RunSettings::new(1), &mut rng, &sink).unwrap();
        assert!(a.is_cached());
        assert!(!b.is_cached());
    }

    #[test]
    fn test_time_axis_yields_series() {
        let p = uniform("b");
        let axis = TimeAxis::monthly(date(2009, 1, 1), date(2009, 12, 1)).unwrap();
        let value = p
            .call(
                &RunSettings::new(4).with_time_axis(axis),
                &mut SmallRng::seed_from_u64(4),
                &CollectingDiagnostics::new(),
            )
            .unwrap();

        let series = value.as_series().unwrap();
        assert_eq!(series.times().len(), 12);
        assert_eq!(series.replicates(), 4);
    }

    #[test]
    fn test_scenario_list_and_tags() {
        let p = uniform("x").with_scenarios(" s1, s2 ,,s1").with_attributes(ParameterAttributes {
            tags: Some("t1, t2".to_string()),
            label: Some("Label X".to_string()),
            ..Default::default()
        });
        assert_eq!(p.scenario_list(), vec!["s1", "s2"]);
        assert_eq!(p.tags(), vec!["t1", "t2"]);
        assert_eq!(p.label_or_name(), "Label X");

        let q = uniform("y");
        assert_eq!(q.scenario_list(), vec![DEFAULT_SCENARIO]);
        assert!(q.tags().is_empty());
        assert_eq!(q.label_or_name(), "y");
    }

    #[test]
    fn test_usage_ledger() {
        let p = uniform("x");
        p.add_usage("process_a", "x_in");
        p.add_usage("process_a", "x_alias");
        p.add_usage("process_b", "x");

        let usage = p.usage();
        assert_eq!(usage["process_a"], vec!["x_in", "x_alias"]);
        assert_eq!(usage["process_b"], vec!["x"]);
        assert!(!p.is_cached());
    }
}
