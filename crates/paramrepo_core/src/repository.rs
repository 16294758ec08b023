//! Scenario- and tag-indexed parameter store.
//!
//! A [`ParameterRepository`] maps each parameter name to a
//! [`ParameterScenarioSet`], which in turn maps scenario names to shared
//! [`Parameter`] handles. Lookups for a scenario without its own entry fall
//! back to the `"default"` scenario.
//!
//! Scenario variants inherit blank attributes from the default entry of the
//! same name when they are inserted. Tags are the exception: they are always
//! taken from the default when the two differ.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use rand::RngCore;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::diagnostics::{Diagnostic, DiagnosticsSink, TracingDiagnostics, WarningKind};
use crate::distribution::DistributionRegistry;
use crate::error::{LookupError, RepositoryError};
use crate::parameter::{DEFAULT_SCENARIO, Parameter, ParameterValue, split_list};
use crate::rows::ParameterRow;
use crate::settings::RunSettings;

/// All scenario variants of one parameter name.
#[derive(Debug, Clone)]
pub struct ParameterScenarioSet {
    name: String,
    scenarios: BTreeMap<String, Rc<Parameter>>,
}

impl ParameterScenarioSet {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scenarios: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entry for `scenario`, or the default entry if there is none.
    #[must_use]
    pub fn get(&self, scenario: &str) -> Option<&Rc<Parameter>> {
        self.scenarios
            .get(scenario)
            .or_else(|| self.scenarios.get(DEFAULT_SCENARIO))
    }

    /// Entry for exactly `scenario`, without fallback.
    #[must_use]
    pub fn get_exact(&self, scenario: &str) -> Option<&Rc<Parameter>> {
        self.scenarios.get(scenario)
    }

    #[must_use]
    pub fn default_parameter(&self) -> Option<&Rc<Parameter>> {
        self.scenarios.get(DEFAULT_SCENARIO)
    }

    #[must_use]
    pub fn contains(&self, scenario: &str) -> bool {
        self.scenarios.contains_key(scenario)
    }

    /// Insert into an empty slot.
    pub fn insert(
        &mut self,
        scenario: &str,
        parameter: Rc<Parameter>,
    ) -> Result<(), RepositoryError> {
        if self.contains(scenario) {
            return Err(RepositoryError::DuplicateParameter {
                name: self.name.clone(),
                scenario: scenario.to_string(),
            });
        }
        self.scenarios.insert(scenario.to_string(), parameter);
        Ok(())
    }

    /// Insert, returning whatever occupied the slot before.
    pub fn replace(&mut self, scenario: &str, parameter: Rc<Parameter>) -> Option<Rc<Parameter>> {
        self.scenarios.insert(scenario.to_string(), parameter)
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &str> {
        self.scenarios.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rc<Parameter>)> {
        self.scenarios.iter().map(|(s, p)| (s.as_str(), p))
    }

    /// Distinct instances; one shared across several scenarios counts once.
    #[must_use]
    pub fn unique_parameters(&self) -> Vec<Rc<Parameter>> {
        let mut unique: Vec<Rc<Parameter>> = Vec::new();
        for parameter in self.scenarios.values() {
            if !unique.iter().any(|p| Rc::ptr_eq(p, parameter)) {
                unique.push(Rc::clone(parameter));
            }
        }
        unique
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

/// tag -> parameter name -> instances bearing the tag
type TagIndex = FxHashMap<String, FxHashMap<String, Vec<Rc<Parameter>>>>;

pub struct ParameterRepository {
    parameters: FxHashMap<String, ParameterScenarioSet>,
    tags: TagIndex,
    diagnostics: Rc<dyn DiagnosticsSink>,
}

impl fmt::Debug for ParameterRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterRepository")
            .field("parameters", &self.names())
            .field("tags", &self.tags())
            .finish()
    }
}

impl Default for ParameterRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterRepository {
    /// Empty repository reporting diagnostics through `tracing`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_diagnostics(Rc::new(TracingDiagnostics))
    }

    #[must_use]
    pub fn with_diagnostics(diagnostics: Rc<dyn DiagnosticsSink>) -> Self {
        Self {
            parameters: FxHashMap::default(),
            tags: FxHashMap::default(),
            diagnostics,
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &dyn DiagnosticsSink {
        self.diagnostics.as_ref()
    }

    fn report(&self, parameter: &str, scenario: Option<&str>, kind: WarningKind) {
        self.diagnostics
            .report(Diagnostic::new(parameter, scenario, kind));
    }

    /// Register `parameter` under every scenario it lists.
    ///
    /// The insertion is all-or-nothing: if any listed (name, scenario) slot is
    /// already taken, nothing is changed.
    pub fn add_parameter(&mut self, parameter: Parameter) -> Result<Rc<Parameter>, RepositoryError> {
        let scenarios = parameter.scenario_list();
        if let Some(set) = self.parameters.get(parameter.name())
            && let Some(taken) = scenarios.iter().find(|s| set.contains(s))
        {
            return Err(RepositoryError::DuplicateParameter {
                name: parameter.name().to_string(),
                scenario: taken.clone(),
            });
        }
        Ok(self.insert(parameter, scenarios))
    }

    /// Register `parameter`, replacing any existing entries for its scenarios.
    pub fn replace_parameter(&mut self, parameter: Parameter) -> Rc<Parameter> {
        let scenarios = parameter.scenario_list();
        self.insert(parameter, scenarios)
    }

    fn insert(&mut self, mut parameter: Parameter, scenarios: Vec<String>) -> Rc<Parameter> {
        if !scenarios.iter().any(|s| s == DEFAULT_SCENARIO) {
            self.inherit_defaults(&mut parameter, &scenarios);
        }
        parameter.set_scenarios(scenarios.clone());

        let name = parameter.name().to_string();
        let parameter = Rc::new(parameter);
        let mut replaced = Vec::new();
        let set = self
            .parameters
            .entry(name.clone())
            .or_insert_with(|| ParameterScenarioSet::new(&name));
        for scenario in &scenarios {
            if set.replace(scenario, Rc::clone(&parameter)).is_some() {
                replaced.push(scenario.as_str());
            }
        }
        for scenario in replaced {
            self.report(&name, Some(scenario), WarningKind::ParameterReplaced);
        }

        self.reindex_tags(&name);
        tracing::debug!(parameter = %name, scenarios = ?scenarios, "registered parameter");
        parameter
    }

    /// Fill blank attributes of a scenario variant from the default entry.
    fn inherit_defaults(&self, parameter: &mut Parameter, scenarios: &[String]) {
        let scenario_label = scenarios.join(", ");
        let Some(default) = self
            .parameters
            .get(parameter.name())
            .and_then(ParameterScenarioSet::default_parameter)
        else {
            self.report(
                parameter.name(),
                Some(&scenario_label),
                WarningKind::MissingDefaultScenario,
            );
            return;
        };

        let defaults = default.attributes().clone();
        let attributes = parameter.attributes_mut();
        for (field, inherited) in [
            (&mut attributes.unit, defaults.unit),
            (&mut attributes.label, defaults.label),
            (&mut attributes.comment, defaults.comment),
            (&mut attributes.source, defaults.source),
        ] {
            if field.as_deref().is_none_or(str::is_empty) {
                *field = inherited;
            }
        }

        if tag_set(attributes.tags.as_deref()) != tag_set(defaults.tags.as_deref()) {
            let scenario_tags = attributes.tags.take().unwrap_or_default();
            if !scenario_tags.is_empty() {
                self.report(
                    parameter.name(),
                    Some(&scenario_label),
                    WarningKind::TagsOverwritten {
                        scenario_tags,
                        default_tags: defaults.tags.clone().unwrap_or_default(),
                    },
                );
            }
            parameter.attributes_mut().tags = defaults.tags;
        }
    }

    /// Rebuild the tag index entries for one parameter name.
    fn reindex_tags(&mut self, name: &str) {
        for by_name in self.tags.values_mut() {
            by_name.remove(name);
        }
        if let Some(set) = self.parameters.get(name) {
            for parameter in set.unique_parameters() {
                for tag in parameter.tags() {
                    self.tags
                        .entry(tag)
                        .or_default()
                        .entry(name.to_string())
                        .or_default()
                        .push(Rc::clone(&parameter));
                }
            }
        }
        self.tags.retain(|_, by_name| !by_name.is_empty());
    }

    /// Parameter for `scenario` (default: `"default"`), falling back to the default entry.
    pub fn get_parameter(
        &self,
        name: &str,
        scenario: Option<&str>,
    ) -> Result<Rc<Parameter>, LookupError> {
        let scenario = scenario.unwrap_or(DEFAULT_SCENARIO);
        self.parameters
            .get(name)
            .and_then(|set| set.get(scenario))
            .map(Rc::clone)
            .ok_or_else(|| LookupError::ParameterNotFound {
                name: name.to_string(),
                scenario: scenario.to_string(),
            })
    }

    /// Parameter name -> instances carrying `tag`. Unknown tags give an empty map.
    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> BTreeMap<String, Vec<Rc<Parameter>>> {
        self.tags
            .get(tag)
            .map(|by_name| {
                by_name
                    .iter()
                    .map(|(name, parameters)| (name.clone(), parameters.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `name` is registered, optionally for exactly `scenario`.
    #[must_use]
    pub fn exists(&self, name: &str, scenario: Option<&str>) -> bool {
        match (self.parameters.get(name), scenario) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(set), Some(scenario)) => set.contains(scenario),
        }
    }

    /// Reset every registered parameter's memoized value.
    pub fn clear_cache(&self) {
        let mut cleared = 0usize;
        for set in self.parameters.values() {
            for parameter in set.unique_parameters() {
                parameter.clear_cache();
                cleared += 1;
            }
        }
        tracing::debug!(parameters = cleared, "cleared parameter caches");
    }

    /// Convert and register rows, default-scenario rows first.
    ///
    /// Every row is converted and every (name, scenario) slot checked before
    /// anything is inserted, so a bad or duplicate row leaves the repository
    /// untouched. Returns the number of parameters added.
    pub fn load_rows<I>(
        &mut self,
        rows: I,
        registry: &DistributionRegistry,
    ) -> Result<usize, RepositoryError>
    where
        I: IntoIterator<Item = ParameterRow>,
    {
        let parameters = rows
            .into_iter()
            .map(|row| row.into_parameter(registry))
            .collect::<Result<Vec<_>, _>>()?;

        let (defaults, variants): (Vec<_>, Vec<_>) = parameters
            .into_iter()
            .partition(|p| p.scenario_list().iter().any(|s| s == DEFAULT_SCENARIO));

        let mut slots = FxHashSet::default();
        for parameter in defaults.iter().chain(&variants) {
            for scenario in parameter.scenario_list() {
                if self.exists(parameter.name(), Some(scenario.as_str()))
                    || !slots.insert((parameter.name().to_string(), scenario.clone()))
                {
                    return Err(RepositoryError::DuplicateParameter {
                        name: parameter.name().to_string(),
                        scenario,
                    });
                }
            }
        }

        let count = defaults.len() + variants.len();
        for parameter in defaults.into_iter().chain(variants) {
            let scenarios = parameter.scenario_list();
            self.insert(parameter, scenarios);
        }
        tracing::info!(parameters = count, names = self.len(), "loaded parameter rows");
        Ok(count)
    }

    /// Look up a parameter and invoke it with this repository's diagnostics sink.
    pub fn sample(
        &self,
        name: &str,
        scenario: Option<&str>,
        settings: &RunSettings,
        rng: &mut dyn RngCore,
    ) -> Result<Rc<ParameterValue>, RepositoryError> {
        let parameter = self.get_parameter(name, scenario)?;
        Ok(parameter.call(settings, rng, self.diagnostics.as_ref())?)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of distinct parameter names
    #[must_use]
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    #[must_use]
    pub fn scenario_set(&self, name: &str) -> Option<&ParameterScenarioSet> {
        self.parameters.get(name)
    }

    /// Scenario names registered for `name`, sorted.
    #[must_use]
    pub fn scenarios_of(&self, name: &str) -> Option<Vec<&str>> {
        self.parameters
            .get(name)
            .map(|set| set.scenarios().collect())
    }

    /// Every known tag, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.tags.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}

/// Tags as an unordered set, ignoring spacing and repeats.
fn tag_set(tags: Option<&str>) -> BTreeSet<String> {
    tags.map(split_list).unwrap_or_default().into_iter().collect()
}
