//! Data-quality diagnostics.
//!
//! Non-fatal findings (a scenario variant without a default, overwritten tags,
//! negative values in a growth series, ...) are reported as typed
//! [`Diagnostic`] values to a [`DiagnosticsSink`] owned by the repository.
//! Nothing here installs a global logger; [`TracingDiagnostics`] only emits
//! `tracing` events for whatever subscriber the application configured.

use std::cell::RefCell;
use std::fmt;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WarningKind {
    /// A scenario variant was inserted before any default-scenario entry
    MissingDefaultScenario,
    /// A scenario variant's tags were replaced by the default's
    TagsOverwritten {
        scenario_tags: String,
        default_tags: String,
    },
    /// The reference date lies outside the sampled time axis
    RefDateOutOfBounds {
        ref_date: Date,
        start: Date,
        end: Date,
    },
    /// A growth-composed series contains negative values
    NegativeValues {
        month: Date,
        sample: usize,
        value: f64,
    },
    /// An existing (name, scenario) slot was replaced on purpose
    ParameterReplaced,
}

impl WarningKind {
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            WarningKind::ParameterReplaced => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingDefaultScenario => {
                write!(f, "no default scenario entry to inherit attributes from")
            }
            WarningKind::TagsOverwritten {
                scenario_tags,
                default_tags,
            } => write!(
                f,
                "tags '{scenario_tags}' replaced by default scenario tags '{default_tags}'"
            ),
            WarningKind::RefDateOutOfBounds {
                ref_date,
                start,
                end,
            } => write!(
                f,
                "reference date {ref_date} outside time axis [{start}, {end}], growth extrapolated"
            ),
            WarningKind::NegativeValues {
                month,
                sample,
                value,
            } => write!(
                f,
                "negative value {value} at {month} (sample {sample})"
            ),
            WarningKind::ParameterReplaced => write!(f, "existing entry replaced"),
        }
    }
}

/// One data-quality finding about a parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub parameter: String,
    pub scenario: Option<String>,
    pub kind: WarningKind,
}

impl Diagnostic {
    #[must_use]
    pub fn new(parameter: &str, scenario: Option<&str>, kind: WarningKind) -> Self {
        Self {
            parameter: parameter.to_string(),
            scenario: scenario.map(str::to_string),
            kind,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scenario {
            Some(scenario) => write!(f, "{} [{}]: {}", self.parameter, scenario, self.kind),
            None => write!(f, "{}: {}", self.parameter, self.kind),
        }
    }
}

/// Receives diagnostics; never interrupts the computation that produced them.
pub trait DiagnosticsSink {
    fn report(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        let scenario = diagnostic.scenario.as_deref().unwrap_or("-");
        match diagnostic.kind.severity() {
            Severity::Info => tracing::info!(
                parameter = %diagnostic.parameter,
                scenario,
                "{}",
                diagnostic.kind
            ),
            Severity::Warning => tracing::warn!(
                parameter = %diagnostic.parameter,
                scenario,
                "{}",
                diagnostic.kind
            ),
        }
    }
}

/// Keeps diagnostics in memory, e.g. to show them after a load.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.borrow().clone()
    }

    /// Remove and return everything reported so far
    pub fn take(&self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.borrow().is_empty()
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.borrow_mut().push(diagnostic);
    }
}
