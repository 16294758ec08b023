//! Named statistical distributions and the sampler that draws from them.
//!
//! Rows name a distribution by string (optionally with a module namespace such
//! as `numpy.random`). The [`DistributionRegistry`] resolves that name to a
//! [`DistributionFamily`] once, when the row is converted, so unknown names and
//! bad parameters fail before any sampling begins.

use std::fmt;
use std::sync::Arc;

use rand::distr::{Distribution, Uniform};
use rand::rngs::SmallRng;
use rand::{Rng, RngCore, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ConfigError;

/// Draw count used when a family has no closed-form mean.
pub const SYNTHETIC_MEAN_SAMPLES: usize = 100_000;
/// Fixed seed for synthetic means, so mean-value runs are repeatable.
const SYNTHETIC_MEAN_SEED: u64 = 0x5EED_0F_3EA9;

/// Positional distribution parameters.
///
/// Numeric families read their arguments in order (`param_a`, `param_b`,
/// `param_c`). The `choice` family reads the whole vector as its candidate
/// values, whether they came from separate cells or a comma-separated string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DistributionParams(Vec<f64>);

impl DistributionParams {
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    /// Parse a comma-separated list of numbers, e.g. `"1, 2, 3"`.
    pub fn parse_list(value: &str) -> Result<Self, ConfigError> {
        value
            .split(',')
            .map(str::trim)
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| ConfigError::MalformedChoice {
                        value: value.to_string(),
                        token: token.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A sampling function with a fixed numeric-parameter signature.
///
/// Implementations must be pure apart from the supplied RNG.
pub trait DistributionFamily: Send + Sync {
    /// Check that `params` describe a valid member of this family.
    fn validate(&self, params: &DistributionParams) -> Result<(), ConfigError>;

    /// Draw `size` independent samples.
    fn sample(
        &self,
        params: &DistributionParams,
        rng: &mut dyn RngCore,
        size: usize,
    ) -> Result<Vec<f64>, ConfigError>;

    /// Closed-form mean, if the family has one.
    fn analytic_mean(&self, _params: &DistributionParams) -> Option<f64> {
        None
    }
}

/// The distribution families available out of the box.
///
/// Parameter order follows the usual `numpy.random` signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinDistribution {
    /// `(loc, scale)`
    Normal,
    /// `(low, high)`
    Uniform,
    /// `(left, mode, right)`
    Triangular,
    /// Candidate values, drawn with equal probability
    Choice,
    /// `(mean, sigma)` of the underlying normal
    LogNormal,
    /// `(scale)`
    Exponential,
    /// `(shape, scale)`
    Gamma,
    /// `(a, b)`
    Beta,
    /// `(lam)`
    Poisson,
}

impl BuiltinDistribution {
    pub const ALL: [BuiltinDistribution; 9] = [
        BuiltinDistribution::Normal,
        BuiltinDistribution::Uniform,
        BuiltinDistribution::Triangular,
        BuiltinDistribution::Choice,
        BuiltinDistribution::LogNormal,
        BuiltinDistribution::Exponential,
        BuiltinDistribution::Gamma,
        BuiltinDistribution::Beta,
        BuiltinDistribution::Poisson,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BuiltinDistribution::Normal => "normal",
            BuiltinDistribution::Uniform => "uniform",
            BuiltinDistribution::Triangular => "triangular",
            BuiltinDistribution::Choice => "choice",
            BuiltinDistribution::LogNormal => "lognormal",
            BuiltinDistribution::Exponential => "exponential",
            BuiltinDistribution::Gamma => "gamma",
            BuiltinDistribution::Beta => "beta",
            BuiltinDistribution::Poisson => "poisson",
        }
    }

    fn arity(self) -> usize {
        match self {
            BuiltinDistribution::Exponential | BuiltinDistribution::Poisson => 1,
            BuiltinDistribution::Triangular => 3,
            BuiltinDistribution::Choice => 1,
            _ => 2,
        }
    }

    fn invalid(self, params: &DistributionParams, reason: &'static str) -> ConfigError {
        ConfigError::InvalidDistributionParameters {
            distribution: self.name().to_string(),
            params: params.as_slice().to_vec(),
            reason,
        }
    }

    /// Leading `arity` parameters; `choice` takes all of them.
    fn args<'a>(self, params: &'a DistributionParams) -> Result<&'a [f64], ConfigError> {
        let p = params.as_slice();
        match self {
            BuiltinDistribution::Choice if p.is_empty() => {
                Err(self.invalid(params, "choice needs at least one candidate value"))
            }
            BuiltinDistribution::Choice => Ok(p),
            _ if p.len() < self.arity() => Err(self.invalid(params, "too few parameters")),
            _ => Ok(&p[..self.arity()]),
        }
    }

    fn draw(
        self,
        params: &DistributionParams,
        rng: &mut dyn RngCore,
        size: usize,
    ) -> Result<Vec<f64>, ConfigError> {
        let p = self.args(params)?;
        let samples: Vec<f64> = match self {
            BuiltinDistribution::Normal => {
                if p[1] < 0.0 {
                    return Err(self.invalid(params, "scale must be non-negative and finite"));
                }
                let d = rand_distr::Normal::new(p[0], p[1])
                    .map_err(|_| self.invalid(params, "scale must be non-negative and finite"))?;
                d.sample_iter(rng).take(size).collect()
            }
            BuiltinDistribution::Uniform => {
                if p[0] == p[1] {
                    vec![p[0]; size]
                } else {
                    let d = Uniform::new(p[0], p[1])
                        .map_err(|_| self.invalid(params, "low must be below high"))?;
                    d.sample_iter(rng).take(size).collect()
                }
            }
            BuiltinDistribution::Triangular => {
                let (left, mode, right) = (p[0], p[1], p[2]);
                if !(left <= mode && mode <= right) {
                    return Err(self.invalid(params, "expected left <= mode <= right"));
                }
                if left == right {
                    vec![left; size]
                } else {
                    let d = rand_distr::Triangular::new(left, right, mode)
                        .map_err(|_| self.invalid(params, "expected left <= mode <= right"))?;
                    d.sample_iter(rng).take(size).collect()
                }
            }
            BuiltinDistribution::Choice => (0..size)
                .map(|_| p[rng.random_range(0..p.len())])
                .collect(),
            BuiltinDistribution::LogNormal => {
                if p[1] < 0.0 {
                    return Err(self.invalid(params, "sigma must be non-negative and finite"));
                }
                let d = rand_distr::LogNormal::new(p[0], p[1])
                    .map_err(|_| self.invalid(params, "sigma must be non-negative and finite"))?;
                d.sample_iter(rng).take(size).collect()
            }
            BuiltinDistribution::Exponential => {
                if p[0] <= 0.0 {
                    return Err(self.invalid(params, "scale must be positive"));
                }
                let d = rand_distr::Exp::new(1.0 / p[0])
                    .map_err(|_| self.invalid(params, "scale must be positive"))?;
                d.sample_iter(rng).take(size).collect()
            }
            BuiltinDistribution::Gamma => {
                let d = rand_distr::Gamma::new(p[0], p[1])
                    .map_err(|_| self.invalid(params, "shape and scale must be positive"))?;
                d.sample_iter(rng).take(size).collect()
            }
            BuiltinDistribution::Beta => {
                let d = rand_distr::Beta::new(p[0], p[1])
                    .map_err(|_| self.invalid(params, "a and b must be positive"))?;
                d.sample_iter(rng).take(size).collect()
            }
            BuiltinDistribution::Poisson => {
                let d = rand_distr::Poisson::new(p[0])
                    .map_err(|_| self.invalid(params, "lam must be positive and finite"))?;
                d.sample_iter(rng).take(size).collect()
            }
        };
        Ok(samples)
    }
}

impl DistributionFamily for BuiltinDistribution {
    fn validate(&self, params: &DistributionParams) -> Result<(), ConfigError> {
        // Constructing the distribution performs all parameter checks.
        let mut rng = SmallRng::seed_from_u64(0);
        self.draw(params, &mut rng, 0).map(|_| ())
    }

    fn sample(
        &self,
        params: &DistributionParams,
        rng: &mut dyn RngCore,
        size: usize,
    ) -> Result<Vec<f64>, ConfigError> {
        self.draw(params, rng, size)
    }

    fn analytic_mean(&self, params: &DistributionParams) -> Option<f64> {
        let p = self.args(params).ok()?;
        match self {
            BuiltinDistribution::Normal => Some(p[0]),
            BuiltinDistribution::Uniform => Some((p[0] + p[1]) / 2.0),
            BuiltinDistribution::Triangular => Some((p[0] + p[1] + p[2]) / 3.0),
            BuiltinDistribution::Choice => Some(p.iter().sum::<f64>() / p.len() as f64),
            _ => None,
        }
    }
}

/// Maps distribution names to sampling families.
///
/// A row's module column is only checked against the accepted namespaces; the
/// distribution name alone selects the family.
#[derive(Clone)]
pub struct DistributionRegistry {
    families: FxHashMap<String, Arc<dyn DistributionFamily>>,
    namespaces: FxHashSet<String>,
}

impl fmt::Debug for DistributionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.families.keys().collect();
        names.sort();
        f.debug_struct("DistributionRegistry")
            .field("families", &names)
            .field("namespaces", &self.namespaces)
            .finish()
    }
}

impl Default for DistributionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for ns in ["numpy.random", "random", "rand_distr"] {
            registry.add_namespace(ns);
        }
        for builtin in BuiltinDistribution::ALL {
            registry.register(builtin.name(), Arc::new(builtin));
        }
        registry
    }
}

impl DistributionRegistry {
    /// Registry with every built-in family
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with no families and no namespaces
    #[must_use]
    pub fn empty() -> Self {
        Self {
            families: FxHashMap::default(),
            namespaces: FxHashSet::default(),
        }
    }

    /// Register (or replace) a family under `name`.
    pub fn register(&mut self, name: &str, family: Arc<dyn DistributionFamily>) {
        self.families.insert(name.to_string(), family);
    }

    pub fn add_namespace(&mut self, namespace: &str) {
        self.namespaces.insert(namespace.to_string());
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.families.contains_key(name)
    }

    /// Resolve a module/distribution pair and validate its parameters.
    pub fn resolve(
        &self,
        module: Option<&str>,
        distribution: &str,
        params: DistributionParams,
    ) -> Result<DistributionSpec, ConfigError> {
        let unknown = || ConfigError::UnknownDistribution {
            module: module.map(str::to_string),
            distribution: distribution.to_string(),
        };

        if let Some(module) = module
            && !self.namespaces.contains(module)
        {
            return Err(unknown());
        }
        let family = self.families.get(distribution).ok_or_else(unknown)?;
        family.validate(&params)?;

        Ok(DistributionSpec {
            name: distribution.to_string(),
            family: Arc::clone(family),
            params,
        })
    }
}

/// A resolved distribution: family plus validated parameters.
#[derive(Clone)]
pub struct DistributionSpec {
    name: String,
    family: Arc<dyn DistributionFamily>,
    params: DistributionParams,
}

impl fmt::Debug for DistributionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionSpec")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl DistributionSpec {
    /// Build a spec for a built-in family without going through a registry.
    pub fn builtin(
        builtin: BuiltinDistribution,
        params: DistributionParams,
    ) -> Result<Self, ConfigError> {
        builtin.validate(&params)?;
        Ok(Self {
            name: builtin.name().to_string(),
            family: Arc::new(builtin),
            params,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn params(&self) -> &DistributionParams {
        &self.params
    }

    /// Closed-form mean, or the average of a large seeded synthetic sample.
    pub fn mean(&self) -> Result<f64, ConfigError> {
        if let Some(mean) = self.family.analytic_mean(&self.params) {
            return Ok(mean);
        }
        let mut rng = SmallRng::seed_from_u64(SYNTHETIC_MEAN_SEED);
        let draws = self
            .family
            .sample(&self.params, &mut rng, SYNTHETIC_MEAN_SAMPLES)?;
        Ok(draws.iter().sum::<f64>() / draws.len() as f64)
    }

    fn sample(&self, rng: &mut dyn RngCore, size: usize) -> Result<Vec<f64>, ConfigError> {
        self.family.sample(&self.params, rng, size)
    }
}

/// Draws a configured number of samples from one distribution.
#[derive(Debug, Clone)]
pub struct DistributionSampler {
    spec: DistributionSpec,
    sample_size: usize,
    sample_mean_value: bool,
}

impl DistributionSampler {
    #[must_use]
    pub fn new(spec: DistributionSpec, sample_size: usize) -> Self {
        Self {
            spec,
            sample_size,
            sample_mean_value: false,
        }
    }

    /// Replace random draws by the distribution mean.
    #[must_use]
    pub fn with_mean_value(mut self, sample_mean_value: bool) -> Self {
        self.sample_mean_value = sample_mean_value;
        self
    }

    #[must_use]
    pub fn spec(&self) -> &DistributionSpec {
        &self.spec
    }

    #[must_use]
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    #[must_use]
    pub fn is_mean_value(&self) -> bool {
        self.sample_mean_value
    }

    /// Draw `size` values (default: the configured sample size).
    ///
    /// In mean-value mode every value is the distribution mean and the RNG is
    /// not touched.
    pub fn generate_values(
        &self,
        size: Option<usize>,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<f64>, ConfigError> {
        let size = size.unwrap_or(self.sample_size);
        if self.sample_mean_value {
            return Ok(vec![self.spec.mean()?; size]);
        }
        self.spec.sample(rng, size)
    }
}
