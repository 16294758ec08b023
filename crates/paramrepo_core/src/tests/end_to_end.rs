//! Tests for loading rows and sampling parameters through the repository
//!
//! These tests verify that:
//! - A uniform row samples inside its bounds and averages exactly in mean mode
//! - Parameters memoize across calls and resample after `clear_cache`
//! - Bad rows abort the load without registering anything

use std::rc::Rc;

use rand::SeedableRng;
use rand::rngs::SmallRng;

use super::load;
use crate::distribution::DistributionRegistry;
use crate::error::{ConfigError, RepositoryError};
use crate::repository::ParameterRepository;
use crate::rows::ParameterRow;
use crate::settings::RunSettings;

const UNIFORM_B: &str = r#"[
    {"name": "b", "module": "numpy.random", "distribution": "uniform", "param_a": 2, "param_b": 4}
]"#;

#[test]
fn test_uniform_single_draw_in_bounds() {
    let repo = load(UNIFORM_B);
    let mut rng = SmallRng::seed_from_u64(42);

    let value = repo.sample("b", None, &RunSettings::new(1), &mut rng).unwrap();

    assert_eq!(value.len(), 1);
    assert!((2.0..=4.0).contains(&value.values()[0]));
}

#[test]
fn test_uniform_mean_value_is_exact() {
    let repo = load(UNIFORM_B);
    let mut rng = SmallRng::seed_from_u64(42);

    let value = repo
        .sample("b", None, &RunSettings::new(1).with_mean_value(true), &mut rng)
        .unwrap();

    assert_eq!(value.values(), &[3.0]);
}

#[test]
fn test_second_call_ignores_new_settings() {
    let repo = load(UNIFORM_B);
    let mut rng = SmallRng::seed_from_u64(1);

    let first = repo.sample("b", None, &RunSettings::new(3), &mut rng).unwrap();
    let second = repo
        .sample("b", Some("other"), &RunSettings::new(100).with_mean_value(true), &mut rng)
        .unwrap();

    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(second.len(), 3);
}

#[test]
fn test_clear_cache_forces_resampling() {
    let repo = load(UNIFORM_B);
    let mut rng = SmallRng::seed_from_u64(1);

    let first = repo.sample("b", None, &RunSettings::new(3), &mut rng).unwrap();
    repo.clear_cache();
    let second = repo
        .sample("b", None, &RunSettings::new(2).with_mean_value(true), &mut rng)
        .unwrap();

    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(second.values(), &[3.0, 3.0]);
}

#[test]
fn test_same_seed_same_draws() {
    let draw = |seed| {
        let repo = load(UNIFORM_B);
        let mut rng = SmallRng::seed_from_u64(seed);
        repo.sample("b", None, &RunSettings::new(10), &mut rng)
            .unwrap()
            .values()
            .to_vec()
    };
    assert_eq!(draw(7), draw(7));
}

#[test]
fn test_bad_row_aborts_load() {
    let rows: Vec<ParameterRow> = serde_json::from_str(
        r#"[
            {"name": "a", "distribution": "normal", "param_a": 0, "param_b": 1},
            {"name": "b", "distribution": "zipf", "param_a": 2}
        ]"#,
    )
    .unwrap();
    let mut repo = ParameterRepository::new();

    let err = repo.load_rows(rows, &DistributionRegistry::new()).unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Config(ConfigError::UnknownDistribution { .. })
    ));
    assert!(repo.is_empty());
}

#[test]
fn test_unknown_name_is_lookup_error() {
    let repo = load(UNIFORM_B);
    let mut rng = SmallRng::seed_from_u64(1);

    let err = repo
        .sample("missing", Some("s1"), &RunSettings::default(), &mut rng)
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "parameter 'missing' not found for scenario 's1' or the default scenario"
    );
}

#[test]
fn test_usage_recorded_on_shared_instance() {
    let repo = load(UNIFORM_B);
    let p = repo.get_parameter("b", None).unwrap();
    p.add_usage("cooling", "b_in");

    let again = repo.get_parameter("b", Some("s9")).unwrap();
    assert_eq!(again.usage()["cooling"], vec!["b_in"]);
}
