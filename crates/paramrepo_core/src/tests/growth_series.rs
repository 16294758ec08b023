//! Tests for time-series sampling through the repository
//!
//! These tests verify that:
//! - Growth rows produce one value per (month, replicate)
//! - CAGR scaling is anchored at the reference month
//! - Out-of-range reference dates and negative values are reported, not fatal

use std::rc::Rc;

use jiff::civil::date;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::diagnostics::{CollectingDiagnostics, WarningKind};
use crate::distribution::DistributionRegistry;
use crate::repository::ParameterRepository;
use crate::rows::ParameterRow;
use crate::settings::{RunSettings, TimeAxis};

fn load_with_sink(json: &str) -> (ParameterRepository, Rc<CollectingDiagnostics>) {
    let rows: Vec<ParameterRow> = serde_json::from_str(json).unwrap();
    let sink = Rc::new(CollectingDiagnostics::new());
    let mut repo = ParameterRepository::with_diagnostics(sink.clone());
    repo.load_rows(rows, &DistributionRegistry::new()).unwrap();
    (repo, sink)
}

fn settings(replicates: usize, start: (i16, i8), end: (i16, i8)) -> RunSettings {
    let axis = TimeAxis::monthly(date(start.0, start.1, 1), date(end.0, end.1, 1)).unwrap();
    RunSettings::new(replicates).with_time_axis(axis)
}

#[test]
fn test_cagr_row_as_series() {
    let (repo, sink) = load_with_sink(
        r#"[{"name": "demand", "distribution": "choice", "param_a": 100,
             "CAGR": 0.1, "ref date": "2009-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(3);

    let value = repo
        .sample("demand", None, &settings(5, (2009, 1), (2010, 1)), &mut rng)
        .unwrap();
    let series = value.as_series().unwrap();

    assert_eq!(series.times().len(), 13);
    assert_eq!(series.len(), 65);
    assert_eq!(series.month(date(2009, 1, 1)).unwrap(), &[100.0; 5]);
    let last = series.get(date(2010, 1, 1), 4).unwrap();
    assert!((last - 110.0).abs() < 1e-9);
    assert!(sink.is_empty());
}

#[test]
fn test_growth_row_without_time_axis_is_flat() {
    let (repo, _) = load_with_sink(
        r#"[{"name": "demand", "distribution": "choice", "param_a": 100,
             "CAGR": 0.1, "ref date": "2009-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(3);

    let value = repo
        .sample("demand", None, &RunSettings::new(4), &mut rng)
        .unwrap();

    assert!(value.as_series().is_none());
    assert_eq!(value.values(), &[100.0; 4]);
}

#[test]
fn test_ref_date_after_axis_reported() {
    let (repo, sink) = load_with_sink(
        r#"[{"name": "price", "scenario": "s1", "distribution": "choice", "param_a": 1,
             "CAGR": 0.05, "ref date": "2020-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(4);
    sink.take();

    let value = repo
        .sample("price", Some("s1"), &settings(1, (2019, 1), (2019, 12)), &mut rng)
        .unwrap();

    let series = value.as_series().unwrap();
    let first = series.at(0, 0).unwrap();
    assert!((first - 0.95).abs() < 1e-9);

    let diagnostics = sink.take();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].parameter, "price");
    assert_eq!(diagnostics[0].scenario.as_deref(), Some("s1"));
    assert!(matches!(
        diagnostics[0].kind,
        WarningKind::RefDateOutOfBounds { ref_date, .. } if ref_date == date(2020, 1, 1)
    ));
}

#[test]
fn test_negative_series_flagged_with_first_month() {
    let (repo, sink) = load_with_sink(
        r#"[{"name": "balance", "ref value": 1, "initial_value_proportional_variation": 0,
             "mean growth": "{\"2009-01-01\": 1, \"2009-03-01\": -1}", "ref date": "2009-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(5);

    let value = repo
        .sample("balance", None, &settings(2, (2009, 1), (2009, 4)), &mut rng)
        .unwrap();

    let series = value.as_series().unwrap();
    assert_eq!(series.mean_by_month(), vec![1.0, 0.0, -1.0, -1.0]);
    let diagnostics = sink.take();
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics[0].kind,
        WarningKind::NegativeValues { month, sample: 0, value }
            if month == date(2009, 3, 1) && value == -1.0
    ));
}

#[test]
fn test_mean_variability_mean_mode() {
    let (repo, _) = load_with_sink(
        r#"[{"name": "load", "ref value": 200, "mean growth": 0.1,
             "initial_value_proportional_variation": 0.2, "variability growth": 0.05,
             "ref date": "2010-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(6);
    let settings = settings(3, (2010, 1), (2011, 1)).with_mean_value(true);

    let value = repo.sample("load", None, &settings, &mut rng).unwrap();
    let series = value.as_series().unwrap();

    assert_eq!(series.month(date(2010, 1, 1)).unwrap(), &[200.0; 3]);
    let end = series.get(date(2011, 1, 1), 0).unwrap();
    assert!((end - 220.0).abs() < 1e-9);
}

#[test]
fn test_mean_variability_noise_stays_in_band() {
    let (repo, _) = load_with_sink(
        r#"[{"name": "load", "ref value": 200, "initial_value_proportional_variation": 0.2,
             "ref date": "2010-01-01"}]"#,
    );
    let mut rng = SmallRng::seed_from_u64(7);

    let value = repo
        .sample("load", None, &settings(20, (2010, 1), (2010, 12)), &mut rng)
        .unwrap();

    assert!(value.values().iter().all(|v| (160.0..=240.0).contains(v)));
}
