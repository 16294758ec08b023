//! Integration tests for the parameter repository
//!
//! Tests are organized by topic:
//! - `end_to_end` - Rows loaded into a repository and sampled
//! - `scenarios` - Scenario fallback, default inheritance and tag indexing
//! - `growth_series` - Time-series sampling through the repository

mod end_to_end;
mod growth_series;

use crate::distribution::DistributionRegistry;
use crate::repository::ParameterRepository;
use crate::rows::ParameterRow;

/// Parse a JSON array of rows and load them into a fresh repository.
fn load(json: &str) -> ParameterRepository {
    let rows: Vec<ParameterRow> = serde_json::from_str(json).unwrap();
    let mut repo = ParameterRepository::new();
    repo.load_rows(rows, &DistributionRegistry::new()).unwrap();
    repo
}
