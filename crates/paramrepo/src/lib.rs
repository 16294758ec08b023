//! Command-line front-end for the parameter repository
//!
//! Reads normalized parameter rows from a YAML or JSON file, loads them into a
//! [`paramrepo_core::ParameterRepository`] and prints sampling summaries.

pub mod logging;
pub mod report;
pub mod rows_file;

pub use logging::init_logging;
pub use report::{ParameterSummary, select_names};
pub use rows_file::{RowFormat, load_rows_file, parse_rows};
