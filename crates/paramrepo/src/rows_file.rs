//! Reading normalized parameter rows from YAML or JSON files.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{WrapErr, eyre};
use paramrepo_core::ParameterRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFormat {
    Yaml,
    Json,
}

impl RowFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> color_eyre::Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Ok(RowFormat::Yaml),
            Some("json") => Ok(RowFormat::Json),
            _ => Err(eyre!(
                "cannot tell the row format of {}; expected .yaml, .yml or .json",
                path.display()
            )),
        }
    }
}

/// Parse a list of rows.
pub fn parse_rows(content: &str, format: RowFormat) -> color_eyre::Result<Vec<ParameterRow>> {
    let rows = match format {
        RowFormat::Yaml => serde_saphyr::from_str(content).wrap_err("invalid YAML rows")?,
        RowFormat::Json => serde_json::from_str(content).wrap_err("invalid JSON rows")?,
    };
    Ok(rows)
}

/// Read and parse a row file.
pub fn load_rows_file(path: &Path) -> color_eyre::Result<Vec<ParameterRow>> {
    let format = RowFormat::from_path(path)?;
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    let rows = parse_rows(&content, format)
        .wrap_err_with(|| format!("failed to parse {}", path.display()))?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "read row file");
    Ok(rows)
}
