use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use color_eyre::eyre::{WrapErr, eyre};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose events pass the default filter
const LOG_TARGETS: [&str; 2] = ["paramrepo", "paramrepo_core"];

/// Default filter directives for `level`, e.g. `paramrepo=warn,paramrepo_core=warn`.
pub fn filter_directives(level: &str) -> color_eyre::Result<String> {
    let level: LevelFilter = level
        .trim()
        .parse()
        .map_err(|_| eyre!("unknown log level '{level}'"))?;
    let level = level.to_string().to_lowercase();
    Ok(LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(","))
}

/// Open `path` for appending, creating it and its directory if needed.
pub fn open_log_file(path: &Path) -> io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global `tracing` subscriber.
///
/// Events go to stderr, or are appended to `log_file` without ANSI colors.
/// `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, log_file: Option<&Path>) -> color_eyre::Result<()> {
    let directives = filter_directives(level)?;
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directives));

    let file_layer = match log_file {
        Some(path) => {
            let file = open_log_file(path)
                .wrap_err_with(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };
    let stderr_layer = file_layer
        .is_none()
        .then(|| fmt::layer().with_writer(io::stderr).with_target(false));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::debug!(log_file = ?log_file, "logging initialized");
    Ok(())
}
