use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use jiff::civil::Date;
use paramrepo::{ParameterSummary, init_logging, load_rows_file, select_names};
use paramrepo_core::{DistributionRegistry, ParameterRepository, RunSettings, TimeAxis};
use rand::SeedableRng;
use rand::rngs::SmallRng;

#[derive(Parser, Debug)]
#[command(name = "paramrepo")]
#[command(about = "Sample scenario-aware model parameters from a row file")]
struct Args {
    /// YAML or JSON file with one row per parameter
    #[arg(short, long)]
    rows: PathBuf,

    /// Scenario to resolve parameters for
    #[arg(short, long, default_value = "default")]
    scenario: String,

    /// Samples per parameter (per month with a time axis)
    #[arg(short = 'n', long, default_value_t = 1)]
    size: usize,

    /// First month of the time axis (YYYY-MM-01)
    #[arg(long, requires = "end")]
    start: Option<Date>,

    /// Last month of the time axis (YYYY-MM-01)
    #[arg(long, requires = "start")]
    end: Option<Date>,

    /// Use distribution means instead of random draws
    #[arg(long)]
    mean: bool,

    /// Seed for reproducible draws
    #[arg(long)]
    seed: Option<u64>,

    /// Only sample parameters carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Print summaries as JSON
    #[arg(long)]
    json: bool,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Append logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Parameters to sample (default: all, or all with --tag)
    names: Vec<String>,
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let rows = load_rows_file(&args.rows)?;
    let mut repo = ParameterRepository::new();
    repo.load_rows(rows, &DistributionRegistry::new())
        .wrap_err_with(|| format!("failed to load {}", args.rows.display()))?;

    let mut settings = RunSettings::new(args.size).with_mean_value(args.mean);
    if let (Some(start), Some(end)) = (args.start, args.end) {
        settings = settings.with_time_axis(TimeAxis::monthly(start, end)?);
    }

    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let scenario = Some(args.scenario.as_str());
    let mut summaries = Vec::new();
    for name in select_names(&repo, args.tag.as_deref(), &args.names) {
        let parameter = repo.get_parameter(&name, scenario)?;
        let value = parameter
            .call(&settings, &mut rng, repo.diagnostics())
            .wrap_err_with(|| format!("failed to sample '{name}'"))?;
        summaries.push(ParameterSummary::new(&parameter, &value));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
    } else {
        for summary in &summaries {
            println!("{summary}");
        }
    }

    tracing::info!(parameters = summaries.len(), "done");
    Ok(())
}
