use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mcmc_diag::diagnostics::{run, run_with_renderer, DiagnosticsOptions};
use mcmc_diag::render::{write_csv, CsvRenderer};
use mcmc_diag::utils::read_csv;
use mcmc_diag::VarianceEstimator;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Table,
    Json,
    Csv,
}

/// Convergence diagnostics (ESS, R hat, pooled summary) for MCMC chains.
#[derive(Parser, Debug)]
#[command(name = "mcmc-diag", author, version, about)]
struct Args {
    /// CSV file of draws, one column per chain
    #[arg(value_name = "CHAINS_CSV")]
    input: PathBuf,

    /// Leading lines of the CSV to skip (headers)
    #[arg(long, default_value_t = 0)]
    skip_rows: usize,

    /// Options file (TOML); flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep every N-th draw of each chain
    #[arg(long)]
    thin: Option<usize>,

    /// Report W and B while computing R hat
    #[arg(long)]
    detailed: bool,

    /// Use V = W + B/n instead of the chain length corrected estimate
    #[arg(long)]
    unscaled: bool,

    /// Maximum lag of the autocorrelation table
    #[arg(long)]
    max_lag: Option<usize>,

    /// Parameter label in exported tables
    #[arg(long)]
    parameter: Option<String>,

    /// Directory to export autocorrelation.csv and samples.csv into
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    /// Output format of the summary
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,
}

impl Args {
    fn options(&self) -> Result<DiagnosticsOptions> {
        let mut options = match &self.config {
            Some(path) => DiagnosticsOptions::from_toml_file(path)?,
            None => DiagnosticsOptions::default(),
        };
        if let Some(thin) = self.thin {
            options.thinning = thin;
        }
        if self.detailed {
            options.detailed = true;
        }
        if self.unscaled {
            options.variance_estimator = VarianceEstimator::Unscaled;
        }
        if let Some(max_lag) = self.max_lag {
            options.max_lag = max_lag;
        }
        if let Some(parameter) = &self.parameter {
            options.parameter = parameter.clone();
        }
        if self.export.is_some() {
            options.plot_autocorrelation = true;
            options.plot_trace = true;
        }
        options.validate()?;
        Ok(options)
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let options = args.options()?;
    let chains = read_csv(&args.input, args.skip_rows)?;

    let report = match &args.export {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            let mut renderer = CsvRenderer::new(dir);
            run_with_renderer(&chains, &options, &mut renderer)?
        }
        None => run(&chains, &options)?,
    };

    match args.format {
        Format::Table => print!("{}", report.summary),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report.summary)?),
        Format::Csv => write_csv(&report.summary.to_frame(), std::io::stdout())?,
    }
    Ok(())
}
