//! End-to-end diagnostics run: thin, reshape, hand tables to renderers,
//! compute ESS and R hat, and summarize the pooled draws.
use crate::acf::{autocorrelation, AutocorrelationTable};
use crate::error::{DiagnosticsError, Result};
use crate::ess::effective_sample_size;
use crate::render::Renderer;
use crate::rhat::{scale_reduction_with, Strategy, VarianceDecomposition, VarianceEstimator};
use crate::summary::DiagnosticsSummary;
use crate::table::{to_long_form_with, SampleTable, DEFAULT_PARAMETER};
use crate::utils::{check_chains, thin_chains};
use crate::Array2;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, info, warn};

/// R hat above this value is reported as a convergence warning.
pub const RHAT_WARNING_THRESHOLD: f64 = 1.1;

/// Options of a diagnostics run.  Every field has a default, so a TOML file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOptions {
    /// Keep every `thinning`-th draw of each chain.
    pub thinning: usize,
    /// Derive R hat through the detailed strategy, logging W and B.
    pub detailed: bool,
    /// Hand the first chain's autocorrelation table to the renderer.
    pub plot_autocorrelation: bool,
    /// Hand the long-form sample table to the renderer.
    pub plot_trace: bool,
    /// Exclusive upper bound on the lags of the autocorrelation table.
    pub max_lag: usize,
    /// Label of the diagnosed parameter in long-form tables.
    pub parameter: String,
    pub variance_estimator: VarianceEstimator,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        DiagnosticsOptions {
            thinning: 1,
            detailed: false,
            plot_autocorrelation: false,
            plot_trace: false,
            max_lag: 100,
            parameter: DEFAULT_PARAMETER.to_string(),
            variance_estimator: VarianceEstimator::default(),
        }
    }
}

impl DiagnosticsOptions {
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let options: DiagnosticsOptions = toml::from_str(text).context("parsing options")?;
        options.validate()?;
        Ok(options)
    }

    pub fn from_toml_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading options from {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.thinning == 0 {
            return Err(DiagnosticsError::InvalidThinning);
        }
        Ok(())
    }
}

/// Everything a diagnostics run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct DiagnosticsReport {
    pub summary: DiagnosticsSummary,
    pub variance: VarianceDecomposition,
    /// Autocorrelation of the first (thinned) chain.
    pub autocorrelation: AutocorrelationTable,
    /// Long-form table of the thinned draws.
    pub samples: SampleTable,
    pub num_chains: usize,
    /// Draws per chain after thinning.
    pub num_draws: usize,
}

/// Summarizes a chains × samples matrix after thinning it by `thinning`.
/// With `detailed`, R hat goes through the detailed strategy.
pub fn diagnose(
    chains: &[Vec<f64>],
    thinning: usize,
    detailed: bool,
) -> Result<DiagnosticsSummary> {
    let options = DiagnosticsOptions {
        thinning,
        detailed,
        ..DiagnosticsOptions::default()
    };
    run(chains, &options).map(|report| report.summary)
}

/// Runs diagnostics without any renderer; the display flags are ignored.
pub fn run(chains: &[Vec<f64>], options: &DiagnosticsOptions) -> Result<DiagnosticsReport> {
    execute(chains, options, None)
}

/// Runs diagnostics and hands the requested tables to `renderer`.
pub fn run_with_renderer(
    chains: &[Vec<f64>],
    options: &DiagnosticsOptions,
    renderer: &mut dyn Renderer,
) -> Result<DiagnosticsReport> {
    execute(chains, options, Some(renderer))
}

fn execute(
    chains: &[Vec<f64>],
    options: &DiagnosticsOptions,
    mut renderer: Option<&mut dyn Renderer>,
) -> Result<DiagnosticsReport> {
    options.validate()?;
    check_chains(chains, 2)?;

    let chains: Cow<'_, [Vec<f64>]> = if options.thinning > 1 {
        let thinned: Array2 = thin_chains(chains, options.thinning)?;
        Cow::Owned(thinned)
    } else {
        Cow::Borrowed(chains)
    };
    let num_chains = chains.len();
    let num_draws = chains[0].len();
    debug!(num_chains, num_draws, thinning = options.thinning, "prepared chains");

    let samples = to_long_form_with(&chains, &options.parameter)?;
    let max_lag = options.max_lag.min(num_draws - 1);
    let acf = autocorrelation(&chains[0], max_lag)?;

    if let Some(renderer) = renderer.as_mut() {
        if options.plot_autocorrelation {
            let frame = acf.to_frame();
            frame.require(&AutocorrelationTable::FIELDS)?;
            renderer.autocorrelation(&frame)?;
        }
        if options.plot_trace {
            let frame = samples.to_frame();
            frame.require(&SampleTable::FIELDS)?;
            renderer.trace(&frame)?;
        }
    }

    let ess = effective_sample_size(&chains)?;
    info!(
        "The effective sample size across our {} chains is {}",
        num_chains,
        ess.round()
    );

    let variance = scale_reduction_with(
        &chains,
        Strategy::from_detailed(options.detailed),
        options.variance_estimator,
    )?;
    let r = variance.scale_reduction_factor;
    info!("The average scale reduction (R) is {:.2}", r);
    if r > RHAT_WARNING_THRESHOLD {
        warn!(
            r_hat = r,
            threshold = RHAT_WARNING_THRESHOLD,
            "chains may not have converged"
        );
    }

    let summary = DiagnosticsSummary::from_draws(&chains, ess, r)?;
    Ok(DiagnosticsReport {
        summary,
        variance,
        autocorrelation: acf,
        samples,
        num_chains,
        num_draws,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::table::Frame;

    #[derive(Default)]
    struct Recorder {
        autocorrelation: Vec<Frame>,
        trace: Vec<Frame>,
    }

    impl Renderer for Recorder {
        fn autocorrelation(&mut self, table: &Frame) -> Result<()> {
            self.autocorrelation.push(table.clone());
            Ok(())
        }

        fn trace(&mut self, samples: &Frame) -> Result<()> {
            self.trace.push(samples.clone());
            Ok(())
        }
    }

    struct Failing;

    impl Renderer for Failing {
        fn autocorrelation(&mut self, _: &Frame) -> Result<()> {
            Err(DiagnosticsError::Render {
                target: "autocorrelation",
                message: "no display".to_string(),
            })
        }

        fn trace(&mut self, _: &Frame) -> Result<()> {
            Ok(())
        }
    }

    fn sawtooth(num_chains: usize, n: usize) -> Array2 {
        (0..num_chains)
            .map(|c| (0..n).map(|i| ((i * 7 + c * 3) % 11) as f64 / 10.0).collect())
            .collect()
    }

    #[test]
    fn test_report_contents() {
        let chains = sawtooth(3, 40);
        let options = DiagnosticsOptions {
            max_lag: 10,
            ..DiagnosticsOptions::default()
        };
        let report = run(&chains, &options).unwrap();
        assert_eq!(report.num_chains, 3);
        assert_eq!(report.num_draws, 40);
        assert_eq!(report.samples.len(), 120);
        assert_eq!(report.autocorrelation.len(), 10);
        assert_eq!(
            report.summary.scale_reduction_factor,
            report.variance.scale_reduction_factor
        );
        assert!(report.summary.effective_sample_size <= 120.0);
    }

    #[test]
    fn test_renderer_flags() {
        let chains = sawtooth(2, 30);
        let mut recorder = Recorder::default();
        run_with_renderer(&chains, &DiagnosticsOptions::default(), &mut recorder).unwrap();
        assert!(recorder.autocorrelation.is_empty());
        assert!(recorder.trace.is_empty());

        let options = DiagnosticsOptions {
            plot_autocorrelation: true,
            plot_trace: true,
            parameter: "theta".to_string(),
            ..DiagnosticsOptions::default()
        };
        run_with_renderer(&chains, &options, &mut recorder).unwrap();
        assert_eq!(recorder.autocorrelation.len(), 1);
        // max lag clamped to the chain length
        assert_eq!(recorder.autocorrelation[0].n_rows(), 29);
        let samples = SampleTable::try_from_frame(&recorder.trace[0]).unwrap();
        assert_eq!(samples.len(), 60);
        assert!(samples.records.iter().all(|r| r.parameter == "theta"));
    }

    #[test]
    fn test_renderer_failure_aborts() {
        let chains = sawtooth(2, 30);
        let options = DiagnosticsOptions {
            plot_autocorrelation: true,
            ..DiagnosticsOptions::default()
        };
        let err = run_with_renderer(&chains, &options, &mut Failing).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Collaborator);
    }

    #[test]
    fn test_thinning() {
        let chains = sawtooth(2, 31);
        let thinned = diagnose(&chains, 3, false).unwrap();
        let pre_thinned: Array2 = chains
            .iter()
            .map(|c| c.iter().step_by(3).take(10).copied().collect())
            .collect();
        assert_eq!(thinned, diagnose(&pre_thinned, 1, false).unwrap());

        let report = run(
            &chains,
            &DiagnosticsOptions {
                thinning: 3,
                ..DiagnosticsOptions::default()
            },
        )
        .unwrap();
        assert_eq!(report.num_draws, 10);

        let err = diagnose(&chains, 16, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientData);
        assert_eq!(diagnose(&chains, 0, false), Err(DiagnosticsError::InvalidThinning));
    }

    #[test]
    fn test_failures_propagate() {
        let ragged = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0]];
        assert_eq!(diagnose(&ragged, 1, false).unwrap_err().kind(), ErrorKind::Shape);

        let constant = vec![vec![7.0; 20], vec![7.0; 20]];
        assert_eq!(
            diagnose(&constant, 1, true).unwrap_err().kind(),
            ErrorKind::DegenerateVariance
        );
    }

    #[test]
    fn test_options_from_toml() {
        let options = DiagnosticsOptions::from_toml_str(
            "thinning = 2\ndetailed = true\nvariance_estimator = \"unscaled\"\n",
        )
        .unwrap();
        assert_eq!(options.thinning, 2);
        assert!(options.detailed);
        assert_eq!(options.variance_estimator, VarianceEstimator::Unscaled);
        assert_eq!(options.max_lag, 100);
        assert_eq!(options.parameter, DEFAULT_PARAMETER);

        assert_eq!(
            DiagnosticsOptions::from_toml_str("").unwrap(),
            DiagnosticsOptions::default()
        );
        assert!(DiagnosticsOptions::from_toml_str("thinning = 0").is_err());
        assert!(DiagnosticsOptions::from_toml_str("thinning = \"two\"").is_err());
    }
}
