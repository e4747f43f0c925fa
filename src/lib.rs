//! Convergence and mixing diagnostics for the output of an MCMC sampler:
//! lag autocorrelation, effective sample size, the Gelman Rubin potential
//! scale reduction factor (R hat) and summary statistics of the pooled
//! draws.
//!
//! All functions take a chains × samples matrix for a single scalar
//! parameter and are pure: no state is kept between calls.  The crate is
//! sampler agnostic and works with the draws of any MCMC implementation.
//!
//! ```no_run
//! let chains = vec![vec![0.1, -0.3, 0.2, 0.5], vec![0.0, 0.4, -0.2, 0.1]];
//! let summary = mcmc_diag::diagnose(&chains, 1, false).unwrap();
//! println!("{}", summary);
//! ```
#[macro_use]
extern crate approx;

/// Lag autocorrelation and autocovariance of a single chain
pub mod acf;
/// Orchestration of a full diagnostics run and its options
pub mod diagnostics;
/// Error type shared by every diagnostic
pub mod error;
/// Effective Sample Size (ESS)
pub mod ess;
/// Hand-off of tables to plotting collaborators and CSV export
pub mod render;
/// Gelman-Rubin potential scale reduction (Rhat)
pub mod rhat;
/// Summary statistics of the pooled draws
pub mod summary;
/// Long-form sample tables and the column-oriented `Frame`
pub mod table;
/// Convenience utilities like chain validation, thinning, chain splitting
/// and the summary statistics used by the other modules (mean, variance,
/// percentiles, mode), plus lightweight CSV reading
pub mod utils;

pub use acf::{autocorrelation, AutocorrelationPoint, AutocorrelationTable};
pub use diagnostics::{diagnose, run, run_with_renderer, DiagnosticsOptions, DiagnosticsReport};
pub use error::{DiagnosticsError, ErrorKind, Result};
pub use ess::effective_sample_size;
pub use render::{CsvRenderer, Renderer};
pub use rhat::{scale_reduction, VarianceDecomposition, VarianceEstimator};
pub use summary::DiagnosticsSummary;
pub use table::{to_long_form, Frame, SampleRecord, SampleTable};

/// One-dimensional vector of numeric values
pub type Array1 = Vec<f64>;
/// Two dimensional vector of vectors of numeric values
pub type Array2 = Vec<Array1>;
