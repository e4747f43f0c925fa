use crate::error::Result;
use crate::table::{Column, Frame};
use crate::utils::{flatten, mean, mode_rounded, percentile_sorted, population_std_dev};
use serde::Serialize;
use std::fmt;

/// Decimal places draws are rounded to before taking the mode.
pub const MODE_DECIMALS: i32 = 3;

/// Pooled summary of one diagnostics run.  Fields serialize under the
/// column names of the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticsSummary {
    #[serde(rename = "mean_parameter")]
    pub mean: f64,
    #[serde(rename = "mode_parameter")]
    pub mode: f64,
    /// Population standard deviation of all draws.
    #[serde(rename = "std_dev_parameter")]
    pub std_dev: f64,
    #[serde(rename = "5_percentile")]
    pub percentile_5: f64,
    #[serde(rename = "95_percentile")]
    pub percentile_95: f64,
    #[serde(rename = "n_eff")]
    pub effective_sample_size: f64,
    #[serde(rename = "R")]
    pub scale_reduction_factor: f64,
}

impl DiagnosticsSummary {
    pub const FIELDS: [&'static str; 7] = [
        "mean_parameter",
        "mode_parameter",
        "std_dev_parameter",
        "5_percentile",
        "95_percentile",
        "n_eff",
        "R",
    ];

    /// Pools all draws of `chains` and combines their summary statistics
    /// with already computed ESS and R hat.
    ///
    /// Mean, standard deviation and percentiles use the draws at full
    /// precision; only the mode rounds them to [`MODE_DECIMALS`] decimals.
    /// Tools that round every draw first will differ in the last reported
    /// digits.
    pub fn from_draws(
        chains: &[Vec<f64>],
        effective_sample_size: f64,
        scale_reduction_factor: f64,
    ) -> Result<Self> {
        let mut draws = flatten(chains);
        let mean = mean(&draws)?;
        let mode = mode_rounded(&draws, MODE_DECIMALS)?;
        let std_dev = population_std_dev(&draws)?;
        draws.sort_unstable_by(|a, b| a.total_cmp(b));
        Ok(DiagnosticsSummary {
            mean,
            mode,
            std_dev,
            percentile_5: percentile_sorted(&draws, 5.0),
            percentile_95: percentile_sorted(&draws, 95.0),
            effective_sample_size,
            scale_reduction_factor,
        })
    }

    fn values(&self) -> [f64; 7] {
        [
            self.mean,
            self.mode,
            self.std_dev,
            self.percentile_5,
            self.percentile_95,
            self.effective_sample_size,
            self.scale_reduction_factor,
        ]
    }

    /// Single-row table, full precision.
    pub fn to_frame(&self) -> Frame {
        Frame::from_columns(
            Self::FIELDS
                .iter()
                .zip(self.values().iter())
                .map(|(name, v)| (name.to_string(), Column::Float(vec![*v])))
                .collect(),
        )
    }
}

/// Prints the one-row table with n_eff rounded up and R to two decimals.
impl fmt::Display for DiagnosticsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells = [
            format!("{:.4}", self.mean),
            format!("{:.3}", self.mode),
            format!("{:.4}", self.std_dev),
            format!("{:.4}", self.percentile_5),
            format!("{:.4}", self.percentile_95),
            format!("{}", self.effective_sample_size.ceil()),
            format!("{:.2}", self.scale_reduction_factor),
        ];
        let frame = Frame::from_columns(
            Self::FIELDS
                .iter()
                .zip(cells.iter())
                .map(|(name, c)| (name.to_string(), Column::Text(vec![c.clone()])))
                .collect(),
        );
        write!(f, "{}", frame)
    }
}
