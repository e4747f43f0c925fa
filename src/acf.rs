use crate::error::{DiagnosticsError, Result};
use crate::table::{Column, Frame};
use crate::Array1;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

/// Autocorrelation of a chain at one lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutocorrelationPoint {
    pub lag: usize,
    pub autocorrelation: f64,
}

/// Autocorrelation by increasing lag, starting at lag 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AutocorrelationTable {
    pub points: Vec<AutocorrelationPoint>,
}

impl AutocorrelationTable {
    pub const FIELDS: [&'static str; 2] = ["lag", "autocorrelation"];

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, lag: usize) -> Option<f64> {
        self.points.get(lag).map(|p| p.autocorrelation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AutocorrelationPoint> {
        self.points.iter()
    }

    pub fn to_frame(&self) -> Frame {
        Frame::from_columns(vec![
            (
                "lag".to_string(),
                Column::Index(self.points.iter().map(|p| p.lag).collect()),
            ),
            (
                "autocorrelation".to_string(),
                Column::Float(self.points.iter().map(|p| p.autocorrelation).collect()),
            ),
        ])
    }
}

/// Returns the autocorrelation of `sequence` for lags `0..max_lag`.
///
/// Lag 0 is 1 by definition.  Every other lag `k` is the Pearson
/// correlation between `sequence[..n - k]` and `sequence[k..]`, each window
/// centered on its own mean.  A window with zero variance gives `NaN` for
/// that lag only.
///
/// # Arguments
/// * `sequence` - draws of one chain, in sampling order
/// * `max_lag` - exclusive upper bound on the lag; `sequence` must be
///               longer than this
pub fn autocorrelation(sequence: &[f64], max_lag: usize) -> Result<AutocorrelationTable> {
    let n = sequence.len();
    if n <= max_lag {
        return Err(DiagnosticsError::InsufficientLag { len: n, max_lag });
    }
    let mut points = Vec::with_capacity(max_lag.max(1));
    points.push(AutocorrelationPoint {
        lag: 0,
        autocorrelation: 1.0,
    });
    for lag in 1..max_lag {
        points.push(AutocorrelationPoint {
            lag,
            autocorrelation: pearson(&sequence[..n - lag], &sequence[lag..]),
        });
    }
    Ok(AutocorrelationTable { points })
}

/// Pearson correlation of two equal-length slices, `NaN` when either one
/// is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        let dx = a - mx;
        let dy = b - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Chains up to this length get their autocovariance by direct summation,
/// longer ones through an FFT.
const DIRECT_MAX_LEN: usize = 100;

/// Biased (1/n) autocovariance of `sequence` around its overall mean, for
/// lags `0..=max_lag`.
pub fn autocovariance(sequence: &[f64], max_lag: usize) -> Result<Array1> {
    let n = sequence.len();
    if n <= max_lag {
        return Err(DiagnosticsError::InsufficientLag { len: n, max_lag });
    }
    let mut acov = full_autocovariance(sequence);
    acov.truncate(max_lag + 1);
    Ok(acov)
}

/// Biased autocovariance at every lag `0..n` of a non-empty sequence.
pub(crate) fn full_autocovariance(sequence: &[f64]) -> Array1 {
    let n = sequence.len() as f64;
    let mean = sequence.iter().sum::<f64>() / n;
    let centered: Array1 = sequence.iter().map(|x| x - mean).collect();
    if centered.len() <= DIRECT_MAX_LEN {
        direct_autocovariance(&centered)
    } else {
        fft_autocovariance(&centered)
    }
}

fn direct_autocovariance(centered: &[f64]) -> Array1 {
    let n = centered.len() as f64;
    (0..centered.len())
        .map(|lag| {
            centered
                .iter()
                .zip(&centered[lag..])
                .map(|(a, b)| a * b)
                .sum::<f64>()
                / n
        })
        .collect()
}

/// Wiener-Khinchin: inverse transform of the power spectrum.  Zero padding
/// to at least `2n - 1` points keeps the circular correlation from wrapping
/// around.
fn fft_autocovariance(centered: &[f64]) -> Array1 {
    let n = centered.len();
    let padded = (2 * n - 1).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(padded);
    let inverse = planner.plan_fft_inverse(padded);

    let mut buffer: Vec<Complex<f64>> = centered
        .iter()
        .map(|&x| Complex::new(x, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(padded)
        .collect();
    forward.process(&mut buffer);
    for x in buffer.iter_mut() {
        *x = Complex::new(x.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);
    // rustfft leaves the inverse unnormalized
    let scale = (padded * n) as f64;
    buffer.iter().take(n).map(|x| x.re / scale).collect()
}
