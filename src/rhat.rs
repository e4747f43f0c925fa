use crate::error::{DiagnosticsError, Result};
use crate::utils::{check_chains, mean, sample_variance, split_chains};
use crate::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How the marginal posterior variance V is estimated from W and B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VarianceEstimator {
    /// V = W (n - 1) / n + B / n, the classical Gelman-Rubin estimate.
    ChainLengthCorrected,
    /// V = W + B / n.  Skips the chain length correction, so R hat is
    /// slightly larger than the classical value for short chains.
    Unscaled,
}

impl Default for VarianceEstimator {
    fn default() -> Self {
        Self::ChainLengthCorrected
    }
}

/// How R hat is derived from the variance components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Closed form on the ratio B / W.
    Pooled,
    /// Builds V explicitly and reports W and B along the way.
    Detailed,
}

impl Strategy {
    pub fn from_detailed(detailed: bool) -> Self {
        if detailed {
            Strategy::Detailed
        } else {
            Strategy::Pooled
        }
    }
}

/// Within/between chain variance and the resulting potential scale
/// reduction factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VarianceDecomposition {
    /// W: mean of the per-chain sample variances.
    pub within_variance: f64,
    /// B: chain length times the sample variance of the chain means.
    pub between_variance: f64,
    pub scale_reduction_factor: f64,
}

/// Computes the potential scale reduction (Rhat) for one parameter from
/// a rectangular chains × samples matrix, using the classical variance
/// estimator.
///
/// See more details in Stan reference manual section
/// ["Potential Scale Reduction"](https://mc-stan.org/docs/2_24/reference-manual/notation-for-samples-chains-and-draws.html#potential-scale-reduction).
///
/// Fails when the matrix is ragged, has fewer than two draws per chain, or
/// every chain is constant (W = 0).
pub fn scale_reduction(chains: &[Vec<f64>], detailed: bool) -> Result<VarianceDecomposition> {
    scale_reduction_with(
        chains,
        Strategy::from_detailed(detailed),
        VarianceEstimator::default(),
    )
}

pub fn scale_reduction_with(
    chains: &[Vec<f64>],
    strategy: Strategy,
    estimator: VarianceEstimator,
) -> Result<VarianceDecomposition> {
    let (within, between, n) = variance_components(chains)?;
    let scale_reduction_factor = match strategy {
        Strategy::Pooled => match estimator {
            VarianceEstimator::ChainLengthCorrected => ((between / within + n - 1.0) / n).sqrt(),
            VarianceEstimator::Unscaled => (1.0 + between / (n * within)).sqrt(),
        },
        Strategy::Detailed => {
            info!("The average variance within chains (W) is {:.2}", within);
            info!("The average variance between chains (B) is {:.2}", between);
            let var_plus = match estimator {
                VarianceEstimator::ChainLengthCorrected => within * (n - 1.0) / n + between / n,
                VarianceEstimator::Unscaled => within + between / n,
            };
            debug!(var_plus, "marginal variance estimate");
            (var_plus / within).sqrt()
        }
    };
    Ok(VarianceDecomposition {
        within_variance: within,
        between_variance: between,
        scale_reduction_factor,
    })
}

/// Computes the split potential scale reduction (Rhat): every chain is
/// halved and the halves are treated as separate chains.  When the number
/// of draws N is odd, the (N+1)/2th draw is ignored.
///
/// Based on reference implementation in Stan v2.24.0 at
/// [https://github.com/stan-dev/stan/blob/v2.24.0/src/stan/analyze/mcmc/compute_potential_scale_reduction.hpp]()
pub fn split_scale_reduction(chains: &[Vec<f64>]) -> Result<VarianceDecomposition> {
    check_chains(chains, 4)?;
    let split = split_chains(chains)?;
    scale_reduction_with(&split, Strategy::Pooled, VarianceEstimator::default())
}

/// Returns (W, B, n) for a validated matrix.
fn variance_components(chains: &[Vec<f64>]) -> Result<(f64, f64, f64)> {
    let num_draws = check_chains(chains, 2)?;
    let moments: Vec<(f64, f64)> = chains
        .par_iter()
        .map(|chain| -> Result<(f64, f64)> { Ok((mean(chain)?, sample_variance(chain)?)) })
        .collect::<Result<_>>()?;
    for (c, (m, v)) in moments.iter().enumerate() {
        debug!(chain = c, mean = m, variance = v, "chain moments");
    }
    let chain_mean: Array1 = moments.iter().map(|(m, _)| *m).collect();
    let chain_var: Array1 = moments.iter().map(|(_, v)| *v).collect();

    let n = num_draws as f64;
    let within = mean(&chain_var)?;
    let between = if chains.len() > 1 {
        n * sample_variance(&chain_mean)?
    } else {
        0.0
    };

    // W is zero only when no chain moves.
    if chains.iter().all(|c| c.iter().all(|x| *x == c[0])) {
        return Err(DiagnosticsError::DegenerateVariance { within });
    }
    Ok((within, between, n))
}
