use crate::acf::full_autocovariance;
use crate::error::Result;
use crate::utils::{check_chains, flatten, sample_variance};
use crate::Array1;
use rayon::prelude::*;
use tracing::debug;

/// Computes the effective sample size (ESS) of a single chain from its
/// autocorrelation structure:
///
/// ```text
/// ESS = N / (1 + 2 * sum_{k=1}^{K} rho_k)
/// ```
///
/// where `rho_k` is the biased (1/N) lag-`k` autocorrelation and the sum
/// stops just before the first negative `rho_k`.  The result is clamped to
/// `[0, N]`.  A constant chain carries the information of a single draw and
/// returns 1.
pub fn chain_effective_sample_size(chain: &[f64]) -> f64 {
    let num_draws = chain.len();
    if num_draws < 2 {
        return num_draws as f64;
    }
    if chain.iter().all(|x| *x == chain[0]) {
        return 1.0;
    }
    let n = num_draws as f64;
    let acov = full_autocovariance(chain);

    let mut rho_sum = 0.0;
    let mut truncation_lag = num_draws;
    for (lag, gamma) in acov.iter().enumerate().skip(1) {
        let rho = gamma / acov[0];
        if rho < 0.0 {
            truncation_lag = lag;
            break;
        }
        rho_sum += rho;
    }
    let ess = n / (1.0 + 2.0 * rho_sum);
    debug!(truncation_lag, rho_sum, ess, "chain effective sample size");
    ess.max(0.0).min(n)
}

/// Computes the effective sample size across all chains: the sum of the
/// per-chain estimates from [`chain_effective_sample_size`].
///
/// The total never exceeds the number of draws in the matrix.
///
/// # Arguments
/// * `chains` - Reference to a vector of chains, each of which is a vector of samples for
///              the same parameter
pub fn effective_sample_size(chains: &[Vec<f64>]) -> Result<f64> {
    let num_draws = check_chains(chains, 2)?;
    let per_chain: Array1 = chains
        .par_iter()
        .map(|chain| chain_effective_sample_size(chain))
        .collect();
    for (c, ess) in per_chain.iter().enumerate() {
        debug!(chain = c, ess, "per-chain effective sample size");
    }
    let total = per_chain.iter().sum::<f64>();
    Ok(total.min((chains.len() * num_draws) as f64))
}

/// Computes the Monte Carlo Standard Error (MCSE) of the pooled mean, the
/// standard deviation of all draws over the square root of the effective
/// sample size.
///
/// See the Stan reference manual section
/// ["Estimation of MCMC Standard Error"](https://mc-stan.org/docs/2_24/reference-manual/effective-sample-size-section.html#estimation-of-mcmc-standard-error)
pub fn monte_carlo_standard_error(chains: &[Vec<f64>]) -> Result<f64> {
    let ess = effective_sample_size(chains)?;
    let var = sample_variance(&flatten(chains))?;
    Ok((var / ess).sqrt())
}
