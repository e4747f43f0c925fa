use crate::error::{DiagnosticsError, Result};
use crate::Array2;
use anyhow::Context;
use average::Variance;
use std::collections::BTreeMap;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Compute the arithmetic mean of an array.
pub fn mean(arr: &[f64]) -> Result<f64> {
    if arr.is_empty() {
        return Err(DiagnosticsError::TooFewValues {
            len: 0,
            required: 1,
        });
    }
    let sum = arr.iter().sum::<f64>();
    let count = arr.len() as f64;
    Ok(sum / count)
}

/// Compute the sample variance of an array using Bessel's correction.
pub fn sample_variance(arr: &[f64]) -> Result<f64> {
    if arr.len() < 2 {
        return Err(DiagnosticsError::TooFewValues {
            len: arr.len(),
            required: 2,
        });
    }
    let xbar = mean(arr)?;
    Ok(arr.iter().map(|x| (x - xbar).powi(2)).sum::<f64>() / (arr.len() as f64 - 1.0))
}

/// Population (1/n) standard deviation of an array.
pub fn population_std_dev(arr: &[f64]) -> Result<f64> {
    if arr.is_empty() {
        return Err(DiagnosticsError::TooFewValues {
            len: 0,
            required: 1,
        });
    }
    let moments: Variance = arr.iter().copied().collect();
    Ok(moments.population_variance().sqrt())
}

/// Checks that `chains` is a usable chain matrix and returns the number of
/// samples per chain.
///
/// The matrix must hold at least one chain, every chain must have the same
/// length as chain 0, that length must be at least `min_samples`, and every
/// value must be finite.  Shape problems are reported before any value is
/// inspected.
pub fn check_chains(chains: &[Vec<f64>], min_samples: usize) -> Result<usize> {
    let num_draws = check_shape(chains)?;
    if num_draws < min_samples {
        return Err(DiagnosticsError::InsufficientSamples {
            chain: 0,
            len: num_draws,
            required: min_samples,
        });
    }
    for (chain, c) in chains.iter().enumerate() {
        if let Some(sample) = c.iter().position(|v| !v.is_finite()) {
            return Err(DiagnosticsError::NonFinite {
                chain,
                sample,
                value: c[sample],
            });
        }
    }
    Ok(num_draws)
}

/// Checks only that `chains` is non-empty and rectangular, returning the
/// common chain length.
pub fn check_shape(chains: &[Vec<f64>]) -> Result<usize> {
    let first = chains.first().ok_or(DiagnosticsError::NoChains)?;
    let num_draws = first.len();
    for (chain, c) in chains.iter().enumerate().skip(1) {
        if c.len() != num_draws {
            return Err(DiagnosticsError::Ragged {
                chain,
                expected: num_draws,
                found: c.len(),
            });
        }
    }
    Ok(num_draws)
}

/// Concatenates all chains, chain-major.
pub fn flatten(chains: &[Vec<f64>]) -> Vec<f64> {
    chains.iter().flat_map(|c| c.iter().copied()).collect()
}

/// Keeps every `thinning`-th sample of each chain, starting from the first.
///
/// Each chain is cut into `floor(n / thinning)` blocks and the first draw of
/// each block is kept, so a trailing partial block is dropped.  Fails when
/// any thinned chain ends up with fewer than two samples.
pub fn thin_chains(chains: &[Vec<f64>], thinning: usize) -> Result<Array2> {
    if thinning == 0 {
        return Err(DiagnosticsError::InvalidThinning);
    }
    let thinned: Array2 = chains
        .iter()
        .map(|c| c.chunks_exact(thinning).map(|block| block[0]).collect())
        .collect();
    for (chain, c) in thinned.iter().enumerate() {
        if c.len() < 2 {
            return Err(DiagnosticsError::InsufficientSamples {
                chain,
                len: c.len(),
                required: 2,
            });
        }
    }
    Ok(thinned)
}

/// Splits each chain into two chains of equal length.  When the
/// number of total draws N is odd, the (N+1)/2th draw is ignored.
///
/// See more details in Stan reference manual section
/// ["Effective Sample Size"](http://mc-stan.org/users/documentation).
pub fn split_chains(chains: &[Vec<f64>]) -> Result<Array2> {
    let num_draws = check_chains(chains, 2)?;
    let (half, offset) = if num_draws % 2 == 0 {
        (num_draws / 2, 0)
    } else {
        ((num_draws - 1) / 2, 1)
    };
    let mut split_draws = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        split_draws.push(chain[..half].to_vec());
        split_draws.push(chain[(half + offset)..].to_vec());
    }
    Ok(split_draws)
}

/// Percentile `q` (in [0, 100]) using linear interpolation between the
/// closest ranks.
pub fn percentile(arr: &[f64], q: f64) -> Result<f64> {
    if !(0.0..=100.0).contains(&q) {
        return Err(DiagnosticsError::InvalidPercentile(q));
    }
    if arr.is_empty() {
        return Err(DiagnosticsError::TooFewValues {
            len: 0,
            required: 1,
        });
    }
    let mut sorted = arr.to_vec();
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));
    Ok(percentile_sorted(&sorted, q))
}

/// Same as [`percentile`] on data that is already sorted ascending and
/// non-empty.
pub(crate) fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (rank.ceil() as usize).min(sorted.len() - 1);
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Most frequent value after rounding to `decimals` places.  Ties go to
/// the smallest value.
pub fn mode_rounded(arr: &[f64], decimals: i32) -> Result<f64> {
    let scale = 10f64.powi(decimals);
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for v in arr {
        *counts.entry((v * scale).round() as i64).or_insert(0) += 1;
    }
    let mut best: Option<(i64, usize)> = None;
    for (&key, &count) in &counts {
        match best {
            Some((_, c)) if c >= count => {}
            _ => best = Some((key, count)),
        }
    }
    best.map(|(key, _)| key as f64 / scale)
        .ok_or(DiagnosticsError::TooFewValues {
            len: 0,
            required: 1,
        })
}

/// Reads a CSV file of draws where each column holds one chain.  The first
/// `skip_rows` lines (headers, comments) are ignored, as are blank lines.
pub fn read_csv(path: &Path, skip_rows: usize) -> anyhow::Result<Array2> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let f = BufReader::new(f);
    let mut result: Array2 = Vec::new();
    for (lineno, line) in f.lines().enumerate().skip(skip_rows) {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        for (idx, value) in line.split(',').enumerate() {
            if idx >= result.len() {
                result.push(Vec::new())
            }
            let value = value.trim().parse::<f64>().with_context(|| {
                format!(
                    "{}:{}: column {} is not a number: {:?}",
                    path.display(),
                    lineno + 1,
                    idx,
                    value
                )
            })?;
            result[idx].push(value);
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::Array1;
    use std::io::Write;

    #[test]
    fn test_stats() {
        // Test our basic stats functions using numbers computed with numpy.
        let arr = vec![
            2.13829088,
            -1.06214379,
            -0.79265699,
            -0.21300888,
            -1.07155142,
            -0.50425317,
            0.95708854,
            -1.23854172,
            1.37124938,
            1.17658286,
        ];
        let empty: Array1 = vec![];
        assert_abs_diff_eq!(
            sample_variance(&arr).unwrap(),
            1.492596054209826,
            epsilon = 1e-6
        );
        assert_abs_diff_eq!(mean(&arr).unwrap(), 0.07610557018217139, epsilon = 1e-6);
        // np.std(arr)
        assert_abs_diff_eq!(
            population_std_dev(&arr).unwrap(),
            (1.492596054209826f64 * 9.0 / 10.0).sqrt(),
            epsilon = 1e-6
        );

        assert!(sample_variance(&empty).is_err());
        assert!(mean(&empty).is_err());
        assert!(population_std_dev(&empty).is_err());
    }

    #[test]
    fn test_check_chains() {
        assert_eq!(check_chains(&[], 2), Err(DiagnosticsError::NoChains));

        let ragged = vec![vec![1.0, 2.0, 3.0], vec![1.0, 2.0], vec![1.0, 2.0, 3.0]];
        let err = check_chains(&ragged, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert_eq!(
            err,
            DiagnosticsError::Ragged {
                chain: 1,
                expected: 3,
                found: 2
            }
        );

        let short = vec![vec![1.0], vec![2.0]];
        assert_eq!(
            check_chains(&short, 2).unwrap_err().kind(),
            ErrorKind::InsufficientData
        );

        let nan = vec![vec![1.0, 2.0], vec![2.0, f64::NAN]];
        match check_chains(&nan, 2) {
            Err(DiagnosticsError::NonFinite { chain, sample, .. }) => {
                assert_eq!((chain, sample), (1, 1))
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(check_chains(&[vec![1.0, 2.0, 3.0]], 2), Ok(3));
    }

    #[test]
    fn test_thin_chains() {
        let chains = vec![
            (0..10).map(f64::from).collect::<Vec<_>>(),
            (10..20).map(f64::from).collect::<Vec<_>>(),
        ];
        let thinned = thin_chains(&chains, 3).unwrap();
        assert_eq!(thinned[0], vec![0.0, 3.0, 6.0]);
        assert_eq!(thinned[1], vec![10.0, 13.0, 16.0]);

        assert_eq!(thin_chains(&chains, 1).unwrap(), chains);
        assert_eq!(thin_chains(&chains, 0), Err(DiagnosticsError::InvalidThinning));
        match thin_chains(&chains, 6) {
            Err(DiagnosticsError::InsufficientSamples { chain, len, .. }) => {
                assert_eq!((chain, len), (0, 1))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_split_empty_chains() {
        // Make sure the we Err on empty or minimum 0 length chains
        let a: Array1 = vec![1.0];
        let b: Array1 = vec![];
        let c: Array1 = vec![];
        let chains = vec![a, b, c];
        assert!(split_chains(&chains).is_err());

        let a: Array1 = vec![];
        let b: Array1 = vec![];
        let chains = vec![a, b];
        assert!(split_chains(&chains).is_err());
    }

    #[test]
    fn test_split_odd_chains() {
        // Make sure the middle value gets dropped per the Stan reference implementation
        let a = vec![1.0, 2.0, 3.0, 4.0, 4.5];
        let b = vec![5.0, 6.0, 7.0, 8.0, 8.5];
        let chains = vec![a, b];
        let split = split_chains(&chains).unwrap();
        assert_eq!(split[0], vec![1.0, 2.0]);
        assert_eq!(split[1], vec![4.0, 4.5]);
        assert_eq!(split[2], vec![5.0, 6.0]);
        assert_eq!(split[3], vec![8.0, 8.5]);
    }

    #[test]
    fn test_percentile() {
        // np.percentile(np.arange(1, 11), [0, 5, 50, 95, 100])
        let arr: Vec<f64> = (1..=10).rev().map(f64::from).collect();
        assert_abs_diff_eq!(percentile(&arr, 0.0).unwrap(), 1.0);
        assert_abs_diff_eq!(percentile(&arr, 5.0).unwrap(), 1.45, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&arr, 50.0).unwrap(), 5.5, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&arr, 95.0).unwrap(), 9.55, epsilon = 1e-12);
        assert_abs_diff_eq!(percentile(&arr, 100.0).unwrap(), 10.0);
        assert_abs_diff_eq!(percentile(&[3.0], 42.0).unwrap(), 3.0);

        assert!(percentile(&arr, 101.0).is_err());
        assert!(percentile(&[], 50.0).is_err());
    }

    #[test]
    fn test_mode_rounded() {
        let arr = vec![1.0001, 0.9999, 2.5, 2.5004, 3.0];
        // 1.000 and 2.500 both appear twice; the smaller wins
        assert_abs_diff_eq!(mode_rounded(&arr, 3).unwrap(), 1.0);

        let arr = vec![-0.1234, 5.0, -0.12341, 7.0];
        assert_abs_diff_eq!(mode_rounded(&arr, 3).unwrap(), -0.123, epsilon = 1e-12);

        // no repeats: smallest value
        let arr = vec![4.0, 2.0, 3.0];
        assert_abs_diff_eq!(mode_rounded(&arr, 3).unwrap(), 2.0);

        assert!(mode_rounded(&[], 3).is_err());
    }

    #[test]
    fn test_read_csv() {
        let path = std::env::temp_dir().join(format!("mcmc_diag_read_{}.csv", std::process::id()));
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, "chain_a,chain_b").unwrap();
            writeln!(f, "1.0, 2.0").unwrap();
            writeln!(f).unwrap();
            writeln!(f, "3.5,-4").unwrap();
        }
        let chains = read_csv(&path, 1).unwrap();
        assert_eq!(chains, vec![vec![1.0, 3.5], vec![2.0, -4.0]]);

        // header not skipped
        assert!(read_csv(&path, 0).is_err());
        std::fs::remove_file(&path).unwrap();

        assert!(read_csv(Path::new("/nonexistent/chains.csv"), 0).is_err());
    }
}
