//! One-sample location tests used by the dot chart.

use super::contingency::EffectSize;
use super::resample::{mean, median, percentile_ci, sd};
use crate::error::{Result, StatsPlotError};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use std::cmp::Ordering;

/// Bend constant of the one-step M-estimator
const ONESTEP_BEND: f64 = 1.28;
/// Below this sample size the signed-rank p-value is exact (without ties)
const SIGNRANK_EXACT_LIMIT: usize = 50;

/// Which family of one-sample test is run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    #[default]
    #[serde(alias = "p")]
    #[value(alias = "p")]
    Parametric,
    #[serde(alias = "np")]
    #[value(alias = "np")]
    Nonparametric,
    #[serde(alias = "r")]
    #[value(alias = "r")]
    Robust,
    #[serde(alias = "bf")]
    #[value(alias = "bf")]
    Bayes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TTest {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub estimate: f64,
    pub effect: EffectSize,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedRankTest {
    pub statistic: f64,
    pub p_value: f64,
    pub exact: bool,
    pub effect: EffectSize,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RobustTest {
    pub estimate: f64,
    pub ci: (f64, f64),
    pub conf_level: f64,
    pub p_value: f64,
    pub n: usize,
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| StatsPlotError::test(e.to_string()))
}

fn require_observations(values: &[f64], min: usize, test: &str) -> Result<()> {
    if values.len() < min {
        return Err(StatsPlotError::test(format!(
            "{} needs at least {} observations, got {}",
            test,
            min,
            values.len()
        )));
    }
    Ok(())
}

/// Student's one-sample t-test with Hedges' g
pub fn t_test(values: &[f64], test_value: f64, conf_level: f64) -> Result<TTest> {
    require_observations(values, 2, "one-sample t-test")?;

    let n = values.len();
    let m = mean(values);
    let s = sd(values);
    if s == 0.0 || !s.is_finite() {
        return Err(StatsPlotError::test("one-sample t-test needs non-zero variance"));
    }

    let df = (n - 1) as f64;
    let statistic = (m - test_value) / (s / (n as f64).sqrt());
    let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| StatsPlotError::test(e.to_string()))?;
    let p_value = 2.0 * (1.0 - dist.cdf(statistic.abs()));

    // Hedges' small-sample correction of Cohen's d
    let d = (m - test_value) / s;
    let correction = 1.0 - 3.0 / (4.0 * df - 1.0);
    let g = d * correction;
    let se = (1.0 / n as f64 + g * g / (2.0 * n as f64)).sqrt();
    let z = standard_normal()?.inverse_cdf(1.0 - (1.0 - conf_level) / 2.0);

    Ok(TTest {
        statistic,
        df,
        p_value,
        estimate: m,
        effect: EffectSize {
            name: "g",
            estimate: g,
            ci: (g - z * se, g + z * se),
            conf_level,
        },
        n,
    })
}

/// Average ranks of `values` (1-based), plus the tie correction term Σ(t³ - t)
fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; values.len()];
    let mut tie_term = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        let t = (end - start) as f64;
        tie_term += t * t * t - t;
        start = end;
    }
    (ranks, tie_term)
}

/// Exact null distribution of the signed-rank statistic: `counts[v]` subsets of 1..=n summing to v
fn signrank_counts(n: usize) -> Vec<f64> {
    let max = n * (n + 1) / 2;
    let mut counts = vec![0.0; max + 1];
    counts[0] = 1.0;
    for k in 1..=n {
        for v in (k..=max).rev() {
            counts[v] += counts[v - k];
        }
    }
    counts
}

fn signed_rank_statistic(diffs: &[f64]) -> (f64, f64) {
    let abs: Vec<f64> = diffs.iter().map(|d| d.abs()).collect();
    let (ranks, tie_term) = average_ranks(&abs);
    let v = diffs
        .iter()
        .zip(&ranks)
        .filter(|(d, _)| **d > 0.0)
        .map(|(_, r)| r)
        .sum();
    (v, tie_term)
}

/// Normal-approximation z of the signed-rank statistic
fn signed_rank_z(v: f64, n: usize, tie_term: f64, continuity: bool) -> f64 {
    let n = n as f64;
    let centered = v - n * (n + 1.0) / 4.0;
    let sigma = (n * (n + 1.0) * (2.0 * n + 1.0) / 24.0 - tie_term / 48.0).sqrt();
    let correction = if continuity { 0.5 * centered.signum() } else { 0.0 };
    (centered - correction) / sigma
}

/// Wilcoxon signed-rank test against `test_value`, effect size r = z / sqrt(n)
pub fn signed_rank_test(
    values: &[f64],
    test_value: f64,
    conf_level: f64,
    nboot: usize,
    rng: &mut StdRng,
) -> Result<SignedRankTest> {
    let shifted: Vec<f64> = values.iter().map(|v| v - test_value).collect();
    let diffs: Vec<f64> = shifted.iter().copied().filter(|d| *d != 0.0).collect();
    let has_zeroes = diffs.len() != shifted.len();
    require_observations(&diffs, 1, "signed-rank test (after dropping zero differences)")?;

    let n = diffs.len();
    let (v, tie_term) = signed_rank_statistic(&diffs);
    let exact = n < SIGNRANK_EXACT_LIMIT && tie_term == 0.0 && !has_zeroes;
    let normal = standard_normal()?;

    let p_value = if exact {
        let counts = signrank_counts(n);
        let total: f64 = counts.iter().sum();
        let v_int = v.round() as usize;
        let tail = if v > (n * (n + 1)) as f64 / 4.0 {
            counts[v_int..].iter().sum::<f64>()
        } else {
            counts[..=v_int].iter().sum::<f64>()
        };
        (2.0 * tail / total).min(1.0)
    } else {
        let z = signed_rank_z(v, n, tie_term, true);
        2.0 * normal.cdf(-z.abs())
    };

    let r_of = |d: &[f64]| -> f64 {
        let (v, tie) = signed_rank_statistic(d);
        signed_rank_z(v, d.len(), tie, false) / (d.len() as f64).sqrt()
    };

    let boot: Vec<f64> = (0..nboot)
        .map(|_| {
            let sample: Vec<f64> = (0..n).map(|_| diffs[rng.gen_range(0..n)]).collect();
            r_of(&sample)
        })
        .collect();

    Ok(SignedRankTest {
        statistic: v,
        p_value,
        exact,
        effect: EffectSize {
            name: "r",
            estimate: r_of(&diffs),
            ci: percentile_ci(&boot, conf_level),
            conf_level,
        },
        n,
    })
}

/// One-step M-estimator of location (Huber psi, bend 1.28)
pub fn onestep(values: &[f64]) -> f64 {
    let med = median(values);
    let abs_dev: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    let madn = median(&abs_dev) / 0.6745;
    if madn == 0.0 || !madn.is_finite() {
        return med;
    }

    let y: Vec<f64> = values.iter().map(|v| (v - med) / madn).collect();
    let psi_sum: f64 = y.iter().map(|u| u.clamp(-ONESTEP_BEND, ONESTEP_BEND)).sum();
    let inside = y.iter().filter(|u| u.abs() <= ONESTEP_BEND).count();
    if inside == 0 {
        return med;
    }
    med + madn * psi_sum / inside as f64
}

/// Percentile-bootstrap test of the one-step M-estimator
pub fn robust_test(
    values: &[f64],
    test_value: f64,
    conf_level: f64,
    nboot: usize,
    rng: &mut StdRng,
) -> Result<RobustTest> {
    require_observations(values, 2, "robust one-sample test")?;
    if nboot == 0 {
        return Err(StatsPlotError::invalid_option("nboot", "robust test needs nboot > 0"));
    }

    let n = values.len();
    let boot: Vec<f64> = (0..nboot)
        .map(|_| {
            let sample: Vec<f64> = (0..n).map(|_| values[rng.gen_range(0..n)]).collect();
            onestep(&sample)
        })
        .collect();

    let below = boot.iter().filter(|&&b| b < test_value).count() as f64;
    let equal = boot.iter().filter(|&&b| b == test_value).count() as f64;
    let p_one = (below + 0.5 * equal) / nboot as f64;

    Ok(RobustTest {
        estimate: onestep(values),
        ci: percentile_ci(&boot, conf_level),
        conf_level,
        p_value: 2.0 * p_one.min(1.0 - p_one),
        n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::resample::make_rng;

    #[test]
    fn test_t_test_known_values() {
        // t = 2.826, p = 0.037
        let x = [5.1, 4.9, 5.6, 5.8, 6.0, 6.3];
        let res = t_test(&x, 5.0, 0.95).unwrap();
        assert_eq!(res.df, 5.0);
        assert_eq!(res.n, 6);
        let expected_t = (mean(&x) - 5.0) / (sd(&x) / 6f64.sqrt());
        assert!((res.statistic - expected_t).abs() < 1e-12);
        assert!(res.p_value > 0.0 && res.p_value < 0.05);
        assert!(res.effect.ci.0 < res.effect.estimate && res.effect.estimate < res.effect.ci.1);
    }

    #[test]
    fn test_t_test_rejects_constant_sample() {
        assert!(t_test(&[2.0, 2.0, 2.0], 0.0, 0.95).is_err());
        assert!(t_test(&[2.0], 0.0, 0.95).is_err());
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let (ranks, tie) = average_ranks(&[3.0, 1.0, 3.0, 2.0]);
        assert_eq!(ranks, vec![3.5, 1.0, 3.5, 2.0]);
        assert_eq!(tie, 6.0);
    }

    #[test]
    fn test_signrank_counts() {
        // subsets of {1, 2, 3}: sums 0,1,2,3,3,4,5,6
        assert_eq!(signrank_counts(3), vec![1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_signed_rank_exact() {
        // all positive differences: V = 15 of 15 -> p = 2 / 32
        let mut rng = make_rng(Some(1));
        let res = signed_rank_test(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.0, 0.95, 20, &mut rng).unwrap();
        assert!(res.exact);
        assert_eq!(res.statistic, 15.0);
        assert!((res.p_value - 0.0625).abs() < 1e-12);
        assert!(res.effect.estimate > 0.0);
    }

    #[test]
    fn test_signed_rank_normal_approximation_with_ties() {
        let mut rng = make_rng(Some(1));
        let res = signed_rank_test(&[1.0, 1.0, 2.0, -3.0, 4.0], 0.0, 0.95, 10, &mut rng).unwrap();
        assert!(!res.exact);
        assert!(res.p_value > 0.0 && res.p_value <= 1.0);
    }

    #[test]
    fn test_onestep() {
        assert_eq!(onestep(&[4.0, 4.0, 4.0]), 4.0);
        let with_outlier = onestep(&[1.0, 2.0, 3.0, 4.0, 100.0]);
        assert!(with_outlier < mean(&[1.0, 2.0, 3.0, 4.0, 100.0]));
        assert!(with_outlier > 1.0);
    }

    #[test]
    fn test_robust_test() {
        let x = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0, 17.0];
        let mut rng = make_rng(Some(42));
        let res = robust_test(&x, 0.0, 0.95, 200, &mut rng).unwrap();
        // every bootstrap estimate lies far above the null value
        assert_eq!(res.p_value, 0.0);
        assert!(res.ci.0 <= res.estimate && res.estimate <= res.ci.1);
    }
}
