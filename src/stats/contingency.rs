//! Chi-square family: independence, goodness of fit and paired symmetry tests.

use super::resample::percentile_ci;
use crate::aggregate::ContingencyTable;
use crate::error::{Result, StatsPlotError};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use statrs::distribution::{ChiSquared, ContinuousCDF};

/// Tolerance used when comparing simulated statistics with the observed one
const SIM_TOLERANCE: f64 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChiSquareMethod {
    Pearson,
    GoodnessOfFit,
    McNemar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquareTest {
    pub method: ChiSquareMethod,
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub n: u64,
    /// Number of replicates when the p-value was simulated
    pub simulated: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EffectSize {
    pub name: &'static str,
    pub estimate: f64,
    pub ci: (f64, f64),
    pub conf_level: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyResult {
    pub test: ChiSquareTest,
    pub effect: EffectSize,
}

/// Knobs shared by the bootstrap CI and the Monte-Carlo p-value.
#[derive(Debug, Clone, Copy)]
pub struct ResampleOptions {
    pub conf_level: f64,
    pub nboot: usize,
    pub simulate_p_value: bool,
    pub b: usize,
}

fn chisq_p_value(statistic: f64, df: f64) -> Result<f64> {
    let dist = ChiSquared::new(df).map_err(|e| StatsPlotError::test(e.to_string()))?;
    Ok(1.0 - dist.cdf(statistic))
}

/// Pearson X² over cells with a non-zero expected count
fn pearson_statistic(counts: &[Vec<u64>]) -> f64 {
    let n: u64 = counts.iter().flatten().sum();
    if n == 0 {
        return f64::NAN;
    }
    let ncol = counts.first().map_or(0, Vec::len);
    let row_totals: Vec<u64> = counts.iter().map(|r| r.iter().sum()).collect();
    let col_totals: Vec<u64> = (0..ncol).map(|j| counts.iter().map(|r| r[j]).sum()).collect();

    let mut stat = 0.0;
    for (i, row) in counts.iter().enumerate() {
        for (j, &obs) in row.iter().enumerate() {
            let expected = row_totals[i] as f64 * col_totals[j] as f64 / n as f64;
            if expected > 0.0 {
                stat += (obs as f64 - expected).powi(2) / expected;
            }
        }
    }
    stat
}

fn cramers_v(counts: &[Vec<u64>]) -> f64 {
    let n: u64 = counts.iter().flatten().sum();
    let ncol = counts.first().map_or(0, Vec::len);
    let rows = counts.iter().filter(|r| r.iter().any(|&c| c > 0)).count();
    let cols = (0..ncol).filter(|&j| counts.iter().any(|r| r[j] > 0)).count();
    let m = rows.min(cols);
    if m < 2 || n == 0 {
        return f64::NAN;
    }
    (pearson_statistic(counts) / (n as f64 * (m - 1) as f64)).sqrt()
}

fn gof_statistic(counts: &[u64], probs: &[f64]) -> f64 {
    let n: u64 = counts.iter().sum();
    counts
        .iter()
        .zip(probs)
        .map(|(&obs, &p)| {
            let expected = n as f64 * p;
            (obs as f64 - expected).powi(2) / expected
        })
        .sum()
}

fn gof_cramers_v(counts: &[u64], probs: &[f64]) -> f64 {
    let n: u64 = counts.iter().sum();
    if n == 0 || counts.len() < 2 {
        return f64::NAN;
    }
    (gof_statistic(counts, probs) / (n as f64 * (counts.len() - 1) as f64)).sqrt()
}

/// Off-diagonal pairs (n_ij, n_ji) with at least one discordant observation
fn discordant_pairs(counts: &[Vec<u64>]) -> Vec<(u64, u64)> {
    let k = counts.len();
    let mut pairs = Vec::new();
    for i in 0..k {
        for j in (i + 1)..k {
            let (a, b) = (counts[i][j], counts[j][i]);
            if a + b > 0 {
                pairs.push((a, b));
            }
        }
    }
    pairs
}

fn symmetry_statistic(pairs: &[(u64, u64)], continuity: bool) -> f64 {
    pairs
        .iter()
        .map(|&(a, b)| {
            let diff = (a as f64 - b as f64).abs();
            let diff = if continuity { (diff - 1.0).max(0.0) } else { diff };
            diff.powi(2) / (a + b) as f64
        })
        .sum()
}

fn cohens_g(counts: &[Vec<u64>]) -> f64 {
    let pairs = discordant_pairs(counts);
    let total: u64 = pairs.iter().map(|&(a, b)| a + b).sum();
    if total == 0 {
        return f64::NAN;
    }
    let larger: u64 = pairs.iter().map(|&(a, b)| a.max(b)).sum();
    larger as f64 / total as f64 - 0.5
}

/// One (row, col) pair per observation
fn observations(counts: &[Vec<u64>]) -> Vec<(usize, usize)> {
    let mut obs = Vec::new();
    for (i, row) in counts.iter().enumerate() {
        for (j, &c) in row.iter().enumerate() {
            obs.extend(std::iter::repeat((i, j)).take(c as usize));
        }
    }
    obs
}

fn tabulate(obs: &[(usize, usize)], nrow: usize, ncol: usize) -> Vec<Vec<u64>> {
    let mut counts = vec![vec![0u64; ncol]; nrow];
    for &(i, j) in obs {
        counts[i][j] += 1;
    }
    counts
}

fn bootstrap_table<F>(
    counts: &[Vec<u64>],
    nboot: usize,
    rng: &mut StdRng,
    statistic: F,
) -> Vec<f64>
where
    F: Fn(&[Vec<u64>]) -> f64,
{
    let obs = observations(counts);
    if obs.is_empty() {
        return Vec::new();
    }
    let (nrow, ncol) = (counts.len(), counts.first().map_or(0, Vec::len));
    let mut sample = vec![(0, 0); obs.len()];
    (0..nboot)
        .map(|_| {
            for slot in sample.iter_mut() {
                *slot = obs[rng.gen_range(0..obs.len())];
            }
            statistic(&tabulate(&sample, nrow, ncol))
        })
        .collect()
}

/// Pearson chi-square test of independence with Cramér's V
pub fn test_independence(
    table: &ContingencyTable,
    opts: &ResampleOptions,
    rng: &mut StdRng,
) -> Result<ContingencyResult> {
    if table.nrow() < 2 || table.ncol() < 2 {
        return Err(StatsPlotError::test(
            "a test of independence needs at least two levels in each variable",
        ));
    }

    let statistic = pearson_statistic(&table.counts);
    let df = ((table.nrow() - 1) * (table.ncol() - 1)) as f64;

    let (p_value, simulated) = if opts.simulate_p_value {
        (simulate_independence_p(&table.counts, statistic, opts.b, rng), Some(opts.b))
    } else {
        (chisq_p_value(statistic, df)?, None)
    };

    let boot = bootstrap_table(&table.counts, opts.nboot, rng, cramers_v);

    Ok(ContingencyResult {
        test: ChiSquareTest {
            method: ChiSquareMethod::Pearson,
            statistic,
            df,
            p_value,
            n: table.total(),
            simulated,
        },
        effect: EffectSize {
            name: "V",
            estimate: cramers_v(&table.counts),
            ci: percentile_ci(&boot, opts.conf_level),
            conf_level: opts.conf_level,
        },
    })
}

/// Permuting one margin against the other keeps both margins fixed.
fn simulate_independence_p(counts: &[Vec<u64>], observed: f64, b: usize, rng: &mut StdRng) -> f64 {
    let obs = observations(counts);
    let (nrow, ncol) = (counts.len(), counts.first().map_or(0, Vec::len));
    let rows: Vec<usize> = obs.iter().map(|&(i, _)| i).collect();
    let mut cols: Vec<usize> = obs.iter().map(|&(_, j)| j).collect();

    let mut hits = 0usize;
    for _ in 0..b {
        cols.shuffle(rng);
        let pairs: Vec<(usize, usize)> = rows.iter().copied().zip(cols.iter().copied()).collect();
        if pearson_statistic(&tabulate(&pairs, nrow, ncol)) >= observed - SIM_TOLERANCE {
            hits += 1;
        }
    }
    (1 + hits) as f64 / (b + 1) as f64
}

/// McNemar (2×2) or Bowker (k×k) test of symmetry for paired data, with Cohen's g
pub fn test_symmetry(
    table: &ContingencyTable,
    opts: &ResampleOptions,
    rng: &mut StdRng,
) -> Result<ContingencyResult> {
    if table.nrow() != table.ncol() || table.row_levels != table.col_levels {
        return Err(StatsPlotError::test(
            "paired data need the same levels in both variables (square table)",
        ));
    }
    if table.nrow() < 2 {
        return Err(StatsPlotError::test("paired data need at least two levels"));
    }

    let pairs = discordant_pairs(&table.counts);
    if pairs.is_empty() {
        return Err(StatsPlotError::test("no discordant pairs, the symmetry test is undefined"));
    }

    let continuity = table.nrow() == 2;
    let statistic = symmetry_statistic(&pairs, continuity);
    let df = pairs.len() as f64;
    let boot = bootstrap_table(&table.counts, opts.nboot, rng, cohens_g);

    Ok(ContingencyResult {
        test: ChiSquareTest {
            method: ChiSquareMethod::McNemar,
            statistic,
            df,
            p_value: chisq_p_value(statistic, df)?,
            n: table.total(),
            simulated: None,
        },
        effect: EffectSize {
            name: "g",
            estimate: cohens_g(&table.counts),
            ci: percentile_ci(&boot, opts.conf_level),
            conf_level: opts.conf_level,
        },
    })
}

/// Probabilities from a user ratio (equal when absent), validated against `k`
pub fn normalize_ratio(ratio: Option<&[f64]>, k: usize) -> Result<Vec<f64>> {
    let Some(ratio) = ratio else {
        return Ok(vec![1.0 / k as f64; k]);
    };
    if ratio.len() != k {
        return Err(StatsPlotError::invalid_option(
            "ratio",
            format!("expected {} proportions, got {}", k, ratio.len()),
        ));
    }
    if ratio.iter().any(|&r| !r.is_finite() || r <= 0.0) {
        return Err(StatsPlotError::invalid_option("ratio", "proportions must be positive"));
    }
    let total: f64 = ratio.iter().sum();
    Ok(ratio.iter().map(|r| r / total).collect())
}

/// Chi-square goodness of fit of `counts` against `probs`, no effect size
pub fn goodness_of_fit(counts: &[u64], probs: &[f64]) -> Result<ChiSquareTest> {
    if counts.len() < 2 {
        return Err(StatsPlotError::test(
            "a goodness-of-fit test needs at least two categories",
        ));
    }
    let statistic = gof_statistic(counts, probs);
    let df = (counts.len() - 1) as f64;
    Ok(ChiSquareTest {
        method: ChiSquareMethod::GoodnessOfFit,
        statistic,
        df,
        p_value: chisq_p_value(statistic, df)?,
        n: counts.iter().sum(),
        simulated: None,
    })
}

/// Goodness of fit with Cramér's V, bootstrap CI and optional simulated p-value
pub fn test_goodness_of_fit(
    counts: &[u64],
    probs: &[f64],
    opts: &ResampleOptions,
    rng: &mut StdRng,
) -> Result<ContingencyResult> {
    let mut test = goodness_of_fit(counts, probs)?;

    if opts.simulate_p_value {
        test.p_value = simulate_gof_p(counts, probs, test.statistic, opts.b, rng)?;
        test.simulated = Some(opts.b);
    }

    let as_table = vec![counts.to_vec()];
    let boot = bootstrap_table(&as_table, opts.nboot, rng, |t| gof_cramers_v(&t[0], probs));

    Ok(ContingencyResult {
        test,
        effect: EffectSize {
            name: "V",
            estimate: gof_cramers_v(counts, probs),
            ci: percentile_ci(&boot, opts.conf_level),
            conf_level: opts.conf_level,
        },
    })
}

fn simulate_gof_p(
    counts: &[u64],
    probs: &[f64],
    observed: f64,
    b: usize,
    rng: &mut StdRng,
) -> Result<f64> {
    let n: u64 = counts.iter().sum();
    let dist = WeightedIndex::new(probs).map_err(|e| StatsPlotError::test(e.to_string()))?;
    let mut hits = 0usize;
    let mut sim = vec![0u64; counts.len()];
    for _ in 0..b {
        sim.iter_mut().for_each(|c| *c = 0);
        for _ in 0..n {
            sim[dist.sample(rng)] += 1;
        }
        if gof_statistic(&sim, probs) >= observed - SIM_TOLERANCE {
            hits += 1;
        }
    }
    Ok((1 + hits) as f64 / (b + 1) as f64)
}
