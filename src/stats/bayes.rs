//! Bayes factors: Gunel–Dickey contingency tables, Dirichlet goodness of fit and
//! the JZS one-sample t-test. Everything is returned as natural-log BF10.

use crate::aggregate::ContingencyTable;
use crate::error::{Result, StatsPlotError};
use serde::{Deserialize, Serialize};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;

/// Sampling scheme assumed for the contingency-table Bayes factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "camelCase")]
pub enum SamplingPlan {
    #[default]
    #[value(name = "indepMulti")]
    IndepMulti,
    #[value(name = "jointMulti")]
    JointMulti,
}

impl SamplingPlan {
    pub fn describe(&self) -> &'static str {
        match self {
            SamplingPlan::IndepMulti => "independent multinomial",
            SamplingPlan::JointMulti => "joint multinomial",
        }
    }
}

/// Margin held fixed under independent multinomial sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FixedMargin {
    #[default]
    Rows,
    Cols,
}

/// log of the multivariate beta function
fn ln_mbeta(alpha: &[f64]) -> f64 {
    alpha.iter().map(|&a| ln_gamma(a)).sum::<f64>() - ln_gamma(alpha.iter().sum())
}

/// log marginal likelihood ratio of Dirichlet(alpha) for counts, multinomial coefficient dropped
fn ln_dirichlet_ratio(counts: &[u64], alpha: &[f64]) -> f64 {
    let posterior: Vec<f64> = counts.iter().zip(alpha).map(|(&c, &a)| c as f64 + a).collect();
    ln_mbeta(&posterior) - ln_mbeta(alpha)
}

/// Concentration of the shared margin under the null: `k * a - (k - 1)`
fn null_concentration(k: usize, a: f64) -> Result<f64> {
    let xi = k as f64 * a - (k as f64 - 1.0);
    if xi <= 0.0 {
        return Err(StatsPlotError::invalid_option(
            "prior_concentration",
            format!("too small for a table with {} levels on one margin", k),
        ));
    }
    Ok(xi)
}

/// Gunel–Dickey Bayes factor for independence
pub fn contingency_log_bf10(
    table: &ContingencyTable,
    plan: SamplingPlan,
    margin: FixedMargin,
    prior_concentration: f64,
) -> Result<f64> {
    if !(prior_concentration > 0.0) {
        return Err(StatsPlotError::invalid_option(
            "prior_concentration",
            "must be positive",
        ));
    }
    let a = prior_concentration;

    match plan {
        SamplingPlan::IndepMulti => {
            // rows are the groups whose totals are fixed
            let table = match margin {
                FixedMargin::Rows => table.clone(),
                FixedMargin::Cols => table.transposed(),
            };
            let (nrow, ncol) = (table.nrow(), table.ncol());
            let row_alpha = vec![a; ncol];
            let ln_alt: f64 = table
                .counts
                .iter()
                .map(|row| ln_dirichlet_ratio(row, &row_alpha))
                .sum();
            let xi = vec![null_concentration(nrow, a)?; ncol];
            let ln_null = ln_dirichlet_ratio(&table.col_totals(), &xi);
            Ok(ln_alt - ln_null)
        }
        SamplingPlan::JointMulti => {
            let (nrow, ncol) = (table.nrow(), table.ncol());
            let cells: Vec<u64> = table.counts.iter().flatten().copied().collect();
            let ln_alt = ln_dirichlet_ratio(&cells, &vec![a; cells.len()]);
            let xi_rows = vec![null_concentration(ncol, a)?; nrow];
            let xi_cols = vec![null_concentration(nrow, a)?; ncol];
            let ln_null = ln_dirichlet_ratio(&table.row_totals(), &xi_rows)
                + ln_dirichlet_ratio(&table.col_totals(), &xi_cols);
            Ok(ln_alt - ln_null)
        }
    }
}

/// Dirichlet(a) alternative against the point null `probs`
pub fn gof_log_bf10(counts: &[u64], probs: &[f64], prior_concentration: f64) -> Result<f64> {
    if !(prior_concentration > 0.0) {
        return Err(StatsPlotError::invalid_option(
            "prior_concentration",
            "must be positive",
        ));
    }
    let alpha = vec![prior_concentration; counts.len()];
    let ln_alt = ln_dirichlet_ratio(counts, &alpha);
    let ln_null: f64 = counts
        .iter()
        .zip(probs)
        .map(|(&c, &p)| c as f64 * p.ln())
        .sum();
    Ok(ln_alt - ln_null)
}

/// JZS Bayes factor for a one-sample t statistic with Cauchy prior width `r`
pub fn jzs_log_bf10(t: f64, n: usize, r: f64) -> Result<f64> {
    if n < 2 {
        return Err(StatsPlotError::test("a Bayes factor t-test needs at least 2 observations"));
    }
    if !(r > 0.0) {
        return Err(StatsPlotError::invalid_option("bf_prior", "prior width must be positive"));
    }

    let nf = n as f64;
    let nu = nf - 1.0;
    let ln_null = -(nu + 1.0) / 2.0 * (1.0 + t * t / nu).ln();

    // integrate over u = ln g so the inverse-gamma prior's mass is well covered
    let ln_integrand = |u: f64| -> f64 {
        let g = u.exp();
        let scale = 1.0 + nf * g * r * r;
        -0.5 * scale.ln() - (nu + 1.0) / 2.0 * (1.0 + t * t / (scale * nu)).ln()
            - 0.5 * (2.0 * PI).ln()
            - 1.5 * u
            - 1.0 / (2.0 * g)
            + u
    };

    const STEPS: usize = 4000;
    let (lo, hi) = (-20.0_f64, 30.0_f64);
    let h = (hi - lo) / STEPS as f64;
    let values: Vec<f64> = (0..=STEPS).map(|i| ln_integrand(lo + i as f64 * h)).collect();
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    // Simpson's rule on the rescaled integrand
    let sum: f64 = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let w = if i == 0 || i == STEPS {
                1.0
            } else if i % 2 == 1 {
                4.0
            } else {
                2.0
            };
            w * (v - max).exp()
        })
        .sum();
    let ln_alt = max + (sum * h / 3.0).ln();

    Ok(ln_alt - ln_null)
}
