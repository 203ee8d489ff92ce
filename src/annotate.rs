//! Subtitle and caption text from the statistical tests.
//!
//! The branch taken depends on two flags: whether a grouping variable is present
//! and whether a Bayes factor message was requested.

use crate::aggregate::ContingencyTable;
use crate::error::Result;
use crate::options::{DotOptions, PieOptions};
use crate::stats::bayes::{contingency_log_bf10, gof_log_bf10, jzs_log_bf10};
use crate::stats::contingency::{
    goodness_of_fit, normalize_ratio, test_goodness_of_fit, test_independence, test_symmetry,
    ChiSquareMethod, ChiSquareTest, ContingencyResult, EffectSize, ResampleOptions,
};
use crate::stats::format::{format_conf_level, format_num, format_p, significance_stars};
use crate::stats::location::{robust_test, signed_rank_test, t_test, TestType};
use crate::stats::normality::jarque_bera;
use rand::rngs::StdRng;
use serde::Serialize;
use tracing::{debug, info};

/// Text attached to a chart. Never parsed again once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Annotation {
    pub subtitle: Option<String>,
    pub caption: Option<String>,
}

/// Per-group proportion test shown beside each facet.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupTest {
    pub group: String,
    pub test: ChiSquareTest,
    pub significance: &'static str,
}

fn effect_text(effect: &EffectSize, k: usize) -> String {
    format!(
        "{} = {}, CI{}% [{}, {}]",
        effect.name,
        format_num(effect.estimate, k),
        format_conf_level(effect.conf_level),
        format_num(effect.ci.0, k),
        format_num(effect.ci.1, k)
    )
}

/// `χ²(1) = 3.2, p = 0.074, V = 0.21, CI95% [0.00, 0.51], n = 32`
pub fn chisq_subtitle(result: &ContingencyResult, k: usize) -> String {
    let test = &result.test;
    let (symbol, n_name) = match test.method {
        ChiSquareMethod::Pearson => ("χ²", "n"),
        ChiSquareMethod::GoodnessOfFit => ("χ²_gof", "n"),
        ChiSquareMethod::McNemar => ("χ²_McNemar", "n_pairs"),
    };
    format!(
        "{}({}) = {}, p {}, {}, {} = {}",
        symbol,
        format_num(test.df, 0),
        format_num(test.statistic, k),
        format_p(test.p_value, k),
        effect_text(&result.effect, k),
        n_name,
        test.n
    )
}

fn bayes_caption(log_bf10: f64, details: &str, k: usize) -> String {
    format!(
        "In favor of null: log_e(BF01) = {}, {}",
        format_num(-log_bf10, k),
        details
    )
}

/// Keep the user's caption and put the Bayes message underneath
pub fn join_caption(user: Option<&str>, bayes: Option<String>) -> Option<String> {
    match (user, bayes) {
        (Some(u), Some(b)) => Some(format!("{}\n{}", u, b)),
        (Some(u), None) => Some(u.to_string()),
        (None, b) => b,
    }
}

fn resample_options(opts: &PieOptions) -> ResampleOptions {
    ResampleOptions {
        conf_level: opts.conf_level,
        nboot: opts.nboot,
        simulate_p_value: opts.simulate_p_value,
        b: opts.b,
    }
}

/// Subtitle and caption for a pie chart.
///
/// `table` has the groups as rows (a single unnamed row without a grouping
/// variable) and the main categories as columns.
pub fn pie_annotation(
    table: &ContingencyTable,
    has_group: bool,
    opts: &PieOptions,
    rng: &mut StdRng,
) -> Result<Annotation> {
    if !opts.results_subtitle {
        return Ok(Annotation {
            subtitle: None,
            caption: opts.caption.clone(),
        });
    }

    let resample = resample_options(opts);
    let (result, bayes) = if has_group {
        let result = if opts.paired {
            debug!("Running symmetry test on {}x{} paired table", table.nrow(), table.ncol());
            test_symmetry(table, &resample, rng)?
        } else {
            debug!("Running test of independence on {}x{} table", table.nrow(), table.ncol());
            test_independence(table, &resample, rng)?
        };

        let bayes = if opts.bf_message && !opts.paired {
            let log_bf10 = contingency_log_bf10(
                table,
                opts.sampling_plan,
                opts.fixed_margin,
                opts.prior_concentration,
            )?;
            Some(bayes_caption(
                log_bf10,
                &format!(
                    "sampling = {}, a = {}",
                    opts.sampling_plan.describe(),
                    format_num(opts.prior_concentration, 2)
                ),
                opts.k,
            ))
        } else {
            None
        };
        (result, bayes)
    } else {
        let counts = table.counts.first().cloned().unwrap_or_default();
        let probs = normalize_ratio(opts.ratio.as_deref(), counts.len())?;
        debug!("Running goodness of fit on {} categories", counts.len());
        let result = test_goodness_of_fit(&counts, &probs, &resample, rng)?;

        let bayes = if opts.bf_message {
            let log_bf10 = gof_log_bf10(&counts, &probs, opts.prior_concentration)?;
            Some(bayes_caption(
                log_bf10,
                &format!("a = {}", format_num(opts.prior_concentration, 2)),
                opts.k,
            ))
        } else {
            None
        };
        (result, bayes)
    };

    if opts.messages {
        info!(
            "{} test: statistic = {}, df = {}, p = {}, n = {}",
            match result.test.method {
                ChiSquareMethod::Pearson => "Pearson's chi-squared",
                ChiSquareMethod::GoodnessOfFit => "Chi-squared goodness of fit",
                ChiSquareMethod::McNemar => "McNemar's chi-squared",
            },
            format_num(result.test.statistic, opts.k),
            result.test.df,
            result.test.p_value,
            result.test.n
        );
        if let Some(b) = result.test.simulated {
            info!("p-value simulated from {} replicates", b);
        }
    }

    let text = chisq_subtitle(&result, opts.k);
    let subtitle = match &opts.stat_title {
        Some(title) => format!("{}: {}", title, text),
        None => text,
    };

    Ok(Annotation {
        subtitle: Some(subtitle),
        caption: join_caption(opts.caption.as_deref(), bayes),
    })
}

/// Goodness of fit of each group's category counts against `ratio`
pub fn group_tests(
    table: &ContingencyTable,
    ratio: Option<&[f64]>,
    messages: bool,
) -> Result<Vec<GroupTest>> {
    let probs = normalize_ratio(ratio, table.ncol())?;
    let tests = table
        .row_levels
        .iter()
        .zip(&table.counts)
        .map(|(group, counts)| {
            let test = goodness_of_fit(counts, &probs)?;
            Ok(GroupTest {
                group: group.clone(),
                significance: significance_stars(test.p_value),
                test,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if messages {
        for t in &tests {
            info!(
                "Proportion test for group '{}': chi-squared({}) = {:.3}, p = {:.4}, n = {} [{}]",
                t.group, t.test.df, t.test.statistic, t.test.p_value, t.test.n, t.significance
            );
        }
    }
    Ok(tests)
}

/// Subtitle and caption for a dot chart, testing the per-label means
pub fn dot_annotation(values: &[f64], opts: &DotOptions, rng: &mut StdRng) -> Result<Annotation> {
    if opts.messages {
        match jarque_bera(values) {
            Ok(check) => info!(
                "Jarque-Bera normality test on the means: JB = {:.3}, p = {:.4}, n = {}",
                check.statistic, check.p_value, check.n
            ),
            Err(e) => debug!("Skipping normality check: {}", e),
        }
    }

    if !opts.results_subtitle {
        return Ok(Annotation {
            subtitle: opts.subtitle.clone(),
            caption: opts.caption.clone(),
        });
    }

    let k = opts.k;
    let prior = format_num(opts.bf_prior, 3);

    let subtitle = match opts.test_type {
        TestType::Parametric => {
            let res = t_test(values, opts.test_value, opts.conf_level)?;
            format!(
                "t({}) = {}, p {}, {}, n = {}",
                format_num(res.df, 0),
                format_num(res.statistic, k),
                format_p(res.p_value, k),
                effect_text(&res.effect, k),
                res.n
            )
        }
        TestType::Nonparametric => {
            let res = signed_rank_test(values, opts.test_value, opts.conf_level, opts.nboot, rng)?;
            // ln(0) has no printable value
            let statistic = if res.statistic > 0.0 {
                format!("log_e(V) = {}", format_num(res.statistic.ln(), k))
            } else {
                format!("V = {}", format_num(res.statistic, 0))
            };
            format!(
                "{}, p {}, {}, n = {}",
                statistic,
                format_p(res.p_value, k),
                effect_text(&res.effect, k),
                res.n
            )
        }
        TestType::Robust => {
            let res = robust_test(values, opts.test_value, opts.conf_level, opts.nboot, rng)?;
            format!(
                "M_robust = {}, CI{}% [{}, {}], p {}, n = {}",
                format_num(res.estimate, k),
                format_conf_level(res.conf_level),
                format_num(res.ci.0, k),
                format_num(res.ci.1, k),
                format_p(res.p_value, k),
                res.n
            )
        }
        TestType::Bayes => {
            let res = t_test(values, opts.test_value, opts.conf_level)?;
            let log_bf10 = jzs_log_bf10(res.statistic, res.n, opts.bf_prior)?;
            format!(
                "log_e(BF10) = {}, Prior width = {}, n = {}",
                format_num(log_bf10, k),
                prior,
                res.n
            )
        }
    };

    let bayes = if opts.bf_message && opts.test_type == TestType::Parametric {
        let res = t_test(values, opts.test_value, opts.conf_level)?;
        let log_bf10 = jzs_log_bf10(res.statistic, res.n, opts.bf_prior)?;
        Some(bayes_caption(log_bf10, &format!("Prior width = {}", prior), k))
    } else {
        None
    };

    Ok(Annotation {
        subtitle: Some(subtitle),
        caption: join_caption(opts.caption.as_deref(), bayes),
    })
}
