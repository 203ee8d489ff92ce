use crate::error::{Result, StatsPlotError};
use crate::select::{CategoricalData, LabeledValues};
use serde::Serialize;
use std::cmp::Ordering;

/// Cell counts of a group × category table. Rows are groups (one row when
/// there is no grouping variable), columns are categories of the main variable.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    pub row_levels: Vec<String>,
    pub col_levels: Vec<String>,
    pub counts: Vec<Vec<u64>>,
}

impl ContingencyTable {
    pub fn nrow(&self) -> usize {
        self.counts.len()
    }

    pub fn ncol(&self) -> usize {
        self.col_levels.len()
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn row_totals(&self) -> Vec<u64> {
        self.counts.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn col_totals(&self) -> Vec<u64> {
        (0..self.ncol())
            .map(|j| self.counts.iter().map(|r| r[j]).sum())
            .collect()
    }

    pub fn transposed(&self) -> ContingencyTable {
        ContingencyTable {
            row_levels: self.col_levels.clone(),
            col_levels: self.row_levels.clone(),
            counts: (0..self.ncol())
                .map(|j| self.counts.iter().map(|r| r[j]).collect())
                .collect(),
        }
    }
}

/// Tally the full group × category matrix, zero cells included
pub fn contingency_counts(data: &CategoricalData) -> ContingencyTable {
    let col_levels = data.main.levels.clone();
    let (row_levels, row_codes): (Vec<String>, Vec<usize>) = match &data.condition {
        Some(cond) => (cond.levels.clone(), cond.codes.clone()),
        None => (vec![String::new()], vec![0; data.len()]),
    };

    let mut counts = vec![vec![0u64; col_levels.len()]; row_levels.len()];
    for (obs, &col) in data.main.codes.iter().enumerate() {
        counts[row_codes[obs]][col] += 1;
    }

    ContingencyTable {
        row_levels,
        col_levels,
        counts,
    }
}

/// One (group, category) cell of the pie summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProportionRow {
    pub group: Option<String>,
    pub category: String,
    pub count: u64,
    pub perc: f64,
}

/// Counts and within-group percentages.
///
/// Groups come out in level order, categories in descending level order inside
/// each group, which is the order the stacked bars are built in. Cells with a
/// zero count produce no row.
pub fn summarize_proportions(data: &CategoricalData) -> Vec<ProportionRow> {
    let table = contingency_counts(data);
    let has_group = data.condition.is_some();

    let mut rows = Vec::new();
    for (g, cells) in table.counts.iter().enumerate() {
        let total: u64 = cells.iter().sum();
        if total == 0 {
            continue;
        }
        for c in (0..table.ncol()).rev() {
            let count = cells[c];
            if count == 0 {
                continue;
            }
            rows.push(ProportionRow {
                group: has_group.then(|| table.row_levels[g].clone()),
                category: table.col_levels[c].clone(),
                count,
                perc: count as f64 / total as f64 * 100.0,
            });
        }
    }
    rows
}

/// One label of the dot chart, ordered by its mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankRow {
    pub label: String,
    pub mean: f64,
    pub rank: usize,
    pub percentile: f64,
}

/// Per-label means ranked ascending; ties keep level order
pub fn rank_means(data: &LabeledValues) -> Result<Vec<RankRow>> {
    let n_levels = data.labels.nlevels();
    let mut sums = vec![0.0; n_levels];
    let mut counts = vec![0usize; n_levels];

    for (obs, value) in data.values.iter().enumerate() {
        if let Some(v) = value {
            let code = data.labels.codes[obs];
            sums[code] += v;
            counts[code] += 1;
        }
    }

    let mut means = Vec::with_capacity(n_levels);
    for (level, label) in data.labels.levels.iter().enumerate() {
        if counts[level] == 0 {
            return Err(StatsPlotError::EmptyGroup(label.clone()));
        }
        means.push((level, sums[level] / counts[level] as f64));
    }

    means.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

    let n = means.len() as f64;
    Ok(means
        .into_iter()
        .enumerate()
        .map(|(pos, (level, mean))| {
            let rank = pos + 1;
            RankRow {
                label: data.labels.levels[level].clone(),
                mean,
                rank,
                percentile: (rank as f64).floor() / n * 100.0,
            }
        })
        .collect())
}
