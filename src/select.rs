//! Column selection, weight expansion and factor coercion.
//!
//! Both chart pipelines start here: the referenced columns are pulled out of an
//! arbitrary [`DataTable`] into a fixed shape, weighted rows are replicated, rows
//! with missing keys are dropped and the categorical columns become [`Factor`]s.

use crate::data::DataTable;
use crate::error::{Result, StatsPlotError};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Upper bound on the rows a counts column may expand to
pub const MAX_EXPANDED_ROWS: usize = 50_000_000;

/// Canonical three-column shape produced by the selector.
#[derive(Debug, Clone)]
pub struct SelectedColumns {
    pub main: Vec<Option<String>>,
    pub condition: Option<Vec<Option<String>>>,
    pub counts: Option<CountsColumn>,
}

#[derive(Debug, Clone)]
pub struct CountsColumn {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// One unweighted observation after expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub main: Option<String>,
    pub condition: Option<String>,
}

/// A finite, ordered label set plus one level code per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub levels: Vec<String>,
    pub codes: Vec<usize>,
}

impl Factor {
    /// Build a factor whose levels are exactly the observed labels.
    /// Levels sort numerically when every label is a number.
    pub fn new<S: AsRef<str>>(values: &[S]) -> Self {
        let mut levels: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for v in values {
            if seen.insert(v.as_ref()) {
                levels.push(v.as_ref().to_string());
            }
        }
        sort_levels(&mut levels);

        let index: HashMap<&str, usize> = levels
            .iter()
            .enumerate()
            .map(|(i, l)| (l.as_str(), i))
            .collect();
        let codes = values.iter().map(|v| index[v.as_ref()]).collect();

        Factor { levels, codes }
    }

    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn label(&self, obs: usize) -> &str {
        &self.levels[self.codes[obs]]
    }
}

fn sort_levels(levels: &mut [String]) {
    let numeric: Option<Vec<f64>> = levels.iter().map(|l| l.parse::<f64>().ok()).collect();
    if numeric.is_some() {
        levels.sort_by(|a, b| {
            let (x, y) = (a.parse::<f64>().unwrap_or(0.0), b.parse::<f64>().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        });
    } else {
        levels.sort();
    }
}

/// Categorical observations ready for aggregation.
#[derive(Debug, Clone)]
pub struct CategoricalData {
    pub main: Factor,
    pub condition: Option<Factor>,
}

impl CategoricalData {
    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }
}

/// Labeled numeric observations for the dot chart.
#[derive(Debug, Clone)]
pub struct LabeledValues {
    pub labels: Factor,
    pub values: Vec<Option<f64>>,
}

/// Pull the referenced columns out of `table`
pub fn select_columns(
    table: &DataTable,
    main: &str,
    condition: Option<&str>,
    counts: Option<&str>,
) -> Result<SelectedColumns> {
    let owned = |col: Vec<Option<&str>>| -> Vec<Option<String>> {
        col.into_iter().map(|c| c.map(str::to_string)).collect()
    };

    let main_col = owned(table.column(main)?);
    let condition_col = match condition {
        Some(name) => Some(owned(table.column(name)?)),
        None => None,
    };
    let counts_col = match counts {
        Some(name) => Some(CountsColumn {
            name: table.column_name(name)?.to_string(),
            values: owned(table.column(name)?),
        }),
        None => None,
    };

    Ok(SelectedColumns {
        main: main_col,
        condition: condition_col,
        counts: counts_col,
    })
}

/// Replicate every row `weight` times when a counts column is present
pub fn expand_counts(selected: SelectedColumns) -> Result<Vec<Record>> {
    let SelectedColumns {
        main,
        condition,
        counts,
    } = selected;

    let condition_at = |i: usize| condition.as_ref().and_then(|c| c[i].clone());

    let Some(counts) = counts else {
        return Ok((0..main.len())
            .map(|i| Record {
                main: main[i].clone(),
                condition: condition_at(i),
            })
            .collect());
    };

    let mut weights = Vec::with_capacity(counts.values.len());
    let mut total: usize = 0;
    for (i, weight) in counts.values.iter().enumerate() {
        let times = parse_weight(weight.as_deref()).ok_or_else(|| StatsPlotError::InvalidWeight {
            column: counts.name.clone(),
            row: i + 1,
            value: weight.clone().unwrap_or_else(|| "NA".to_string()),
        })?;
        total = total
            .checked_add(times)
            .filter(|&t| t <= MAX_EXPANDED_ROWS)
            .ok_or_else(|| StatsPlotError::ExpansionTooLarge {
                column: counts.name.clone(),
                limit: MAX_EXPANDED_ROWS,
            })?;
        weights.push(times);
    }

    let mut records = Vec::with_capacity(total);
    for (i, times) in weights.into_iter().enumerate() {
        let record = Record {
            main: main[i].clone(),
            condition: condition_at(i),
        };
        records.extend(std::iter::repeat(record).take(times));
    }

    debug!(
        source_rows = counts.values.len(),
        expanded_rows = records.len(),
        "expanded weighted rows"
    );
    Ok(records)
}

fn parse_weight(cell: Option<&str>) -> Option<usize> {
    let w = cell?.trim().parse::<f64>().ok()?;
    if !w.is_finite() || w < 0.0 || w.fract() != 0.0 || w > usize::MAX as f64 {
        return None;
    }
    Some(w as usize)
}

/// Selector, expander and NA filter for the pie pipeline
pub fn prepare_categorical(
    table: &DataTable,
    main: &str,
    condition: Option<&str>,
    counts: Option<&str>,
) -> Result<CategoricalData> {
    let selected = select_columns(table, main, condition, counts)?;
    let has_condition = selected.condition.is_some();
    let records = expand_counts(selected)?;

    let kept: Vec<(String, Option<String>)> = records
        .into_iter()
        .filter_map(|r| {
            let m = r.main?;
            match (has_condition, r.condition) {
                (false, _) => Some((m, None)),
                (true, Some(c)) => Some((m, Some(c))),
                (true, None) => None,
            }
        })
        .collect();

    if kept.is_empty() {
        return Err(StatsPlotError::NoData);
    }

    let main_values: Vec<&str> = kept.iter().map(|(m, _)| m.as_str()).collect();
    let condition_factor = if has_condition {
        let values: Vec<&str> = kept
            .iter()
            .filter_map(|(_, c)| c.as_deref())
            .collect();
        Some(Factor::new(&values))
    } else {
        None
    };

    Ok(CategoricalData {
        main: Factor::new(&main_values),
        condition: condition_factor,
    })
}

/// Selector and NA filter for the dot pipeline
pub fn prepare_numeric(table: &DataTable, x: &str, y: &str) -> Result<LabeledValues> {
    let x_name = table.column_name(x)?.to_string();
    let x_col = table.column(x)?;
    let y_col = table.column(y)?;

    let mut labels = Vec::new();
    let mut values = Vec::new();
    for (row, (value, label)) in x_col.into_iter().zip(y_col).enumerate() {
        let Some(label) = label else { continue };
        let value = match value {
            Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
                StatsPlotError::InvalidNumber {
                    column: x_name.clone(),
                    row: row + 1,
                    value: raw.to_string(),
                }
            })?),
            None => None,
        };
        labels.push(label);
        values.push(value);
    }

    if labels.is_empty() {
        return Err(StatsPlotError::NoData);
    }

    Ok(LabeledValues {
        labels: Factor::new(&labels),
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_factor_levels_sorted_and_coded() {
        let f = Factor::new(&["b", "a", "b", "c"]);
        assert_eq!(f.levels, vec!["a", "b", "c"]);
        assert_eq!(f.codes, vec![1, 0, 1, 2]);
        assert_eq!(f.label(3), "c");
    }

    #[test]
    fn test_factor_numeric_levels() {
        let f = Factor::new(&["10", "4", "6", "4"]);
        assert_eq!(f.levels, vec!["4", "6", "10"]);
    }

    #[test]
    fn test_expand_single_weighted_row() {
        let t = table(&["cat", "weight"], &[&["X", "3"]]);
        let selected = select_columns(&t, "cat", None, Some("weight")).unwrap();
        let records = expand_counts(selected).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.main.as_deref() == Some("X") && r.condition.is_none()));
    }

    #[test]
    fn test_expand_zero_weight_drops_row() {
        let t = table(&["cat", "n"], &[&["X", "0"], &["Y", "2.0"]]);
        let records = expand_counts(select_columns(&t, "cat", None, Some("n")).unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.main.as_deref() == Some("Y")));
    }

    #[test]
    fn test_expand_rejects_bad_weights() {
        for bad in ["-1", "2.5", "abc", ""] {
            let t = table(&["cat", "n"], &[&["X", "1"], &["Y", bad]]);
            let err = expand_counts(select_columns(&t, "cat", None, Some("n")).unwrap()).unwrap_err();
            match err {
                StatsPlotError::InvalidWeight { row, .. } => assert_eq!(row, 2),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_expand_rejects_huge_weights() {
        let t = table(&["cat", "n"], &[&["X", "1e20"], &["Y", "1"]]);
        let err = expand_counts(select_columns(&t, "cat", None, Some("n")).unwrap()).unwrap_err();
        assert!(matches!(err, StatsPlotError::InvalidWeight { row: 1, .. }), "{err}");

        // each weight is representable but the sum is not
        let big = (MAX_EXPANDED_ROWS / 2 + 1).to_string();
        let t = table(&["cat", "n"], &[&["X", big.as_str()], &["Y", big.as_str()]]);
        let err = expand_counts(select_columns(&t, "cat", None, Some("n")).unwrap()).unwrap_err();
        assert!(matches!(err, StatsPlotError::ExpansionTooLarge { .. }), "{err}");
    }

    #[test]
    fn test_select_missing_column() {
        let t = table(&["cat"], &[&["X"]]);
        assert!(matches!(
            select_columns(&t, "cat", Some("group"), None),
            Err(StatsPlotError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_prepare_categorical_drops_missing() {
        let t = table(
            &["cat", "grp"],
            &[&["A", "g1"], &["NA", "g1"], &["B", ""], &["B", "g2"]],
        );
        let data = prepare_categorical(&t, "cat", Some("grp"), None).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.main.levels, vec!["A", "B"]);
        assert_eq!(data.condition.unwrap().levels, vec!["g1", "g2"]);
    }

    #[test]
    fn test_prepare_categorical_drops_unused_levels() {
        // "C" only appears next to a missing condition, so it must not survive as a level
        let t = table(&["cat", "grp"], &[&["A", "g1"], &["C", "NA"]]);
        let data = prepare_categorical(&t, "cat", Some("grp"), None).unwrap();
        assert_eq!(data.main.levels, vec!["A"]);
    }

    #[test]
    fn test_prepare_categorical_all_missing() {
        let t = table(&["cat"], &[&["NA"], &[""]]);
        assert!(matches!(
            prepare_categorical(&t, "cat", None, None),
            Err(StatsPlotError::NoData)
        ));
    }

    #[test]
    fn test_prepare_numeric() {
        let t = table(
            &["value", "label"],
            &[&["1.5", "a"], &["NA", "b"], &["3", "NA"], &["2", "b"]],
        );
        let data = prepare_numeric(&t, "value", "label").unwrap();
        assert_eq!(data.labels.levels, vec!["a", "b"]);
        assert_eq!(data.values, vec![Some(1.5), None, Some(2.0)]);
    }

    #[test]
    fn test_prepare_numeric_non_numeric_value() {
        let t = table(&["value", "label"], &[&["1", "a"], &["high", "b"]]);
        let err = prepare_numeric(&t, "value", "label").unwrap_err();
        assert!(err.to_string().contains("Failed to parse 'high'"));
    }
}
