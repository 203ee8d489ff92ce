//! Display strings for pie slices and group annotations.

use crate::aggregate::ProportionRow;
use serde::{Deserialize, Serialize};

/// What each pie slice shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SliceLabel {
    #[default]
    Percentage,
    Counts,
    Both,
}

/// A proportion row with its composed labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRow {
    #[serde(flatten)]
    pub row: ProportionRow,
    pub slice_label: String,
    /// Only the first row of each group carries `(n = total)`
    pub sample_size_label: Option<String>,
}

pub fn format_percentage(perc: f64, perc_k: usize) -> String {
    format!("{:.*}%", perc_k, perc)
}

pub fn slice_label(count: u64, perc: f64, mode: SliceLabel, perc_k: usize) -> String {
    match mode {
        SliceLabel::Percentage => format_percentage(perc, perc_k),
        SliceLabel::Counts => format!("n = {}", count),
        SliceLabel::Both => format!("{}\n({})", count, format_percentage(perc, perc_k)),
    }
}

pub fn sample_size_label(total: u64) -> String {
    format!("(n = {})", total)
}

/// `(n = total)` for the first row of each group, `None` for the rest.
///
/// Rows of one group are contiguous, as produced by
/// [`summarize_proportions`](crate::aggregate::summarize_proportions).
pub fn sample_size_labels(rows: &[ProportionRow]) -> Vec<Option<String>> {
    let mut labels = Vec::with_capacity(rows.len());
    let mut start = 0;
    while start < rows.len() {
        let group = &rows[start].group;
        let end = rows[start..]
            .iter()
            .position(|r| &r.group != group)
            .map_or(rows.len(), |offset| start + offset);
        let total: u64 = rows[start..end].iter().map(|r| r.count).sum();

        labels.push(Some(sample_size_label(total)));
        labels.extend(std::iter::repeat(None).take(end - start - 1));
        start = end;
    }
    labels
}

/// Attach slice and sample-size labels to the summary rows
pub fn compose(rows: &[ProportionRow], mode: SliceLabel, perc_k: usize) -> Vec<LabeledRow> {
    rows.iter()
        .zip(sample_size_labels(rows))
        .map(|(row, n_label)| LabeledRow {
            row: row.clone(),
            slice_label: slice_label(row.count, row.perc, mode, perc_k),
            sample_size_label: n_label,
        })
        .collect()
}

/// Text placed beside a facet: significance marker above the sample size
pub fn group_annotation(significance: Option<&str>, n_label: Option<&str>) -> Option<String> {
    match (significance, n_label) {
        (Some(sig), Some(n)) => Some(format!("{}\n{}", sig, n)),
        (Some(sig), None) => Some(sig.to_string()),
        (None, Some(n)) => Some(n.to_string()),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(group: Option<&str>, category: &str, count: u64, perc: f64) -> ProportionRow {
        ProportionRow {
            group: group.map(str::to_string),
            category: category.to_string(),
            count,
            perc,
        }
    }

    #[test]
    fn test_slice_label_modes() {
        let perc = 200.0 / 3.0;
        assert_eq!(slice_label(2, perc, SliceLabel::Percentage, 0), "67%");
        assert_eq!(slice_label(2, perc, SliceLabel::Percentage, 1), "66.7%");
        assert_eq!(slice_label(2, perc, SliceLabel::Counts, 0), "n = 2");
        assert_eq!(slice_label(2, perc, SliceLabel::Both, 0), "2\n(67%)");
        assert_eq!(slice_label(1, 100.0 / 3.0, SliceLabel::Percentage, 0), "33%");
    }

    #[test]
    fn test_slice_label_is_pure() {
        let a = slice_label(7, 41.17647, SliceLabel::Both, 2);
        let b = slice_label(7, 41.17647, SliceLabel::Both, 2);
        assert_eq!(a, b);
        assert_eq!(a, "7\n(41.18%)");
    }

    #[test]
    fn test_sample_size_labels_first_row_per_group() {
        let rows = vec![
            row(Some("g1"), "B", 2, 40.0),
            row(Some("g1"), "A", 3, 60.0),
            row(Some("g2"), "B", 1, 25.0),
            row(Some("g2"), "A", 2, 50.0),
            row(Some("g2"), "0", 1, 25.0),
        ];
        let labels = sample_size_labels(&rows);
        assert_eq!(
            labels,
            vec![
                Some("(n = 5)".to_string()),
                None,
                Some("(n = 4)".to_string()),
                None,
                None
            ]
        );
    }

    #[test]
    fn test_sample_size_labels_without_groups() {
        let rows = vec![row(None, "B", 1, 50.0), row(None, "A", 1, 50.0)];
        assert_eq!(
            sample_size_labels(&rows),
            vec![Some("(n = 2)".to_string()), None]
        );
        assert!(sample_size_labels(&[]).is_empty());
    }

    #[test]
    fn test_compose() {
        let rows = vec![row(None, "B", 1, 100.0 / 3.0), row(None, "A", 2, 200.0 / 3.0)];
        let labeled = compose(&rows, SliceLabel::Percentage, 0);
        assert_eq!(labeled[0].slice_label, "33%");
        assert_eq!(labeled[1].slice_label, "67%");
        assert_eq!(labeled[0].sample_size_label.as_deref(), Some("(n = 3)"));
        assert_eq!(labeled[1].sample_size_label, None);
    }

    #[test]
    fn test_group_annotation() {
        assert_eq!(group_annotation(Some("**"), Some("(n = 9)")).as_deref(), Some("**\n(n = 9)"));
        assert_eq!(group_annotation(Some("ns"), None).as_deref(), Some("ns"));
        assert_eq!(group_annotation(None, None), None);
    }
}
