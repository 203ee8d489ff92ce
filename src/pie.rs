//! `ggpiestats`: pie charts of a categorical variable, faceted by an optional
//! grouping variable, with chi-square test results attached.

use crate::aggregate::{contingency_counts, summarize_proportions, ContingencyTable};
use crate::annotate::{group_tests, pie_annotation, GroupTest};
use crate::data::DataTable;
use crate::error::Result;
use crate::ir::{
    Aesthetic, Bar, ChartKind, ChartSpec, Coord, DiscreteScale, FacetLayout, Labels, Layer, Panel,
    Position, TextMark, ThemeSpec,
};
use crate::labels::{compose, group_annotation, LabeledRow};
use crate::options::PieOptions;
use crate::palette::palette_colors;
use crate::select::prepare_categorical;
use crate::stats::resample::make_rng;
use tracing::debug;

/// Radial offset of the per-group annotation, just outside the pie
pub const GROUP_LABEL_X: f64 = 1.65;
pub const GROUP_LABEL_Y: f64 = 0.5;
const SLICE_X: f64 = 1.0;

/// Build the annotated pie chart for `table`
pub fn ggpiestats(table: &DataTable, opts: &PieOptions) -> Result<ChartSpec> {
    opts.validate()?;

    let data = prepare_categorical(
        table,
        &opts.main,
        opts.condition.as_deref(),
        opts.counts.as_deref(),
    )?;
    let has_group = data.condition.is_some();
    debug!(
        "Prepared {} observations, {} categories",
        data.len(),
        data.main.nlevels()
    );

    let contingency = contingency_counts(&data);
    let rows = compose(&summarize_proportions(&data), opts.slice_label, opts.perc_k);

    let mut rng = make_rng(opts.seed);
    let annotation = pie_annotation(&contingency, has_group, opts, &mut rng)?;

    let tests = if has_group && opts.facet_proptest && contingency.ncol() >= 2 {
        group_tests(&contingency, opts.ratio.as_deref(), opts.messages)?
    } else {
        Vec::new()
    };

    let fill_scale = DiscreteScale {
        breaks: data.main.levels.clone(),
        colors: palette_colors(&opts.palette, opts.direction, data.main.nlevels())?,
    };

    let panels = build_panels(&rows, &contingency, &tests, &fill_scale, has_group, opts);

    let legend = match &opts.legend_title {
        Some(title) => title.clone(),
        None => table.column_name(&opts.main)?.to_string(),
    };

    Ok(ChartSpec {
        kind: ChartKind::Pie,
        facet_layout: FacetLayout::wrap(panels.len()),
        panels,
        coord: Coord::Polar {
            theta: Aesthetic::Y,
        },
        fill_scale: Some(fill_scale),
        y_axis: None,
        secondary_y_axis: None,
        labels: Labels {
            title: opts.title.clone(),
            subtitle: annotation.subtitle,
            caption: annotation.caption,
            x: None,
            y: None,
            legend: Some(legend),
        },
        theme: ThemeSpec {
            preset: opts.theme,
            ggstatsplot_layer: opts.ggstatsplot_layer,
        },
    })
}

fn panel_title(level: &str, facet_wrap_name: Option<&str>) -> String {
    match facet_wrap_name {
        Some(name) => format!("{}: {}", name, level),
        None => level.to_string(),
    }
}

/// Stack one group's rows from 0, in the order given, on a 0..1 scale
pub fn stack_rows(rows: &[&LabeledRow], fill_scale: &DiscreteScale) -> (Vec<Bar>, Vec<TextMark>) {
    let total: u64 = rows.iter().map(|r| r.row.count).sum();
    let mut bars = Vec::with_capacity(rows.len());
    let mut marks = Vec::with_capacity(rows.len());

    let mut ymin = 0.0;
    for r in rows {
        let ymax = ymin + r.row.count as f64 / total as f64;
        bars.push(Bar {
            x: SLICE_X,
            ymin,
            ymax,
            fill: fill_scale
                .color_for(&r.row.category)
                .unwrap_or("gray")
                .to_string(),
            category: r.row.category.clone(),
        });
        marks.push(TextMark {
            x: SLICE_X,
            y: (ymin + ymax) / 2.0,
            text: r.slice_label.clone(),
        });
        ymin = ymax;
    }
    (bars, marks)
}

fn build_panels(
    rows: &[LabeledRow],
    contingency: &ContingencyTable,
    tests: &[GroupTest],
    fill_scale: &DiscreteScale,
    has_group: bool,
    opts: &PieOptions,
) -> Vec<Panel> {
    // rows come grouped in level order; an unfaceted pie is one group
    let groups: Vec<Option<&str>> = if has_group {
        contingency.row_levels.iter().map(|l| Some(l.as_str())).collect()
    } else {
        vec![None]
    };

    groups
        .into_iter()
        .filter_map(|group| {
            let members: Vec<&LabeledRow> = rows
                .iter()
                .filter(|r| r.row.group.as_deref() == group)
                .collect();
            if members.is_empty() {
                return None;
            }

            let (bars, marks) = stack_rows(&members, fill_scale);
            let mut layers = vec![
                Layer::Col {
                    position: Position::Fill,
                    width: 1.0,
                    outline: "black".to_string(),
                    bars,
                },
                Layer::Label { marks },
            ];

            if let Some(level) = group {
                let significance = tests
                    .iter()
                    .find(|t| t.group == level)
                    .map(|t| t.significance);
                let n_label = if opts.sample_size_label {
                    members.iter().find_map(|r| r.sample_size_label.as_deref())
                } else {
                    None
                };
                if let Some(text) = group_annotation(significance, n_label) {
                    layers.push(Layer::Text {
                        marks: vec![TextMark {
                            x: GROUP_LABEL_X,
                            y: GROUP_LABEL_Y,
                            text,
                        }],
                    });
                }
            }

            Some(Panel {
                title: group.map(|level| panel_title(level, opts.facet_wrap_name.as_deref())),
                layers,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsPlotError;
    use crate::ir::Layer;

    fn make_table(headers: &[&str], rows: &[&[&str]]) -> DataTable {
        DataTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn quiet(main: &str) -> PieOptions {
        let mut opts = PieOptions::new(main);
        opts.messages = false;
        opts.seed = Some(42);
        opts
    }

    fn col_layer(panel: &Panel) -> &Vec<Bar> {
        match &panel.layers[0] {
            Layer::Col { bars, .. } => bars,
            other => panic!("Expected Col layer, got {:?}", other),
        }
    }

    fn label_layer(panel: &Panel) -> &Vec<TextMark> {
        match &panel.layers[1] {
            Layer::Label { marks } => marks,
            other => panic!("Expected Label layer, got {:?}", other),
        }
    }

    #[test]
    fn test_single_pie_percentages() {
        let table = make_table(&["cat"], &[&["A"], &["A"], &["B"], &["NA"]]);
        let mut opts = quiet("cat");
        opts.results_subtitle = false;
        let spec = ggpiestats(&table, &opts).unwrap();

        assert_eq!(spec.kind, ChartKind::Pie);
        assert_eq!(spec.panels.len(), 1);
        assert_eq!(spec.panels[0].title, None);

        let labels: Vec<&str> = label_layer(&spec.panels[0]).iter().map(|m| m.text.as_str()).collect();
        // descending level order: B first, A second
        assert_eq!(labels, vec!["33%", "67%"]);
        assert_eq!(spec.labels.legend.as_deref(), Some("cat"));
        assert_eq!(spec.coord, Coord::Polar { theta: Aesthetic::Y });
    }

    #[test]
    fn test_stacking_positions() {
        let table = make_table(&["cat"], &[&["A"], &["B"], &["B"], &["B"]]);
        let mut opts = quiet("cat");
        opts.results_subtitle = false;
        let spec = ggpiestats(&table, &opts).unwrap();

        let bars = col_layer(&spec.panels[0]);
        assert_eq!(bars[0].category, "B");
        assert_eq!((bars[0].ymin, bars[0].ymax), (0.0, 0.75));
        assert_eq!(bars[1].category, "A");
        assert_eq!((bars[1].ymin, bars[1].ymax), (0.75, 1.0));

        let marks = label_layer(&spec.panels[0]);
        assert_eq!(marks[0].y, 0.375);
        assert_eq!(marks[1].y, 0.875);
        assert!(marks.iter().all(|m| m.x == 1.0));
    }

    #[test]
    fn test_fill_colors_follow_levels() {
        let table = make_table(&["cat"], &[&["A"], &["B"], &["C"]]);
        let mut opts = quiet("cat");
        opts.results_subtitle = false;
        let spec = ggpiestats(&table, &opts).unwrap();

        let scale = spec.fill_scale.as_ref().unwrap();
        assert_eq!(scale.breaks, vec!["A", "B", "C"]);
        assert_eq!(scale.colors, vec!["#1B9E77", "#D95F02", "#7570B3"]);
        let bars = col_layer(&spec.panels[0]);
        assert_eq!(bars[0].category, "C");
        assert_eq!(bars[0].fill, "#7570B3");
    }

    #[test]
    fn test_faceted_pie_with_group_annotations() {
        let table = make_table(
            &["cyl", "am"],
            &[
                &["4", "0"], &["4", "0"], &["6", "0"], &["8", "0"], &["8", "0"], &["8", "0"],
                &["4", "1"], &["4", "1"], &["4", "1"], &["6", "1"], &["8", "1"],
            ],
        );
        let mut opts = quiet("cyl");
        opts.condition = Some("am".into());
        opts.facet_wrap_name = Some("Transmission".into());
        let spec = ggpiestats(&table, &opts).unwrap();

        assert_eq!(spec.panels.len(), 2);
        assert_eq!(spec.facet_layout, FacetLayout { nrow: 1, ncol: 2 });
        assert_eq!(spec.panels[0].title.as_deref(), Some("Transmission: 0"));
        assert_eq!(spec.panels[1].title.as_deref(), Some("Transmission: 1"));

        match &spec.panels[0].layers[2] {
            Layer::Text { marks } => {
                assert_eq!(marks.len(), 1);
                assert_eq!((marks[0].x, marks[0].y), (GROUP_LABEL_X, GROUP_LABEL_Y));
                assert!(marks[0].text.ends_with("(n = 6)"), "{}", marks[0].text);
            }
            other => panic!("Expected Text layer, got {:?}", other),
        }
        assert!(spec.labels.subtitle.as_deref().unwrap().starts_with("χ²(2) = "));
        assert!(spec.labels.caption.as_deref().unwrap().starts_with("In favor of null"));
    }

    #[test]
    fn test_group_annotation_can_be_disabled() {
        let table = make_table(&["x", "g"], &[&["a", "1"], &["b", "1"], &["a", "2"], &["b", "2"]]);
        let mut opts = quiet("x");
        opts.condition = Some("g".into());
        opts.facet_proptest = false;
        opts.sample_size_label = false;
        opts.results_subtitle = false;
        let spec = ggpiestats(&table, &opts).unwrap();
        assert!(spec.panels.iter().all(|p| p.layers.len() == 2));
    }

    #[test]
    fn test_weighted_pie() {
        let table = make_table(&["cat", "n"], &[&["X", "3"], &["Y", "1"]]);
        let mut opts = quiet("cat");
        opts.counts = Some("n".into());
        opts.slice_label = crate::labels::SliceLabel::Counts;
        opts.results_subtitle = false;
        let spec = ggpiestats(&table, &opts).unwrap();
        let labels: Vec<&str> = label_layer(&spec.panels[0]).iter().map(|m| m.text.as_str()).collect();
        assert_eq!(labels, vec!["n = 1", "n = 3"]);
    }

    #[test]
    fn test_missing_column_and_bad_weight() {
        let table = make_table(&["cat", "n"], &[&["X", "1.5"]]);
        assert!(matches!(
            ggpiestats(&table, &quiet("nope")),
            Err(StatsPlotError::MissingColumn(_))
        ));

        let mut opts = quiet("cat");
        opts.counts = Some("n".into());
        assert!(matches!(
            ggpiestats(&table, &opts),
            Err(StatsPlotError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_huge_weight_is_an_error() {
        let table = make_table(&["cat", "n"], &[&["X", "1e20"], &["Y", "1"]]);
        let mut opts = quiet("cat");
        opts.counts = Some("n".into());
        assert!(matches!(
            ggpiestats(&table, &opts),
            Err(StatsPlotError::InvalidWeight { row: 1, .. })
        ));
    }

    #[test]
    fn test_title_and_legend_override() {
        let table = make_table(&["cat"], &[&["A"], &["B"]]);
        let mut opts = quiet("CAT");
        opts.title = Some("Shares".into());
        opts.legend_title = Some("Category".into());
        opts.bf_message = false;
        let spec = ggpiestats(&table, &opts).unwrap();
        assert_eq!(spec.labels.title.as_deref(), Some("Shares"));
        assert_eq!(spec.labels.legend.as_deref(), Some("Category"));
        assert!(spec.labels.subtitle.as_deref().unwrap().starts_with("χ²_gof(1) = 0.00"));
    }
}
