//! `ggdotplotstats`: ranked dot chart of per-label means with a one-sample test
//! of those means.

use crate::aggregate::{rank_means, RankRow};
use crate::annotate::dot_annotation;
use crate::data::DataTable;
use crate::error::Result;
use crate::ir::{
    AxisSpec, ChartKind, ChartSpec, Coord, FacetLayout, Labels, Layer, Panel, PointMark, ThemeSpec,
};
use crate::options::{Centrality, DotOptions};
use crate::select::prepare_numeric;
use crate::stats::format::format_num;
use crate::stats::resample::{make_rng, mean, median};
use crate::theme::LineType;
use tracing::debug;

/// Build the annotated dot chart for `table`
pub fn ggdotplotstats(table: &DataTable, opts: &DotOptions) -> Result<ChartSpec> {
    opts.validate()?;

    let values = prepare_numeric(table, &opts.x, &opts.y)?;
    let ranked = rank_means(&values)?;
    debug!("Ranked {} labels by mean", ranked.len());

    let means: Vec<f64> = ranked.iter().map(|r| r.mean).collect();
    let mut rng = make_rng(opts.seed);
    let annotation = dot_annotation(&means, opts, &mut rng)?;

    let mut layers = vec![Layer::Point {
        color: opts.point_color.clone(),
        size: opts.point_size,
        points: ranked
            .iter()
            .map(|r| PointMark {
                x: r.mean,
                y: r.rank as f64,
                label: r.label.clone(),
            })
            .collect(),
    }];

    if opts.centrality_line {
        let value = centrality(&means, opts.centrality_para);
        layers.push(Layer::VLine {
            x: value,
            color: opts.centrality_color.clone(),
            linetype: LineType::Dashed,
            label: Some(format!(
                "{} = {}",
                opts.centrality_para.name(),
                format_num(value, opts.k)
            )),
        });
    }
    if opts.test_value_line {
        layers.push(Layer::VLine {
            x: opts.test_value,
            color: opts.test_value_color.clone(),
            linetype: LineType::Solid,
            label: Some(format!("test = {}", format_num(opts.test_value, opts.k))),
        });
    }

    let y_label = match &opts.ylab {
        Some(label) => label.clone(),
        None => table.column_name(&opts.y)?.to_string(),
    };
    let (y_axis, secondary_y_axis) = rank_axes(&ranked, Some(y_label));

    let x_label = match &opts.xlab {
        Some(label) => label.clone(),
        None => table.column_name(&opts.x)?.to_string(),
    };

    Ok(ChartSpec {
        kind: ChartKind::Dot,
        facet_layout: FacetLayout::wrap(1),
        panels: vec![Panel {
            title: None,
            layers,
        }],
        coord: Coord::Cartesian,
        fill_scale: None,
        y_axis: Some(y_axis),
        secondary_y_axis: Some(secondary_y_axis),
        labels: Labels {
            title: opts.title.clone(),
            subtitle: annotation.subtitle,
            caption: annotation.caption,
            x: Some(x_label),
            y: None,
            legend: None,
        },
        theme: ThemeSpec {
            preset: opts.theme,
            ggstatsplot_layer: opts.ggstatsplot_layer,
        },
    })
}

pub fn centrality(means: &[f64], para: Centrality) -> f64 {
    match para {
        Centrality::Mean => mean(means),
        Centrality::Median => median(means),
    }
}

/// Primary axis labels each rank with its category; the secondary one with its percentile
pub fn rank_axes(ranked: &[RankRow], title: Option<String>) -> (AxisSpec, AxisSpec) {
    let breaks: Vec<f64> = ranked.iter().map(|r| r.rank as f64).collect();
    let limits = (0.5, ranked.len() as f64 + 0.5);

    let primary = AxisSpec {
        title,
        breaks: breaks.clone(),
        labels: ranked.iter().map(|r| r.label.clone()).collect(),
        limits,
    };
    let secondary = AxisSpec {
        title: Some("percentile".to_string()),
        breaks,
        labels: ranked
            .iter()
            .map(|r| format!("{}%", format_num(r.percentile, 0)))
            .collect(),
        limits,
    };
    (primary, secondary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatsPlotError;
    use crate::stats::location::TestType;

    fn make_table() -> DataTable {
        let rows = [
            ("12.0", "Audi"),
            ("14.0", "Audi"),
            ("20.0", "BMW"),
            ("22.0", "BMW"),
            ("8.0", "Fiat"),
            ("NA", "Fiat"),
            ("17.0", "Kia"),
            ("30.0", "Tesla"),
            ("5.0", "NA"),
        ];
        DataTable::new(
            vec!["price".to_string(), "brand".to_string()],
            rows.iter()
                .map(|(p, b)| vec![p.to_string(), b.to_string()])
                .collect(),
        )
    }

    fn quiet() -> DotOptions {
        let mut opts = DotOptions::new("price", "brand");
        opts.messages = false;
        opts.seed = Some(7);
        opts
    }

    #[test]
    fn test_dot_chart_points_and_axes() {
        let spec = ggdotplotstats(&make_table(), &quiet()).unwrap();
        assert_eq!(spec.kind, ChartKind::Dot);
        assert_eq!(spec.coord, Coord::Cartesian);

        let Layer::Point { points, .. } = &spec.panels[0].layers[0] else {
            panic!("Expected Point layer");
        };
        let labels: Vec<&str> = points.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Fiat", "Audi", "Kia", "BMW", "Tesla"]);
        assert_eq!(points[1].x, 13.0);
        assert_eq!(points[1].y, 2.0);

        let y = spec.y_axis.as_ref().unwrap();
        assert_eq!(y.breaks, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(y.labels[4], "Tesla");
        assert_eq!(y.title.as_deref(), Some("brand"));
        assert_eq!(y.limits, (0.5, 5.5));

        let sec = spec.secondary_y_axis.as_ref().unwrap();
        assert_eq!(sec.title.as_deref(), Some("percentile"));
        assert_eq!(sec.labels, vec!["20%", "40%", "60%", "80%", "100%"]);
        assert_eq!(spec.labels.x.as_deref(), Some("price"));
    }

    #[test]
    fn test_centrality_line() {
        let spec = ggdotplotstats(&make_table(), &quiet()).unwrap();
        // means: 8, 13, 17, 21, 30
        match &spec.panels[0].layers[1] {
            Layer::VLine { x, label, linetype, .. } => {
                assert!((x - 17.8).abs() < 1e-12);
                assert_eq!(label.as_deref(), Some("mean = 17.80"));
                assert_eq!(*linetype, LineType::Dashed);
            }
            other => panic!("Expected VLine, got {:?}", other),
        }

        let mut opts = quiet();
        opts.centrality_para = Centrality::Median;
        opts.test_value_line = true;
        opts.test_value = 15.0;
        let spec = ggdotplotstats(&make_table(), &opts).unwrap();
        let layers = &spec.panels[0].layers;
        assert_eq!(layers.len(), 3);
        assert!(matches!(&layers[1], Layer::VLine { x, .. } if *x == 17.0));
        assert!(matches!(&layers[2], Layer::VLine { label: Some(l), .. } if l == "test = 15.00"));
    }

    #[test]
    fn test_subtitle_uses_means() {
        let mut opts = quiet();
        opts.test_value = 10.0;
        let spec = ggdotplotstats(&make_table(), &opts).unwrap();
        let subtitle = spec.labels.subtitle.unwrap();
        assert!(subtitle.starts_with("t(4) = "), "{}", subtitle);
        assert!(subtitle.ends_with("n = 5"));
        assert!(spec.labels.caption.unwrap().starts_with("In favor of null: log_e(BF01) = "));

        opts.test_type = TestType::Robust;
        let spec = ggdotplotstats(&make_table(), &opts).unwrap();
        assert!(spec.labels.subtitle.unwrap().starts_with("M_robust = "));
        assert_eq!(spec.labels.caption, None);
    }

    #[test]
    fn test_empty_group_is_an_error() {
        let table = DataTable::new(
            vec!["price".to_string(), "brand".to_string()],
            vec![
                vec!["1".to_string(), "A".to_string()],
                vec!["NA".to_string(), "B".to_string()],
            ],
        );
        assert!(matches!(
            ggdotplotstats(&table, &quiet()),
            Err(StatsPlotError::EmptyGroup(label)) if label == "B"
        ));
    }

    #[test]
    fn test_custom_axis_titles() {
        let mut opts = quiet();
        opts.xlab = Some("Price (k$)".into());
        opts.ylab = Some("Brand".into());
        opts.results_subtitle = false;
        let spec = ggdotplotstats(&make_table(), &opts).unwrap();
        assert_eq!(spec.labels.x.as_deref(), Some("Price (k$)"));
        assert_eq!(spec.y_axis.unwrap().title.as_deref(), Some("Brand"));
        assert_eq!(spec.labels.subtitle, None);
    }
}
