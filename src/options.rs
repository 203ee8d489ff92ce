//! Chart options, deserialisable from JSON with per-field defaults.

use crate::error::{Result, StatsPlotError};
use crate::labels::SliceLabel;
use crate::palette::PaletteRef;
use crate::stats::bayes::{FixedMargin, SamplingPlan};
use crate::stats::location::TestType;
use crate::theme::ThemePreset;
use serde::{Deserialize, Serialize};

/// Options for [`ggpiestats`](crate::pie::ggpiestats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieOptions {
    pub main: String,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub counts: Option<String>,
    /// Expected proportions for the goodness-of-fit and per-group tests
    #[serde(default)]
    pub ratio: Option<Vec<f64>>,
    #[serde(default)]
    pub paired: bool,
    #[serde(default = "default_true")]
    pub results_subtitle: bool,
    #[serde(default)]
    pub stat_title: Option<String>,
    #[serde(default = "default_true")]
    pub sample_size_label: bool,
    #[serde(default = "default_true")]
    pub bf_message: bool,
    #[serde(default)]
    pub sampling_plan: SamplingPlan,
    #[serde(default)]
    pub fixed_margin: FixedMargin,
    #[serde(default = "default_prior_concentration")]
    pub prior_concentration: f64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default = "default_conf_level")]
    pub conf_level: f64,
    #[serde(default = "default_pie_nboot")]
    pub nboot: usize,
    #[serde(default)]
    pub simulate_p_value: bool,
    #[serde(default = "default_b")]
    pub b: usize,
    #[serde(default)]
    pub legend_title: Option<String>,
    #[serde(default)]
    pub facet_wrap_name: Option<String>,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default)]
    pub perc_k: usize,
    #[serde(default)]
    pub slice_label: SliceLabel,
    #[serde(default = "default_true")]
    pub facet_proptest: bool,
    #[serde(default)]
    pub theme: ThemePreset,
    #[serde(default = "default_true")]
    pub ggstatsplot_layer: bool,
    #[serde(default)]
    pub palette: PaletteRef,
    #[serde(default = "default_direction")]
    pub direction: i8,
    #[serde(default = "default_true")]
    pub messages: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Centrality measure drawn on the dot chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Centrality {
    #[default]
    Mean,
    Median,
}

impl Centrality {
    pub fn name(&self) -> &'static str {
        match self {
            Centrality::Mean => "mean",
            Centrality::Median => "median",
        }
    }
}

/// Options for [`ggdotplotstats`](crate::dot::ggdotplotstats).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DotOptions {
    pub x: String,
    pub y: String,
    #[serde(default)]
    pub xlab: Option<String>,
    #[serde(default)]
    pub ylab: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default, rename = "type")]
    pub test_type: TestType,
    #[serde(default)]
    pub test_value: f64,
    #[serde(default)]
    pub test_value_line: bool,
    #[serde(default = "default_bf_prior")]
    pub bf_prior: f64,
    #[serde(default = "default_true")]
    pub bf_message: bool,
    #[serde(default = "default_conf_level")]
    pub conf_level: f64,
    #[serde(default = "default_dot_nboot")]
    pub nboot: usize,
    #[serde(default = "default_k")]
    pub k: usize,
    #[serde(default = "default_true")]
    pub results_subtitle: bool,
    #[serde(default = "default_point_color")]
    pub point_color: String,
    #[serde(default = "default_point_size")]
    pub point_size: f64,
    #[serde(default = "default_true")]
    pub centrality_line: bool,
    #[serde(default)]
    pub centrality_para: Centrality,
    #[serde(default = "default_centrality_color")]
    pub centrality_color: String,
    #[serde(default = "default_test_value_color")]
    pub test_value_color: String,
    #[serde(default)]
    pub theme: ThemePreset,
    #[serde(default = "default_true")]
    pub ggstatsplot_layer: bool,
    #[serde(default = "default_true")]
    pub messages: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_true() -> bool { true }
fn default_conf_level() -> f64 { 0.95 }
fn default_k() -> usize { 2 }
fn default_pie_nboot() -> usize { 25 }
fn default_dot_nboot() -> usize { 100 }
fn default_b() -> usize { 2000 }
fn default_prior_concentration() -> f64 { 1.0 }
fn default_direction() -> i8 { 1 }
fn default_bf_prior() -> f64 { 0.707 }
fn default_point_color() -> String { "black".to_string() }
fn default_point_size() -> f64 { 3.0 }
fn default_centrality_color() -> String { "blue".to_string() }
fn default_test_value_color() -> String { "black".to_string() }

impl PieOptions {
    pub fn new(main: impl Into<String>) -> Self {
        PieOptions {
            main: main.into(),
            condition: None,
            counts: None,
            ratio: None,
            paired: false,
            results_subtitle: true,
            stat_title: None,
            sample_size_label: true,
            bf_message: true,
            sampling_plan: SamplingPlan::default(),
            fixed_margin: FixedMargin::default(),
            prior_concentration: default_prior_concentration(),
            title: None,
            caption: None,
            conf_level: default_conf_level(),
            nboot: default_pie_nboot(),
            simulate_p_value: false,
            b: default_b(),
            legend_title: None,
            facet_wrap_name: None,
            k: default_k(),
            perc_k: 0,
            slice_label: SliceLabel::default(),
            facet_proptest: true,
            theme: ThemePreset::default(),
            ggstatsplot_layer: true,
            palette: PaletteRef::default(),
            direction: default_direction(),
            messages: true,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_conf_level(self.conf_level)?;
        if self.simulate_p_value && self.b == 0 {
            return Err(StatsPlotError::invalid_option("b", "needs at least one replicate"));
        }
        Ok(())
    }
}

impl DotOptions {
    pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
        DotOptions {
            x: x.into(),
            y: y.into(),
            xlab: None,
            ylab: None,
            title: None,
            subtitle: None,
            caption: None,
            test_type: TestType::default(),
            test_value: 0.0,
            test_value_line: false,
            bf_prior: default_bf_prior(),
            bf_message: true,
            conf_level: default_conf_level(),
            nboot: default_dot_nboot(),
            k: default_k(),
            results_subtitle: true,
            point_color: default_point_color(),
            point_size: default_point_size(),
            centrality_line: true,
            centrality_para: Centrality::default(),
            centrality_color: default_centrality_color(),
            test_value_color: default_test_value_color(),
            theme: ThemePreset::default(),
            ggstatsplot_layer: true,
            messages: true,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_conf_level(self.conf_level)?;
        if !self.test_value.is_finite() {
            return Err(StatsPlotError::invalid_option("test_value", "must be finite"));
        }
        Ok(())
    }
}

fn validate_conf_level(conf_level: f64) -> Result<()> {
    if conf_level > 0.0 && conf_level < 1.0 {
        Ok(())
    } else {
        Err(StatsPlotError::invalid_option(
            "conf_level",
            format!("{} is not between 0 and 1", conf_level),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pie_options_defaults_from_json() {
        let opts: PieOptions = serde_json::from_value(json!({ "main": "cyl" })).unwrap();
        assert_eq!(opts.main, "cyl");
        assert_eq!(opts.conf_level, 0.95);
        assert_eq!(opts.nboot, 25);
        assert_eq!(opts.k, 2);
        assert_eq!(opts.perc_k, 0);
        assert_eq!(opts.slice_label, SliceLabel::Percentage);
        assert_eq!(opts.palette, PaletteRef::Name("Dark2".into()));
        assert!(opts.facet_proptest);
        assert!(opts.messages);
    }

    #[test]
    fn test_pie_options_overrides() {
        let opts: PieOptions = serde_json::from_value(json!({
            "main": "cyl",
            "condition": "am",
            "slice_label": "both",
            "palette": 3,
            "sampling_plan": "jointMulti",
            "fixed_margin": "cols",
            "ratio": [0.5, 0.25, 0.25]
        }))
        .unwrap();
        assert_eq!(opts.condition.as_deref(), Some("am"));
        assert_eq!(opts.slice_label, SliceLabel::Both);
        assert_eq!(opts.palette, PaletteRef::Index(3));
        assert_eq!(opts.sampling_plan, SamplingPlan::JointMulti);
        assert_eq!(opts.fixed_margin, FixedMargin::Cols);
        assert_eq!(opts.ratio, Some(vec![0.5, 0.25, 0.25]));
    }

    #[test]
    fn test_dot_options_type_aliases() {
        let opts: DotOptions =
            serde_json::from_value(json!({ "x": "price", "y": "brand", "type": "np" })).unwrap();
        assert_eq!(opts.test_type, TestType::Nonparametric);
        assert_eq!(opts.bf_prior, 0.707);
        assert_eq!(opts.nboot, 100);
        assert_eq!(opts.centrality_para, Centrality::Mean);
    }

    #[test]
    fn test_new_matches_serde_defaults() {
        let from_json: DotOptions =
            serde_json::from_value(json!({ "x": "a", "y": "b" })).unwrap();
        let built = DotOptions::new("a", "b");
        assert_eq!(
            serde_json::to_value(&from_json).unwrap(),
            serde_json::to_value(&built).unwrap()
        );
    }

    #[test]
    fn test_validate_conf_level() {
        let mut opts = PieOptions::new("x");
        assert!(opts.validate().is_ok());
        opts.conf_level = 95.0;
        assert!(matches!(opts.validate(), Err(StatsPlotError::InvalidOption { .. })));
    }
}
