//! Declarative chart description produced by the chart functions.
//!
//! Everything here is already computed: stacked extents, label positions,
//! axis breaks and colours. The renderer draws it blindly and `--format json`
//! prints it as is.

use crate::theme::{LineType, ThemePreset};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Pie,
    Dot,
}

/// Immutable layered chart specification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub facet_layout: FacetLayout,
    pub panels: Vec<Panel>,
    pub coord: Coord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_scale: Option<DiscreteScale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_y_axis: Option<AxisSpec>,
    pub labels: Labels,
    pub theme: ThemeSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetLayout {
    pub nrow: usize,
    pub ncol: usize,
}

impl FacetLayout {
    /// Square-ish grid for `n_panels` facets
    pub fn wrap(n_panels: usize) -> Self {
        if n_panels <= 1 {
            return FacetLayout { nrow: 1, ncol: 1 };
        }
        let ncol = (n_panels as f64).sqrt().ceil() as usize;
        let nrow = (n_panels as f64 / ncol as f64).ceil() as usize;
        FacetLayout { nrow, ncol }
    }

    /// (row, col) of the panel at `index`
    pub fn position(&self, index: usize) -> (usize, usize) {
        (index / self.ncol, index % self.ncol)
    }
}

/// One facet. Unfaceted charts have a single untitled panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub layers: Vec<Layer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Fill,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "geom", rename_all = "lowercase")]
pub enum Layer {
    Col {
        position: Position,
        width: f64,
        outline: String,
        bars: Vec<Bar>,
    },
    /// Boxed labels drawn at each slice centre
    Label { marks: Vec<TextMark> },
    Text { marks: Vec<TextMark> },
    Point {
        color: String,
        size: f64,
        points: Vec<PointMark>,
    },
    VLine {
        x: f64,
        color: String,
        linetype: LineType,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

/// A stacked bar segment, already positioned
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bar {
    pub x: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub fill: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextMark {
    pub x: f64,
    pub y: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointMark {
    pub x: f64,
    pub y: f64,
    pub label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Aesthetic {
    X,
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Coord {
    Cartesian,
    Polar { theta: Aesthetic },
}

/// Discrete fill scale: one colour per break
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscreteScale {
    pub breaks: Vec<String>,
    pub colors: Vec<String>,
}

impl DiscreteScale {
    pub fn color_for(&self, level: &str) -> Option<&str> {
        self.breaks
            .iter()
            .position(|b| b == level)
            .and_then(|i| self.colors.get(i))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub breaks: Vec<f64>,
    pub labels: Vec<String>,
    pub limits: (f64, f64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Labels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThemeSpec {
    pub preset: ThemePreset,
    pub ggstatsplot_layer: bool,
}

impl ChartSpec {
    /// Every layer across panels, in drawing order
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.panels.iter().flat_map(|p| p.layers.iter())
    }
}
