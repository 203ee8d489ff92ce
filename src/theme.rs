//! Theme Resolution
//!
//! Resolves a theme preset into concrete, fully-specified styles for the renderer.
//! Elements inherit from three roots, as in ggplot2:
//! ```text
//! text
//! ├── plot_title / plot_subtitle / plot_caption
//! ├── axis_text / axis_title
//! ├── strip_text
//! └── legend_text / legend_title
//!
//! rect
//! ├── plot_background
//! ├── panel_background
//! └── strip_background
//!
//! line
//! ├── axis_line / axis_ticks
//! └── panel_grid_major
//!     └── panel_grid_minor
//! ```

use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

// === Resolved Types (no Options - fully concrete) ===

/// Fully resolved text style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedText {
    pub family: String,
    pub color: RGBColor,
    pub size: f64,
    pub face: FontFace,
}

/// Fully resolved line style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedLine {
    pub color: RGBColor,
    pub width: f64,
    pub linetype: LineType,
}

/// Fully resolved rectangle style ready for rendering
#[derive(Debug, Clone)]
pub struct ResolvedRect {
    pub fill: RGBColor,
    pub border_color: Option<RGBColor>,
    pub border_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FontFace {
    Plain,
    Bold,
    Italic,
    BoldItalic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Solid,
    Dashed,
    Dotted,
}

/// Complete themes available to the charts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreset {
    #[default]
    Bw,
    Classic,
    Minimal,
    #[serde(alias = "grey")]
    #[value(alias = "grey")]
    Gray,
}

/// Complete resolved theme with all elements fully specified
#[derive(Debug, Clone)]
pub struct ResolvedTheme {
    pub plot_background: ResolvedRect,
    pub panel_background: ResolvedRect,
    pub strip_background: Option<ResolvedRect>,
    pub plot_title: ResolvedText,
    pub plot_subtitle: ResolvedText,
    pub plot_caption: ResolvedText,
    pub strip_text: ResolvedText,
    pub axis_text: ResolvedText,
    pub axis_title: ResolvedText,
    pub legend_title: ResolvedText,
    pub legend_text: ResolvedText,
    pub panel_grid_major: Option<ResolvedLine>, // None if blank
    pub panel_grid_minor: Option<ResolvedLine>,
    pub axis_line: Option<ResolvedLine>,
    pub axis_ticks: Option<ResolvedLine>,
}

// === Default Values ===

impl Default for ResolvedText {
    fn default() -> Self {
        ResolvedText {
            family: "sans-serif".to_string(),
            color: RGBColor(0, 0, 0),
            size: 12.0,
            face: FontFace::Plain,
        }
    }
}

impl Default for ResolvedLine {
    fn default() -> Self {
        ResolvedLine {
            color: RGBColor(0, 0, 0),
            width: 1.0,
            linetype: LineType::Solid,
        }
    }
}

impl Default for ResolvedRect {
    fn default() -> Self {
        ResolvedRect {
            fill: RGBColor(255, 255, 255),
            border_color: None,
            border_width: 0.0,
        }
    }
}

// === Color Parsing ===

/// Parse a color string into RGBColor, supporting hex (#RRGGBB, #RGB) and named colors
pub fn parse_color(color_str: &str) -> Option<RGBColor> {
    let color_str = color_str.trim();

    if color_str.starts_with('#') {
        return parse_hex_color(color_str);
    }

    match color_str.to_lowercase().as_str() {
        "white" => Some(RGBColor(255, 255, 255)),
        "black" => Some(RGBColor(0, 0, 0)),
        "red" => Some(RGBColor(255, 0, 0)),
        "green" => Some(RGBColor(0, 128, 0)),
        "blue" => Some(RGBColor(0, 0, 255)),
        "orange" => Some(RGBColor(255, 165, 0)),
        "purple" => Some(RGBColor(128, 0, 128)),
        "darkgreen" => Some(RGBColor(0, 100, 0)),
        "darkred" => Some(RGBColor(139, 0, 0)),
        "gray" | "grey" => Some(RGBColor(190, 190, 190)),
        // gray0 to gray100
        s if s.starts_with("gray") || s.starts_with("grey") => {
            let n = s[4..].parse::<u8>().ok().filter(|n| *n <= 100)?;
            let v = (n as f64 * 2.55).round() as u8;
            Some(RGBColor(v, v, v))
        }
        _ => None,
    }
}

/// Parse hex color (#RRGGBB or #RGB)
fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim_start_matches('#');
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(RGBColor(r, g, b))
        }
        3 => {
            let r = u8::from_str_radix(&hex[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&hex[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&hex[2..3], 16).ok()? * 17;
            Some(RGBColor(r, g, b))
        }
        _ => None,
    }
}

fn gray(level: u8) -> RGBColor {
    let v = (level as f64 * 2.55).round() as u8;
    RGBColor(v, v, v)
}

fn text_with(base: &ResolvedText, size: f64, face: FontFace, color: RGBColor) -> ResolvedText {
    ResolvedText {
        size,
        face,
        color,
        ..base.clone()
    }
}

// === Resolution Logic ===

impl ThemePreset {
    /// Resolve the preset into concrete styles.
    ///
    /// `ggstatsplot_layer` enlarges and emboldens the title and subtitle.
    pub fn resolve(&self, ggstatsplot_layer: bool) -> ResolvedTheme {
        let base_text = ResolvedText::default();
        let base_line = ResolvedLine::default();
        let base_rect = ResolvedRect::default();

        let grid = ResolvedLine {
            color: gray(92),
            width: 1.0,
            ..base_line.clone()
        };
        let minor = |major: &ResolvedLine| ResolvedLine {
            width: major.width * 0.5,
            ..major.clone()
        };
        let bordered = ResolvedRect {
            border_color: Some(gray(20)),
            border_width: 1.0,
            ..base_rect.clone()
        };

        let (panel_background, strip_background, panel_grid_major, axis_line) = match self {
            ThemePreset::Bw => (
                bordered.clone(),
                Some(ResolvedRect {
                    fill: gray(85),
                    ..bordered
                }),
                Some(grid),
                None,
            ),
            ThemePreset::Classic => (base_rect.clone(), None, None, Some(base_line.clone())),
            ThemePreset::Minimal => (base_rect.clone(), None, Some(grid), None),
            ThemePreset::Gray => (
                ResolvedRect {
                    fill: gray(92),
                    ..base_rect.clone()
                },
                Some(ResolvedRect {
                    fill: gray(85),
                    ..base_rect.clone()
                }),
                Some(ResolvedLine {
                    color: RGBColor(255, 255, 255),
                    ..base_line.clone()
                }),
                None,
            ),
        };
        let panel_grid_minor = panel_grid_major.as_ref().map(minor);
        let axis_ticks = match self {
            ThemePreset::Minimal => None,
            _ => Some(ResolvedLine {
                color: gray(20),
                width: 0.5,
                ..base_line.clone()
            }),
        };

        let (title_size, title_face, subtitle_size, subtitle_face) = if ggstatsplot_layer {
            (16.0, FontFace::Bold, 12.0, FontFace::Bold)
        } else {
            (14.0, FontFace::Plain, 11.0, FontFace::Plain)
        };

        ResolvedTheme {
            plot_background: base_rect,
            panel_background,
            strip_background,
            plot_title: text_with(&base_text, title_size, title_face, base_text.color),
            plot_subtitle: text_with(&base_text, subtitle_size, subtitle_face, base_text.color),
            plot_caption: text_with(&base_text, 9.0, FontFace::Plain, gray(30)),
            strip_text: text_with(&base_text, 10.0, FontFace::Plain, gray(10)),
            axis_text: text_with(&base_text, 10.0, FontFace::Plain, gray(30)),
            axis_title: base_text.clone(),
            legend_title: text_with(&base_text, 11.0, FontFace::Bold, base_text.color),
            legend_text: text_with(&base_text, 10.0, FontFace::Plain, base_text.color),
            panel_grid_major,
            panel_grid_minor,
            axis_line,
            axis_ticks,
        }
    }
}
