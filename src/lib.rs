// Library exports for ggstats

pub mod aggregate;
pub mod annotate;
pub mod csv_reader;
pub mod data;
pub mod dot;
pub mod error;
pub mod graph;
pub mod ir;
pub mod labels;
pub mod options;
pub mod palette;
pub mod pie;
pub mod select;
pub mod stats;
pub mod theme;

pub use dot::ggdotplotstats;
pub use error::{Result, StatsPlotError};
pub use pie::ggpiestats;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[serde(rename = "png")]
    #[default]
    Png,
    #[serde(rename = "svg")]
    Svg,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default, rename = "type")]
    pub format: OutputFormat,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            format: OutputFormat::Png,
        }
    }
}
