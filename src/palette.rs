//! Discrete colour palettes for the pie fill scale.

use crate::error::{Result, StatsPlotError};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A palette chosen by name (`"Dark2"`) or by its position in [`PALETTES`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaletteRef {
    Index(usize),
    Name(String),
}

impl Default for PaletteRef {
    fn default() -> Self {
        PaletteRef::Name("Dark2".to_string())
    }
}

impl std::str::FromStr for PaletteRef {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(i) => PaletteRef::Index(i),
            Err(_) => PaletteRef::Name(s.trim().to_string()),
        })
    }
}

/// Qualitative ColorBrewer palettes
pub const PALETTES: &[(&str, &[&str])] = &[
    ("Accent", &["#7FC97F", "#BEAED4", "#FDC086", "#FFFF99", "#386CB0", "#F0027F", "#BF5B17", "#666666"]),
    ("Dark2", &["#1B9E77", "#D95F02", "#7570B3", "#E7298A", "#66A61E", "#E6AB02", "#A6761D", "#666666"]),
    ("Paired", &[
        "#A6CEE3", "#1F78B4", "#B2DF8A", "#33A02C", "#FB9A99", "#E31A1C",
        "#FDBF6F", "#FF7F00", "#CAB2D6", "#6A3D9A", "#FFFF99", "#B15928",
    ]),
    ("Pastel1", &["#FBB4AE", "#B3CDE3", "#CCEBC5", "#DECBE4", "#FED9A6", "#FFFFCC", "#E5D8BD", "#FDDAEC", "#F2F2F2"]),
    ("Pastel2", &["#B3E2CD", "#FDCDAC", "#CBD5E8", "#F4CAE4", "#E6F5C9", "#FFF2AE", "#F1E2CC", "#CCCCCC"]),
    ("Set1", &["#E41A1C", "#377EB8", "#4DAF4A", "#984EA3", "#FF7F00", "#FFFF33", "#A65628", "#F781BF", "#999999"]),
    ("Set2", &["#66C2A5", "#FC8D62", "#8DA0CB", "#E78AC3", "#A6D854", "#FFD92F", "#E5C494", "#B3B3B3"]),
    ("Set3", &[
        "#8DD3C7", "#FFFFB3", "#BEBADA", "#FB8072", "#80B1D3", "#FDB462",
        "#B3DE69", "#FCCDE5", "#D9D9D9", "#BC80BD", "#CCEBC5", "#FFED6F",
    ]),
];

fn lookup(palette: &PaletteRef) -> Result<(&'static str, &'static [&'static str])> {
    match palette {
        PaletteRef::Name(name) => PALETTES
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .copied()
            .ok_or_else(|| StatsPlotError::UnknownPalette(name.clone())),
        PaletteRef::Index(i) => {
            // 1-based, as palettes are numbered for users
            let idx = i.checked_sub(1).unwrap_or(usize::MAX);
            PALETTES
                .get(idx)
                .copied()
                .ok_or_else(|| StatsPlotError::UnknownPalette(i.to_string()))
        }
    }
}

/// Colours for `n` categories. Negative `direction` reverses the palette.
/// When the palette is too short a warning is logged and colours are recycled.
pub fn palette_colors(palette: &PaletteRef, direction: i8, n: usize) -> Result<Vec<String>> {
    let (name, colors) = lookup(palette)?;

    if n > colors.len() {
        let err = StatsPlotError::InsufficientPalette {
            palette: name.to_string(),
            available: colors.len(),
            requested: n,
        };
        warn!("{}; colours will be recycled", err);
    }

    let mut ordered: Vec<&str> = colors.to_vec();
    if direction < 0 {
        ordered.reverse();
    }

    Ok(ordered.iter().cycle().take(n).map(|c| c.to_string()).collect())
}
