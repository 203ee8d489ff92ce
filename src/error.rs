use thiserror::Error;

/// Errors raised while turning a table into an annotated chart.
#[derive(Debug, Error)]
pub enum StatsPlotError {
    #[error("Column '{0}' not found")]
    MissingColumn(String),

    #[error("Invalid weight '{value}' in column '{column}' at row {row}: weights must be non-negative integers")]
    InvalidWeight {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Weights in column '{column}' expand to more than {limit} rows")]
    ExpansionTooLarge { column: String, limit: usize },

    #[error("Category '{0}' has no usable observations")]
    EmptyGroup(String),

    /// Only ever logged; the chart falls back to recycled colors.
    #[error("Palette '{palette}' has {available} colors but {requested} categories need one")]
    InsufficientPalette {
        palette: String,
        available: usize,
        requested: usize,
    },

    #[error("Failed to parse '{value}' as number in column '{column}' at row {row}")]
    InvalidNumber {
        column: String,
        row: usize,
        value: String,
    },

    #[error("No observations left after dropping missing values")]
    NoData,

    #[error("Unknown palette '{0}'")]
    UnknownPalette(String),

    #[error("Invalid option '{name}': {reason}")]
    InvalidOption { name: String, reason: String },

    #[error("Statistical test failed: {0}")]
    Test(String),
}

impl StatsPlotError {
    pub fn test(msg: impl Into<String>) -> Self {
        StatsPlotError::Test(msg.into())
    }

    pub fn invalid_option(name: &str, reason: impl Into<String>) -> Self {
        StatsPlotError::InvalidOption {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StatsPlotError>;
