use crate::error::{Result, StatsPlotError};

/// Cell spellings treated as missing values.
const MISSING_MARKERS: [&str; 4] = ["", "NA", "NaN", "null"];

/// The observation table handed to the chart functions.
#[derive(Debug, Clone)]
pub struct DataTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DataTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    /// Create a table from parsed CSV (CLI path)
    pub fn from_csv(csv: crate::csv_reader::CsvData) -> Self {
        Self {
            headers: csv.headers,
            rows: csv.rows,
        }
    }

    /// Case-insensitive column lookup
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| StatsPlotError::MissingColumn(name.to_string()))
    }

    /// Header spelling as it appears in the table
    pub fn column_name(&self, name: &str) -> Result<&str> {
        let idx = self.column_index(name)?;
        Ok(&self.headers[idx])
    }

    /// Cells of one column, with missing markers mapped to `None`
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>> {
        let idx = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| row.get(idx).map(String::as_str).filter(|s| !is_missing(s)))
            .collect())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}
