use anyhow::{Context, Result};
use std::io::{self, Read};

/// Raw CSV contents: a header row plus string cells.
#[derive(Debug, Clone)]
pub struct CsvData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read CSV from stdin
pub fn read_csv_from_stdin() -> Result<CsvData> {
    let stdin = io::stdin();
    read_csv(stdin.lock())
}

/// Read CSV from any reader. Short rows are padded with empty (missing) cells.
pub fn read_csv<R: Read>(reader: R) -> Result<CsvData> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .context("Failed to read CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() {
        anyhow::bail!("CSV input has no header row");
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("Failed to read CSV record {}", idx + 1))?;
        let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    if rows.is_empty() {
        anyhow::bail!("CSV must contain at least one data row");
    }

    Ok(CsvData { headers, rows })
}
