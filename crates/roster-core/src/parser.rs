//! CSV reader for manual-edit tables and previously written outputs

use crate::error::{Error, Result};
use crate::table::{CellValue, Row, Table};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Parse a CSV file into a Table named after the file stem
pub fn parse_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();

    read_table(BufReader::new(file), name, path)
}

/// Parse CSV from a string (useful for testing)
pub fn parse_csv_str(content: &str, name: &str) -> Result<Table> {
    read_table(content.as_bytes(), name.to_string(), Path::new(name))
}

fn read_table<R: Read>(reader: R, name: String, path: &Path) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // manual-edit tables often have ragged rows
        .from_reader(reader);

    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.to_path_buf(),
        source: e,
    })?;

    let headers: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(Error::CsvParse {
            path: path.to_path_buf(),
            message: "no columns found in CSV".to_string(),
        });
    }

    let mut table = Table::new(name, &headers);
    let width = table.column_count();

    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        if cells.len() > width {
            tracing::warn!(
                row = row_idx + 1,
                path = %path.display(),
                "row has more cells than columns, truncating"
            );
            cells.truncate(width);
        }
        cells.resize(width, CellValue::Empty);

        table.rows.push(Row::new(cells));
    }

    Ok(table)
}
