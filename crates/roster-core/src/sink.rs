//! Table sinks: where projected tables are written

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Destination for output tables; each write replaces the previous content
pub trait TableSink {
    fn write_table(&mut self, table: &Table) -> Result<()>;
}

/// On-disk table format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }

    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "csv" => Some(OutputFormat::Csv),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        OutputFormat::from_extension(&s.trim().to_lowercase())
            .ok_or_else(|| Error::invalid_setting("format", s))
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Writes each table to `<dir>/<name>.<ext>`
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    format: OutputFormat,
}

impl DirectorySink {
    /// Open an existing output directory
    pub fn open<P: AsRef<Path>>(dir: P, format: OutputFormat) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::MissingSinkTarget(dir.to_path_buf()));
        }
        Ok(Self {
            dir: dir.to_path_buf(),
            format,
        })
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, self.format.extension()))
    }

    fn write_csv(&self, table: &Table, path: &Path) -> Result<()> {
        let csv_error = |e: csv::Error| Error::Csv {
            path: path.to_path_buf(),
            source: e,
        };

        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(csv_error)?;
        writer.write_record(table.headers()).map_err(csv_error)?;
        for row in &table.rows {
            writer
                .write_record(row.cells.iter().map(|c| c.to_string_value()))
                .map_err(csv_error)?;
        }
        writer.flush()?;
        Ok(())
    }

    fn write_json(&self, table: &Table, path: &Path) -> Result<()> {
        let records: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                let record: Map<String, Value> = table
                    .columns
                    .iter()
                    .map(|col| (col.name.clone(), row.get(col.index).map_or(Value::Null, cell_to_json)))
                    .collect();
                Value::Object(record)
            })
            .collect();

        fs::write(path, serde_json::to_string_pretty(&records)?)?;
        Ok(())
    }
}

fn cell_to_json(cell: &CellValue) -> Value {
    match cell {
        CellValue::Integer(i) => Value::from(*i),
        CellValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        CellValue::Boolean(b) => Value::Bool(*b),
        CellValue::String(s) => Value::String(s.clone()),
        CellValue::Empty => Value::Null,
    }
}

impl TableSink for DirectorySink {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        let path = self.table_path(&table.name);
        tracing::debug!(path = %path.display(), rows = table.row_count(), "writing table");
        match self.format {
            OutputFormat::Csv => self.write_csv(table, &path),
            OutputFormat::Json => self.write_json(table, &path),
        }
    }
}

/// Keeps the last written version of every table in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub tables: BTreeMap<String, Table>,
    pub writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }
}

impl TableSink for MemorySink {
    fn write_table(&mut self, table: &Table) -> Result<()> {
        self.tables.insert(table.name.clone(), table.clone());
        self.writes += 1;
        Ok(())
    }
}

/// A table file found in an output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableFile {
    pub name: String,
    pub path: PathBuf,
    pub format: OutputFormat,
}

/// Table files directly inside `dir`, sorted by name
pub fn list_tables<P: AsRef<Path>>(dir: P) -> Result<Vec<TableFile>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::MissingSinkTarget(dir.to_path_buf()));
    }

    let mut tables = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(OutputFormat::from_extension);
        let name = path.file_stem().and_then(|s| s.to_str());

        if let (Some(format), Some(name)) = (format, name) {
            tables.push(TableFile {
                name: name.to_string(),
                path: path.to_path_buf(),
                format,
            });
        }
    }

    tables.sort_by(|a, b| a.name.cmp(&b.name).then(a.path.cmp(&b.path)));
    Ok(tables)
}
