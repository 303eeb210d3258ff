//! Table types shared by the CSV reader, the projector and the sinks

use serde::{Deserialize, Serialize};

/// A named table: header columns plus rows of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Table name (sink target)
    pub name: String,
    /// Column definitions
    pub columns: Vec<Column>,
    /// Row data
    pub rows: Vec<Row>,
}

impl Table {
    /// Create an empty table with the given headers
    pub fn new<S: AsRef<str>>(name: impl Into<String>, headers: &[S]) -> Self {
        Self {
            name: name.into(),
            columns: headers
                .iter()
                .enumerate()
                .map(|(i, h)| Column::new(h.as_ref().to_string(), i))
                .collect(),
            rows: Vec::new(),
        }
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Header names in column order
    pub fn headers(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Find a column by name
    pub fn find_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a header at the end of the column list
    pub fn push_column(&mut self, name: impl Into<String>) {
        let index = self.columns.len();
        self.columns.push(Column::new(name.into(), index));
    }

    /// Append a row as-is
    pub fn push_row(&mut self, cells: Vec<CellValue>) {
        self.rows.push(Row::new(cells));
    }

    /// Look up a cell by row index and column name
    pub fn cell(&self, row: usize, column: &str) -> Option<&CellValue> {
        let col = self.find_column(column)?;
        self.rows.get(row).and_then(|r| r.get(col.index))
    }

    /// Pad every row shorter than `width` with empty cells.
    ///
    /// Rows already at or beyond `width` are left untouched.
    pub fn pad_rows(&mut self, width: usize) {
        for row in &mut self.rows {
            if row.cells.len() < width {
                row.cells.resize(width, CellValue::Empty);
            }
        }
    }
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name (e.g., "allyCode" or "ability_0")
    pub name: String,
    /// Column index (0-based)
    pub index: usize,
}

impl Column {
    /// Create a new column
    pub fn new(name: String, index: usize) -> Self {
        Self { name, index }
    }
}

/// A row of data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Cell values for each column
    pub cells: Vec<CellValue>,
}

impl Row {
    /// Create a new row
    pub fn new(cells: Vec<CellValue>) -> Self {
        Self { cells }
    }

    /// Get a cell value by column index
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.cells.get(index)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// A cell value with type detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer value
    Integer(i64),
    /// Floating-point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// String value
    String(String),
    /// Empty/null cell
    Empty,
}

impl CellValue {
    /// Parse a string into a CellValue, detecting the type
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        // Try parsing as integer first
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Integer(i);
        }

        // Try parsing as float
        if let Ok(f) = trimmed.parse::<f64>() {
            return CellValue::Float(f);
        }

        match trimmed {
            "true" => CellValue::Boolean(true),
            "false" => CellValue::Boolean(false),
            _ => CellValue::String(trimmed.to_string()),
        }
    }

    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric view of the cell, truncating floats and treating anything
    /// non-numeric as zero
    pub fn as_i64(&self) -> i64 {
        match self {
            CellValue::Integer(i) => *i,
            CellValue::Float(f) => *f as i64,
            CellValue::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    /// Convert to a display string
    pub fn to_string_value(&self) -> String {
        match self {
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Boolean(b) => b.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Float(fl) => write!(f, "{}", fl),
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::String(s) => write!(f, "{}", s),
            CellValue::Empty => write!(f, ""),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Integer(v)
    }
}

impl From<u64> for CellValue {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or_else(|_| CellValue::String(v.to_string()), CellValue::Integer)
    }
}

impl From<u32> for CellValue {
    fn from(v: u32) -> Self {
        CellValue::Integer(i64::from(v))
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Boolean(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::String(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::String(v)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(CellValue::Empty, Into::into)
    }
}
