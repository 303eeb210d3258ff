//! Rename/Add/Remove (RAR) directives
//!
//! Manual corrections live in a CSV table with the columns
//! `targetGuild,newName,addAllyCode,removeAllyCode`. A row with a non-zero
//! add code always yields an add directive (to `targetGuild`, or to a
//! single-player pseudo-guild when blank) and, if `newName` is set, a rename.
//! A row with a non-zero remove code yields a remove directive.

use crate::error::Result;
use crate::parser::parse_csv;
use crate::table::{CellValue, Table};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const RAR_HEADERS: [&str; 4] = ["targetGuild", "newName", "addAllyCode", "removeAllyCode"];

/// One row of the manual-edit table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RarRow {
    pub target_guild: String,
    pub new_name: String,
    pub add_ally_code: u64,
    pub remove_ally_code: u64,
}

impl RarRow {
    /// Rows without an add or remove code carry no directive
    pub fn is_directive(&self) -> bool {
        self.add_ally_code > 0 || self.remove_ally_code > 0
    }
}

/// Rename a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rename {
    pub ally_code: u64,
    pub new_name: String,
}

/// Add a player to a guild, or to the pseudo-guild when `target_guild` is None
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Add {
    pub ally_code: u64,
    pub target_guild: Option<String>,
}

/// The three ordered directive lists of one refresh cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RarDirectives {
    pub rename: Vec<Rename>,
    pub add: Vec<Add>,
    pub remove: Vec<u64>,
}

impl RarDirectives {
    /// Derive directives from manual-edit rows, keeping row order
    pub fn from_rows(rows: &[RarRow]) -> Self {
        let mut directives = Self::default();

        for row in rows {
            let target = row.target_guild.trim();
            let name = row.new_name.trim();

            if row.add_ally_code > 0 {
                if !name.is_empty() {
                    directives.rename.push(Rename {
                        ally_code: row.add_ally_code,
                        new_name: name.to_string(),
                    });
                }
                directives.add.push(Add {
                    ally_code: row.add_ally_code,
                    target_guild: (!target.is_empty()).then(|| target.to_string()),
                });
            }

            if row.remove_ally_code > 0 && !directives.remove.contains(&row.remove_ally_code) {
                directives.remove.push(row.remove_ally_code);
            }
        }

        directives
    }

    pub fn is_empty(&self) -> bool {
        self.rename.is_empty() && self.add.is_empty() && self.remove.is_empty()
    }
}

/// Read manual-edit rows from a parsed table.
///
/// Columns are looked up by header name; a table without the expected
/// headers is read positionally.
pub fn rows_from_table(table: &Table) -> Vec<RarRow> {
    let index = |name: &str, fallback: usize| {
        table.find_column(name).map(|c| c.index).unwrap_or(fallback)
    };
    let target_idx = index(RAR_HEADERS[0], 0);
    let name_idx = index(RAR_HEADERS[1], 1);
    let add_idx = index(RAR_HEADERS[2], 2);
    let remove_idx = index(RAR_HEADERS[3], 3);

    table
        .rows
        .iter()
        .map(|row| {
            let text = |i: usize| row.get(i).map(CellValue::to_string_value).unwrap_or_default();
            let code = |i: usize| row.get(i).map(parse_ally_code).unwrap_or(0);
            RarRow {
                target_guild: text(target_idx).trim().to_string(),
                new_name: text(name_idx).trim().to_string(),
                add_ally_code: code(add_idx),
                remove_ally_code: code(remove_idx),
            }
        })
        .collect()
}

/// Load manual-edit rows from a CSV file; no file configured means no rows
pub fn load_rows(path: Option<&Path>) -> Result<Vec<RarRow>> {
    match path {
        Some(path) => Ok(rows_from_table(&parse_csv(path)?)),
        None => Ok(Vec::new()),
    }
}

/// Write an empty manual-edit table with the expected headers
pub fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
    fs::write(path, format!("{}\n", RAR_HEADERS.join(",")))?;
    Ok(())
}

/// Read an ally code from a cell. Dashed forms such as `123-456-789` are
/// accepted; anything without digits reads as zero.
pub fn parse_ally_code(cell: &CellValue) -> u64 {
    match cell {
        CellValue::Integer(i) if *i > 0 => *i as u64,
        CellValue::Float(f) if *f > 0.0 => *f as u64,
        CellValue::String(s) => {
            let digits: String = s.chars().filter(char::is_ascii_digit).collect();
            digits.parse().unwrap_or(0)
        }
        _ => 0,
    }
}
