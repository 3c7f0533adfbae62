use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::data::loader::write_rows;
use crate::error::Result;

// ---------------------------------------------------------------------------
// MergedReport – the wide per-host table
// ---------------------------------------------------------------------------

/// The merged table: fixed column order, one row per primary record, and a
/// set of highlighted cells kept apart from the values.
#[derive(Debug, Clone, Default)]
pub struct MergedReport {
    pub columns: Vec<String>,
    /// Header cell of the host identifier column.
    pub host_column: String,
    /// Each row has exactly `columns.len()` cells.
    pub rows: Vec<Vec<String>>,
    highlights: BTreeSet<(usize, usize)>,
}

/// A highlighted cell as written to the sidecar file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightedCell<'a> {
    pub row: usize,
    pub host: &'a str,
    pub column: &'a str,
    pub value: &'a str,
}

impl MergedReport {
    pub fn new(columns: Vec<String>, host_column: String, rows: Vec<Vec<String>>) -> Self {
        MergedReport {
            columns,
            host_column,
            rows,
            highlights: BTreeSet::new(),
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row)?.get(col).map(String::as_str)
    }

    /// First row whose host identifier (trimmed) equals `host_id`.
    pub fn row_for_host(&self, host_id: &str) -> Option<usize> {
        let col = self.column_index(&self.host_column)?;
        self.rows
            .iter()
            .position(|r| r.get(col).map(|h| h.trim()) == Some(host_id))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn flag(&mut self, row: usize, col: usize) {
        self.highlights.insert((row, col));
    }

    pub fn clear_highlights(&mut self) {
        self.highlights.clear();
    }

    pub fn is_highlighted(&self, row: usize, column: &str) -> bool {
        self.column_index(column)
            .is_some_and(|col| self.highlights.contains(&(row, col)))
    }

    pub fn highlight_count(&self) -> usize {
        self.highlights.len()
    }

    /// Highlighted cells in row-major order.
    pub fn highlighted_cells(&self) -> Vec<HighlightedCell<'_>> {
        let host_col = self.column_index(&self.host_column);
        self.highlights
            .iter()
            .map(|&(row, col)| HighlightedCell {
                row,
                host: host_col
                    .and_then(|h| self.rows[row].get(h))
                    .map(|h| h.trim())
                    .unwrap_or(""),
                column: &self.columns[col],
                value: &self.rows[row][col],
            })
            .collect()
    }

    pub fn write_csv(&self, path: &Path, delimiter: u8) -> Result<()> {
        write_rows(File::create(path)?, &self.columns, self.rows.iter().cloned(), delimiter)
    }

    /// Write the highlight flags as a JSON array next to the report.
    pub fn write_highlights(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, &self.highlighted_cells())?;
        Ok(())
    }
}
