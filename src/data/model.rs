use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ReportError, Result};

use super::codec;

// ---------------------------------------------------------------------------
// CellValue – a decoded export cell
// ---------------------------------------------------------------------------

/// A cell after locale-aware decoding.
///
/// Exports carry numbers as comma-decimal text; `codec::decode` turns the
/// ones that look numeric into `Integer` / `Float` and leaves everything
/// else (host names, addresses, "no data", "-") as `Text`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Float(v) => Some(*v),
            CellValue::Text(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&codec::encode(self))
    }
}

// ---------------------------------------------------------------------------
// Time series
// ---------------------------------------------------------------------------

/// One history sample: unix timestamp in seconds and the measured value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub clock: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(clock: i64, value: f64) -> Self {
        Sample { clock, value }
    }
}

/// The CPU history of one host plus the identity columns carried into the
/// spike summary export.
#[derive(Debug, Clone, Default)]
pub struct HostSeries {
    pub host_id: String,
    pub host: String,
    pub visible_name: String,
    pub ip: String,
    pub templates: String,
    /// `false` when the host has no CPU utilization item at all.
    pub has_item: bool,
    /// Ordered by `clock`, non-decreasing.
    pub samples: Vec<Sample>,
}

// ---------------------------------------------------------------------------
// HostRecord / Dataset – one delimited export
// ---------------------------------------------------------------------------

/// One row of an export, keyed by its (trimmed) host identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostRecord {
    pub host_id: String,
    /// column name → raw cell text.
    pub fields: BTreeMap<String, String>,
}

impl HostRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }

    /// Cell text, or `""` when the column is absent from this row.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }
}

/// A fully loaded export with its header order preserved.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    /// Label used in log lines and errors (e.g. "disks").
    pub name: String,
    /// Header row, in file order.
    pub columns: Vec<String>,
    /// The header cell holding the host identifier.
    pub host_column: String,
    pub records: Vec<HostRecord>,
}

impl Dataset {
    /// A dataset with no header and no records, standing in for an export
    /// that could not be loaded.
    pub fn empty(name: &str) -> Self {
        Dataset {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Build a dataset from a header row and raw rows.
    ///
    /// Fails with [`ReportError::MissingKeyColumn`] when no header cell names
    /// the host identifier. Short rows are accepted; their trailing columns
    /// are simply absent from the record.
    pub fn from_rows<I>(name: &str, columns: Vec<String>, rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut columns = columns;
        if let Some(first) = columns.first_mut() {
            if let Some(stripped) = first.strip_prefix('\u{feff}') {
                *first = stripped.to_string();
            }
        }

        let host_idx = find_host_column(&columns).ok_or_else(|| ReportError::MissingKeyColumn {
            dataset: name.to_string(),
        })?;

        let records = rows
            .into_iter()
            .map(|row| {
                let host_id = row.get(host_idx).map(|h| h.trim()).unwrap_or("").to_string();
                let fields = columns
                    .iter()
                    .cloned()
                    .zip(row)
                    .collect::<BTreeMap<_, _>>();
                HostRecord { host_id, fields }
            })
            .collect();

        Ok(Dataset {
            name: name.to_string(),
            host_column: columns[host_idx].clone(),
            columns,
            records,
        })
    }

    /// Records with a non-empty host identifier.
    pub fn keyed_records(&self) -> impl Iterator<Item = &HostRecord> {
        self.records.iter().filter(|r| !r.host_id.is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Locate the host identifier column: case-insensitive, surrounding
/// whitespace and a leading byte-order mark ignored.
pub fn find_host_column(columns: &[String]) -> Option<usize> {
    columns.iter().position(|c| {
        c.trim()
            .trim_start_matches('\u{feff}')
            .trim()
            .eq_ignore_ascii_case("hostid")
    })
}
