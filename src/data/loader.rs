use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::error::{ReportError, Result};

use super::model::{Dataset, HostSeries, Sample};

// ---------------------------------------------------------------------------
// Delimited exports
// ---------------------------------------------------------------------------

/// Read one delimited export with a header row.
pub fn read_dataset(path: &Path, name: &str, delimiter: u8) -> Result<Dataset> {
    let file = File::open(path)?;
    read_dataset_from(file, name, delimiter)
}

/// Like [`read_dataset`] but for a secondary export: a file that cannot be
/// opened yields an empty dataset and a warning instead of an error.
///
/// A file that opens but has no host column is still fatal.
pub fn read_optional_dataset(path: &Path, name: &str, delimiter: u8) -> Result<Dataset> {
    match File::open(path) {
        Ok(file) if file.metadata().map(|m| m.len() == 0).unwrap_or(false) => {
            warn!("{name}: {} is empty, continuing with empty data", path.display());
            Ok(Dataset::empty(name))
        }
        Ok(file) => read_dataset_from(file, name, delimiter),
        Err(e) => {
            warn!(
                "{name}: cannot open {} ({e}), continuing with empty data",
                path.display()
            );
            Ok(Dataset::empty(name))
        }
    }
}

pub fn read_dataset_from<R: Read>(reader: R, name: &str, delimiter: u8) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }
    debug!("{name}: {} records, {} columns", rows.len(), columns.len());

    Dataset::from_rows(name, columns, rows)
}

/// Write a header row and data rows, prefixed with a UTF-8 byte-order mark
/// so spreadsheet tools pick the right encoding.
pub fn write_rows<W, I>(mut writer: W, columns: &[String], rows: I, delimiter: u8) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = Vec<String>>,
{
    writer.write_all("\u{feff}".as_bytes())?;
    let mut out = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(writer);
    out.write_record(columns)?;
    for row in rows {
        out.write_record(&row)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_dataset(path: &Path, dataset: &Dataset, delimiter: u8) -> Result<()> {
    let file = File::create(path)?;
    let rows = dataset.records.iter().map(|r| {
        dataset
            .columns
            .iter()
            .map(|c| r.value(c).to_string())
            .collect::<Vec<_>>()
    });
    write_rows(file, &dataset.columns, rows, delimiter)
}

// ---------------------------------------------------------------------------
// CPU history
// ---------------------------------------------------------------------------

/// Load per-host CPU history.  Dispatch by extension.
///
/// Supported formats:
/// * `.json` – `[{ "hostid": "101", "host": "web01", "history": [{ "clock": "1700000000", "value": "12.5" }, ...] }, ...]`
/// * `.csv`  – `HostID;Host;Clock;Value` rows, one sample per row
///
/// Samples of every host are sorted by timestamp.
pub fn load_history(path: &Path, delimiter: u8) -> Result<Vec<HostSeries>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut hosts = match ext.as_str() {
        "json" => load_history_json(&std::fs::read_to_string(path)?)?,
        "csv" => load_history_csv(File::open(path)?, delimiter)?,
        other => return Err(ReportError::UnsupportedFormat(other.to_string())),
    };
    for h in &mut hosts {
        h.samples.sort_by_key(|s| s.clock);
    }
    Ok(hosts)
}

#[derive(Debug, Deserialize)]
struct HistoryHost {
    hostid: JsonValue,
    #[serde(default)]
    host: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    ip: String,
    #[serde(default)]
    templates: String,
    #[serde(default = "default_has_item")]
    has_item: bool,
    #[serde(default)]
    history: Vec<HistoryPoint>,
}

#[derive(Debug, Deserialize)]
struct HistoryPoint {
    clock: JsonValue,
    value: JsonValue,
}

fn default_has_item() -> bool {
    true
}

/// The monitoring API sends numbers as strings; accept both.
fn json_number(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn json_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

fn load_history_json(text: &str) -> Result<Vec<HostSeries>> {
    let raw: Vec<HistoryHost> = serde_json::from_str(text)?;

    raw.into_iter()
        .map(|h| -> Result<HostSeries> {
            let host_id = json_text(&h.hostid);
            let samples = h
                .history
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    let clock = json_number(&p.clock).filter(|c| c.is_finite());
                    let value = json_number(&p.value).filter(|v| v.is_finite());
                    match (clock, value) {
                        (Some(c), Some(v)) => Ok(Sample::new(c as i64, v)),
                        _ => Err(ReportError::MalformedSample {
                            host: host_id.clone(),
                            index: i,
                            reason: format!("clock={} value={}", p.clock, p.value),
                        }),
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(HostSeries {
                host_id,
                host: h.host,
                visible_name: h.name,
                ip: h.ip,
                templates: h.templates,
                has_item: h.has_item,
                samples,
            })
        })
        .collect()
}

fn load_history_csv<R: Read>(reader: R, delimiter: u8) -> Result<Vec<HostSeries>> {
    let ds = read_dataset_from(reader, "cpu history", delimiter)?;
    let name_column = ds
        .columns
        .iter()
        .find(|c| c.trim().eq_ignore_ascii_case("host") && **c != ds.host_column)
        .cloned();

    let mut hosts: Vec<HostSeries> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (row, rec) in ds.keyed_records().enumerate() {
        let clock = rec.value("Clock").trim().parse::<i64>();
        let value = rec
            .value("Value")
            .trim()
            .replace(',', ".")
            .parse::<f64>();
        let sample = match (clock, value) {
            (Ok(c), Ok(v)) if v.is_finite() => Sample::new(c, v),
            _ => {
                return Err(ReportError::MalformedSample {
                    host: rec.host_id.clone(),
                    index: row,
                    reason: format!(
                        "clock='{}' value='{}'",
                        rec.value("Clock"),
                        rec.value("Value")
                    ),
                })
            }
        };

        let slot = *index.entry(rec.host_id.clone()).or_insert_with(|| {
            hosts.push(HostSeries {
                host_id: rec.host_id.clone(),
                host: name_column
                    .as_deref()
                    .map(|c| rec.value(c).to_string())
                    .unwrap_or_default(),
                has_item: true,
                ..Default::default()
            });
            hosts.len() - 1
        });
        hosts[slot].samples.push(sample);
    }

    Ok(hosts)
}
