//! Join of the trend export with the per-host secondary exports.
//!
//! Each secondary export is reduced to one accumulator in a single pass.
//! Accumulators are plain values, built fresh for every run and only read
//! while the primary rows are merged.

use std::collections::{BTreeSet, HashMap};

use log::{debug, info};

use crate::columns::{
    derived_inserts, CPU_SPIKES_COUNT, CPU_SPIKES_TOTAL_S, CPU_SPIKE_MAX_S, DISK,
    DISK_COUNT_BACKEND, DISK_COUNT_LOGICAL, DISK_TOTAL_AGG_GB, DISK_USED_AGG_GB,
    DISK_USED_AGG_PCT, FS_COUNT, FS_FREE_GB, FS_TOTAL_GB,
};
use crate::data::codec::{decode, encode, encode_float, parse_number};
use crate::data::model::Dataset;
use crate::data::schema::{build_columns, ColumnInsert};
use crate::report::MergedReport;

// ---------------------------------------------------------------------------
// Disk utilization
// ---------------------------------------------------------------------------

/// Logical disk behind a device descriptor: `"0 C:"` → `"C:"`, `"sda"` → `"sda"`.
pub fn logical_disk_id(raw: &str) -> &str {
    let raw = raw.trim();
    if raw.contains(':') {
        raw.split_whitespace().last().unwrap_or(raw)
    } else {
        raw
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiskAccumulator {
    backend: HashMap<String, usize>,
    logical: HashMap<String, BTreeSet<String>>,
}

impl DiskAccumulator {
    pub fn from_dataset(ds: &Dataset) -> Self {
        let mut acc = DiskAccumulator::default();
        for rec in ds.keyed_records() {
            *acc.backend.entry(rec.host_id.clone()).or_default() += 1;
            let logical = logical_disk_id(rec.value(DISK));
            if !logical.is_empty() {
                acc.logical
                    .entry(rec.host_id.clone())
                    .or_default()
                    .insert(logical.to_string());
            }
        }
        acc
    }

    pub fn backend_count(&self, host: &str) -> usize {
        self.backend.get(host).copied().unwrap_or(0)
    }

    pub fn logical_count(&self, host: &str) -> usize {
        self.logical.get(host).map_or(0, BTreeSet::len)
    }
}

// ---------------------------------------------------------------------------
// Filesystem inventory
// ---------------------------------------------------------------------------

/// Summed capacity over a host's filesystems, in GB.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Capacity {
    pub total_gb: f64,
    pub free_gb: f64,
}

impl Capacity {
    pub fn used_gb(&self) -> f64 {
        self.total_gb - self.free_gb
    }

    /// `0` when there is no capacity to divide by.
    pub fn used_percent(&self) -> f64 {
        if self.total_gb <= 0.0 {
            0.0
        } else {
            self.used_gb() / self.total_gb * 100.0
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilesystemAccumulator {
    counts: HashMap<String, usize>,
    totals: HashMap<String, Capacity>,
}

impl FilesystemAccumulator {
    pub fn from_dataset(ds: &Dataset) -> Self {
        let mut acc = FilesystemAccumulator::default();
        for rec in ds.keyed_records() {
            *acc.counts.entry(rec.host_id.clone()).or_default() += 1;

            let total = rec.get(FS_TOTAL_GB).and_then(parse_number);
            let free = rec.get(FS_FREE_GB).and_then(parse_number);
            let (Some(total), Some(free)) = (total, free) else {
                debug!(
                    "{}: host {} has unreadable capacity (total='{}' free='{}'), skipped",
                    ds.name,
                    rec.host_id,
                    rec.value(FS_TOTAL_GB),
                    rec.value(FS_FREE_GB)
                );
                continue;
            };

            let cap = acc.totals.entry(rec.host_id.clone()).or_default();
            cap.total_gb += total;
            cap.free_gb += free;
        }
        acc
    }

    pub fn count(&self, host: &str) -> usize {
        self.counts.get(host).copied().unwrap_or(0)
    }

    pub fn capacity(&self, host: &str) -> Option<Capacity> {
        self.totals.get(host).copied()
    }
}

// ---------------------------------------------------------------------------
// Spike summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpikeCells {
    pub count: String,
    pub max_s: String,
    pub total_s: String,
}

/// Host → spike cells; a host listed twice keeps its last entry.
#[derive(Debug, Clone, Default)]
pub struct SpikeLookup {
    entries: HashMap<String, SpikeCells>,
}

impl SpikeLookup {
    pub fn from_dataset(ds: &Dataset) -> Self {
        let entries = ds
            .keyed_records()
            .map(|rec| {
                let cells = SpikeCells {
                    count: rec.value(CPU_SPIKES_COUNT).trim().to_string(),
                    max_s: rec.value(CPU_SPIKE_MAX_S).trim().to_string(),
                    total_s: rec.value(CPU_SPIKES_TOTAL_S).trim().to_string(),
                };
                (rec.host_id.clone(), cells)
            })
            .collect();
        SpikeLookup { entries }
    }

    pub fn get(&self, host: &str) -> Option<&SpikeCells> {
        self.entries.get(host)
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Every secondary export, reduced.
#[derive(Debug, Clone, Default)]
pub struct Accumulators {
    pub disks: DiskAccumulator,
    pub filesystems: FilesystemAccumulator,
    pub spikes: SpikeLookup,
}

impl Accumulators {
    pub fn build(disks: &Dataset, filesystems: &Dataset, spikes: &Dataset) -> Self {
        Accumulators {
            disks: DiskAccumulator::from_dataset(disks),
            filesystems: FilesystemAccumulator::from_dataset(filesystems),
            spikes: SpikeLookup::from_dataset(spikes),
        }
    }
}

/// Counts of zero are reported as blank cells.
fn count_cell(n: usize) -> String {
    if n == 0 {
        String::new()
    } else {
        n.to_string()
    }
}

/// Re-encode a copied numeric cell through the codec.
fn recode(raw: &str) -> String {
    encode(&decode(raw))
}

#[derive(Debug, Clone)]
pub struct KeyedAggregator {
    inserts: Vec<ColumnInsert>,
}

impl Default for KeyedAggregator {
    fn default() -> Self {
        KeyedAggregator {
            inserts: derived_inserts(),
        }
    }
}

impl KeyedAggregator {
    pub fn with_inserts(inserts: Vec<ColumnInsert>) -> Self {
        KeyedAggregator { inserts }
    }

    /// Derived cells for one host, keyed by column name.
    pub fn derived_fields(&self, host: &str, acc: &Accumulators) -> Vec<(&'static str, String)> {
        let mut out = vec![
            (DISK_COUNT_BACKEND, count_cell(acc.disks.backend_count(host))),
            (DISK_COUNT_LOGICAL, count_cell(acc.disks.logical_count(host))),
            (FS_COUNT, count_cell(acc.filesystems.count(host))),
        ];

        match acc.filesystems.capacity(host) {
            Some(cap) => out.extend([
                (DISK_TOTAL_AGG_GB, encode_float(cap.total_gb)),
                (DISK_USED_AGG_GB, encode_float(cap.used_gb())),
                (DISK_USED_AGG_PCT, encode_float(cap.used_percent())),
            ]),
            None => out.extend([
                (DISK_TOTAL_AGG_GB, String::new()),
                (DISK_USED_AGG_GB, String::new()),
                (DISK_USED_AGG_PCT, encode_float(Capacity::default().used_percent())),
            ]),
        }

        match acc.spikes.get(host) {
            Some(s) => out.extend([
                (CPU_SPIKES_COUNT, recode(&s.count)),
                (CPU_SPIKE_MAX_S, recode(&s.max_s)),
                (CPU_SPIKES_TOTAL_S, recode(&s.total_s)),
            ]),
            None => out.extend([
                (CPU_SPIKES_COUNT, String::new()),
                (CPU_SPIKE_MAX_S, String::new()),
                (CPU_SPIKES_TOTAL_S, String::new()),
            ]),
        }

        out
    }

    /// Merge `primary` with the accumulated secondaries.
    ///
    /// The column order is settled first; every row then follows it. Primary
    /// cells are copied as they are, derived cells replace any primary cell
    /// of the same name.
    pub fn merge(&self, primary: &Dataset, acc: &Accumulators) -> MergedReport {
        let columns = build_columns(&primary.columns, &self.inserts);

        let rows: Vec<Vec<String>> = primary
            .records
            .iter()
            .map(|rec| {
                let derived: HashMap<&str, String> =
                    self.derived_fields(&rec.host_id, acc).into_iter().collect();
                columns
                    .iter()
                    .map(|col| match derived.get(col.as_str()) {
                        Some(v) => v.clone(),
                        None => rec.value(col).to_string(),
                    })
                    .collect()
            })
            .collect();

        info!("merged {} hosts into {} columns", rows.len(), columns.len());
        MergedReport::new(columns, primary.host_column.clone(), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset(name: &str, header: &[&str], rows: &[&[&str]]) -> Dataset {
        Dataset::from_rows(
            name,
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect::<Vec<Vec<String>>>(),
        )
        .unwrap()
    }

    #[test]
    fn test_logical_disk_id() {
        assert_eq!(logical_disk_id("0 C:"), "C:");
        assert_eq!(logical_disk_id("1 D: E:"), "E:");
        assert_eq!(logical_disk_id(" sda "), "sda");
        assert_eq!(logical_disk_id("nvme0n1 p1"), "nvme0n1 p1");
    }

    #[test]
    fn test_disk_accumulator_dedups_logical() {
        let ds = dataset(
            "disks",
            &["HostID", "Disk"],
            &[&["1", "0 C:"], &["1", "1 C:"], &["1", "2 D:"], &[" 2 ", "sda"], &["", "sdb"]],
        );
        let acc = DiskAccumulator::from_dataset(&ds);
        assert_eq!(acc.backend_count("1"), 3);
        assert_eq!(acc.logical_count("1"), 2);
        assert_eq!(acc.backend_count("2"), 1);
        assert_eq!(acc.backend_count(""), 0);
    }

    #[test]
    fn test_filesystem_accumulator_skips_malformed() {
        let ds = dataset(
            "fs",
            &["HostID", "Total_GB", "Free_GB"],
            &[&["1", "60,50", "10,25"], &["1", "n/a", "1"], &["1", "39.5", "9,75"], &["2", "", ""]],
        );
        let acc = FilesystemAccumulator::from_dataset(&ds);
        assert_eq!(acc.count("1"), 3);
        assert_eq!(
            acc.capacity("1"),
            Some(Capacity {
                total_gb: 100.0,
                free_gb: 20.0
            })
        );
        assert_eq!(acc.count("2"), 1);
        assert_eq!(acc.capacity("2"), None);
    }

    #[test]
    fn test_capacity_percent_guard() {
        let zero = Capacity::default();
        assert_eq!(zero.used_percent(), 0.0);
        let cap = Capacity {
            total_gb: 200.0,
            free_gb: 50.0,
        };
        assert_eq!(cap.used_gb(), 150.0);
        assert_eq!(cap.used_percent(), 75.0);
    }

    #[test]
    fn test_spike_lookup_last_entry_wins() {
        let ds = dataset(
            "spikes",
            &["HostID", "CPU_Spikes_Count", "CPU_Spike_Max_s", "CPU_Spikes_Total_s"],
            &[&["1", "1", "60", "60"], &["1", " 4 ", "240", "600"]],
        );
        let lookup = SpikeLookup::from_dataset(&ds);
        assert_eq!(
            lookup.get("1"),
            Some(&SpikeCells {
                count: "4".into(),
                max_s: "240".into(),
                total_s: "600".into()
            })
        );
    }

    #[test]
    fn test_merge_orders_columns_and_fills_rows() {
        let primary = dataset(
            "trends",
            &["HostID", "Host", "%_RAM_Util", "%_RAM_Util_MAX", "Note"],
            &[&["1", "web", "50", "90,5", "x"], &["2", "db"]],
        );
        let disks = dataset("disks", &["HostID", "Disk"], &[&["1", "sda"], &["1", "sdb"]]);
        let fs = dataset(
            "fs",
            &["HostID", "Total_GB", "Free_GB"],
            &[&["1", "0", "0"]],
        );
        let spikes = dataset(
            "spikes",
            &["HostID", "CPU_Spikes_Count", "CPU_Spike_Max_s", "CPU_Spikes_Total_s"],
            &[&["1", "0", "0", "0"]],
        );

        let report = KeyedAggregator::default().merge(&primary, &Accumulators::build(&disks, &fs, &spikes));

        assert_eq!(
            report.columns,
            vec![
                "HostID",
                "Host",
                "%_RAM_Util",
                "%_RAM_Util_MAX",
                "Disk_Count_Backend",
                "Disk_Count_Logical",
                "FS_Count",
                "Disk_Total_Agg_GB",
                "Disk_Used_Agg_GB",
                "%_Disk_Used_Agg",
                "CPU_Spikes_Count",
                "CPU_Spike_Max_s",
                "CPU_Spikes_Total_s",
                "Note",
            ]
        );
        assert_eq!(
            report.rows[0],
            vec!["1", "web", "50", "90,5", "2", "2", "1", "0,00", "0,00", "0,00", "0", "0", "0", "x"]
        );
        assert_eq!(
            report.rows[1],
            vec!["2", "db", "", "", "", "", "", "", "", "0,00", "", "", "", ""]
        );
    }

    #[test]
    fn test_merge_with_empty_secondaries() {
        let primary = dataset("trends", &["HostID", "%_RAM_Util_MAX"], &[&["1", "10"], &["1", "11"]]);
        let empty = Dataset::empty("missing");
        let report =
            KeyedAggregator::default().merge(&primary, &Accumulators::build(&empty, &empty, &empty));
        assert_eq!(report.len(), 2);
        assert_eq!(report.cell(0, DISK_USED_AGG_PCT), Some("0,00"));
        assert_eq!(report.cell(1, CPU_SPIKES_COUNT), Some(""));
    }

    #[test]
    fn test_derived_overrides_primary_column() {
        let primary = dataset("trends", &["HostID", "FS_Count"], &[&["1", "stale"]]);
        let fs = dataset("fs", &["HostID"], &[&["1"], &["1"]]);
        let empty = Dataset::empty("missing");
        let report =
            KeyedAggregator::default().merge(&primary, &Accumulators::build(&empty, &fs, &empty));
        assert_eq!(report.cell(0, FS_COUNT), Some("2"));
        assert_eq!(report.columns.iter().filter(|c| *c == FS_COUNT).count(), 1);
    }
}
