//! Run-length CPU spike detection over one host's history.
//!
//! A *run* is a maximal stretch of consecutive samples at or above the
//! threshold. A run counts as a spike when it lasts at least the minimum
//! duration **and** spans at least two samples, so a single coarse sample
//! can never produce a spike on its own.

use chrono::DateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::columns::{CPU_SPIKES_COUNT, CPU_SPIKES_TOTAL_S, CPU_SPIKE_MAX_S};
use crate::data::codec::encode_text;
use crate::data::model::{Dataset, HostSeries, Sample};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Parameters and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpikeParams {
    /// Samples `>=` this value are "above".
    pub threshold: f64,
    pub min_duration_s: u64,
    /// Used when the interval cannot be inferred from the history.
    pub default_interval_s: u64,
}

impl Default for SpikeParams {
    fn default() -> Self {
        SpikeParams {
            threshold: 80.0,
            min_duration_s: 60,
            default_interval_s: 60,
        }
    }
}

/// One countable spike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpikeInterval {
    pub duration_s: u64,
    pub run_length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpikeSummary {
    /// Interval used for every duration in this summary.
    pub interval_s: u64,
    pub samples: usize,
    pub count: usize,
    pub max_duration_s: u64,
    pub total_duration_s: u64,
    /// All samples at or above threshold, whether or not they formed a spike.
    pub total_samples_above: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpikeOutcome {
    /// The history was empty.
    NoData,
    Analyzed(SpikeSummary),
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct SpikeDetector {
    params: SpikeParams,
}

impl SpikeDetector {
    pub fn new(params: SpikeParams) -> Self {
        SpikeDetector { params }
    }

    pub fn params(&self) -> &SpikeParams {
        &self.params
    }

    /// Sampling interval taken from the first two timestamps only.
    pub fn detect_interval(&self, samples: &[Sample]) -> u64 {
        let default = self.params.default_interval_s;
        match samples {
            [first, second, ..] => {
                let diff = second.clock - first.clock;
                if diff <= 0 {
                    return default;
                }
                let diff = diff as u64;
                if diff != default {
                    warn!("detected dynamic interval: {diff}s (instead of {default}s)");
                }
                diff
            }
            _ => default,
        }
    }

    /// Countable spikes of `samples` measured with `interval_s`, plus the
    /// number of samples at or above threshold.
    pub fn scan(&self, samples: &[Sample], interval_s: u64) -> (Vec<SpikeInterval>, usize) {
        let mut spikes = Vec::new();
        let mut run = 0usize;
        let mut above = 0usize;

        for s in samples {
            if s.value >= self.params.threshold {
                run += 1;
                above += 1;
            } else {
                spikes.extend(self.close_run(run, interval_s));
                run = 0;
            }
        }
        spikes.extend(self.close_run(run, interval_s));

        (spikes, above)
    }

    fn close_run(&self, run_length: usize, interval_s: u64) -> Option<SpikeInterval> {
        let duration_s = run_length as u64 * interval_s;
        (duration_s >= self.params.min_duration_s && run_length >= 2).then_some(SpikeInterval {
            duration_s,
            run_length,
        })
    }

    pub fn analyze(&self, samples: &[Sample]) -> SpikeOutcome {
        if samples.is_empty() {
            return SpikeOutcome::NoData;
        }
        let interval_s = self.detect_interval(samples);
        let (spikes, above) = self.scan(samples, interval_s);

        SpikeOutcome::Analyzed(SpikeSummary {
            interval_s,
            samples: samples.len(),
            count: spikes.len(),
            max_duration_s: spikes.iter().map(|s| s.duration_s).max().unwrap_or(0),
            total_duration_s: spikes.iter().map(|s| s.duration_s).sum(),
            total_samples_above: above,
        })
    }
}

// ---------------------------------------------------------------------------
// Summary export
// ---------------------------------------------------------------------------

pub const SUMMARY_COLUMNS: [&str; 14] = [
    "HostID",
    "Host",
    "VisibleName",
    "IP",
    "Templates",
    "Trend",
    "Threshold_Percent",
    "Effective_Interval_s",
    CPU_SPIKES_COUNT,
    CPU_SPIKE_MAX_S,
    CPU_SPIKES_TOTAL_S,
    "History_Records_Count",
    "Total_Samples_Above_Threshold",
    "Note",
];

pub const RAW_COLUMNS: [&str; 7] = [
    "HostID",
    "Host",
    "Clock",
    "Value",
    "Threshold_Percent",
    "Effective_Interval_s",
    "Over_Threshold",
];

/// Spike summary of every host, ready to be written or joined.
#[derive(Debug, Clone)]
pub struct SpikeExport {
    pub summary: Dataset,
    /// Per-sample rows; empty unless requested.
    pub raw: Dataset,
    pub completed: usize,
    pub no_data: usize,
    pub no_item: usize,
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|c| c.to_string()).collect()
}

fn format_clock(clock: i64) -> String {
    DateTime::from_timestamp(clock, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| clock.to_string())
}

/// Run the detector over every host and build the summary export.
pub fn summarize_hosts(
    detector: &SpikeDetector,
    hosts: &[HostSeries],
    period_days: u32,
    with_raw: bool,
) -> Result<SpikeExport> {
    let threshold = encode_text(&detector.params().threshold.to_string());
    let total = hosts.len();

    let mut summary_rows = Vec::with_capacity(total);
    let mut raw_rows = Vec::new();
    let (mut completed, mut no_data, mut no_item) = (0, 0, 0);

    for (i, h) in hosts.iter().enumerate() {
        let prefix = format!("[{:>2}/{total}]", i + 1);
        let identity = [
            h.host_id.clone(),
            h.host.clone(),
            h.visible_name.clone(),
            h.ip.clone(),
            h.templates.clone(),
            period_days.to_string(),
            threshold.clone(),
        ];

        let outcome = if h.has_item {
            detector.analyze(&h.samples)
        } else {
            SpikeOutcome::NoData
        };

        let tail: Vec<String> = match &outcome {
            SpikeOutcome::NoData => {
                let note = if h.has_item {
                    info!("{prefix} {}: no data for the last {period_days}d", h.host);
                    no_data += 1;
                    "no data"
                } else {
                    info!("{prefix} {}: no CPU utilization item", h.host);
                    no_item += 1;
                    "no item"
                };
                let mut cells = vec!["-".to_string(); 6];
                cells.push(note.to_string());
                cells
            }
            SpikeOutcome::Analyzed(s) => {
                info!(
                    "{prefix} {}: {:>4} rec | spikes={:<2} | max={:>4}s | sum={:>5}s | above={}",
                    h.host, s.samples, s.count, s.max_duration_s, s.total_duration_s, s.total_samples_above
                );
                completed += 1;
                if with_raw {
                    let interval = s.interval_s.to_string();
                    raw_rows.extend(h.samples.iter().map(|sample| {
                        vec![
                            h.host_id.clone(),
                            h.host.clone(),
                            format_clock(sample.clock),
                            encode_text(&sample.value.to_string()),
                            threshold.clone(),
                            interval.clone(),
                            (sample.value >= detector.params().threshold).to_string(),
                        ]
                    }));
                }
                vec![
                    s.interval_s.to_string(),
                    s.count.to_string(),
                    s.max_duration_s.to_string(),
                    s.total_duration_s.to_string(),
                    s.samples.to_string(),
                    s.total_samples_above.to_string(),
                    String::new(),
                ]
            }
        };

        summary_rows.push(identity.into_iter().chain(tail).collect::<Vec<_>>());
    }

    info!("spike summary: completed={completed} no_data={no_data} no_item={no_item}");

    Ok(SpikeExport {
        summary: Dataset::from_rows("cpu spikes", columns(&SUMMARY_COLUMNS), summary_rows)?,
        raw: Dataset::from_rows("cpu spikes raw", columns(&RAW_COLUMNS), raw_rows)?,
        completed,
        no_data,
        no_item,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(start: i64, step: i64, values: &[f64]) -> Vec<Sample> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| Sample::new(start + i as i64 * step, *v))
            .collect()
    }

    fn summary(outcome: SpikeOutcome) -> SpikeSummary {
        match outcome {
            SpikeOutcome::Analyzed(s) => s,
            SpikeOutcome::NoData => panic!("expected analyzed outcome"),
        }
    }

    #[test]
    fn test_empty_series_is_no_data() {
        assert_eq!(SpikeDetector::default().analyze(&[]), SpikeOutcome::NoData);
    }

    #[test]
    fn test_all_above_is_one_spike() {
        let s = summary(SpikeDetector::default().analyze(&series(0, 60, &[90.0; 5])));
        assert_eq!(s.count, 1);
        assert_eq!(s.max_duration_s, 300);
        assert_eq!(s.total_duration_s, 300);
        assert_eq!(s.total_samples_above, 5);
    }

    #[test]
    fn test_alternating_samples_never_count() {
        let values = [90.0, 10.0, 85.0, 20.0, 81.0, 79.9];
        let s = summary(SpikeDetector::default().analyze(&series(0, 60, &values)));
        assert_eq!(s.count, 0);
        assert_eq!(s.max_duration_s, 0);
        assert_eq!(s.total_duration_s, 0);
        assert_eq!(s.total_samples_above, 3);
    }

    #[test]
    fn test_threshold_is_inclusive_and_open_run_closes() {
        let values = [80.0, 80.0, 10.0, 95.0, 96.0, 97.0];
        let s = summary(SpikeDetector::default().analyze(&series(0, 60, &values)));
        assert_eq!(s.count, 2);
        assert_eq!(s.max_duration_s, 180);
        assert_eq!(s.total_duration_s, 300);
        assert_eq!(s.total_samples_above, 5);
    }

    #[test]
    fn test_min_duration_gates_short_runs() {
        let detector = SpikeDetector::new(SpikeParams {
            threshold: 80.0,
            min_duration_s: 300,
            default_interval_s: 60,
        });
        let values = [90.0, 90.0, 90.0, 10.0, 90.0, 90.0, 90.0, 90.0, 90.0];
        let s = summary(detector.analyze(&series(0, 60, &values)));
        assert_eq!(s.count, 1);
        assert_eq!(s.max_duration_s, 300);
    }

    #[test]
    fn test_interval_from_first_two_samples() {
        let detector = SpikeDetector::default();
        assert_eq!(detector.detect_interval(&series(0, 30, &[1.0, 2.0, 3.0])), 30);
        assert_eq!(detector.detect_interval(&series(0, 30, &[1.0])), 60);
        assert_eq!(
            detector.detect_interval(&[Sample::new(100, 1.0), Sample::new(100, 2.0)]),
            60
        );

        // Later gaps do not change the interval.
        let samples = vec![
            Sample::new(0, 90.0),
            Sample::new(30, 90.0),
            Sample::new(600, 90.0),
        ];
        let s = summary(detector.analyze(&samples));
        assert_eq!(s.interval_s, 30);
        assert_eq!(s.max_duration_s, 90);
    }

    #[test]
    fn test_coarse_single_sample_cannot_spike() {
        // One sample at a 600s interval is long enough but only one sample.
        let samples = vec![Sample::new(0, 10.0), Sample::new(600, 95.0), Sample::new(1200, 10.0)];
        let s = summary(SpikeDetector::default().analyze(&samples));
        assert_eq!(s.count, 0);
        assert_eq!(s.total_samples_above, 1);
    }

    #[test]
    fn test_no_spike_shorter_than_two_intervals_or_minimum() {
        let detector = SpikeDetector::new(SpikeParams {
            threshold: 50.0,
            min_duration_s: 90,
            default_interval_s: 60,
        });
        let mut state: u64 = 0x5eed;
        let values: Vec<f64> = (0..500)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 33) % 100) as f64
            })
            .collect();
        let samples = series(0, 45, &values);
        let (spikes, _) = detector.scan(&samples, 45);
        assert!(!spikes.is_empty());
        for s in spikes {
            assert!(s.duration_s >= 90.max(2 * 45));
            assert!(s.run_length >= 2);
        }
    }

    #[test]
    fn test_summarize_hosts_notes_and_counts() {
        let hosts = vec![
            HostSeries {
                host_id: "1".into(),
                host: "web".into(),
                has_item: true,
                samples: series(0, 60, &[90.0, 90.0, 10.0]),
                ..Default::default()
            },
            HostSeries {
                host_id: "2".into(),
                host: "db".into(),
                has_item: true,
                ..Default::default()
            },
            HostSeries {
                host_id: "3".into(),
                host: "lb".into(),
                has_item: false,
                ..Default::default()
            },
        ];
        let export = summarize_hosts(&SpikeDetector::default(), &hosts, 7, true).unwrap();

        assert_eq!((export.completed, export.no_data, export.no_item), (1, 1, 1));
        let rows = &export.summary.records;
        assert_eq!(rows[0].value(CPU_SPIKES_COUNT), "1");
        assert_eq!(rows[0].value(CPU_SPIKE_MAX_S), "120");
        assert_eq!(rows[0].value("Threshold_Percent"), "80");
        assert_eq!(rows[0].value("Note"), "");
        assert_eq!(rows[1].value(CPU_SPIKES_COUNT), "-");
        assert_eq!(rows[1].value("Note"), "no data");
        assert_eq!(rows[2].value("Note"), "no item");

        assert_eq!(export.raw.len(), 3);
        assert_eq!(export.raw.records[0].value("Clock"), "1970-01-01 00:00:00");
        assert_eq!(export.raw.records[0].value("Over_Threshold"), "true");
        assert_eq!(export.raw.records[2].value("Over_Threshold"), "false");
    }
}
