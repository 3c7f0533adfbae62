use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use crate::config::ReportConfig;
use crate::data::loader::{load_history, read_dataset, read_optional_dataset, write_dataset};
use crate::data::model::Dataset;
use crate::highlight::{HighlightOutcome, HighlightRuleEngine};
use crate::merge::{Accumulators, KeyedAggregator};
use crate::report::MergedReport;
use crate::spikes::{summarize_hosts, SpikeDetector};

/// What a run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub hosts: usize,
    pub output: PathBuf,
    pub highlights: Option<HighlightOutcome>,
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(())
}

/// Spike summary for the merge: computed from CPU history when configured
/// (and written to `cpu_spikes`), otherwise read from `cpu_spikes`.
pub fn spike_dataset(config: &ReportConfig) -> Result<Dataset> {
    let delimiter = config.delimiter_byte();
    let Some(history_path) = &config.cpu_history else {
        return read_optional_dataset(&config.cpu_spikes, "cpu spikes", delimiter)
            .with_context(|| format!("reading {}", config.cpu_spikes.display()));
    };

    let hosts = load_history(history_path, delimiter)
        .with_context(|| format!("loading CPU history {}", history_path.display()))?;
    let detector = SpikeDetector::new(config.spike_params());
    let export = summarize_hosts(
        &detector,
        &hosts,
        config.period_days,
        config.spikes_raw_output.is_some(),
    )?;

    ensure_parent(&config.cpu_spikes)?;
    write_dataset(&config.cpu_spikes, &export.summary, delimiter)
        .with_context(|| format!("writing {}", config.cpu_spikes.display()))?;
    info!("spike summary exported: {}", config.cpu_spikes.display());

    if let Some(raw_path) = &config.spikes_raw_output {
        ensure_parent(raw_path)?;
        write_dataset(raw_path, &export.raw, delimiter)
            .with_context(|| format!("writing {}", raw_path.display()))?;
        info!("raw samples exported: {}", raw_path.display());
    }

    Ok(export.summary)
}

/// Merge all exports into one report, apply highlighting. Nothing is written.
pub fn build_report(config: &ReportConfig, spikes: &Dataset) -> Result<(MergedReport, Option<HighlightOutcome>)> {
    let delimiter = config.delimiter_byte();

    let primary = read_dataset(&config.trends, "trends", delimiter)
        .with_context(|| format!("reading {}", config.trends.display()))?;
    let disks = read_optional_dataset(&config.disks, "disks", delimiter)
        .with_context(|| format!("reading {}", config.disks.display()))?;
    let filesystems = read_optional_dataset(&config.filesystems, "filesystems", delimiter)
        .with_context(|| format!("reading {}", config.filesystems.display()))?;

    let acc = Accumulators::build(&disks, &filesystems, spikes);
    let mut report = KeyedAggregator::default().merge(&primary, &acc);

    let highlights = config
        .highlight
        .then(|| HighlightRuleEngine::default().apply(&mut report));

    Ok((report, highlights))
}

pub fn run(config: &ReportConfig) -> Result<RunSummary> {
    let spikes = spike_dataset(config)?;
    let (report, highlights) = build_report(config, &spikes)?;

    let output = config.output_path();
    ensure_parent(&output)?;
    report
        .write_csv(&output, config.delimiter_byte())
        .with_context(|| format!("writing {}", output.display()))?;

    if matches!(highlights, Some(HighlightOutcome::Applied { .. })) {
        let path = config.highlights_path();
        report
            .write_highlights(&path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(RunSummary {
        hosts: report.len(),
        output,
        highlights,
    })
}
