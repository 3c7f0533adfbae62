use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::spikes::SpikeParams;

/// Settings for one report run. Every field has a default, so a config file
/// only needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Field separator of every export read or written.
    pub delimiter: char,
    pub threshold: f64,
    pub min_duration_s: u64,
    pub sample_interval_s: u64,
    /// Reporting period, carried into the spike export and output file name.
    pub period_days: u32,
    pub highlight: bool,

    pub trends: PathBuf,
    pub disks: PathBuf,
    pub filesystems: PathBuf,
    /// Spike summary; read when `cpu_history` is unset, written otherwise.
    pub cpu_spikes: PathBuf,
    pub cpu_history: Option<PathBuf>,
    pub spikes_raw_output: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub highlights_output: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            delimiter: ';',
            threshold: 80.0,
            min_duration_s: 60,
            sample_interval_s: 60,
            period_days: 7,
            highlight: true,
            trends: PathBuf::from("reports/zbx_trends.csv"),
            disks: PathBuf::from("reports/zbx_disks.csv"),
            filesystems: PathBuf::from("reports/zbx_disks_fs.csv"),
            cpu_spikes: PathBuf::from("reports/zbx_cpu_spikes.csv"),
            cpu_history: None,
            spikes_raw_output: None,
            output: None,
            highlights_output: None,
        }
    }
}

impl ReportConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ReportConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("{} not found, using default settings", path.display());
            return Ok(ReportConfig::default());
        }
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(ReportError::InvalidConfig(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )));
        }
        if self.sample_interval_s == 0 {
            return Err(ReportError::InvalidConfig(
                "sample_interval_s must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub fn spike_params(&self) -> SpikeParams {
        SpikeParams {
            threshold: self.threshold,
            min_duration_s: self.min_duration_s,
            default_interval_s: self.sample_interval_s,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(format!("reports/merged_all_{}d.csv", self.period_days))
        })
    }

    /// Highlight sidecar; defaults to `<output stem>.highlights.json`.
    pub fn highlights_path(&self) -> PathBuf {
        self.highlights_output
            .clone()
            .unwrap_or_else(|| self.output_path().with_extension("highlights.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = ReportConfig::from_json(r#"{"threshold": 90, "period_days": 28}"#).unwrap();
        assert_eq!(config.threshold, 90.0);
        assert_eq!(config.delimiter_byte(), b';');
        assert_eq!(config.output_path(), PathBuf::from("reports/merged_all_28d.csv"));
        assert_eq!(
            config.highlights_path(),
            PathBuf::from("reports/merged_all_28d.highlights.json")
        );
        assert_eq!(config.spike_params().min_duration_s, 60);
    }

    #[test]
    fn test_rejects_bad_delimiter() {
        let err = ReportConfig::from_json(r#"{"delimiter": "§"}"#).unwrap_err();
        assert!(matches!(err, ReportError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ReportConfig::load_or_default(&dir.path().join("none.json")).unwrap();
        assert_eq!(config, ReportConfig::default());
    }
}
