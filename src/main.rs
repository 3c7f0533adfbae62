use std::path::PathBuf;

use anyhow::Result;
use log::{info, warn};

use zbx_report::highlight::HighlightOutcome;
use zbx_report::{pipeline, ReportConfig};

fn main() -> Result<()> {
    env_logger::init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("zbx-report.json"));
    let config = ReportConfig::load_or_default(&config_path)?;

    let summary = pipeline::run(&config)?;
    match &summary.highlights {
        Some(HighlightOutcome::Applied { flagged }) => info!("{flagged} cells highlighted"),
        Some(HighlightOutcome::Skipped { missing_column }) => {
            warn!("report written without highlights ('{missing_column}' missing)")
        }
        None => info!("highlighting disabled"),
    }
    println!("DONE -> {} ({} hosts)", summary.output.display(), summary.hosts);
    Ok(())
}
