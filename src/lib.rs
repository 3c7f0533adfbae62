//! Consolidated per-host report from monitoring exports.
//!
//! ```text
//!  cpu history ──► spikes ──┐
//!  disks / filesystems ─────┼──► merge ──► highlight ──► report .csv
//!  trends (primary) ────────┘
//! ```

pub mod columns;
pub mod config;
pub mod data;
pub mod error;
pub mod highlight;
pub mod merge;
pub mod pipeline;
pub mod report;
pub mod spikes;

pub use config::ReportConfig;
pub use error::{ReportError, Result};
pub use report::MergedReport;
