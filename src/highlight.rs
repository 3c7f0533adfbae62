use log::{info, warn};

use crate::columns::{
    CPU_SPIKES_COUNT, CPU_SPIKES_TOTAL_S, CPU_SPIKE_MAX_S, DISK_USED_AGG_PCT, RAM_UTIL,
    RAM_UTIL_MAX,
};
use crate::data::codec::{decode, parse_number};
use crate::report::MergedReport;

/// When a watched cell is flagged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    /// Numeric value strictly greater than the limit.
    Above(f64),
    /// Integer value strictly greater than zero.
    PositiveCount,
}

impl Rule {
    pub fn matches(&self, cell: &str) -> bool {
        match self {
            Rule::Above(limit) => parse_number(cell).is_some_and(|v| v > *limit),
            Rule::PositiveCount => decode(cell).as_i64().is_some_and(|n| n > 0),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchedColumn {
    pub name: String,
    pub rule: Rule,
}

impl WatchedColumn {
    pub fn new(name: &str, rule: Rule) -> Self {
        WatchedColumn {
            name: name.to_string(),
            rule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightOutcome {
    Applied { flagged: usize },
    /// A watched column is not in the report; nothing was flagged.
    Skipped { missing_column: String },
}

#[derive(Debug, Clone)]
pub struct HighlightRuleEngine {
    watched: Vec<WatchedColumn>,
}

impl Default for HighlightRuleEngine {
    fn default() -> Self {
        HighlightRuleEngine {
            watched: vec![
                WatchedColumn::new(RAM_UTIL, Rule::Above(80.0)),
                WatchedColumn::new(RAM_UTIL_MAX, Rule::Above(80.0)),
                WatchedColumn::new(CPU_SPIKE_MAX_S, Rule::Above(80.0)),
                WatchedColumn::new(CPU_SPIKES_TOTAL_S, Rule::Above(80.0)),
                WatchedColumn::new(CPU_SPIKES_COUNT, Rule::PositiveCount),
                WatchedColumn::new(DISK_USED_AGG_PCT, Rule::Above(80.0)),
            ],
        }
    }
}

impl HighlightRuleEngine {
    pub fn new(watched: Vec<WatchedColumn>) -> Self {
        HighlightRuleEngine { watched }
    }

    /// Flag every watched cell that matches its rule.
    ///
    /// All watched columns must be present; if one is missing the report is
    /// left unflagged.
    pub fn apply(&self, report: &mut MergedReport) -> HighlightOutcome {
        let mut targets = Vec::with_capacity(self.watched.len());
        for w in &self.watched {
            match report.column_index(&w.name) {
                Some(idx) => targets.push((idx, w.rule)),
                None => {
                    warn!(
                        "highlighting skipped: column '{}' not found in final columns",
                        w.name
                    );
                    return HighlightOutcome::Skipped {
                        missing_column: w.name.clone(),
                    };
                }
            }
        }

        let mut hits = Vec::new();
        for (row, cells) in report.rows.iter().enumerate() {
            for &(col, rule) in &targets {
                if cells.get(col).is_some_and(|c| rule.matches(c)) {
                    hits.push((row, col));
                }
            }
        }

        let flagged = hits.len();
        for (row, col) in hits {
            report.flag(row, col);
        }
        info!("highlighted {flagged} cells");
        HighlightOutcome::Applied { flagged }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(columns: &[&str], rows: &[&[&str]]) -> MergedReport {
        MergedReport::new(
            columns.iter().map(|s| s.to_string()).collect(),
            "HostID".into(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    const WATCHED: [&str; 7] = [
        "HostID",
        RAM_UTIL,
        RAM_UTIL_MAX,
        CPU_SPIKE_MAX_S,
        CPU_SPIKES_TOTAL_S,
        CPU_SPIKES_COUNT,
        DISK_USED_AGG_PCT,
    ];

    #[test]
    fn test_rules() {
        assert!(Rule::Above(80.0).matches("80,01"));
        assert!(Rule::Above(80.0).matches("81.5"));
        assert!(!Rule::Above(80.0).matches("80,00"));
        assert!(!Rule::Above(80.0).matches(""));
        assert!(!Rule::Above(80.0).matches("-"));
        assert!(Rule::PositiveCount.matches("2"));
        assert!(!Rule::PositiveCount.matches("0"));
        assert!(!Rule::PositiveCount.matches("1,5"));
        assert!(!Rule::PositiveCount.matches(""));
    }

    #[test]
    fn test_apply_flags_matching_cells() {
        let mut r = report(
            &WATCHED,
            &[
                &["1", "85,5", "90", "120", "300", "2", "80,00"],
                &["2", "10", "20", "", "", "", "0,00"],
            ],
        );
        let outcome = HighlightRuleEngine::default().apply(&mut r);
        assert_eq!(outcome, HighlightOutcome::Applied { flagged: 5 });
        assert!(r.is_highlighted(0, RAM_UTIL));
        assert!(r.is_highlighted(0, CPU_SPIKES_COUNT));
        assert!(!r.is_highlighted(0, DISK_USED_AGG_PCT));
        assert!(!r.is_highlighted(1, RAM_UTIL));
        assert_eq!(r.cell(0, RAM_UTIL), Some("85,5"));
    }

    #[test]
    fn test_missing_column_skips_everything() {
        let mut r = report(&WATCHED[..6], &[&["1", "99", "99", "999", "999", "9"]]);
        let outcome = HighlightRuleEngine::default().apply(&mut r);
        assert_eq!(
            outcome,
            HighlightOutcome::Skipped {
                missing_column: DISK_USED_AGG_PCT.to_string()
            }
        );
        assert_eq!(r.highlight_count(), 0);
    }
}
