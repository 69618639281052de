//! Reporter boundary. Classification mutates state only; a `Reporter` emits
//! at the well-defined points the driver names: first critical difference,
//! each printable table row, one truncation notice, and the final summary.
//! Mirrors the teacher's separation between `csv`/`html` comparison (state)
//! and `report::create_*` (rendering).

use crate::accumulation::AccumulationMetrics;
use crate::classify::{CountStats, DiffStats, FirstCriticalEvent, Flags};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info, warn};

/// One row destined for the difference table.
#[derive(Debug, Clone, Copy)]
pub struct TableRow {
    /// 1-based line number.
    pub line_number: u64,
    /// 0-based column index.
    pub column_index: usize,
    pub value1: f64,
    pub value2: f64,
    pub diff: f64,
}

/// The capability the driver emits events through. Implementors decide how
/// (or whether) to render; the driver never formats text itself.
pub trait Reporter {
    /// Called once, the first time a critical difference is encountered.
    fn on_critical(&mut self, line_number: u64, event: &FirstCriticalEvent);
    /// Called for a row whose rounded difference exceeds `Thresholds::print`,
    /// while row emission is not suppressed.
    fn on_table_row(&mut self, row: &TableRow);
    /// Called exactly once, when the table-row cap is first exceeded.
    fn on_truncation_notice(&mut self, rows_emitted: usize);
    /// Called once at end-of-run with the final summary.
    fn on_summary(&mut self, summary: &Summary);
}

/// The final, structured result of one comparison: everything
/// `spec.md` §6's "Reporter output contract" asks for, plus provenance.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Summary {
    pub input1: PathBuf,
    pub input2: PathBuf,
    pub counts: CountStats,
    pub flags: Flags,
    pub diffs: DiffStats,
    pub rmse_all: f64,
    pub rmse_data: f64,
    pub weighted_rmse_data: f64,
    pub m1_score: f64,
    pub m2_score: f64,
    pub m3_correlation: f64,
    pub m_curve: f64,
    pub accumulation: Option<AccumulationMetrics>,
    /// True when one file ended before the other.
    pub length_mismatch: bool,
    /// Overall pass/fail: no critical difference, no significant difference,
    /// compatible structure, and no length mismatch.
    pub success: bool,
    pub generated_at: DateTime<Utc>,
}

/// Reference `Reporter` that emits through `tracing` at the density the
/// rest of the crate uses, and accumulates a plain-text table so callers
/// (the CLI) can print a report without a templating engine.
#[derive(Debug, Default)]
pub struct TracingReporter {
    /// The accumulated plain-text difference table, header included.
    pub table: String,
    header_written: bool,
}

impl TracingReporter {
    /// A fresh reporter with an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_header(&mut self) {
        if !self.header_written {
            self.table.push_str("line\tcolumn\tvalue1\tvalue2\tdiff\n");
            self.header_written = true;
        }
    }
}

impl Reporter for TracingReporter {
    fn on_critical(&mut self, line_number: u64, event: &FirstCriticalEvent) {
        error!(
            line = line_number,
            column = event.column_index + 1,
            value1 = event.rounded1,
            value2 = event.rounded2,
            diff = event.diff_rounded,
            "critical difference"
        );
    }

    fn on_table_row(&mut self, row: &TableRow) {
        self.ensure_header();
        self.table.push_str(&format!(
            "{}\t{}\t{:.6}\t{:.6}\t{:.6}\n",
            row.line_number,
            row.column_index + 1,
            row.value1,
            row.value2,
            row.diff
        ));
    }

    fn on_truncation_notice(&mut self, rows_emitted: usize) {
        warn!(rows_emitted, "difference table truncated");
        self.table.push_str("... (table truncated)\n");
    }

    fn on_summary(&mut self, summary: &Summary) {
        info!(
            success = summary.success,
            elem_number = summary.counts.elem_number,
            diff_significant = summary.counts.diff_significant,
            diff_critical = summary.counts.diff_critical,
            m_curve = summary.m_curve,
            "comparison summary"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{CountStats, DiffStats};

    #[test]
    fn table_rows_share_one_header() {
        let mut reporter = TracingReporter::new();
        reporter.on_table_row(&TableRow {
            line_number: 1,
            column_index: 0,
            value1: 1.0,
            value2: 2.0,
            diff: 1.0,
        });
        reporter.on_table_row(&TableRow {
            line_number: 2,
            column_index: 0,
            value1: 1.0,
            value2: 3.0,
            diff: 2.0,
        });
        assert_eq!(reporter.table.matches("line\tcolumn").count(), 1);
        assert_eq!(reporter.table.lines().count(), 3);
    }

    #[test]
    fn truncation_notice_is_appended_once() {
        let mut reporter = TracingReporter::new();
        reporter.on_truncation_notice(5);
        assert!(reporter.table.contains("truncated"));
    }

    #[allow(dead_code)]
    fn example_summary() -> Summary {
        Summary {
            input1: PathBuf::from("a"),
            input2: PathBuf::from("b"),
            counts: CountStats::default(),
            flags: Flags::default(),
            diffs: DiffStats::default(),
            rmse_all: 0.0,
            rmse_data: 0.0,
            weighted_rmse_data: 0.0,
            m1_score: 100.0,
            m2_score: 100.0,
            m3_correlation: 1.0,
            m_curve: 100.0,
            accumulation: None,
            length_mismatch: false,
            success: true,
            generated_at: Utc::now(),
        }
    }
}
