//! Comparison driver: advances through paired lines, dispatches to the
//! classifier, enforces the table-row cap and critical-suppression rule,
//! detects file-length mismatch, and finalizes the scoring/accumulation
//! analyzers into a [`Summary`].

use crate::accumulation::{self, AccumulationThresholds, ErrorAccumulationData};
use crate::classify::{classify, ColumnValues, CountStats, DiffStats, Flags};
use crate::error::Error;
use crate::format::FormatTracker;
use crate::line;
use crate::metrics::{RMSEStats, TLMetrics};
use crate::report::{Reporter, Summary, TableRow};
use crate::thresholds::Thresholds;
use crate::unit_mismatch;
use chrono::Utc;
use rayon::prelude::*;
use std::path::Path;
use tracing::warn;
use vg_errortools::fat_io_wrap_std;

/// Column holding transmission-loss values to feed the curve/accumulation
/// analyzers; column 0 is always the range column.
const TL_COLUMN_INDEX: usize = 1;

/// Read both files (in parallel, mirroring the teacher's
/// `[nominal, actual].into_par_iter()` dual-read) and compare them.
pub fn compare_paths(
    path1: impl AsRef<Path> + Sync,
    path2: impl AsRef<Path> + Sync,
    thresholds: Thresholds,
    reporter: &mut dyn Reporter,
) -> Result<Summary, Error> {
    let paths = [path1.as_ref(), path2.as_ref()];
    let contents: Result<Vec<String>, Error> = paths
        .into_par_iter()
        .map(|p| fat_io_wrap_std(p, &std::fs::read_to_string).map_err(Error::from))
        .collect();
    let mut contents = contents?;
    let content2 = contents.pop().expect("exactly two files were read");
    let content1 = contents.pop().expect("exactly two files were read");

    compare_strings(&content1, &content2, path1.as_ref(), path2.as_ref(), thresholds, reporter)
}

/// Compare two already-loaded file contents. Exposed separately from
/// [`compare_paths`] so callers (and tests) can drive the core without
/// touching the filesystem.
pub fn compare_strings(
    content1: &str,
    content2: &str,
    path1: &Path,
    path2: &Path,
    thresholds: Thresholds,
    reporter: &mut dyn Reporter,
) -> Result<Summary, Error> {
    let lines1: Vec<&str> = content1.lines().collect();
    let lines2: Vec<&str> = content2.lines().collect();
    let length_mismatch = lines1.len() != lines2.len();
    let n_lines = lines1.len().min(lines2.len());

    let mut counter = CountStats::default();
    let mut differ = DiffStats::default();
    let mut flags = Flags::default();
    let mut format_tracker = FormatTracker::new();
    let mut rmse = RMSEStats::default();
    let mut tl_metrics = TLMetrics::default();
    let mut accumulation_data = ErrorAccumulationData::default();
    let accumulation_thresholds = AccumulationThresholds::default();

    let mut rows_emitted = 0usize;
    let mut suppress_rows = false;
    let mut truncation_emitted = false;
    let mut unit_mismatch_checked = false;

    for (line1, line2) in lines1.iter().take(n_lines).zip(lines2.iter().take(n_lines)) {
        counter.line_number += 1;
        let line_number = counter.line_number as usize;

        // ParseError is non-fatal to the run: the offending line is skipped
        // and the sweep continues, per the comparison's line-level error
        // policy.
        let data1 = match line::parse_line(line1, line_number) {
            Ok(data) => data,
            Err(err) => {
                warn!(line = line_number, %err, "unparsable line in file1, skipping");
                flags.error_found = true;
                continue;
            }
        };
        let data2 = match line::parse_line(line2, line_number) {
            Ok(data) => data,
            Err(err) => {
                warn!(line = line_number, %err, "unparsable line in file2, skipping");
                flags.error_found = true;
                continue;
            }
        };

        // StructureMismatch is fatal for this line only: it latches
        // `structures_compatible` (which fails the overall verdict) but the
        // sweep continues over the remaining lines.
        let new_fmt = match format_tracker.validate_and_track_column_format(data1.len(), data2.len(), line_number) {
            Ok(new_fmt) => new_fmt,
            Err(err) => {
                warn!(line = line_number, %err, "column count mismatch, skipping line");
                flags.structures_compatible = false;
                flags.error_found = true;
                continue;
            }
        };
        flags.new_fmt = new_fmt;

        if !unit_mismatch_checked && !data1.values.is_empty() && !data2.values.is_empty() {
            unit_mismatch_checked = true;
            if unit_mismatch::detect(data1.values[0], data2.values[0], Thresholds::ZERO) {
                let ratio = data1.values[0].abs() / data2.values[0].abs();
                flags.unit_mismatch = true;
                flags.unit_mismatch_line = line_number as u64;
                flags.unit_mismatch_ratio = ratio;
            }
        }

        let n_cols = data1.len().min(data2.len());
        for column_index in 0..n_cols {
            let min_dp_for_col = data1.decimal_places[column_index].min(data2.decimal_places[column_index]);
            format_tracker.initialize_or_update_decimal_place_format(min_dp_for_col, column_index, line_number);
            let threshold = FormatTracker::calculate_threshold(min_dp_for_col, thresholds.significant());

            let column = ColumnValues {
                value1: data1.values[column_index],
                value2: data2.values[column_index],
                dp1: data1.decimal_places[column_index],
                dp2: data2.decimal_places[column_index],
            };

            let outcome = classify(
                column,
                column_index,
                threshold,
                &thresholds,
                &mut counter,
                &mut differ,
                &mut flags,
            );

            if outcome.raw_diff > Thresholds::ZERO {
                rmse.add_error(column_index, outcome.raw_diff);
                if column_index > 0 {
                    rmse.add_weighted_error(column_index, outcome.raw_diff, column.value1, column.value2);
                }
                if column_index == TL_COLUMN_INDEX {
                    let range = data1.values[0];
                    tl_metrics.add_point(range, column.value1, column.value2, outcome.raw_diff);
                    accumulation_data.add_point(range, column.value1 - column.value2, column.value1);
                }
            }

            if !suppress_rows && outcome.rounded_diff > thresholds.print {
                counter.diff_print += 1;
                flags.has_printed_diff = true;
                if rows_emitted < thresholds.max_table_rows {
                    reporter.on_table_row(&TableRow {
                        line_number: counter.line_number,
                        column_index,
                        value1: column.value1,
                        value2: column.value2,
                        diff: outcome.rounded_diff,
                    });
                    rows_emitted += 1;
                } else if !truncation_emitted {
                    reporter.on_truncation_notice(rows_emitted);
                    truncation_emitted = true;
                }
            }

            if let Some(event) = outcome.first_critical {
                reporter.on_critical(counter.line_number, &event);
            }

            if flags.has_critical_diff {
                suppress_rows = true;
            }
        }
    }

    if length_mismatch {
        flags.file_end_reached = true;
    }

    tl_metrics.finalize();
    let accumulation = if accumulation_data.len() >= accumulation_thresholds.min_points {
        Some(accumulation::analyze(&accumulation_data, &accumulation_thresholds))
    } else {
        None
    };

    let m1 = rmse.weighted_rmse_data();
    let m2 = tl_metrics.calculate_m2();
    let corr = tl_metrics.calculate_correlation();
    let m_curve = tl_metrics.calculate_m_curve(m1);

    let success =
        !flags.has_critical_diff && !flags.has_significant_diff && flags.structures_compatible && !length_mismatch;

    let summary = Summary {
        input1: path1.to_path_buf(),
        input2: path2.to_path_buf(),
        counts: counter,
        flags,
        diffs: differ,
        rmse_all: rmse.rmse_all(),
        rmse_data: rmse.rmse_data(),
        weighted_rmse_data: m1,
        m1_score: TLMetrics::score_from_diff(m1),
        m2_score: TLMetrics::score_from_diff(m2),
        m3_correlation: corr,
        m_curve,
        accumulation,
        length_mismatch,
        success,
        generated_at: Utc::now(),
    };

    reporter.on_summary(&summary);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::TracingReporter;
    use std::path::PathBuf;

    fn run(content1: &str, content2: &str, thresholds: Thresholds) -> Summary {
        let mut reporter = TracingReporter::new();
        compare_strings(
            content1,
            content2,
            &PathBuf::from("a"),
            &PathBuf::from("b"),
            thresholds,
            &mut reporter,
        )
        .unwrap()
    }

    #[test]
    fn identical_files_are_the_same() {
        let summary = run("1.0 2.0\n3.0 4.0\n", "1.0 2.0\n3.0 4.0\n", Thresholds::default());
        assert!(summary.flags.files_are_same);
        assert_eq!(summary.counts.elem_number, 4);
        assert_eq!(summary.counts.diff_non_zero, 0);
        assert!(summary.success);
    }

    #[test]
    fn sub_lsb_boundary_is_trivial_and_close_enough() {
        let thresholds = Thresholds::new(0.0, 10.0, 1.0);
        let summary = run("30.8\n", "30.85\n", thresholds);
        assert_eq!(summary.counts.diff_non_zero, 1);
        assert_eq!(summary.counts.diff_trivial, 1);
        assert_eq!(summary.counts.diff_non_trivial, 0);
        assert!(summary.flags.files_are_close_enough);
        assert!(summary.success);
    }

    #[test]
    fn unit_mismatch_is_detected_on_first_line() {
        let file1 = "1852.0 10.0\n3704.0 20.0\n5556.0 30.0\n";
        let file2 = "1.0 10.0\n2.0 20.0\n3.0 30.0\n";
        let summary = run(file1, file2, Thresholds::default());
        assert!(summary.flags.unit_mismatch);
        assert_eq!(summary.flags.unit_mismatch_line, 1);
        assert!((summary.flags.unit_mismatch_ratio - 1852.0).abs() < 18.52);
    }

    #[test]
    fn critical_mid_stream_suppresses_the_second_row() {
        let thresholds = Thresholds::new(0.1, 1.0, 1.0);
        let summary = run("0.0\n0.0\n", "0.5\n2.0\n", thresholds);
        assert_eq!(summary.counts.diff_significant, 2);
        assert!(summary.flags.has_critical_diff);
        assert_eq!(summary.counts.diff_print, 1);
        assert!(!summary.success);
    }

    #[test]
    fn percent_mode_significance_flags_relative_difference() {
        let thresholds = Thresholds::new(0.0, 1000.0, 1.0).with_percent_mode(0.01);
        let summary = run("101.5\n", "100.0\n", thresholds);
        assert!(summary.flags.has_significant_diff);
    }

    #[test]
    fn length_mismatch_fails_the_verdict() {
        let summary = run("1.0\n2.0\n", "1.0\n", Thresholds::default());
        assert!(summary.length_mismatch);
        assert!(!summary.success);
    }

    #[test]
    fn unparsable_line_is_skipped_but_the_sweep_continues() {
        let summary = run("1.0 2.0\nabc def\n3.0 4.0\n", "1.0 2.0\n9.0 9.0\n3.0 4.0\n", Thresholds::default());
        assert!(summary.flags.error_found);
        assert_eq!(summary.counts.elem_number, 4);
        assert!(summary.success);
    }

    #[test]
    fn column_count_mismatch_is_fatal_for_that_line_only() {
        let summary = run("1.0 2.0\n1.0 2.0 3.0\n4.0 5.0\n", "1.0 2.0\n1.0 2.0\n4.0 5.0\n", Thresholds::default());
        assert!(!summary.flags.structures_compatible);
        assert!(summary.flags.error_found);
        assert_eq!(summary.counts.elem_number, 4);
        assert!(!summary.success);
    }
}
