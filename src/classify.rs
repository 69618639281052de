//! The six-level difference classifier: the deterministic cascade that
//! partitions every element-pair comparison into mutually exclusive
//! buckets (zero/non-zero, trivial/non-trivial, insignificant/significant,
//! marginal/non-marginal, critical/non-critical, error/non-error).

use crate::thresholds::Thresholds;
use tracing::debug;

/// Monotonically non-decreasing counters accumulated over one comparison.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CountStats {
    /// Lines read so far.
    pub line_number: u64,
    /// Elements (column values) checked so far.
    pub elem_number: u64,
    /// Non-zero differences, based on raw value against `Thresholds::ZERO`.
    pub diff_non_zero: u64,
    /// Non-zero differences indistinguishable at the printed precision.
    pub diff_trivial: u64,
    /// Non-zero differences distinguishable at the printed precision.
    pub diff_non_trivial: u64,
    /// Non-trivial differences exceeding the significance cutoff.
    pub diff_significant: u64,
    /// Non-trivial differences at or below the significance cutoff.
    pub diff_insignificant: u64,
    /// Significant differences where both values fall in the marginal band.
    pub diff_marginal: u64,
    /// Non-marginal differences exceeding the critical threshold.
    pub diff_critical: u64,
    /// Non-critical differences exceeding the user threshold.
    pub diff_error: u64,
    /// Non-critical differences at or below the user threshold.
    pub diff_non_error: u64,
    /// Differences large enough to be printed into the difference table.
    pub diff_print: u64,
    /// Non-trivial differences where both values exceed `ignore` (a cause
    /// of insignificance, tracked separately for the zero-threshold
    /// semantic-consistency identity).
    pub diff_high_ignore: u64,
}

/// Latching booleans describing the overall shape of the comparison.
/// Most fields only ever transition `false -> true`; the three
/// `files_*` summary flags start `true` and may only latch to `false`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Flags {
    /// Set when a format era begins (column count or precision change).
    pub new_fmt: bool,
    /// Set once either input stream is exhausted.
    pub file_end_reached: bool,
    /// Global error flag: set by a critical difference or a file-access
    /// failure.
    pub error_found: bool,
    /// Set when a stream could not be opened or read.
    pub file_access_error: bool,
    /// Cleared the first time the two files disagree in column count.
    pub structures_compatible: bool,
    pub has_non_zero_diff: bool,
    pub has_non_trivial_diff: bool,
    pub has_significant_diff: bool,
    pub has_marginal_diff: bool,
    pub has_critical_diff: bool,
    pub has_error_diff: bool,
    pub has_non_error_diff: bool,
    pub has_printed_diff: bool,
    /// Set by the unit-mismatch detector when the first line's first
    /// column looks scaled by the metres/nautical-miles ratio.
    pub unit_mismatch: bool,
    /// 1-based line on which the unit mismatch was detected.
    pub unit_mismatch_line: u64,
    /// The observed ratio (or its inverse) that triggered the detection.
    pub unit_mismatch_ratio: f64,
    /// Set when column 1 looks like monotonically increasing range data
    /// rather than TL values.
    pub column1_is_range_data: bool,
    /// Files are byte-for-byte identical in value (no non-zero diffs).
    pub files_are_same: bool,
    /// Files agree within printed precision (no non-trivial diffs).
    pub files_have_same_values: bool,
    /// Files agree within the user-defined threshold (no significant diffs).
    pub files_are_close_enough: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            new_fmt: false,
            file_end_reached: false,
            error_found: false,
            file_access_error: false,
            structures_compatible: true,
            has_non_zero_diff: false,
            has_non_trivial_diff: false,
            has_significant_diff: false,
            has_marginal_diff: false,
            has_critical_diff: false,
            has_error_diff: false,
            has_non_error_diff: false,
            has_printed_diff: false,
            unit_mismatch: false,
            unit_mismatch_line: 0,
            unit_mismatch_ratio: 0.0,
            column1_is_range_data: false,
            files_are_same: true,
            files_have_same_values: true,
            files_are_close_enough: true,
        }
    }
}

/// Monotonically non-decreasing maxima, each with the decimal-place count
/// in effect when the maximum was recorded.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DiffStats {
    pub max_non_zero: f64,
    pub max_non_trivial: f64,
    pub max_significant: f64,
    /// Largest percent error observed among finite (non-sentinel) values.
    pub max_percent_error: f64,
    pub ndp_non_zero: i32,
    pub ndp_non_trivial: i32,
    pub ndp_significant: i32,
    pub ndp_max: i32,
}

impl DiffStats {
    /// Decimal places associated with a single-precision value; fixed by
    /// the domain, not accumulated.
    pub const NDP_SINGLE_PRECISION: i32 = crate::thresholds::NDP_SINGLE_PRECISION;
}

/// One column's input to the classifier.
#[derive(Debug, Clone, Copy)]
pub struct ColumnValues {
    pub value1: f64,
    pub value2: f64,
    pub dp1: i32,
    pub dp2: i32,
}

impl ColumnValues {
    fn min_dp(&self) -> i32 {
        self.dp1.min(self.dp2)
    }
}

/// Round-half-away-from-zero to `precision` decimal places, matching the
/// source's `std::round(value * scale) / scale`.
pub fn round_to_decimals(value: f64, precision: i32) -> f64 {
    let scale = 10f64.powi(precision);
    (value * scale).round() / scale
}

/// Emitted when the classifier encounters a critical difference for the
/// first time in this comparison; carries what the reporter needs to print
/// the one diagnostic row the spec calls for.
#[derive(Debug, Clone, Copy)]
pub struct FirstCriticalEvent {
    pub rounded1: f64,
    pub rounded2: f64,
    pub diff_rounded: f64,
    pub column_index: usize,
}

/// Result of classifying one column pair: the rounded difference (useful to
/// the driver for the print-threshold and table-row-cap logic) and, if this
/// was the first critical difference seen, the event to hand to the
/// reporter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifyOutcome {
    pub raw_diff: f64,
    pub rounded_diff: f64,
    pub first_critical: Option<FirstCriticalEvent>,
}

/// Classify one column pair, mutating `counter`, `differ`, and `flags` in
/// place. `threshold` is the column's format-derived significance cutoff
/// from [`crate::format::FormatTracker::calculate_threshold`].
pub fn classify(
    column: ColumnValues,
    column_index: usize,
    threshold: f64,
    thresholds: &Thresholds,
    counter: &mut CountStats,
    differ: &mut DiffStats,
    flags: &mut Flags,
) -> ClassifyOutcome {
    let ignore = Thresholds::ignore();
    let min_dp = column.min_dp();

    let rounded1 = round_to_decimals(column.value1, min_dp);
    let rounded2 = round_to_decimals(column.value2, min_dp);
    let rounded_diff = (rounded1 - rounded2).abs();

    process_raw_values(column, differ, counter, flags);

    counter.elem_number += 1;

    let mut outcome = ClassifyOutcome {
        raw_diff: (column.value1 - column.value2).abs(),
        rounded_diff,
        first_critical: None,
    };

    outcome.first_critical = process_rounded_values(
        column,
        column_index,
        rounded1,
        rounded2,
        rounded_diff,
        min_dp,
        threshold,
        ignore,
        thresholds,
        counter,
        differ,
        flags,
    );

    outcome
}

fn process_raw_values(
    column: ColumnValues,
    differ: &mut DiffStats,
    counter: &mut CountStats,
    flags: &mut Flags,
) {
    let diff = (column.value1 - column.value2).abs();
    if diff > differ.max_non_zero {
        differ.max_non_zero = diff;
        differ.ndp_non_zero = column.min_dp();
    }
    if diff > Thresholds::ZERO {
        counter.diff_non_zero += 1;
        flags.has_non_zero_diff = true;
        flags.files_are_same = false;
    }
}

#[allow(clippy::too_many_arguments)]
fn process_rounded_values(
    column: ColumnValues,
    column_index: usize,
    rounded1: f64,
    rounded2: f64,
    rounded_diff: f64,
    min_dp: i32,
    threshold: f64,
    ignore: f64,
    thresholds: &Thresholds,
    counter: &mut CountStats,
    differ: &mut DiffStats,
    flags: &mut Flags,
) -> Option<FirstCriticalEvent> {
    const FP_TOLERANCE: f64 = 1e-12;

    let raw_diff = (column.value1 - column.value2).abs();
    let lsb = 10f64.powi(-min_dp);
    let big_zero = lsb / 2.0;
    let raw_non_zero = raw_diff > Thresholds::ZERO;

    let sub_lsb_diff = (raw_diff < big_zero)
        || ((raw_diff - big_zero).abs() < FP_TOLERANCE * raw_diff.max(big_zero));
    let trivial_after_rounding = rounded_diff == 0.0 || sub_lsb_diff;

    if !raw_non_zero {
        return None;
    }

    if trivial_after_rounding {
        counter.diff_trivial += 1;
        return None;
    }

    counter.diff_non_trivial += 1;
    flags.has_non_trivial_diff = true;
    flags.files_have_same_values = false;

    if rounded_diff > differ.max_non_trivial {
        differ.max_non_trivial = rounded_diff;
        differ.ndp_non_trivial = min_dp;
    }

    let ref_value = column.value2.abs();
    if ref_value > Thresholds::ZERO {
        let pct = 100.0 * raw_diff / ref_value;
        if pct > differ.max_percent_error {
            differ.max_percent_error = pct;
        }
    }

    let both_above_ignore = column.value1 > ignore && column.value2 > ignore;

    let exceeds_significance = if thresholds.significant_is_percent {
        let ref_value = column.value2.abs();
        if ref_value <= Thresholds::ZERO {
            rounded_diff > Thresholds::ZERO
        } else {
            (rounded_diff / ref_value) > thresholds.significant_percent
        }
    } else if thresholds.significant() == 0.0 {
        true
    } else {
        rounded_diff > threshold
    };

    debug!(
        line = counter.line_number,
        column = column_index + 1,
        raw_diff,
        rounded_diff,
        threshold,
        both_above_ignore,
        exceeds_significance,
        "classified non-trivial difference"
    );

    if both_above_ignore || !exceeds_significance {
        counter.diff_insignificant += 1;
        if both_above_ignore {
            counter.diff_high_ignore += 1;
        }
        return None;
    }

    counter.diff_significant += 1;
    flags.has_significant_diff = true;
    flags.files_are_close_enough = false;

    let marginal = crate::thresholds::MARGINAL;
    let mut first_critical = None;

    if column.value1 > marginal
        && column.value1 < ignore
        && column.value2 > marginal
        && column.value2 < ignore
    {
        counter.diff_marginal += 1;
        flags.has_marginal_diff = true;
    } else if rounded_diff > thresholds.critical && column.value1 <= ignore && column.value2 <= ignore
    {
        let was_first = !flags.has_critical_diff;
        counter.diff_critical += 1;
        flags.has_critical_diff = true;
        flags.error_found = true;
        if was_first {
            first_critical = Some(FirstCriticalEvent {
                rounded1,
                rounded2,
                diff_rounded: rounded_diff,
                column_index,
            });
        }
    } else {
        let exceeds_user = if thresholds.significant_is_percent {
            let ref_value = column.value2.abs();
            if ref_value <= Thresholds::ZERO {
                rounded_diff > Thresholds::ZERO
            } else {
                (rounded_diff / ref_value) > thresholds.significant_percent
            }
        } else {
            rounded_diff > thresholds.significant()
        };

        if exceeds_user {
            counter.diff_error += 1;
            flags.has_error_diff = true;
        } else {
            counter.diff_non_error += 1;
            flags.has_non_error_diff = true;
        }
    }

    if rounded_diff > differ.max_significant {
        differ.max_significant = rounded_diff;
        differ.ndp_significant = min_dp;
    }

    first_critical
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        value1: f64,
        value2: f64,
        dp1: i32,
        dp2: i32,
        threshold: f64,
        thresholds: &Thresholds,
    ) -> (CountStats, DiffStats, Flags, ClassifyOutcome) {
        let mut counter = CountStats::default();
        let mut differ = DiffStats::default();
        let mut flags = Flags::default();
        let outcome = classify(
            ColumnValues {
                value1,
                value2,
                dp1,
                dp2,
            },
            0,
            threshold,
            thresholds,
            &mut counter,
            &mut differ,
            &mut flags,
        );
        (counter, differ, flags, outcome)
    }

    #[test]
    fn identical_values_are_not_non_zero() {
        let thresholds = Thresholds::new(0.05, 10.0, 1.0);
        let (counter, _, flags, _) = run(1.0, 1.0, 1, 1, 0.05, &thresholds);
        assert_eq!(counter.diff_non_zero, 0);
        assert!(flags.files_are_same);
    }

    #[test]
    fn sub_lsb_difference_is_trivial() {
        // 30.8 (1dp) vs 30.85 (2dp): LSB = 0.1, half-LSB = 0.05, raw diff = 0.05.
        let thresholds = Thresholds::new(0.0, 10.0, 1.0);
        let (counter, _, flags, _) = run(30.8, 30.85, 1, 2, 0.0, &thresholds);
        assert_eq!(counter.diff_non_zero, 1);
        assert_eq!(counter.diff_trivial, 1);
        assert_eq!(counter.diff_non_trivial, 0);
        assert!(!flags.has_non_trivial_diff);
    }

    #[test]
    fn zero_threshold_marks_all_non_trivial_as_significant_unless_high_ignore() {
        let thresholds = Thresholds::new(0.0, 1000.0, 1.0);
        let (counter, _, flags, _) = run(50.0, 52.0, 1, 1, 0.0, &thresholds);
        assert_eq!(counter.diff_non_trivial, 1);
        assert_eq!(counter.diff_significant, 1);
        assert!(flags.has_significant_diff);
    }

    #[test]
    fn both_above_ignore_is_insignificant() {
        let ignore = Thresholds::ignore();
        let thresholds = Thresholds::new(0.0, 1000.0, 1.0);
        let (counter, _, _, _) = run(ignore + 10.0, ignore + 20.0, 1, 1, 0.0, &thresholds);
        assert_eq!(counter.diff_non_trivial, 1);
        assert_eq!(counter.diff_insignificant, 1);
        assert_eq!(counter.diff_high_ignore, 1);
        assert_eq!(counter.diff_significant, 0);
    }

    #[test]
    fn marginal_band_is_flagged_within_significant() {
        let thresholds = Thresholds::new(0.05, 1000.0, 1.0);
        let (counter, _, flags, _) = run(115.0, 117.0, 1, 1, 0.05, &thresholds);
        assert_eq!(counter.diff_significant, 1);
        assert_eq!(counter.diff_marginal, 1);
        assert!(flags.has_marginal_diff);
    }

    #[test]
    fn critical_difference_sets_flags_and_first_event() {
        let thresholds = Thresholds::new(0.1, 1.0, 1.0);
        let (counter, _, flags, outcome) = run(0.0, 2.0, 1, 1, 0.1, &thresholds);
        assert_eq!(counter.diff_critical, 1);
        assert!(flags.has_critical_diff);
        assert!(flags.error_found);
        assert!(outcome.first_critical.is_some());
    }

    #[test]
    fn second_critical_does_not_refire_first_critical_event() {
        let thresholds = Thresholds::new(0.1, 1.0, 1.0);
        let mut counter = CountStats::default();
        let mut differ = DiffStats::default();
        let mut flags = Flags::default();
        let first = classify(
            ColumnValues {
                value1: 0.0,
                value2: 2.0,
                dp1: 1,
                dp2: 1,
            },
            0,
            0.1,
            &thresholds,
            &mut counter,
            &mut differ,
            &mut flags,
        );
        counter.line_number += 1;
        let second = classify(
            ColumnValues {
                value1: 0.0,
                value2: 3.0,
                dp1: 1,
                dp2: 1,
            },
            0,
            0.1,
            &thresholds,
            &mut counter,
            &mut differ,
            &mut flags,
        );
        assert!(first.first_critical.is_some());
        assert!(second.first_critical.is_none());
        assert_eq!(counter.diff_critical, 2);
    }

    #[test]
    fn sub_lsb_pair_never_trips_critical_even_with_a_tiny_critical_threshold() {
        // 30.8 (1dp) vs 30.85 (2dp) is trivial regardless of user thresholds;
        // a naive rounded-value critical check (rounded to 30.8 vs 30.9)
        // would otherwise see a diff above a small critical threshold.
        let thresholds = Thresholds::new(0.0, 0.05, 1.0);
        let (counter, _, flags, outcome) = run(30.8, 30.85, 1, 2, 0.0, &thresholds);
        assert_eq!(counter.diff_trivial, 1);
        assert_eq!(counter.diff_non_trivial, 0);
        assert_eq!(counter.diff_critical, 0);
        assert!(!flags.has_critical_diff);
        assert!(outcome.first_critical.is_none());
    }

    #[test]
    fn percent_mode_significance() {
        let thresholds = Thresholds::new(0.0, 1000.0, 1.0).with_percent_mode(0.01);
        let (_, _, flags, _) = run(101.5, 100.0, 1, 1, 0.0, &thresholds);
        assert!(flags.has_significant_diff);
    }

    #[test]
    fn round_to_decimals_is_half_away_from_zero() {
        assert_eq!(round_to_decimals(2.5, 0), 3.0);
        assert_eq!(round_to_decimals(-2.5, 0), -3.0);
        assert_eq!(round_to_decimals(1.005, 2), 1.01);
    }
}
