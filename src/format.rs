//! Format tracker: per-column minimum-printed-decimal-place state, scoped to
//! a "format era" (a maximal run of lines sharing the same column count).

use thiserror::Error;

/// Errors raised while tracking format changes across lines.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The two files have a different number of columns on the same line.
    #[error("line {line_number}: column count mismatch (file1: {n_col1}, file2: {n_col2})")]
    ColumnCountMismatch {
        /// 1-based line number.
        line_number: usize,
        /// Column count from the first file's line.
        n_col1: usize,
        /// Column count from the second file's line.
        n_col2: usize,
    },
}

/// Per-column minimum printed decimal places, reset whenever the column
/// count changes (a new "format era" begins).
#[derive(Debug, Default)]
pub struct FormatTracker {
    per_col_dp: Vec<i32>,
    prev_n_col: usize,
    /// Line on which the current format era began.
    pub this_fmt_line: usize,
    /// Column on which the most recent per-column format change was
    /// recorded.
    pub this_fmt_column: usize,
}

impl FormatTracker {
    /// New tracker with no prior lines observed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate that both lines have the same column count and update era
    /// state. Returns whether a new format era began on this line.
    pub fn validate_and_track_column_format(
        &mut self,
        n_col1: usize,
        n_col2: usize,
        line_number: usize,
    ) -> Result<bool, Error> {
        if n_col1 != n_col2 {
            return Err(Error::ColumnCountMismatch {
                line_number,
                n_col1,
                n_col2,
            });
        }

        let mut new_fmt = false;
        if line_number == 1 {
            self.prev_n_col = n_col1;
        } else if self.prev_n_col > 0 && n_col1 != self.prev_n_col {
            self.per_col_dp.clear();
            new_fmt = true;
            self.this_fmt_line = line_number;
        }
        self.prev_n_col = n_col1;
        Ok(new_fmt)
    }

    /// Register the minimum decimal places observed for `column_index` on
    /// this line, creating the column's era state if it is new. Returns
    /// whether this changed the format era.
    pub fn initialize_or_update_decimal_place_format(
        &mut self,
        min_dp: i32,
        column_index: usize,
        line_number: usize,
    ) -> bool {
        if self.per_col_dp.len() == column_index {
            self.per_col_dp.push(min_dp);
            self.this_fmt_line = line_number;
            self.this_fmt_column = column_index + 1;
            true
        } else if self.per_col_dp[column_index] != min_dp {
            self.per_col_dp[column_index] = min_dp;
            self.this_fmt_line = line_number;
            true
        } else {
            false
        }
    }

    /// The format-derived significance threshold for a column of minimum
    /// decimal places `decimal_places`: `max(10^-decimal_places, significant)`.
    pub fn calculate_threshold(decimal_places: i32, significant_threshold: f64) -> f64 {
        let dp_threshold = 10f64.powi(-decimal_places);
        dp_threshold.max(significant_threshold)
    }

    /// Minimum decimal places currently recorded for a column, if any.
    pub fn column_min_dp(&self, column_index: usize) -> Option<i32> {
        self.per_col_dp.get(column_index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_initializes_without_new_format() {
        let mut tracker = FormatTracker::new();
        let new_fmt = tracker
            .validate_and_track_column_format(3, 3, 1)
            .unwrap();
        assert!(!new_fmt);
    }

    #[test]
    fn column_count_change_starts_new_era() {
        let mut tracker = FormatTracker::new();
        tracker.validate_and_track_column_format(3, 3, 1).unwrap();
        tracker
            .initialize_or_update_decimal_place_format(2, 0, 1);

        let new_fmt = tracker
            .validate_and_track_column_format(4, 4, 2)
            .unwrap();
        assert!(new_fmt);
        assert_eq!(tracker.this_fmt_line, 2);
        assert_eq!(tracker.column_min_dp(0), None);
    }

    #[test]
    fn mismatched_column_counts_error() {
        let mut tracker = FormatTracker::new();
        let err = tracker
            .validate_and_track_column_format(3, 4, 5)
            .unwrap_err();
        assert_eq!(
            err,
            Error::ColumnCountMismatch {
                line_number: 5,
                n_col1: 3,
                n_col2: 4
            }
        );
    }

    #[test]
    fn new_column_initializes_era() {
        let mut tracker = FormatTracker::new();
        let changed = tracker.initialize_or_update_decimal_place_format(2, 0, 1);
        assert!(changed);
        assert_eq!(tracker.column_min_dp(0), Some(2));
    }

    #[test]
    fn decimal_place_change_on_existing_column_is_tracked() {
        let mut tracker = FormatTracker::new();
        tracker.initialize_or_update_decimal_place_format(2, 0, 1);
        let changed = tracker.initialize_or_update_decimal_place_format(3, 0, 2);
        assert!(changed);
        assert_eq!(tracker.column_min_dp(0), Some(3));
    }

    #[test]
    fn unchanged_decimal_places_report_no_change() {
        let mut tracker = FormatTracker::new();
        tracker.initialize_or_update_decimal_place_format(2, 0, 1);
        let changed = tracker.initialize_or_update_decimal_place_format(2, 0, 2);
        assert!(!changed);
    }

    #[test]
    fn threshold_prefers_the_larger_of_format_and_significant() {
        assert_eq!(FormatTracker::calculate_threshold(2, 0.001), 0.01);
        assert_eq!(FormatTracker::calculate_threshold(1, 0.5), 0.5);
    }
}
