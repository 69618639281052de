//! RMSE and TL-curve ("M-curve") metrics, after Goodman et al.: weighted and
//! unweighted RMSE accumulation, plus the M1/M2/M3 scoring inputs.

use std::collections::BTreeMap;

/// Full weight below this TL (dB); weight decays linearly to zero by
/// [`RMSEStats::TL_MAX_WEIGHT`].
const TL_MIN_WEIGHT: f64 = 60.0;
/// Zero weight at or above this TL (dB).
const TL_MAX_WEIGHT: f64 = 110.0;
const TL_WEIGHT_SPAN: f64 = TL_MAX_WEIGHT - TL_MIN_WEIGHT;

/// Root-mean-square-error accumulator: global, "data" (excluding the range
/// column), per-column, and TL-weighted variants of each.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct RMSEStats {
    sum_squared_errors_all: f64,
    count_all: u64,
    sum_squared_errors_data: f64,
    count_data: u64,
    sum_squared_errors_per_column: BTreeMap<usize, f64>,
    count_per_column: BTreeMap<usize, u64>,
    sum_weighted_squared_errors_data: f64,
    sum_weights_data: f64,
    sum_weighted_squared_errors_per_column: BTreeMap<usize, f64>,
    sum_weights_per_column: BTreeMap<usize, f64>,
}

impl RMSEStats {
    /// TL-based weight: `1.0` at or below 60 dB, `0.0` at or above 110 dB,
    /// linear in between.
    pub fn calculate_tl_weight(tl_value: f64) -> f64 {
        if tl_value <= TL_MIN_WEIGHT {
            1.0
        } else if tl_value >= TL_MAX_WEIGHT {
            0.0
        } else {
            (TL_MAX_WEIGHT - tl_value) / TL_WEIGHT_SPAN
        }
    }

    /// Record an unweighted squared error for `column_index`. Column 0 (the
    /// range column) is excluded from the "data" aggregate but still
    /// counted globally and per-column.
    pub fn add_error(&mut self, column_index: usize, error: f64) {
        let sq_err = error * error;
        self.sum_squared_errors_all += sq_err;
        self.count_all += 1;
        if column_index > 0 {
            self.sum_squared_errors_data += sq_err;
            self.count_data += 1;
        }
        *self.sum_squared_errors_per_column.entry(column_index).or_insert(0.0) += sq_err;
        *self.count_per_column.entry(column_index).or_insert(0) += 1;
    }

    /// Record a TL-weighted squared error. Column 0 is skipped entirely
    /// (range values are never TL-weighted).
    pub fn add_weighted_error(&mut self, column_index: usize, error: f64, tl_ref: f64, tl_test: f64) {
        if column_index == 0 {
            return;
        }
        let avg_tl = (tl_ref + tl_test) / 2.0;
        let weight = Self::calculate_tl_weight(avg_tl);
        let weighted_sq_err = weight * error * error;

        self.sum_weighted_squared_errors_data += weighted_sq_err;
        self.sum_weights_data += weight;
        *self
            .sum_weighted_squared_errors_per_column
            .entry(column_index)
            .or_insert(0.0) += weighted_sq_err;
        *self.sum_weights_per_column.entry(column_index).or_insert(0.0) += weight;
    }

    /// Unweighted RMSE over all elements.
    pub fn rmse_all(&self) -> f64 {
        if self.count_all > 0 {
            (self.sum_squared_errors_all / self.count_all as f64).sqrt()
        } else {
            0.0
        }
    }

    /// Unweighted RMSE excluding the range column.
    pub fn rmse_data(&self) -> f64 {
        if self.count_data > 0 {
            (self.sum_squared_errors_data / self.count_data as f64).sqrt()
        } else {
            0.0
        }
    }

    /// Unweighted RMSE for one column.
    pub fn rmse_column(&self, column_index: usize) -> f64 {
        match (
            self.sum_squared_errors_per_column.get(&column_index),
            self.count_per_column.get(&column_index),
        ) {
            (Some(sum), Some(&count)) if count > 0 => (sum / count as f64).sqrt(),
            _ => 0.0,
        }
    }

    /// TL-weighted RMSE, excluding the range column.
    pub fn weighted_rmse_data(&self) -> f64 {
        if self.sum_weights_data > 0.0 {
            (self.sum_weighted_squared_errors_data / self.sum_weights_data).sqrt()
        } else {
            0.0
        }
    }

    /// TL-weighted RMSE for one column.
    pub fn weighted_rmse_column(&self, column_index: usize) -> f64 {
        match (
            self.sum_weighted_squared_errors_per_column.get(&column_index),
            self.sum_weights_per_column.get(&column_index),
        ) {
            (Some(sum), Some(&weight)) if weight > 0.0 => (sum / weight).sqrt(),
            _ => 0.0,
        }
    }

    /// Whether any weighted samples were recorded.
    pub fn has_weighted_data(&self) -> bool {
        self.sum_weights_data > 0.0
    }
}

/// TL-curve comparison inputs and M1/M2/M3 ("M-curve") scoring, after
/// Goodman et al.
#[derive(Debug, Clone, Default)]
pub struct TLMetrics {
    ranges: Vec<f64>,
    tl1_values: Vec<f64>,
    tl2_values: Vec<f64>,
    diffs: Vec<f64>,
    max_range: f64,
    sum_diff_last_4pct: f64,
    count_last_4pct: u64,
    has_data: bool,
}

impl TLMetrics {
    /// Record one TL data point for the designated TL column.
    pub fn add_point(&mut self, range: f64, tl1: f64, tl2: f64, diff_abs: f64) {
        self.has_data = true;
        if range > self.max_range {
            self.max_range = range;
        }
        self.ranges.push(range);
        self.tl1_values.push(tl1);
        self.tl2_values.push(tl2);
        self.diffs.push(diff_abs);
    }

    /// Compute the last-4%-of-range statistics after all points are in.
    pub fn finalize(&mut self) {
        if !self.has_data || self.ranges.is_empty() {
            return;
        }
        let range_threshold = self.max_range * 0.96;
        self.sum_diff_last_4pct = 0.0;
        self.count_last_4pct = 0;
        for (range, diff) in self.ranges.iter().zip(self.diffs.iter()) {
            if *range >= range_threshold {
                self.sum_diff_last_4pct += diff;
                self.count_last_4pct += 1;
            }
        }
    }

    /// M2: mean absolute difference over the last 4% of the range.
    pub fn calculate_m2(&self) -> f64 {
        if !self.has_data || self.count_last_4pct == 0 {
            0.0
        } else {
            self.sum_diff_last_4pct / self.count_last_4pct as f64
        }
    }

    /// M3: Pearson correlation between the two TL curves.
    pub fn calculate_correlation(&self) -> f64 {
        if !self.has_data || self.tl1_values.len() < 2 {
            return 0.0;
        }
        let n = self.tl1_values.len() as f64;
        let mean1 = self.tl1_values.iter().sum::<f64>() / n;
        let mean2 = self.tl2_values.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denom1 = 0.0;
        let mut denom2 = 0.0;
        for (v1, v2) in self.tl1_values.iter().zip(self.tl2_values.iter()) {
            let d1 = v1 - mean1;
            let d2 = v2 - mean2;
            numerator += d1 * d2;
            denom1 += d1 * d1;
            denom2 += d2 * d2;
        }

        if denom1 < 1e-10 || denom2 < 1e-10 {
            return 0.0;
        }
        numerator / (denom1 * denom2).sqrt()
    }

    /// Map a dB difference to a 0-100 score (Figure 1 in Goodman et al.):
    /// linear 100-90 for 0-3 dB, linear 90-0 for 3-20 dB, 0 beyond.
    pub fn score_from_diff(diff: f64) -> f64 {
        if diff <= 3.0 {
            100.0 - (diff / 3.0) * 10.0
        } else if diff < 20.0 {
            (90.0 - ((diff - 3.0) / 17.0) * 90.0).max(0.0)
        } else {
            0.0
        }
    }

    /// M_curve: the average of the M1 (weighted RMSE), M2, and M3 scores.
    pub fn calculate_m_curve(&self, m1_diff: f64) -> f64 {
        let m2_diff = self.calculate_m2();
        let corr = self.calculate_correlation();

        let score1 = Self::score_from_diff(m1_diff);
        let score2 = Self::score_from_diff(m2_diff);
        let score3 = (corr * 100.0).max(0.0);

        (score1 + score2 + score3) / 3.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tl_weight_saturates_at_the_band_edges() {
        assert_eq!(RMSEStats::calculate_tl_weight(50.0), 1.0);
        assert_eq!(RMSEStats::calculate_tl_weight(120.0), 0.0);
        assert!((RMSEStats::calculate_tl_weight(85.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn rmse_accumulates_per_column_and_globally() {
        let mut stats = RMSEStats::default();
        stats.add_error(0, 1.0);
        stats.add_error(1, 2.0);
        stats.add_error(1, 2.0);

        assert!((stats.rmse_all() - (((1.0 + 4.0 + 4.0) / 3.0f64).sqrt())).abs() < 1e-12);
        assert!((stats.rmse_data() - 2.0).abs() < 1e-12);
        assert_eq!(stats.rmse_column(0), 1.0);
        assert!((stats.rmse_column(1) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn weighted_rmse_skips_range_column() {
        let mut stats = RMSEStats::default();
        stats.add_weighted_error(0, 5.0, 40.0, 40.0);
        assert!(!stats.has_weighted_data());

        stats.add_weighted_error(1, 2.0, 50.0, 50.0);
        assert!(stats.has_weighted_data());
        assert!((stats.weighted_rmse_data() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn m2_averages_only_last_4_percent_of_range() {
        let mut tl = TLMetrics::default();
        tl.add_point(10.0, 100.0, 100.0, 1.0);
        tl.add_point(100.0, 100.0, 103.0, 3.0);
        tl.finalize();
        assert!((tl.calculate_m2() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_of_identical_curves_is_one() {
        let mut tl = TLMetrics::default();
        for i in 0..10 {
            let v = i as f64;
            tl.add_point(v, v, v, 0.0);
        }
        assert!((tl.calculate_correlation() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn score_from_diff_matches_piecewise_definition() {
        assert!((TLMetrics::score_from_diff(0.0) - 100.0).abs() < 1e-9);
        assert!((TLMetrics::score_from_diff(3.0) - 90.0).abs() < 1e-9);
        assert!((TLMetrics::score_from_diff(25.0)).abs() < 1e-9);
    }
}
